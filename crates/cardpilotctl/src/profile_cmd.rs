//! Profile view - user id, cards on file, default address

use anyhow::{Context, Result};
use cardpilot_common::ProfileStore;
use owo_colors::OwoColorize;

pub fn run(profile_path: &str) -> Result<()> {
    let profile = ProfileStore::new(profile_path)
        .load()
        .with_context(|| format!("failed to load profile ({})", profile_path))?;

    println!();
    println!("{}  {}", "👤".bold(), "User".bright_white().bold());
    println!("   {}", profile.user_id.bright_cyan());

    println!();
    println!("{}  {}", "💼".bold(), "Cards on file".bright_white().bold());
    if profile.cards.is_empty() {
        println!("   {}", "(none)".dimmed());
    } else {
        println!(
            "   {:<10} {:<12} {:<22} {}",
            "CARD".dimmed(),
            "TYPE".dimmed(),
            "NUMBER".dimmed(),
            "STATUS".dimmed()
        );
        for card in &profile.cards {
            println!(
                "   {:<10} {:<12} {:<22} {}",
                card.card_id.bright_cyan(),
                card.card_type,
                card.masked_number,
                card.status
            );
        }
    }

    println!();
    println!("{}  {}", "🏠".bold(), "Default address".bright_white().bold());
    println!("   {}", profile.default_address());
    println!();

    Ok(())
}
