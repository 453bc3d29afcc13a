//! Interactive chat session
//!
//! Holds the session's `ConversationState` and runs one pipeline turn per
//! user line. The held state is only replaced when a turn succeeds, so a
//! failed model call leaves the session intact for retry.

use anyhow::{Context, Result};
use cardpilot_common::{
    ChatMessage, ConversationState, Decision, HttpLlmClient, LlmConfig, ProfileStore, TurnPipeline,
};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

pub fn run(profile_path: &str, verbose: bool) -> Result<()> {
    let store = ProfileStore::new(profile_path);

    // Missing or unreadable profile is fatal at startup
    let profile = store
        .load()
        .with_context(|| format!("cannot start a session without a profile ({})", profile_path))?;

    let config = LlmConfig::from_env();
    tracing::debug!(endpoint = %config.endpoint, model = %config.model, "LLM configured");

    let llm = HttpLlmClient::new(config).context("failed to build LLM client")?;
    let pipeline = TurnPipeline::new(Box::new(llm), store);

    println!();
    println!(
        "{}  {}",
        "💳".bold(),
        "CardPilot - card replacement agent".bright_white().bold()
    );
    println!(
        "   Signed in as {}. Cards on file: {}.",
        profile.user_id.bright_cyan(),
        profile.cards.len()
    );
    println!(
        "   {}",
        "Ask me to replace or cancel a card, e.g. 'Replace CRD-001 due to damage'.".dimmed()
    );
    println!("   {}", "Type 'exit' to quit.".dimmed());
    println!();

    let mut state = ConversationState::new();
    let stdin = io::stdin();

    loop {
        print!("{} ", "you ❯".bright_green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        state.messages.push(ChatMessage::user(input));

        // The pipeline consumes a clone; on error the prior state survives
        match pipeline.run_turn(state.clone(), input) {
            Ok(updated) => {
                state = updated;
                if let Some(reply) = assistant_reply(&state) {
                    state.messages.push(ChatMessage::assistant(reply));
                }
                render_turn(&state, verbose);

                if state.decision == Decision::Exit {
                    println!("   {}", "Understood, ending the session.".dimmed());
                    break;
                }
            }
            Err(e) => {
                println!("{}  turn failed: {:#}", "✗".bright_red().bold(), e);
                println!("   {}", "Your details are kept; please try again.".dimmed());
            }
        }
        println!();
    }

    Ok(())
}

/// Transcript entry for the assistant's side of a turn, if it said anything
fn assistant_reply(state: &ConversationState) -> Option<String> {
    if let Some(msg) = &state.final_message {
        Some(msg.clone())
    } else if !state.next_questions.is_empty() {
        Some(state.next_questions.join(" "))
    } else {
        None
    }
}

/// Render the assistant's side of one completed turn
fn render_turn(state: &ConversationState, verbose: bool) {
    if let Some(msg) = &state.final_message {
        println!("{}  {}", "✓".bright_green().bold(), msg.bright_white());
    } else if !state.next_questions.is_empty() {
        println!(
            "{}  {}",
            "?".bright_cyan().bold(),
            "I need a few details".bright_white().bold()
        );
        for q in &state.next_questions {
            println!("   - {}", q);
        }
    }

    if verbose {
        if let Some(plan) = &state.plan {
            println!();
            println!("   {}", "Plan".bold().underline());
            for line in plan.lines() {
                println!("   {}", line.dimmed());
            }
        }
        if !state.thoughts.is_empty() {
            println!();
            println!("   {}", "Think".bold().underline());
            for (i, t) in state.thoughts.iter().enumerate() {
                println!("   {} {}", format!("[{}]", i + 1).cyan(), t.dimmed());
            }
        }
        if !state.events.is_empty() {
            println!();
            println!("   {}", "Events".bold().underline());
            for e in &state.events {
                println!("   {}", e.dimmed());
            }
        }
    }
}
