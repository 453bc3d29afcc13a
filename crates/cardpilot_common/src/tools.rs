//! Action Tools - ownership validation and mocked card operations
//!
//! Cancel and dispatch are deterministic mocks with no real side effect.
//! Each returns an `event` string destined for the session audit trail.

use crate::profile::Profile;
use serde::{Deserialize, Serialize};

/// Fixed audit messages for the ownership check
pub const OWNERSHIP_OK: &str = "Ownership validated.";
pub const OWNERSHIP_NOT_FOUND: &str = "Card not found for this user.";

/// Result of the mock cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub card_id: String,
    pub status: String,
    pub event: String,
}

/// Result of the mock replacement dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub card_id: String,
    pub tracking_id: String,
    pub address: String,
    pub event: String,
}

/// True iff `card_id` exactly matches a card on file. The message is fixed
/// for either outcome.
pub fn validate_card_ownership(profile: &Profile, card_id: &str) -> (bool, &'static str) {
    let owned = profile.cards.iter().any(|c| c.card_id == card_id);
    if owned {
        (true, OWNERSHIP_OK)
    } else {
        (false, OWNERSHIP_NOT_FOUND)
    }
}

/// Mock cancellation. Always succeeds.
pub fn cancel_card(card_id: &str) -> CancelResult {
    CancelResult {
        card_id: card_id.to_string(),
        status: "CANCELLED".to_string(),
        event: format!("Card {} cancelled.", card_id),
    }
}

/// Mock dispatch. The tracking id swaps the CRD literal for TRK, so
/// CRD-001 yields TRK-001. Always succeeds.
pub fn dispatch_replacement(card_id: &str, address: &str) -> DispatchResult {
    DispatchResult {
        card_id: card_id.to_string(),
        tracking_id: card_id.replace("CRD", "TRK"),
        address: address.to_string(),
        event: format!("Replacement for {} dispatched to: {}", card_id, address),
    }
}
