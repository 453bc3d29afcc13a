//! Conversation State - the single mutable record for a card-replacement session
//!
//! One `ConversationState` per session, created empty at session start and
//! discarded at session end. Field semantics differ on purpose:
//! - `selected_card_id` / `reason` / `address`: overwritten by later
//!   extraction or explicit user edit, never cleared automatically
//! - `address_confirmed` / `delivery_confirmed`: tri-state, `None` means
//!   "not yet known" and is distinct from `Some(false)`
//! - `plan`: replaced each turn; `thoughts` / `events`: append-only
//! - `next_questions`: replaced wholesale by each decide step

use serde::{Deserialize, Serialize};

/// Classified category of the user's request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ReplaceCard,
    CancelCard,
    AddressUpdate,
    StatusCheck,
    Other,
}

impl Default for Intent {
    fn default() -> Self {
        Self::Other
    }
}

impl Intent {
    /// Parse a classifier label. Unknown or missing labels fall back to `Other`.
    pub fn parse(label: &str) -> Self {
        match label {
            "replace_card" => Self::ReplaceCard,
            "cancel_card" => Self::CancelCard,
            "address_update" => Self::AddressUpdate,
            "status_check" => Self::StatusCheck,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReplaceCard => "replace_card",
            Self::CancelCard => "cancel_card",
            Self::AddressUpdate => "address_update",
            Self::StatusCheck => "status_check",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing verdict for the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Missing details; surface `next_questions` to the user
    AskUser,
    /// All readiness rules satisfied; continue to validate + act
    ProceedReplacement,
    /// User is done
    Exit,
}

impl Default for Decision {
    fn default() -> Self {
        Self::AskUser
    }
}

impl Decision {
    /// Parse a decide-step label. Anything unrecognized falls back to `AskUser`
    /// so `decision` is never left empty or out of range.
    pub fn parse(label: &str) -> Self {
        match label {
            "proceed_replacement" => Self::ProceedReplacement,
            "exit" => Self::Exit,
            _ => Self::AskUser,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AskUser => "ask_user",
            Self::ProceedReplacement => "proceed_replacement",
            Self::Exit => "exit",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transcript message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry, for display only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Session state threaded through every turn of the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Latest raw user utterance
    pub user_query: String,

    /// Extracted or user-supplied card id
    pub selected_card_id: Option<String>,

    /// Reason for replacement/cancellation
    pub reason: Option<String>,

    /// Delivery address as a single line
    pub address: Option<String>,

    /// Tri-state: has the user confirmed the delivery address?
    pub address_confirmed: Option<bool>,

    /// Tri-state: has the user confirmed final dispatch?
    pub delivery_confirmed: Option<bool>,

    /// Classified intent, `Other` when extraction fails
    pub intent: Intent,

    /// Latest plan text, replaced each turn
    pub plan: Option<String>,

    /// Think-step reflections, append-only
    pub thoughts: Vec<String>,

    /// Routing verdict from the decide step
    pub decision: Decision,

    /// Questions to put to the user, replaced each decide step
    pub next_questions: Vec<String>,

    /// Set during the validate step only
    pub ownership_validated: bool,

    /// Set on successful cancel + dispatch only
    pub final_message: Option<String>,

    /// Display transcript
    pub messages: Vec<ChatMessage>,

    /// Human-readable audit trail, append-only, never read by control logic
    pub events: Vec<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an audit event
    pub fn push_event(&mut self, event: impl Into<String>) {
        self.events.push(event.into());
    }
}
