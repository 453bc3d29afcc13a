//! CardPilot Common - shared library for the card replacement agent
//!
//! Conversation state, profile store, action tools, prompt templates, the
//! LLM client boundary, and the turn pipeline that ties them together.

pub mod llm_client;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod state;
pub mod tools;

pub use llm_client::{FakeLlmClient, HttpLlmClient, LlmClient, LlmConfig, LlmError};
pub use pipeline::{TurnPipeline, SUCCESS_MESSAGE};
pub use profile::{Address, Card, Profile, ProfileError, ProfileStore, DEFAULT_PROFILE_PATH};
pub use state::{ChatMessage, ConversationState, Decision, Intent, Role};
