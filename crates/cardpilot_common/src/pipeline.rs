//! Turn Pipeline - one full pass of classify → plan → think → decide → act
//!
//! Stages run strictly in order with a single branch: the decide step routes
//! either to validate + cancel/dispatch or back to the caller with questions
//! for the user. Model-call failures abort the turn; malformed model output
//! never does (it downgrades to an empty parse, and every field read has a
//! documented default).

use crate::llm_client::LlmClient;
use crate::profile::ProfileStore;
use crate::prompts;
use crate::state::{ConversationState, Decision, Intent};
use crate::tools::{cancel_card, dispatch_replacement, validate_card_ownership};
use anyhow::{Context, Result};

/// Fixed success string set when cancel + dispatch completes
pub const SUCCESS_MESSAGE: &str = "Your card has been successfully cancelled and a new card is \
                                   dispatched to the confirmed address.";

/// Extract a JSON object from raw model text: take the substring from the
/// first `{` to the last `}` inclusive and parse it. No braces or a parse
/// failure yields an empty object; callers read fields with defaults and
/// never fail on bad model output.
pub fn extract_json(text: &str) -> serde_json::Value {
    let start = match text.find('{') {
        Some(i) => i,
        None => return serde_json::json!({}),
    };
    let end = match text.rfind('}') {
        Some(i) if i >= start => i,
        _ => return serde_json::json!({}),
    };

    match serde_json::from_str(&text[start..=end]) {
        Ok(serde_json::Value::Object(map)) => serde_json::Value::Object(map),
        Ok(_) | Err(_) => serde_json::json!({}),
    }
}

/// Executes one turn against the model and the profile-backed tools
pub struct TurnPipeline {
    llm: Box<dyn LlmClient>,
    profile_store: ProfileStore,
}

impl TurnPipeline {
    pub fn new(llm: Box<dyn LlmClient>, profile_store: ProfileStore) -> Self {
        Self { llm, profile_store }
    }

    /// Run one full turn. Consumes the session state and returns the updated
    /// state; on error the caller keeps its prior copy, so a failed turn
    /// never corrupts the session.
    pub fn run_turn(
        &self,
        mut state: ConversationState,
        user_query: &str,
    ) -> Result<ConversationState> {
        state.user_query = user_query.to_string();

        self.classify(&mut state)?;
        self.plan(&mut state)?;
        self.think(&mut state)?;
        self.decide(&mut state)?;

        if state.decision != Decision::ProceedReplacement {
            tracing::debug!(decision = %state.decision, "turn ends at decide");
            return Ok(state);
        }

        self.validate(&mut state)?;
        // Validation is recorded but does not gate dispatch; see DESIGN.md
        // before changing this.
        self.cancel_and_dispatch(&mut state)?;

        Ok(state)
    }

    /// Classify intent and merge extracted fields into state
    fn classify(&self, state: &mut ConversationState) -> Result<()> {
        let prompt = prompts::render_classify(&state.user_query);
        let text = self.llm.invoke(&prompt).context("classify stage failed")?;
        let parsed = extract_json(&text);

        // Non-empty strings overwrite; null/absent/empty leave prior values
        for (key, field) in [
            ("reason", &mut state.reason),
            ("selected_card_id", &mut state.selected_card_id),
            ("address", &mut state.address),
        ] {
            if let Some(value) = parsed.get(key).and_then(|v| v.as_str()) {
                if !value.is_empty() {
                    *field = Some(value.to_string());
                }
            }
        }

        // Booleans overwrite when present, explicit false included
        if let Some(confirmed) = parsed.get("address_confirmed").and_then(|v| v.as_bool()) {
            state.address_confirmed = Some(confirmed);
        }
        if let Some(confirmed) = parsed.get("delivery_confirmed").and_then(|v| v.as_bool()) {
            state.delivery_confirmed = Some(confirmed);
        }

        state.intent = parsed
            .get("intent")
            .and_then(|v| v.as_str())
            .map(Intent::parse)
            .unwrap_or_default();

        tracing::debug!(intent = %state.intent, "classified");
        state.push_event(format!("Intent classified: {}", state.intent));
        Ok(())
    }

    /// Produce a plan. Advisory only; replaces any prior plan.
    fn plan(&self, state: &mut ConversationState) -> Result<()> {
        let prompt = prompts::render_plan(state);
        let text = self.llm.invoke(&prompt).context("plan stage failed")?;
        state.plan = Some(text);
        Ok(())
    }

    /// Reflect on the current state. Advisory only; appends to thoughts.
    fn think(&self, state: &mut ConversationState) -> Result<()> {
        let prompt = prompts::render_think(state);
        let text = self.llm.invoke(&prompt).context("think stage failed")?;
        state.thoughts.push(text);
        Ok(())
    }

    /// Ask the model for the routing verdict and follow-up questions
    fn decide(&self, state: &mut ConversationState) -> Result<()> {
        let prompt = prompts::render_decide(state);
        let text = self.llm.invoke(&prompt).context("decide stage failed")?;
        let parsed = extract_json(&text);

        state.decision = parsed
            .get("decision")
            .and_then(|v| v.as_str())
            .map(Decision::parse)
            .unwrap_or_default();

        state.next_questions = parsed
            .get("questions")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|q| q.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(decision = %state.decision, questions = state.next_questions.len(), "decided");
        state.push_event(format!("Decision: {}", state.decision));
        Ok(())
    }

    /// Check card ownership against the profile. Records the outcome only;
    /// does not gate the next step.
    fn validate(&self, state: &mut ConversationState) -> Result<()> {
        let profile = self
            .profile_store
            .load()
            .context("failed to load profile for ownership check")?;

        let card_id = state.selected_card_id.clone().unwrap_or_default();
        let (ok, msg) = validate_card_ownership(&profile, &card_id);
        state.ownership_validated = ok;
        state.push_event(msg);

        if !ok {
            tracing::warn!(%card_id, "ownership check failed");
        }
        Ok(())
    }

    /// Mock-cancel the old card and dispatch a replacement
    fn cancel_and_dispatch(&self, state: &mut ConversationState) -> Result<()> {
        let card_id = state.selected_card_id.clone().unwrap_or_default();

        let address = match state.address.as_deref() {
            Some(addr) if !addr.is_empty() => addr.to_string(),
            _ => {
                let profile = self
                    .profile_store
                    .load()
                    .context("failed to load profile for default address")?;
                profile.default_address()
            }
        };

        let cancel_res = cancel_card(&card_id);
        let dispatch_res = dispatch_replacement(&card_id, &address);
        tracing::info!(%card_id, tracking_id = %dispatch_res.tracking_id, "card cancelled and replacement dispatched");

        state.push_event(cancel_res.event);
        state.push_event(dispatch_res.event);
        state.final_message = Some(SUCCESS_MESSAGE.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{FakeLlmClient, LlmError};
    use crate::tools::{OWNERSHIP_NOT_FOUND, OWNERSHIP_OK};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROFILE_FIXTURE: &str = r#"{
        "user_id": "USR-1001",
        "address": {
            "line1": "221B Residency Road",
            "line2": "Apt 4",
            "city": "Bengaluru",
            "state": "KA",
            "pincode": "560025",
            "country": "India"
        },
        "cards": [
            {"card_id": "CRD-001", "type": "VISA", "masked_number": "XXXX-XXXX-XXXX-1111", "status": "ACTIVE"}
        ]
    }"#;

    fn pipeline_with(responses: Vec<&str>) -> (TurnPipeline, NamedTempFile) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PROFILE_FIXTURE.as_bytes()).unwrap();
        let pipeline = TurnPipeline::new(
            Box::new(FakeLlmClient::scripted(responses)),
            ProfileStore::new(file.path()),
        );
        (pipeline, file)
    }

    #[test]
    fn test_extract_json_with_surrounding_prose() {
        let value = extract_json("Sure! Here you go: {\"intent\": \"replace_card\"} Hope that helps.");
        assert_eq!(value["intent"], "replace_card");
    }

    #[test]
    fn test_extract_json_no_braces_is_empty_object() {
        let value = extract_json("I cannot answer that.");
        assert!(value.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_extract_json_malformed_is_empty_object() {
        let value = extract_json("{intent: replace_card, oops}");
        assert!(value.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_extract_json_nested_objects_use_outermost_braces() {
        let value = extract_json(r#"{"decision": "ask_user", "meta": {"x": 1}} trailing"#);
        assert_eq!(value["decision"], "ask_user");
        assert_eq!(value["meta"]["x"], 1);
    }

    #[test]
    fn test_classify_merges_present_fields_only() {
        let (pipeline, _profile) = pipeline_with(vec![
            r#"{"intent": "replace_card", "selected_card_id": "CRD-001", "reason": null,
                "address": null, "address_confirmed": null, "delivery_confirmed": false}"#,
        ]);

        let mut state = ConversationState::new();
        state.reason = Some("damaged chip".to_string());
        state.address = Some("saved address".to_string());

        pipeline.classify(&mut state).unwrap();

        assert_eq!(state.intent, Intent::ReplaceCard);
        assert_eq!(state.selected_card_id.as_deref(), Some("CRD-001"));
        // Null fields keep prior values
        assert_eq!(state.reason.as_deref(), Some("damaged chip"));
        assert_eq!(state.address.as_deref(), Some("saved address"));
        // Absent tri-state stays unset, explicit false lands
        assert_eq!(state.address_confirmed, None);
        assert_eq!(state.delivery_confirmed, Some(false));
        assert_eq!(state.events, vec!["Intent classified: replace_card"]);
    }

    #[test]
    fn test_classify_unparseable_falls_back_to_other() {
        let (pipeline, _profile) = pipeline_with(vec!["no json here at all"]);

        let mut state = ConversationState::new();
        state.selected_card_id = Some("CRD-001".to_string());

        pipeline.classify(&mut state).unwrap();

        assert_eq!(state.intent, Intent::Other);
        // Prior fields untouched
        assert_eq!(state.selected_card_id.as_deref(), Some("CRD-001"));
        assert_eq!(state.events, vec!["Intent classified: other"]);
    }

    #[test]
    fn test_decide_defaults_on_malformed_response() {
        let (pipeline, _profile) = pipeline_with(vec!["garbage, not even braces"]);

        let mut state = ConversationState::new();
        state.next_questions = vec!["stale question".to_string()];

        pipeline.decide(&mut state).unwrap();

        assert_eq!(state.decision, Decision::AskUser);
        // Replaced, not appended
        assert!(state.next_questions.is_empty());
        assert_eq!(state.events, vec!["Decision: ask_user"]);
    }

    #[test]
    fn test_decide_unknown_label_is_ask_user() {
        let (pipeline, _profile) =
            pipeline_with(vec![r#"{"decision": "abort", "questions": ["Which card?"]}"#]);

        let mut state = ConversationState::new();
        pipeline.decide(&mut state).unwrap();

        assert_eq!(state.decision, Decision::AskUser);
        assert_eq!(state.next_questions, vec!["Which card?"]);
    }

    #[test]
    fn test_full_turn_proceeds_to_dispatch() {
        let (pipeline, _profile) = pipeline_with(vec![
            // classify
            r#"{"intent": "replace_card", "selected_card_id": "CRD-001",
                "reason": "card damaged in accident", "address": null,
                "address_confirmed": true, "delivery_confirmed": true}"#,
            // plan
            "1. Validate ownership\n2. Cancel and dispatch",
            // think
            "- All required fields are present",
            // decide
            r#"{"decision": "proceed_replacement", "questions": []}"#,
        ]);

        let mut state = ConversationState::new();
        // Address confirmed via saved address collected in an earlier turn
        state.address = Some("221B Residency Road, Apt 4, Bengaluru, KA-560025, India".to_string());

        let state = pipeline
            .run_turn(state, "Replace CRD-001, it was damaged, ship to my saved address, confirmed")
            .unwrap();

        assert_eq!(state.decision, Decision::ProceedReplacement);
        assert!(state.ownership_validated);
        assert_eq!(state.final_message.as_deref(), Some(SUCCESS_MESSAGE));
        assert_eq!(state.plan.as_deref(), Some("1. Validate ownership\n2. Cancel and dispatch"));
        assert_eq!(state.thoughts, vec!["- All required fields are present"]);
        assert_eq!(
            state.events,
            vec![
                "Intent classified: replace_card".to_string(),
                "Decision: proceed_replacement".to_string(),
                OWNERSHIP_OK.to_string(),
                "Card CRD-001 cancelled.".to_string(),
                "Replacement for CRD-001 dispatched to: 221B Residency Road, Apt 4, Bengaluru, KA-560025, India"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_full_turn_uses_profile_default_address_when_unset() {
        let (pipeline, _profile) = pipeline_with(vec![
            r#"{"intent": "replace_card", "selected_card_id": "CRD-001",
                "reason": "lost", "address": null,
                "address_confirmed": true, "delivery_confirmed": true}"#,
            "plan text",
            "think text",
            r#"{"decision": "proceed_replacement", "questions": []}"#,
        ]);

        let state = pipeline
            .run_turn(ConversationState::new(), "Replace CRD-001, I lost it")
            .unwrap();

        assert_eq!(
            state.events.last().unwrap(),
            "Replacement for CRD-001 dispatched to: 221B Residency Road, Apt 4, Bengaluru, KA-560025, India"
        );
    }

    #[test]
    fn test_vague_turn_ends_at_decide() {
        let (pipeline, _profile) = pipeline_with(vec![
            r#"{"intent": "replace_card", "selected_card_id": null, "reason": null,
                "address": null, "address_confirmed": null, "delivery_confirmed": null}"#,
            "plan text",
            "think text",
            r#"{"decision": "ask_user",
                "questions": ["Which card should I replace?", "What is the reason?"]}"#,
        ]);

        let state = pipeline
            .run_turn(ConversationState::new(), "I need a new card")
            .unwrap();

        assert_eq!(state.decision, Decision::AskUser);
        assert_eq!(state.next_questions.len(), 2);
        assert!(state.final_message.is_none());
        assert!(!state.ownership_validated);
        // No validate/cancel/dispatch events
        assert_eq!(
            state.events,
            vec!["Intent classified: replace_card", "Decision: ask_user"]
        );
    }

    #[test]
    fn test_unknown_card_is_recorded_but_not_blocking() {
        // validate → cancel_dispatch is unconditional
        let (pipeline, _profile) = pipeline_with(vec![
            r#"{"intent": "cancel_card", "selected_card_id": "CRD-999",
                "reason": "fraud", "address": null,
                "address_confirmed": true, "delivery_confirmed": true}"#,
            "plan text",
            "think text",
            r#"{"decision": "proceed_replacement", "questions": []}"#,
        ]);

        let state = pipeline
            .run_turn(ConversationState::new(), "Cancel CRD-999 immediately")
            .unwrap();

        assert!(!state.ownership_validated);
        assert!(state.events.contains(&OWNERSHIP_NOT_FOUND.to_string()));
        // Dispatch still happened, and the success message was set
        assert!(state.events.iter().any(|e| e.contains("TRK") || e.contains("dispatched")));
        assert_eq!(state.final_message.as_deref(), Some(SUCCESS_MESSAGE));
    }

    #[test]
    fn test_model_call_failure_aborts_turn() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PROFILE_FIXTURE.as_bytes()).unwrap();
        let pipeline = TurnPipeline::new(
            Box::new(FakeLlmClient::always_error(LlmError::Timeout(30))),
            ProfileStore::new(file.path()),
        );

        let result = pipeline.run_turn(ConversationState::new(), "Replace my card");
        assert!(result.is_err());
    }

    #[test]
    fn test_exit_decision_ends_turn() {
        let (pipeline, _profile) = pipeline_with(vec![
            r#"{"intent": "other", "selected_card_id": null, "reason": null,
                "address": null, "address_confirmed": null, "delivery_confirmed": null}"#,
            "plan text",
            "think text",
            r#"{"decision": "exit", "questions": []}"#,
        ]);

        let state = pipeline
            .run_turn(ConversationState::new(), "never mind, all done")
            .unwrap();

        assert_eq!(state.decision, Decision::Exit);
        assert!(state.final_message.is_none());
        assert_eq!(state.events, vec!["Intent classified: other", "Decision: exit"]);
    }
}
