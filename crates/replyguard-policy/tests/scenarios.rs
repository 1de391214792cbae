//! End-to-end moderation scenarios, one-shot and streaming

use replyguard_core::{ModerationStatus, UserState};
use replyguard_policy::prelude::*;
use std::io::Write;

const DEFAULT_RULES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../rules.json"));

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn default_state() -> UserState {
    UserState::new(false, "NY", false)
}

fn consenting_state() -> UserState {
    UserState::new(true, "CA", true)
}

fn default_engine() -> RuleEngine {
    RuleEngine::from(RuleSet::from_json(DEFAULT_RULES).expect("default rules are valid"))
}

#[test]
fn scenario_a_block_phrase() {
    init_tracing();
    let rules = vec![Rule::block_phrase("r1", ["guarantee"])];

    let result = evaluate(&default_state(), "we guarantee this", &rules);

    assert_eq!(result.status, ModerationStatus::Block);
    assert_eq!(result.final_reply, "");
    assert!(result.reason.as_deref().unwrap_or_default().contains("guarantee"));
}

#[test]
fn scenario_b_require_phrase() {
    let rules = vec![Rule::require_phrase(
        "r1",
        "Recorded.",
        Some(Condition::ConsentToRecording(true)),
    )];

    let result = evaluate(&UserState::new(true, "NY", false), "Hi", &rules);

    assert_eq!(result.final_reply, "Recorded. Hi");
    assert_eq!(result.status, ModerationStatus::Rewrite);
}

#[test]
fn scenario_c_rewrite_regex() {
    let rules = vec![Rule::rewrite_regex("r1", r"\d{3}-\d{3}-\d{4}", "[REDACTED]")];

    let result = evaluate(&default_state(), "call 555-123-4567", &rules);

    assert_eq!(result.final_reply, "call [REDACTED]");
    assert_eq!(result.status, ModerationStatus::Rewrite);
}

#[test]
fn scenario_d_max_length_hard_cut() {
    let rules = vec![Rule::max_length("r1", 5)];

    let result = evaluate(&default_state(), "Supercalifragilistic", &rules);

    assert_eq!(result.final_reply, "Super");
}

#[test]
fn scenario_e_streaming_early_block() {
    init_tracing();
    let rules = vec![Rule::block_phrase("r1", ["guarantee"])];
    let mut session = ModerationSession::new(default_state(), rules);

    let first = session.append("We guar");
    assert_eq!(first.status, ModerationStatus::Allow);
    assert_eq!(first.final_reply, "We guar");

    let blocked = session.append("antee");
    assert_eq!(blocked.status, ModerationStatus::Block);
    assert_eq!(session.state(), SessionStatus::Blocked);

    assert_eq!(session.append("guarantee again"), blocked);
    assert_eq!(session.finalize(), blocked);
    assert_eq!(session.buffer(), "We guarantee");
}

#[test]
fn scenario_f_split_pattern_only_redacted_on_finalize() {
    let text = "call 555-123-4567";
    let rules: Vec<Rule> = vec![Rule::rewrite_regex("r1", r"\d{3}-\d{3}-\d{4}", "[REDACTED]")];

    for split in 0..=text.len() {
        let (head, tail) = text.split_at(split);
        let mut session = ModerationSession::new(default_state(), rules.clone());

        let first = session.append(head);
        assert_eq!(first.status, ModerationStatus::Allow);
        assert_eq!(first.final_reply, head);

        let second = session.append(tail);
        assert_eq!(second.status, ModerationStatus::Allow);
        assert_eq!(second.final_reply, text);

        let result = session.finalize();
        assert_eq!(result.status, ModerationStatus::Rewrite, "split at {}", split);
        assert_eq!(result.final_reply, "call [REDACTED]", "split at {}", split);
    }
}

#[test]
fn default_rules_block_before_anything_else() {
    let result = default_engine().evaluate(
        &consenting_state(),
        "Hi, we guarantee detection. Call 555-123-4567.",
    );

    assert_eq!(result.status, ModerationStatus::Block);
    assert_eq!(result.applied_rules, vec!["rule_block"]);
}

#[test]
fn default_rules_rewrite_safe_reply() {
    let result = default_engine().evaluate(&consenting_state(), "Please call 555-123-4567.");

    assert_eq!(result.status, ModerationStatus::Rewrite);
    assert_eq!(
        result.final_reply,
        "This call may be recorded. Please call [REDACTED_PHONE]."
    );
    assert_eq!(
        result.applied_rules,
        vec!["rule_block", "rule_req", "rule_rewrite", "rule_max"]
    );
}

#[test]
fn default_rules_streaming_deferred_rewrite() {
    let mut session = default_engine().session(default_state());

    session.append("Call 555");
    session.append("-123-4567");
    assert_eq!(session.buffer(), "Call 555-123-4567");

    let result = session.finalize();
    assert_eq!(result.status, ModerationStatus::Rewrite);
    assert!(result.final_reply.contains("[REDACTED_PHONE]"));
    assert!(result.applied_rules.iter().any(|id| id == "rule_rewrite"));
}

#[test]
fn default_rules_streaming_finalize_runs_all_rules() {
    let mut session = default_engine().session(UserState::new(true, "NY", false));

    session.append("Hello. Call 555-123-4567. ");
    session.append("This is a very long message that should definitely trigger the ");
    session.append("maximum length truncation rule because it is way over 80 chars.");

    let result = session.finalize();

    assert!(result.final_reply.starts_with("This call may be recorded."));
    assert!(result.final_reply.contains("[REDACTED_PHONE]"));
    assert!(result.final_reply.chars().count() <= 80);
    assert!(!result.final_reply.ends_with(char::is_whitespace));
    assert_eq!(
        result.applied_rules,
        vec!["rule_block", "rule_req", "rule_rewrite", "rule_max"]
    );
}

#[test]
fn rule_set_from_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("create temp file");
    file.write_all(DEFAULT_RULES.as_bytes()).expect("write rules");

    let engine = RuleEngine::from_file(file.path()).expect("load rules");
    assert_eq!(engine.rules().len(), 4);
    assert_eq!(engine.rules()[3].rule_type(), "MAX_LENGTH");
}

#[test]
fn request_with_invalid_rules_never_evaluates() {
    let json = r#"{
        "user_state": {"consent_to_recording": true, "jurisdiction": "CA"},
        "draft_reply": "Hello",
        "rules": [{"id": "r1", "type": "BLOCK_PHRASE", "params": {"phrases": ["bad", 123]}}]
    }"#;

    let err = ModerationRequest::from_json(json).unwrap_err();
    let locations: Vec<&str> = err.violations().iter().map(|v| v.location.as_str()).collect();

    assert_eq!(
        locations,
        vec!["user_state.is_debt_collection", "rules[0].params.phrases[1]"]
    );
}
