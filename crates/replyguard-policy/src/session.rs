//! Streaming moderation session
//!
//! Moderates a reply that arrives in chunks. Each `append` rescans the whole
//! buffer with the blocking rules only, so a blocked phrase split across
//! chunk boundaries is still caught. Rewriting rules run once, in
//! `finalize`: text shown to a user while streaming is never retracted or
//! silently corrected afterwards.
//!
//! A session belongs to a single conversational turn and has a single
//! writer; every call takes `&mut self`.

use replyguard_core::{ModerationResult, UserState};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::{block_reason, evaluate};
use crate::rule::Rule;

/// Lifecycle position of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting chunks
    Open,
    /// A blocking phrase was seen; terminal
    Blocked,
    /// The full rule set ran; terminal
    Finalized,
}

#[derive(Debug, Clone)]
enum SessionState {
    Open,
    Blocked {
        rule_id: String,
        result: ModerationResult,
    },
    Finalized(ModerationResult),
}

/// Accumulates one reply chunk by chunk
#[derive(Debug, Clone)]
pub struct ModerationSession {
    user_state: UserState,
    rules: Arc<[Rule]>,
    buffer: String,
    applied_rules: Vec<String>,
    state: SessionState,
}

impl ModerationSession {
    /// Create a new open session
    pub fn new(user_state: UserState, rules: impl Into<Arc<[Rule]>>) -> Self {
        Self {
            user_state,
            rules: rules.into(),
            buffer: String::new(),
            applied_rules: Vec::new(),
            state: SessionState::Open,
        }
    }

    /// Add a chunk and check the whole buffer against the blocking rules.
    ///
    /// Returns `ALLOW` with the raw buffer while nothing blocks. Once the
    /// session is terminal the cached result is returned and the chunk is
    /// dropped.
    pub fn append(&mut self, chunk: &str) -> ModerationResult {
        match &self.state {
            SessionState::Open => {}
            SessionState::Blocked { result, .. } => return result.clone(),
            SessionState::Finalized(result) => {
                warn!(chunk_len = chunk.len(), "Chunk appended to a finalized session, ignoring");
                return result.clone();
            }
        }

        self.buffer.push_str(chunk);

        if let Some((rule_id, phrase)) = self.scan_blocking() {
            info!(rule = %rule_id, phrase = %phrase, buffer_len = self.buffer.len(), "Early block on streamed reply");
            metrics::counter!("replyguard_early_blocks_total").increment(1);

            if !self.applied_rules.contains(&rule_id) {
                self.applied_rules.push(rule_id.clone());
            }

            let result = ModerationResult::block(block_reason(&phrase), self.applied_rules.clone());
            self.state = SessionState::Blocked {
                rule_id,
                result: result.clone(),
            };
            return result;
        }

        debug!(buffer_len = self.buffer.len(), "Chunk accepted");
        ModerationResult::allow(self.buffer.clone(), self.applied_rules.clone())
    }

    /// Run the complete rule set over the accumulated buffer.
    ///
    /// Idempotent: after the first call, or after a block, the cached
    /// terminal result is returned.
    pub fn finalize(&mut self) -> ModerationResult {
        match &self.state {
            SessionState::Open => {}
            SessionState::Blocked { result, .. } | SessionState::Finalized(result) => {
                return result.clone()
            }
        }

        let mut result = evaluate(&self.user_state, &self.buffer, &self.rules);

        let mut applied_rules = self.applied_rules.clone();
        for id in result.applied_rules.drain(..) {
            if !applied_rules.contains(&id) {
                applied_rules.push(id);
            }
        }
        result.applied_rules = applied_rules;

        info!(
            status = %result.status,
            rules = result.applied_rules.len(),
            "Streamed reply finalized"
        );

        self.state = SessionState::Finalized(result.clone());
        result
    }

    /// First blocking rule (in rule order) matching the buffer, with the
    /// phrase that matched
    fn scan_blocking(&self) -> Option<(String, String)> {
        let lowered = self.buffer.to_lowercase();

        self.rules.iter().find_map(|rule| {
            let phrase = rule.blocking_phrases()?.first_match_lowered(&lowered)?;
            Some((rule.id().to_string(), phrase.to_string()))
        })
    }

    /// Everything appended so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Rule ids attributed before finalize
    pub fn applied_rules(&self) -> &[String] {
        &self.applied_rules
    }

    /// Current lifecycle position
    pub fn state(&self) -> SessionStatus {
        match self.state {
            SessionState::Open => SessionStatus::Open,
            SessionState::Blocked { .. } => SessionStatus::Blocked,
            SessionState::Finalized(_) => SessionStatus::Finalized,
        }
    }

    /// Check if a blocking phrase was seen
    pub fn is_blocked(&self) -> bool {
        self.state() == SessionStatus::Blocked
    }

    /// Check if the full rule set has run
    pub fn is_finalized(&self) -> bool {
        self.state() == SessionStatus::Finalized
    }

    /// Id of the rule that blocked the session
    pub fn blocked_rule(&self) -> Option<&str> {
        match &self.state {
            SessionState::Blocked { rule_id, .. } => Some(rule_id.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replyguard_core::ModerationStatus;

    fn session(rules: Vec<Rule>) -> ModerationSession {
        ModerationSession::new(UserState::new(false, "NY", false), rules)
    }

    #[test]
    fn test_early_block_across_chunks() {
        let mut session = session(vec![Rule::block_phrase("rule_block", ["guarantee"])]);

        let first = session.append("We guar");
        assert_eq!(first.status, ModerationStatus::Allow);
        assert_eq!(first.final_reply, "We guar");
        assert!(first.applied_rules.is_empty());

        let second = session.append("antee");
        assert_eq!(second.status, ModerationStatus::Block);
        assert_eq!(second.final_reply, "");
        assert_eq!(second.applied_rules, vec!["rule_block"]);
        assert!(session.is_blocked());
        assert_eq!(session.blocked_rule(), Some("rule_block"));

        assert_eq!(session.append(" more"), second);
        assert_eq!(session.finalize(), second);
        assert_eq!(session.buffer(), "We guarantee");
    }

    #[test]
    fn test_buffer_stops_at_blocking_chunk() {
        let mut session = session(vec![Rule::block_phrase("b0", ["aa"])]);

        assert!(session.append("cbaa").is_blocked());
        assert!(session.append("aaa").is_blocked());
        assert_eq!(session.buffer(), "cbaa");
        assert_eq!(session.applied_rules(), ["b0".to_string()]);
    }

    #[test]
    fn test_append_never_rewrites() {
        let mut session = session(vec![
            Rule::rewrite_regex("rule_rewrite", r"\d{3}-\d{3}-\d{4}", "[REDACTED_PHONE]"),
            Rule::max_length("rule_max", 4),
        ]);

        assert_eq!(session.append("Call 555").final_reply, "Call 555");
        let partial = session.append("-123-4567");
        assert_eq!(partial.status, ModerationStatus::Allow);
        assert_eq!(partial.final_reply, "Call 555-123-4567");
        assert_eq!(session.buffer(), "Call 555-123-4567");

        let result = session.finalize();
        assert_eq!(result.status, ModerationStatus::Rewrite);
        assert_eq!(result.final_reply, "Call");
        assert_eq!(result.applied_rules, vec!["rule_rewrite", "rule_max"]);
    }

    #[test]
    fn test_finalize_is_cached() {
        let mut session = session(vec![Rule::max_length("m", 3)]);
        session.append("abcdef");

        let first = session.finalize();
        assert!(session.is_finalized());
        assert_eq!(session.append("ghi"), first);
        assert_eq!(session.finalize(), first);
        assert_eq!(session.buffer(), "abcdef");
    }

    #[test]
    fn test_block_rules_scanned_in_rule_order() {
        let mut session = session(vec![
            Rule::block_phrase("second_in_text", ["promise"]),
            Rule::block_phrase("first_in_text", ["guarantee"]),
        ]);

        let result = session.append("We guarantee and promise");
        assert_eq!(result.applied_rules, vec!["second_in_text"]);
        assert_eq!(result.reason.as_deref(), Some("Blocked phrase: promise"));
    }

    #[test]
    fn test_finalize_empty_session() {
        let mut session = session(Vec::new());
        assert_eq!(session.state(), SessionStatus::Open);

        let result = session.finalize();
        assert_eq!(result, ModerationResult::allow("", Vec::new()));
        assert_eq!(session.state(), SessionStatus::Finalized);
    }
}
