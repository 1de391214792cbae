//! Rule evaluation engine

use replyguard_core::{ModerationResult, UserState};
use std::sync::Arc;
use tracing::{debug, info};

use crate::rewrite::{prepend_phrase, truncate_at_boundary};
use crate::rule::{Rule, RuleKind, RuleSet};
use crate::session::ModerationSession;

/// Evaluate `rules` in order against `draft_reply`.
///
/// Every visited rule is recorded in `applied_rules`, no-ops included. The
/// first blocking phrase ends evaluation: later rules are neither applied nor
/// recorded. Inputs are never mutated.
pub fn evaluate(user_state: &UserState, draft_reply: &str, rules: &[Rule]) -> ModerationResult {
    let mut current = draft_reply.to_string();
    let mut applied_rules = Vec::with_capacity(rules.len());
    let mut rewritten = false;

    for rule in rules {
        if !applied_rules.iter().any(|id| id == rule.id()) {
            applied_rules.push(rule.id().to_string());
        }

        match rule.kind() {
            RuleKind::BlockPhrase(phrases) => {
                if let Some(phrase) = phrases.first_match(&current) {
                    info!(rule = %rule.id(), phrase = %phrase, "Blocking reply");
                    return record(ModerationResult::block(block_reason(phrase), applied_rules));
                }
            }

            RuleKind::RequirePhrase { phrase, condition } => {
                if let Some(condition) = condition {
                    if !condition.holds(user_state) {
                        debug!(rule = %rule.id(), field = %condition.field(), "Condition not met, skipping required phrase");
                        continue;
                    }
                }

                if let Some(text) = prepend_phrase(phrase, &current) {
                    debug!(rule = %rule.id(), "Prepending required phrase");
                    current = text;
                    rewritten = true;
                }
            }

            RuleKind::RewriteRegex(rewrite) => {
                if !rewrite.is_active() {
                    debug!(rule = %rule.id(), pattern = %rewrite.pattern(), "Inactive rewrite rule");
                    continue;
                }

                if let Some(text) = rewrite.apply(&current) {
                    debug!(rule = %rule.id(), "Rewrote matched content");
                    current = text;
                    rewritten = true;
                }
            }

            RuleKind::MaxLength { max_chars } => {
                let Some(max_chars) = *max_chars else {
                    continue;
                };

                if let Some(text) = truncate_at_boundary(&current, max_chars) {
                    debug!(rule = %rule.id(), max_chars, "Truncated reply");
                    current = text;
                    rewritten = true;
                }
            }
        }
    }

    let result = if rewritten {
        ModerationResult::rewrite(current, applied_rules)
    } else {
        ModerationResult::allow(current, applied_rules)
    };

    record(result)
}

/// Reason attached to a blocked reply
pub(crate) fn block_reason(phrase: &str) -> String {
    format!("Blocked phrase: {}", phrase)
}

fn record(result: ModerationResult) -> ModerationResult {
    metrics::counter!("replyguard_decisions_total", "status" => result.status.as_str()).increment(1);
    result
}

/// Rule engine holding one rule set shared by every evaluation and session
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Arc<[Rule]>,
}

impl RuleEngine {
    /// Create a new rule engine
    pub fn new(rules: impl Into<Arc<[Rule]>>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// Load the rule set from a JSON or YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> replyguard_core::Result<Self> {
        Ok(Self::from(RuleSet::from_file(path)?))
    }

    /// Moderate a complete reply
    pub fn evaluate(&self, user_state: &UserState, draft_reply: &str) -> ModerationResult {
        evaluate(user_state, draft_reply, &self.rules)
    }

    /// Start a streaming session for one conversational turn
    pub fn session(&self, user_state: UserState) -> ModerationSession {
        ModerationSession::new(user_state, Arc::clone(&self.rules))
    }

    /// Get loaded rules
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

impl From<RuleSet> for RuleEngine {
    fn from(set: RuleSet) -> Self {
        Self::new(set.into_shared())
    }
}
