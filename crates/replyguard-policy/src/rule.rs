//! Rule and rule set definitions

use replyguard_core::{FieldViolation, Result, ValidationError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::condition::Condition;
use crate::rewrite::{PhraseSet, RegexRewrite};
use crate::validate;

/// A single moderation rule.
///
/// Ids must be non-empty and unique within a list; [`RuleSet`] and the
/// validator enforce this.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    id: String,
    kind: RuleKind,
}

/// Rule behaviour with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    /// Block the reply if any phrase occurs, ignoring case
    BlockPhrase(PhraseSet),

    /// Prepend `phrase` unless already present, when `condition` holds
    RequirePhrase {
        phrase: String,
        condition: Option<Condition>,
    },

    /// Regex substitution (redaction)
    RewriteRegex(RegexRewrite),

    /// Truncate to a maximum number of characters
    MaxLength { max_chars: Option<usize> },
}

impl Rule {
    /// Create a rule from its parts
    pub fn new(id: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// `BLOCK_PHRASE` rule
    pub fn block_phrase<I, S>(id: impl Into<String>, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases = phrases.into_iter().map(Into::into).collect();
        Self::new(id, RuleKind::BlockPhrase(PhraseSet::new(phrases)))
    }

    /// `REQUIRE_PHRASE` rule
    pub fn require_phrase(
        id: impl Into<String>,
        phrase: impl Into<String>,
        condition: Option<Condition>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::RequirePhrase {
                phrase: phrase.into(),
                condition,
            },
        )
    }

    /// `REWRITE_REGEX` rule
    pub fn rewrite_regex(
        id: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            RuleKind::RewriteRegex(RegexRewrite::new(pattern, Some(replacement.into()))),
        )
    }

    /// `MAX_LENGTH` rule
    pub fn max_length(id: impl Into<String>, max_chars: usize) -> Self {
        Self::new(
            id,
            RuleKind::MaxLength {
                max_chars: Some(max_chars),
            },
        )
    }

    /// Rule identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rule behaviour
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// Wire name of the rule type
    pub fn rule_type(&self) -> &'static str {
        match self.kind {
            RuleKind::BlockPhrase(_) => "BLOCK_PHRASE",
            RuleKind::RequirePhrase { .. } => "REQUIRE_PHRASE",
            RuleKind::RewriteRegex(_) => "REWRITE_REGEX",
            RuleKind::MaxLength { .. } => "MAX_LENGTH",
        }
    }

    /// Phrases of a blocking rule, `None` for every other kind
    pub fn blocking_phrases(&self) -> Option<&PhraseSet> {
        match &self.kind {
            RuleKind::BlockPhrase(phrases) => Some(phrases),
            _ => None,
        }
    }
}

/// Ordered, validated list of rules
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a rule set, checking that ids are non-empty and unique
    pub fn new(rules: Vec<Rule>) -> std::result::Result<Self, ValidationError> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for (index, rule) in rules.iter().enumerate() {
            if rule.id.is_empty() {
                violations.push(FieldViolation::new(
                    format!("rules[{}].id", index),
                    "must be a non-empty string",
                ));
            } else if !seen.insert(rule.id.as_str()) {
                violations.push(FieldViolation::new(
                    format!("rules[{}].id", index),
                    format!("duplicate rule id '{}'", rule.id),
                ));
            }
        }

        match ValidationError::from_violations(violations) {
            Some(err) => Err(err),
            None => Ok(Self { rules }),
        }
    }

    /// Load a rule set from a JSON array of rules
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::from_value(&value)?)
    }

    /// Load a rule set from a YAML sequence of rules
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Ok(Self::from_value(&value)?)
    }

    /// Load a rule set from a file; `.yaml`/`.yml` are read as YAML, anything
    /// else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Validate an untyped rule list
    pub fn from_value(value: &serde_json::Value) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            rules: validate::rules(value)?,
        })
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Share the rules read-only across sessions
    pub fn into_shared(self) -> Arc<[Rule]> {
        self.rules.into()
    }
}
