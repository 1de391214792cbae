//! Validation of untyped input
//!
//! Turns raw JSON-shaped values into typed rules, user context and requests.
//! Validation is all-or-nothing: every violation found is reported together,
//! and no typed value is returned unless the whole input is valid.

use replyguard_core::{FieldViolation, UserField, UserState, ValidationError};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::condition::Condition;
use crate::request::ModerationRequest;
use crate::rewrite::{PhraseSet, RegexRewrite};
use crate::rule::{Rule, RuleKind};

/// Rule type literals accepted on the wire
pub const RULE_TYPES: [&str; 4] = ["BLOCK_PHRASE", "REQUIRE_PHRASE", "REWRITE_REGEX", "MAX_LENGTH"];

/// Validate a user context object
pub fn user_state(value: &Value) -> Result<UserState, ValidationError> {
    let mut collector = Collector::default();
    let state = collector.user_state(value, "user_state");
    collector.finish(state, "user_state")
}

/// Validate an ordered list of rules
pub fn rules(value: &Value) -> Result<Vec<Rule>, ValidationError> {
    let mut collector = Collector::default();
    let rules = collector.rules(value, "rules");
    collector.finish(rules, "rules")
}

/// Validate a full moderation request
pub fn request(value: &Value) -> Result<ModerationRequest, ValidationError> {
    let mut collector = Collector::default();

    let Some(obj) = value.as_object() else {
        return Err(ValidationError::single("$", "expected an object"));
    };

    let user_state = match obj.get("user_state").or_else(|| obj.get("userState")) {
        Some(v) => collector.user_state(v, "user_state"),
        None => {
            collector.push("user_state", "field required");
            None
        }
    };

    let draft_reply = match obj.get("draft_reply").or_else(|| obj.get("draftReply")) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            collector.push("draft_reply", "expected a string");
            None
        }
        None => {
            collector.push("draft_reply", "field required");
            None
        }
    };

    let rules = match obj.get("rules") {
        None | Some(Value::Null) => Some(None),
        Some(v) => collector.rules(v, "rules").map(Some),
    };

    let request = match (user_state, draft_reply, rules) {
        (Some(user_state), Some(draft_reply), Some(rules)) => Some(ModerationRequest {
            user_state,
            draft_reply,
            rules,
        }),
        _ => None,
    };

    collector.finish(request, "$")
}

#[derive(Default)]
struct Collector {
    violations: Vec<FieldViolation>,
}

impl Collector {
    fn push(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(location, message));
    }

    fn finish<T>(self, value: Option<T>, location: &str) -> Result<T, ValidationError> {
        match (ValidationError::from_violations(self.violations), value) {
            (Some(err), _) => Err(err),
            (None, Some(value)) => Ok(value),
            (None, None) => Err(ValidationError::single(location, "invalid value")),
        }
    }

    fn user_state(&mut self, value: &Value, location: &str) -> Option<UserState> {
        let Some(obj) = value.as_object() else {
            self.push(location, "expected an object");
            return None;
        };

        let consent = self.required_bool(
            obj,
            &["consent_to_recording", "consentToRecording"],
            &format!("{}.consent_to_recording", location),
        );
        let jurisdiction = self.required_string(
            obj,
            &["jurisdiction"],
            &format!("{}.jurisdiction", location),
        );
        let debt = self.required_bool(
            obj,
            &["is_debt_collection", "isDebtCollection"],
            &format!("{}.is_debt_collection", location),
        );

        Some(UserState {
            consent_to_recording: consent?,
            jurisdiction: jurisdiction?,
            is_debt_collection: debt?,
        })
    }

    fn rules(&mut self, value: &Value, location: &str) -> Option<Vec<Rule>> {
        let Some(items) = value.as_array() else {
            self.push(location, "expected an array");
            return None;
        };

        let mut rules = Vec::with_capacity(items.len());
        let mut complete = true;
        let mut seen = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            let rule_location = format!("{}[{}]", location, index);
            let rule = self.rule(item, &rule_location);

            // Ids of invalid rules still count as seen
            let id = item.get("id").and_then(Value::as_str).filter(|id| !id.is_empty());
            if let Some(id) = id {
                if !seen.insert(id) {
                    self.push(
                        format!("{}.id", rule_location),
                        format!("duplicate rule id '{}'", id),
                    );
                    complete = false;
                }
            }

            match rule {
                Some(rule) => rules.push(rule),
                None => complete = false,
            }
        }

        complete.then_some(rules)
    }

    fn rule(&mut self, value: &Value, location: &str) -> Option<Rule> {
        let Some(obj) = value.as_object() else {
            self.push(location, "expected an object");
            return None;
        };

        let id_location = format!("{}.id", location);
        let id = match self.required_string(obj, &["id"], &id_location) {
            Some(id) if id.is_empty() => {
                self.push(id_location, "must be a non-empty string");
                None
            }
            other => other,
        };

        let type_location = format!("{}.type", location);
        let rule_type = match self.required_string(obj, &["type"], &type_location) {
            Some(t) if RULE_TYPES.contains(&t.as_str()) => Some(t),
            Some(t) => {
                self.push(
                    type_location,
                    format!(
                        "unknown rule type '{}'; expected one of {}",
                        t,
                        RULE_TYPES.join(", ")
                    ),
                );
                None
            }
            None => None,
        };

        let params_location = format!("{}.params", location);
        let empty = Map::new();
        let params = match obj.get("params") {
            None | Some(Value::Null) => Some(&empty),
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                self.push(params_location.as_str(), "expected an object");
                None
            }
        };

        let kind = match (rule_type.as_deref(), params) {
            (Some(rule_type), Some(params)) => self.rule_kind(rule_type, params, &params_location),
            _ => None,
        };

        Some(Rule::new(id?, kind?))
    }

    fn rule_kind(
        &mut self,
        rule_type: &str,
        params: &Map<String, Value>,
        location: &str,
    ) -> Option<RuleKind> {
        match rule_type {
            "BLOCK_PHRASE" => self.block_phrase(params, location),
            "REQUIRE_PHRASE" => self.require_phrase(params, location),
            "REWRITE_REGEX" => self.rewrite_regex(params, location),
            "MAX_LENGTH" => self.max_length(params, location),
            other => {
                self.push(location, format!("unknown rule type '{}'", other));
                None
            }
        }
    }

    fn block_phrase(&mut self, params: &Map<String, Value>, location: &str) -> Option<RuleKind> {
        let phrases_location = format!("{}.phrases", location);
        let Some(items) = params.get("phrases").and_then(Value::as_array) else {
            self.push(phrases_location, "BLOCK_PHRASE params must contain 'phrases' list");
            return None;
        };

        let mut phrases = Vec::with_capacity(items.len());
        let mut complete = true;
        for (index, item) in items.iter().enumerate() {
            match item {
                Value::String(s) => phrases.push(s.clone()),
                _ => {
                    self.push(
                        format!("{}[{}]", phrases_location, index),
                        "all entries in 'phrases' must be strings",
                    );
                    complete = false;
                }
            }
        }

        complete.then(|| RuleKind::BlockPhrase(PhraseSet::new(phrases)))
    }

    fn require_phrase(&mut self, params: &Map<String, Value>, location: &str) -> Option<RuleKind> {
        let phrase = self.optional_string(params, "phrase", location);

        let condition = match params.get("when").or_else(|| params.get("condition")) {
            None | Some(Value::Null) => Some(None),
            Some(value) => self
                .condition(value, &format!("{}.when", location))
                .map(Some),
        };

        Some(RuleKind::RequirePhrase {
            phrase: phrase?.unwrap_or_default(),
            condition: condition?,
        })
    }

    fn condition(&mut self, value: &Value, location: &str) -> Option<Condition> {
        let Some(obj) = value.as_object() else {
            self.push(location, "expected an object");
            return None;
        };

        let field_location = format!("{}.field", location);
        let field = match self.required_string(obj, &["field"], &field_location) {
            Some(name) => match UserField::parse(&name) {
                Some(field) => Some(field),
                None => {
                    let known: Vec<&str> = UserField::ALL.iter().map(|f| f.as_str()).collect();
                    self.push(
                        field_location,
                        format!(
                            "unknown user field '{}'; expected one of {}",
                            name,
                            known.join(", ")
                        ),
                    );
                    None
                }
            },
            None => None,
        };

        let equals_location = format!("{}.equals", location);
        let Some(equals) = obj.get("equals") else {
            self.push(equals_location, "field required");
            return None;
        };

        match (field?, equals) {
            (UserField::ConsentToRecording, Value::Bool(b)) => Some(Condition::ConsentToRecording(*b)),
            (UserField::IsDebtCollection, Value::Bool(b)) => Some(Condition::IsDebtCollection(*b)),
            (UserField::Jurisdiction, Value::String(s)) => Some(Condition::Jurisdiction(s.clone())),
            (field, _) => {
                let expected = if field.is_bool() { "a boolean" } else { "a string" };
                self.push(
                    equals_location,
                    format!("expected {} to compare with {}", expected, field),
                );
                None
            }
        }
    }

    fn rewrite_regex(&mut self, params: &Map<String, Value>, location: &str) -> Option<RuleKind> {
        let pattern = self.optional_string(params, "pattern", location);
        let replacement = self.optional_string(params, "replacement", location);

        Some(RuleKind::RewriteRegex(RegexRewrite::new(
            pattern?.unwrap_or_default(),
            replacement?,
        )))
    }

    fn max_length(&mut self, params: &Map<String, Value>, location: &str) -> Option<RuleKind> {
        let max_chars_location = format!("{}.max_chars", location);

        let max_chars = match params.get("max_chars").or_else(|| params.get("maxChars")) {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => match n.as_u64().map(usize::try_from) {
                Some(Ok(max)) => Some(max),
                Some(Err(_)) => {
                    self.push(max_chars_location, "'max_chars' is too large");
                    return None;
                }
                None if n.is_i64() => {
                    self.push(max_chars_location, "'max_chars' must be a non-negative integer");
                    return None;
                }
                None => {
                    self.push(max_chars_location, "'max_chars' must be an integer");
                    return None;
                }
            },
            Some(_) => {
                self.push(max_chars_location, "'max_chars' must be an integer");
                return None;
            }
        };

        Some(RuleKind::MaxLength { max_chars })
    }

    /// `Some(None)` when absent or null, `None` when present with the wrong type
    fn optional_string(
        &mut self,
        params: &Map<String, Value>,
        key: &str,
        location: &str,
    ) -> Option<Option<String>> {
        match params.get(key) {
            None | Some(Value::Null) => Some(None),
            Some(Value::String(s)) => Some(Some(s.clone())),
            Some(_) => {
                self.push(
                    format!("{}.{}", location, key),
                    format!("'{}' must be a string", key),
                );
                None
            }
        }
    }

    fn required_string(
        &mut self,
        obj: &Map<String, Value>,
        keys: &[&str],
        location: &str,
    ) -> Option<String> {
        match lookup(obj, keys) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.push(location, "expected a string");
                None
            }
            None => {
                self.push(location, "field required");
                None
            }
        }
    }

    fn required_bool(
        &mut self,
        obj: &Map<String, Value>,
        keys: &[&str],
        location: &str,
    ) -> Option<bool> {
        match lookup(obj, keys) {
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => {
                self.push(location, "expected a boolean");
                None
            }
            None => {
                self.push(location, "field required");
                None
            }
        }
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| obj.get(*key))
}
