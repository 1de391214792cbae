//! Moderation request shape

use replyguard_core::{Result, UserState, ValidationError};

use crate::rule::Rule;
use crate::validate;

/// A validated request to moderate one draft reply
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationRequest {
    /// Context about the user being replied to
    pub user_state: UserState,

    /// Reply proposed by the upstream generator
    pub draft_reply: String,

    /// Rules sent inline with the request, if any
    pub rules: Option<Vec<Rule>>,
}

impl ModerationRequest {
    /// Parse and validate a JSON request
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Ok(Self::from_value(&value)?)
    }

    /// Validate an untyped request value
    pub fn from_value(value: &serde_json::Value) -> std::result::Result<Self, ValidationError> {
        validate::request(value)
    }
}
