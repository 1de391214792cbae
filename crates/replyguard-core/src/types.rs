//! Core types for ReplyGuard

use serde::{Deserialize, Serialize};
use std::fmt;

/// Context about the end user a reply is addressed to.
///
/// Immutable for the lifetime of one moderation call or session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    /// Whether the user agreed to the conversation being recorded
    #[serde(alias = "consentToRecording")]
    pub consent_to_recording: bool,

    /// Jurisdiction code, e.g. `NY` or `CA`
    pub jurisdiction: String,

    /// Whether the conversation is part of a debt collection
    #[serde(alias = "isDebtCollection")]
    pub is_debt_collection: bool,
}

impl UserState {
    /// Create a new user state
    pub fn new(
        consent_to_recording: bool,
        jurisdiction: impl Into<String>,
        is_debt_collection: bool,
    ) -> Self {
        Self {
            consent_to_recording,
            jurisdiction: jurisdiction.into(),
            is_debt_collection,
        }
    }
}

/// The fields of [`UserState`] a rule condition may refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    ConsentToRecording,
    Jurisdiction,
    IsDebtCollection,
}

impl UserField {
    /// All fields, in declaration order
    pub const ALL: [UserField; 3] = [
        UserField::ConsentToRecording,
        UserField::Jurisdiction,
        UserField::IsDebtCollection,
    ];

    /// Parse a wire field name (snake_case or camelCase)
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "consent_to_recording" | "consentToRecording" => Some(Self::ConsentToRecording),
            "jurisdiction" => Some(Self::Jurisdiction),
            "is_debt_collection" | "isDebtCollection" => Some(Self::IsDebtCollection),
            _ => None,
        }
    }

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsentToRecording => "consent_to_recording",
            Self::Jurisdiction => "jurisdiction",
            Self::IsDebtCollection => "is_debt_collection",
        }
    }

    /// Whether the field holds a boolean (otherwise a string)
    pub fn is_bool(&self) -> bool {
        !matches!(self, Self::Jurisdiction)
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome class of a moderation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModerationStatus {
    /// Reply may be delivered as drafted
    Allow,
    /// Reply must not be delivered
    Block,
    /// Reply may be delivered after the rewrites in `final_reply`
    Rewrite,
}

impl ModerationStatus {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Block => "BLOCK",
            Self::Rewrite => "REWRITE",
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for one reply, with the ids of every rule visited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationResult {
    /// Allow, block or rewrite
    pub status: ModerationStatus,

    /// Text to deliver; empty when blocked
    pub final_reply: String,

    /// Ids of visited rules in evaluation order, without duplicates
    pub applied_rules: Vec<String>,

    /// Why the reply was blocked
    pub reason: Option<String>,
}

impl ModerationResult {
    /// Reply passes unchanged
    pub fn allow(final_reply: impl Into<String>, applied_rules: Vec<String>) -> Self {
        Self {
            status: ModerationStatus::Allow,
            final_reply: final_reply.into(),
            applied_rules,
            reason: None,
        }
    }

    /// Reply passes after rewriting
    pub fn rewrite(final_reply: impl Into<String>, applied_rules: Vec<String>) -> Self {
        Self {
            status: ModerationStatus::Rewrite,
            final_reply: final_reply.into(),
            applied_rules,
            reason: None,
        }
    }

    /// Reply is blocked
    pub fn block(reason: impl Into<String>, applied_rules: Vec<String>) -> Self {
        Self {
            status: ModerationStatus::Block,
            final_reply: String::new(),
            applied_rules,
            reason: Some(reason.into()),
        }
    }

    /// Check if the reply was blocked
    pub fn is_blocked(&self) -> bool {
        self.status == ModerationStatus::Block
    }
}
