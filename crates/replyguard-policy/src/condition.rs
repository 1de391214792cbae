//! Rule conditions over the user context

use replyguard_core::{UserField, UserState};

/// Condition gating a `REQUIRE_PHRASE` rule.
///
/// Each variant carries an expected value of the field's own type, so a
/// condition can only be built for a field that exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    ConsentToRecording(bool),
    Jurisdiction(String),
    IsDebtCollection(bool),
}

impl Condition {
    /// The user field this condition reads
    pub fn field(&self) -> UserField {
        match self {
            Self::ConsentToRecording(_) => UserField::ConsentToRecording,
            Self::Jurisdiction(_) => UserField::Jurisdiction,
            Self::IsDebtCollection(_) => UserField::IsDebtCollection,
        }
    }

    /// Whether the user context satisfies this condition
    pub fn holds(&self, user_state: &UserState) -> bool {
        match self {
            Self::ConsentToRecording(expected) => user_state.consent_to_recording == *expected,
            Self::Jurisdiction(expected) => user_state.jurisdiction == *expected,
            Self::IsDebtCollection(expected) => user_state.is_debt_collection == *expected,
        }
    }
}
