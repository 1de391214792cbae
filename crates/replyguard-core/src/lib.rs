//! ReplyGuard Core
//!
//! Core types and error handling shared across ReplyGuard components.
//!
//! This crate provides:
//! - The typed user context a reply is moderated against
//! - Moderation decisions and their audit trail
//! - Error types, including aggregated validation failures

pub mod error;
pub mod types;

pub use error::{Error, FieldViolation, Result, ValidationError};
pub use types::{ModerationResult, ModerationStatus, UserField, UserState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, FieldViolation, Result, ValidationError};
    pub use crate::types::{ModerationResult, ModerationStatus, UserField, UserState};
}
