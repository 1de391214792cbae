//! ReplyGuard Policy Engine
//!
//! Deterministic moderation of outbound replies against an ordered list of
//! compliance rules.
//!
//! Rules come in four kinds:
//! - `BLOCK_PHRASE`: refuse the reply when a phrase occurs
//! - `REQUIRE_PHRASE`: prepend a disclosure, optionally gated on user context
//! - `REWRITE_REGEX`: redact or rewrite matching content
//! - `MAX_LENGTH`: truncate at a word boundary
//!
//! [`evaluate`] moderates a complete reply in one pass; a
//! [`ModerationSession`] moderates a reply streamed in chunks, blocking early
//! and deferring every rewrite to `finalize`.

pub mod condition;
pub mod engine;
pub mod request;
pub mod rewrite;
pub mod rule;
pub mod session;
pub mod validate;

pub use condition::Condition;
pub use engine::{evaluate, RuleEngine};
pub use request::ModerationRequest;
pub use rewrite::{PhraseSet, RegexRewrite};
pub use rule::{Rule, RuleKind, RuleSet};
pub use session::{ModerationSession, SessionStatus};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::condition::Condition;
    pub use crate::engine::{evaluate, RuleEngine};
    pub use crate::request::ModerationRequest;
    pub use crate::rule::{Rule, RuleKind, RuleSet};
    pub use crate::session::{ModerationSession, SessionStatus};
    pub use replyguard_core::{ModerationResult, ModerationStatus, UserState};
}
