//! Per-session runtime: one reviewer, one document at a time.
//!
//! A [`Session`] owns its collaborators and the slots the review flow
//! fills in (uploaded document, current classification). Every action runs
//! to completion before the next one is accepted.

mod session;

pub use session::{
    Classification, Document, FeedbackOutcome, Session, SessionConfig, SessionError, SessionState,
};
