//! # larder-guard
//!
//! Keeps unauthenticated sessions off the dashboard. The guard does not judge
//! credentials itself; it forwards the session cookie to the backend's
//! `/verify` endpoint and trusts its `authenticated` flag.

pub mod guard;
pub mod verify;

pub use guard::{AuthGuard, GuardDecision, protect, require_session};
pub use verify::{GuardError, VerifyClient, VerifyResponse};
