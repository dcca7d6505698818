//! # larder-common
//!
//! Configuration and the shared error type used by every Larder tool.
//! No orchestration lives here, just primitives the other crates agree on.

pub mod config;
pub mod error;
