//! `runtime-client` — REST client for the serverless runtime's action
//! registry.
//!
//! The registry is resource-oriented: one namespace holds a flat set of
//! named actions, each carrying an executable archive and annotations. The
//! gate only needs three calls — list the namespace, create an action,
//! update an action — so that is all this crate models.
//!
//! The crate is deliberately independent of the rest of the workspace: it
//! knows nothing about pipelines, events, or release versions. Callers
//! decide what an action is named and when to create versus update.

pub mod client;
pub mod error;
pub mod types;

pub use client::RuntimeClient;
pub use error::RuntimeError;
pub use types::{ActionSpec, ActionSummary};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, RuntimeError>;
