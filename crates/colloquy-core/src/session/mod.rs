//! Conversation session management.
//!
//! A [`Session`] owns one conversation's ordered history and context state,
//! mediates between caller input and the injected collaborators, and
//! guarantees a consistent, replayable transcript.

mod config;
mod manager;
mod submit;
mod types;

pub use config::SessionConfig;
pub use manager::Session;
