//! Conversation session management for Colloquy.
//!
//! Provides the [`Session`] type, an ordered, replayable dialogue log with
//! per-session context state, plus:
//! - Injected collaborator traits ([`Normalizer`], [`Responder`]) so the
//!   session never owns inference or text-processing logic
//! - Fail-fast reentrancy control (one exchange in flight per session)
//! - A typed failure taxonomy that keeps partial exchanges visible
//! - A [`SessionStore`] registry for hosting many independent sessions

pub mod id;
pub mod session;
pub mod store;

use std::collections::HashMap;

use async_trait::async_trait;

pub use id::SessionId;
pub use session::{Session, SessionConfig};
pub use store::SessionStore;

pub type Result<T> = std::result::Result<T, SessionError>;

/// Accumulated conversational context, keyed by slot name.
///
/// Written only by [`Session::submit`] from the responder's returned state;
/// cleared by [`Session::start`].
pub type StateMap = HashMap<String, serde_json::Value>;

/// Which side of the conversation produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Agent,
}

/// One recorded utterance in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    /// The literal text produced or submitted for this turn.
    pub text: String,
    /// Append-time position, strictly increasing within a session.
    pub sequence: u64,
}

/// Normalizer output: the intermediate representation handed to a responder.
///
/// The fields are open so normalizers can fill whichever representation their
/// paired responder consumes; [`NormalizedInput::verbatim`] covers passthrough
/// normalizers and test stubs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NormalizedInput {
    /// Original text as submitted.
    pub raw: String,
    /// Canonical form (normalizer-defined; e.g. case-folded and trimmed).
    pub canonical: String,
    /// Token stream, empty when the normalizer does not tokenize.
    pub tokens: Vec<String>,
}

impl NormalizedInput {
    /// Passthrough representation: canonical text equals the raw text, no tokens.
    pub fn verbatim(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            canonical: raw.clone(),
            raw,
            tokens: Vec::new(),
        }
    }
}

/// Responder output: the reply text plus the full next context state.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Replaces the session state wholesale, so responders can both add and
    /// retire slots.
    pub state: StateMap,
}

impl Reply {
    /// A reply that carries the given state through unchanged.
    pub fn text(text: impl Into<String>, state: &StateMap) -> Self {
        Self {
            text: text.into(),
            state: state.clone(),
        }
    }
}

/// Turns raw submitted text into the representation responders consume.
///
/// Implementations must be deterministic: the same input yields the same
/// output, so transcripts are replayable against recorded normalizations.
#[async_trait]
pub trait Normalizer: Send + Sync {
    async fn normalize(&self, raw: &str) -> std::result::Result<NormalizedInput, NormalizationError>;
}

/// Produces the agent's reply for a normalized input and the current state.
///
/// A successful reply must carry non-empty text; the session rejects empty
/// replies as malformed ([`CollaboratorError::EmptyReply`]).
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        input: &NormalizedInput,
        state: &StateMap,
    ) -> std::result::Result<Reply, InferenceError>;
}

/// Failure produced by a [`Normalizer`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("normalization failed: {0}")]
pub struct NormalizationError(pub String);

/// Failure produced by a [`Responder`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("inference failed: {0}")]
pub struct InferenceError(pub String);

/// A collaborator call failed or returned malformed output.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("responder returned an empty reply")]
    EmptyReply,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Bad caller input (empty or over-length message).
    #[error("invalid message: {0}")]
    Validation(String),

    /// An exchange is already in flight on this session.
    #[error("session is busy with another exchange")]
    Busy,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl SessionError {
    /// True when the error came out of a collaborator rather than the session.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, SessionError::Collaborator(_))
    }
}
