//! The async message exchange: validation, collaborator calls, turn recording.

use tracing::{debug, warn};

use crate::{CollaboratorError, SessionError, Speaker};

use super::manager::Session;
use super::types::BusyGuard;

impl Session {
    /// Submit a user message and return the agent's reply text.
    ///
    /// On success the session gains exactly two turns: the user turn with the
    /// literal `message`, then the agent turn with the reply. The context
    /// state is replaced by the state the responder returned.
    ///
    /// The user turn is recorded before the collaborators run, so a failed
    /// exchange leaves the unanswered question visible in the transcript
    /// ([`Session::awaiting_reply`]) with no agent turn and the state at its
    /// pre-call value. The session returns to idle on every exit path and
    /// accepts further calls.
    pub async fn submit(&self, message: &str) -> crate::Result<String> {
        if message.trim().is_empty() {
            return Err(SessionError::Validation(
                "message is empty or whitespace-only".into(),
            ));
        }
        if let Some(max) = self.config().max_message_len {
            let len = message.chars().count();
            if len > max {
                return Err(SessionError::Validation(format!(
                    "message is {len} characters, limit is {max}"
                )));
            }
        }

        let _guard = BusyGuard::acquire(&self.busy)?;

        let sequence = self.inner_mut().append(Speaker::User, message);
        debug!(session = %self.id(), sequence, "recorded user turn");

        // Collaborator calls happen without the record lock held; reads
        // observe the user turn while the exchange is still in flight.
        let normalized = match self.normalizer.normalize(message).await {
            Ok(normalized) => normalized,
            Err(err) => {
                warn!(session = %self.id(), error = %err, "normalizer failed");
                return Err(CollaboratorError::from(err).into());
            }
        };

        let state = self.state();
        let reply = match self.responder.respond(&normalized, &state).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(session = %self.id(), error = %err, "responder failed");
                return Err(CollaboratorError::from(err).into());
            }
        };

        if reply.text.trim().is_empty() {
            warn!(session = %self.id(), "responder returned a blank reply");
            return Err(CollaboratorError::EmptyReply.into());
        }

        let mut inner = self.inner_mut();
        inner.state = reply.state;
        let sequence = inner.append(Speaker::Agent, reply.text.clone());
        drop(inner);
        debug!(session = %self.id(), sequence, "recorded agent turn");

        Ok(reply.text)
    }
}
