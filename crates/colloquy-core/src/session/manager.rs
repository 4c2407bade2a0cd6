//! Session struct and lifecycle operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::id::SessionId;
use crate::{Normalizer, Responder, Speaker, StateMap, Turn};

use super::config::SessionConfig;
use super::types::BusyGuard;

/// A conversation session: an ordered turn history, accumulated context
/// state, and the collaborators that interpret and answer each message.
///
/// Methods take `&self` so a session can be shared behind an [`Arc`]; the
/// records live under an interior lock that is never held across an `await`.
/// At most one exchange runs at a time: a second [`Session::submit`] (or
/// [`Session::start`]) while one is in flight fails fast with
/// [`SessionError::Busy`]. Reads like [`Session::transcript`] are always
/// allowed and see the last committed records.
///
/// [`SessionError::Busy`]: crate::SessionError::Busy
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    /// Turns raw message text into the responder's input representation.
    pub(super) normalizer: Arc<dyn Normalizer>,
    /// Produces the agent reply and the next context state.
    pub(super) responder: Arc<dyn Responder>,
    /// History, state and bookkeeping, guarded by a sync lock.
    pub(super) inner: RwLock<Inner>,
    /// Whether the session is currently processing an exchange.
    pub(super) busy: AtomicBool,
}

/// Mutable session records.
pub(super) struct Inner {
    pub(super) history: Vec<Turn>,
    pub(super) state: StateMap,
    pub(super) next_seq: u64,
    pub(super) last_activity: Instant,
}

impl Inner {
    /// Append a turn at the next sequence number. Assignment and push happen
    /// under one lock acquisition, so numbering never gaps or repeats.
    pub(super) fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> u64 {
        let sequence = self.next_seq;
        self.history.push(Turn {
            speaker,
            text: text.into(),
            sequence,
        });
        self.next_seq += 1;
        self.last_activity = Instant::now();
        sequence
    }
}

impl Session {
    pub fn new(normalizer: Arc<dyn Normalizer>, responder: Arc<dyn Responder>) -> Self {
        Self {
            id: SessionId::new(),
            config: SessionConfig::default(),
            normalizer,
            responder,
            inner: RwLock::new(Inner {
                history: Vec::new(),
                state: StateMap::new(),
                next_seq: 0,
                last_activity: Instant::now(),
            }),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Reset the session and record the greeting.
    ///
    /// Discards all prior turns and context state, then appends the
    /// configured greeting as an agent turn at sequence 0. Fails with
    /// [`SessionError::Busy`](crate::SessionError::Busy) if an exchange is
    /// in flight; the records are untouched in that case.
    pub fn start(&self) -> crate::Result<()> {
        let _guard = BusyGuard::acquire(&self.busy)?;

        let mut inner = self.inner_mut();
        inner.history.clear();
        inner.state.clear();
        inner.next_seq = 0;
        inner.append(Speaker::Agent, self.config.greeting.clone());
        drop(inner);

        debug!(session = %self.id, "session started");
        Ok(())
    }

    /// Snapshot of the full turn history, oldest first.
    ///
    /// The returned turns are copies; later exchanges do not alter them.
    pub fn transcript(&self) -> Vec<Turn> {
        self.inner().history.clone()
    }

    /// Snapshot of the current context state.
    pub fn state(&self) -> StateMap {
        self.inner().state.clone()
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of recorded turns.
    pub fn turn_count(&self) -> usize {
        self.inner().history.len()
    }

    /// Whether an exchange is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// True when the last recorded turn is an unanswered user turn: after a
    /// failed exchange, or while one is in flight.
    pub fn awaiting_reply(&self) -> bool {
        matches!(
            self.inner().history.last(),
            Some(turn) if turn.speaker == Speaker::User
        )
    }

    /// Time since the last recorded turn (or construction).
    pub fn idle_for(&self) -> Duration {
        self.inner().last_activity.elapsed()
    }

    pub(super) fn inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("session lock poisoned")
    }

    pub(super) fn inner_mut(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("session lock poisoned")
    }
}
