//! Per-session configuration.

/// Settings that shape a session's transcript and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Display name for the agent side of the conversation.
    pub agent_name: String,
    /// Text of the agent turn recorded by [`Session::start`].
    ///
    /// [`Session::start`]: super::Session::start
    pub greeting: String,
    /// Optional cap on submitted message length, in characters.
    /// `None` accepts messages of any length.
    pub max_message_len: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_name: "Colloquy".to_string(),
            greeting: "Hi, how can I assist you today?".to_string(),
            max_message_len: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_max_message_len(mut self, max: usize) -> Self {
        self.max_message_len = Some(max);
        self
    }
}
