//! CLI configuration: TOML schema, loading, and default file creation.
//!
//! All sections use `serde(default)` so partial configs work correctly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use colloquy_core::SessionConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Agent presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Name shown on the agent's side of the conversation.
    pub name: String,
    /// Greeting recorded when a session starts.
    pub greeting: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Colloquy".into(),
            greeting: "Hi, how can I assist you today?".into(),
        }
    }
}

/// Session behavior settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Reject messages longer than this many characters. Unset means no limit.
    pub max_message_len: Option<usize>,
}

/// Top-level CLI config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub agent: AgentConfig,
    pub session: SessionSection,
}

impl CliConfig {
    /// Map onto the core session settings.
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::new()
            .with_agent_name(self.agent.name.clone())
            .with_greeting(self.agent.greeting.clone());
        match self.session.max_message_len {
            Some(max) => config.with_max_message_len(max),
            None => config,
        }
    }
}

fn validate(config: &CliConfig) -> Result<(), ConfigError> {
    if config.agent.name.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "agent.name must not be empty".into(),
        ));
    }
    if config.agent.greeting.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "agent.greeting must not be empty".into(),
        ));
    }
    if config.session.max_message_len == Some(0) {
        return Err(ConfigError::ValidationError(
            "session.max_message_len must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// After loading, the config is validated; if validation fails, a warning
/// is logged and the parsed config is returned as-is.
pub fn load_from_path(path: &Path) -> Result<CliConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: CliConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validate(&config) {
        warn!("config validation warning: {e} — using parsed config as-is");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path
/// (`~/.config/colloquy/config.toml` on Linux).
///
/// If the file does not exist, creates a default config file and returns
/// defaults.
pub fn load_default() -> Result<CliConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::ParseError(msg)) if msg.contains("failed to read") => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(CliConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Load config from the override path, or the default path when none is
/// given, falling back to `CliConfig::default()` with a warning on any load
/// failure. The conversation loop runs either way.
pub fn load_or_default(override_path: Option<&Path>) -> CliConfig {
    let loaded = match override_path {
        Some(path) => load_from_path(path),
        None => load_default(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("config load failed, using defaults: {e}");
        CliConfig::default()
    })
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("colloquy").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// The commented template written on first run.
fn default_config_toml() -> &'static str {
    r##"# colloquy configuration
#
# Every field is optional; missing fields fall back to their defaults.

[agent]
# Name shown on the agent's side of the conversation.
name = "Colloquy"
# Greeting recorded when a session starts.
greeting = "Hi, how can I assist you today?"

[session]
# Reject messages longer than this many characters. Remove to disable.
# max_message_len = 2000
"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.agent.greeting, "Hi, how can I assist you today?");
        assert_eq!(config.session.max_message_len, None);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: CliConfig = toml::from_str(
            r#"
[agent]
name = "Desk"

[session]
max_message_len = 500
"#,
        )
        .unwrap();
        assert_eq!(config.agent.name, "Desk");
        assert_eq!(config.agent.greeting, "Hi, how can I assist you today?");
        assert_eq!(config.session.max_message_len, Some(500));
    }

    #[test]
    fn template_parses_and_validates() {
        let config: CliConfig = toml::from_str(default_config_toml()).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn session_config_mapping() {
        let config: CliConfig = toml::from_str(
            r#"
[agent]
name = "Desk"
greeting = "Welcome."

[session]
max_message_len = 64
"#,
        )
        .unwrap();

        let session = config.session_config();
        assert_eq!(session.agent_name, "Desk");
        assert_eq!(session.greeting, "Welcome.");
        assert_eq!(session.max_message_len, Some(64));
    }

    #[test]
    fn validate_rejects_blank_greeting_and_zero_limit() {
        let mut config = CliConfig::default();
        config.agent.greeting = "   ".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = CliConfig::default();
        config.session.max_message_len = Some(0);
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn load_from_nonexistent_returns_parse_error() {
        let result = load_from_path(Path::new("/tmp/nonexistent_colloquy_config.toml"));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn load_valid_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agent]
greeting = "Back again?"
"#,
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.agent.greeting, "Back again?");
        // Defaults preserved
        assert_eq!(config.agent.name, "Colloquy");
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn load_or_default_falls_back_on_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let config = load_or_default(Some(&path));
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn load_or_default_falls_back_on_missing_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let config = load_or_default(Some(&path));
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn load_or_default_uses_valid_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[agent]
name = "Desk"
"#,
        )
        .unwrap();

        let config = load_or_default(Some(&path));
        assert_eq!(config.agent.name, "Desk");
    }
}
