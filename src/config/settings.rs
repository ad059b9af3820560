//! Configuration settings for the Lyceum engine.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub intake: IntakeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            intake: IntakeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy().to_string()).to_string();
        let content = std::fs::read_to_string(expanded).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            // Current directory
            PathBuf::from("config.toml"),
            PathBuf::from("lyceum.toml"),
            // User config directory
            dirs::config_dir()
                .map(|p| p.join("lyceum/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let intake = &self.intake;
        if !(0.0..=1.0).contains(&intake.similarity_threshold) {
            return Err(ConfigError::Invalid(
                "intake.similarity_threshold must be within 0.0..=1.0".to_string(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&intake.relevance_threshold) {
            return Err(ConfigError::Invalid(
                "intake.relevance_threshold must be within 0.0..=1.0".to_string(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&intake.moderation.spam_threshold) {
            return Err(ConfigError::Invalid(
                "intake.moderation.spam_threshold must be within 0.0..=1.0".to_string(),
            )
            .into());
        }
        if intake.min_question_tokens == 0 {
            return Err(
                ConfigError::Invalid("intake.min_question_tokens must be > 0".to_string()).into(),
            );
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    pub bind_addr: String,
    /// HTTP port.
    pub http_port: u16,
    /// Enable CORS (the mobile client talks to us cross-origin in dev).
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            http_port: 8000,
            enable_cors: true,
        }
    }
}

/// Intake pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Minimum similarity score for a FAQ match (0.0 to 1.0).
    pub similarity_threshold: f32,
    /// Minimum topic-overlap ratio for a question to count as on-topic.
    pub relevance_threshold: f32,
    /// Questions with fewer content tokens than this always pass the
    /// relevance check (short questions carry too little signal).
    pub min_question_tokens: usize,
    /// Moderation filter configuration.
    pub moderation: ModerationConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            relevance_threshold: 0.1,
            min_question_tokens: 3,
            moderation: ModerationConfig::default(),
        }
    }
}

/// Moderation filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Additional disallowed terms merged into the built-in lexicon.
    pub extra_terms: Vec<String>,
    /// Spam score above which a question is rejected.
    pub spam_threshold: f32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            extra_terms: Vec::new(),
            spam_threshold: 0.6,
        }
    }
}
