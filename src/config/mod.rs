//! Configuration module.

mod settings;

pub use settings::{Config, IntakeConfig, ModerationConfig, ServerConfig};
