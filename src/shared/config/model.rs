use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub codec: CodecConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub stdout_level: String,
    pub file_level: String,
    /// Level for the codec's own `kwproto::*` targets; other crates follow
    /// `RUST_LOG`.
    pub codec_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            stdout_level: "info".to_string(),
            file_level: "debug".to_string(),
            codec_level: "debug".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// First allocation of a payload buffer, in bytes.
    pub initial_payload_capacity: usize,
    /// Minimum growth increment when a payload buffer runs out of room.
    pub payload_extend_step: usize,
    /// Layout emitted by the row batch builder: "none", "snappy" or "lz4".
    pub result_compression: String,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            initial_payload_capacity: 64 * 1024,
            payload_extend_step: 64 * 1024,
            result_compression: "lz4".to_string(),
        }
    }
}

use std::env;

pub fn load_settings() -> Result<Settings, config::ConfigError> {
    let config_path = env::var("KWPROTO_CONFIG").unwrap_or_else(|_| "config".to_string());

    let settings: Settings = config::Config::builder()
        .add_source(config::File::with_name(&config_path).required(false))
        .add_source(config::Environment::with_prefix("KWPROTO").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}

pub fn load_settings_from(path: &Path) -> Result<Settings, config::ConfigError> {
    let settings: Settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()?
        .try_deserialize()?;

    Ok(settings)
}
