use thiserror::Error;

pub const ROOM_NAME_VAR: &str = "BASICROOM_ROOM_NAME";
pub const LOG_LEVEL_VAR: &str = "BASICROOM_LOG_LEVEL";
pub const PARTICIPANTS_VAR: &str = "BASICROOM_PARTICIPANTS";
pub const FAIL_PIPELINE_VAR: &str = "BASICROOM_FAIL_PIPELINE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Settings for the demo binary, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Name of the demo room; a generated pet name when unset
    pub room_name: String,
    /// Default tracing level when RUST_LOG is not set
    pub log_level: String,
    /// Members that join the demo room, in order
    pub participants: Vec<String>,
    /// Make the in-memory pipeline backend refuse to create pipelines
    pub fail_pipeline: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room_name: generate_room_name(),
            log_level: "debug".to_string(),
            participants: vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
            fail_pipeline: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup(ROOM_NAME_VAR).filter(|v| !v.trim().is_empty()) {
            config.room_name = name.trim().to_string();
        }

        if let Some(level) = lookup(LOG_LEVEL_VAR).filter(|v| !v.trim().is_empty()) {
            config.log_level = level.trim().to_lowercase();
        }

        if let Some(list) = lookup(PARTICIPANTS_VAR) {
            config.participants = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = lookup(FAIL_PIPELINE_VAR) {
            config.fail_pipeline = parse_bool(FAIL_PIPELINE_VAR, &value)?;
        }

        Ok(config)
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn generate_room_name() -> String {
    petname::Petnames::default().generate_one(2, "-")
}
