use crate::error::{Error, Result};
use crate::session::SessionConfig;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub exam_api_base_url: String,
    pub exam_api_token: String,
    pub assignment_id: Uuid,
    pub candidate_id: Uuid,
    pub autosave_debounce_ms: u64,
    pub camera_poll_secs: u64,
    pub warning_ttl_secs: u64,
    pub finalize_max_attempts: u32,
    pub finalize_backoff_ms: u64,
    pub http_timeout_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            exam_api_base_url: get_env("EXAM_API_BASE_URL")?,
            exam_api_token: get_env("EXAM_API_TOKEN")?,
            assignment_id: get_env_parse("ASSIGNMENT_ID")?,
            candidate_id: get_env_parse("CANDIDATE_ID")?,
            autosave_debounce_ms: get_env_parse_or("AUTOSAVE_DEBOUNCE_MS", 2_000)?,
            camera_poll_secs: get_env_parse_or("CAMERA_POLL_SECS", 3)?,
            warning_ttl_secs: get_env_parse_or("WARNING_TTL_SECS", 5)?,
            finalize_max_attempts: get_env_parse_or("FINALIZE_MAX_ATTEMPTS", 3)?,
            finalize_backoff_ms: get_env_parse_or("FINALIZE_BACKOFF_MS", 1_000)?,
            http_timeout_secs: get_env_parse_or("HTTP_TIMEOUT_SECS", 15)?,
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            autosave_debounce: Duration::from_millis(self.autosave_debounce_ms),
            camera_poll_interval: Duration::from_secs(self.camera_poll_secs.max(1)),
            warning_ttl: Duration::from_secs(self.warning_ttl_secs),
            finalize_max_attempts: self.finalize_max_attempts.max(1),
            finalize_backoff: Duration::from_millis(self.finalize_backoff_ms),
            ..SessionConfig::default()
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
