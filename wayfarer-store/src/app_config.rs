use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub booking: BookingRules,
    pub events: EventsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Upper bound on waiting for a package's admission lock
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Load the sample catalog into an empty store at startup
    #[serde(default)]
    pub seed_sample_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_admission_attempts")]
    pub admission_max_attempts: u32,
    #[serde(default = "default_admission_backoff")]
    pub admission_backoff_ms: u64,
    #[serde(default = "default_reference_prefix")]
    pub reference_prefix: String,
}

impl BookingRules {
    pub fn admission_backoff(&self) -> Duration {
        Duration::from_millis(self.admission_backoff_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }
fn default_lock_timeout() -> u64 { 2000 }
fn default_admission_attempts() -> u32 { 3 }
fn default_admission_backoff() -> u64 { 25 }
fn default_reference_prefix() -> String { "BK".to_string() }
fn default_channel_capacity() -> usize { 256 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `WAYFARER__DATABASE__URL=...` sets `database.url`
            .add_source(config::Environment::with_prefix("WAYFARER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let s = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080
                [database]
                url = "postgres://localhost/wayfarer"
                [storage]
                backend = "memory"
                [booking]
                [events]
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: Config = s.try_deserialize().unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(!config.storage.seed_sample_data);
        assert_eq!(config.database.lock_timeout_ms, 2000);
        assert_eq!(config.booking.admission_max_attempts, 3);
        assert_eq!(config.booking.admission_backoff(), Duration::from_millis(25));
        assert_eq!(config.booking.reference_prefix, "BK");
        assert_eq!(config.events.channel_capacity, 256);
    }
}
