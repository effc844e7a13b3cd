use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub core: CoreConfig,
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// SHA-256 hex digest of the service API key.
    pub api_key_hash: String,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Tunables for the transaction/campaign pipeline. Passed explicitly into
/// each service at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Whole-operation retries when row locks cannot be acquired.
    #[serde(default = "default_max_lock_retries")]
    pub max_lock_retries: u32,

    /// Backoff between lock retries.
    #[serde(default = "default_lock_retry_backoff_ms")]
    pub lock_retry_backoff_ms: u64,

    /// Attempt budget given to newly enqueued tasks.
    #[serde(default = "default_task_max_attempts")]
    pub task_max_attempts: i32,

    /// Tasks claimed per task-runner tick.
    #[serde(default = "default_task_batch_size")]
    pub task_batch_size: i64,

    /// Base of the task retry exponential backoff, in seconds.
    #[serde(default = "default_task_backoff_base_secs")]
    pub task_backoff_base_secs: u64,

    /// Rows processed per tick by the scheduled conversion/reset jobs.
    #[serde(default = "default_job_batch_size")]
    pub job_batch_size: i64,

    /// Days finished task rows are kept before cleanup.
    #[serde(default = "default_task_retention_days")]
    pub task_retention_days: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether transactional email sending is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Email provider endpoint for transactional sends.
    #[serde(default)]
    pub endpoint: String,

    /// Provider API key.
    #[serde(default)]
    pub api_key: String,

    /// Sender address.
    #[serde(default = "default_email_from")]
    pub from_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            from_address: default_email_from(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_lock_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_max_lock_retries() -> u32 {
    3
}
fn default_lock_retry_backoff_ms() -> u64 {
    200
}
fn default_task_max_attempts() -> i32 {
    6
}
fn default_task_batch_size() -> i64 {
    20
}
fn default_task_backoff_base_secs() -> u64 {
    60
}
fn default_job_batch_size() -> i64 {
    500
}
fn default_task_retention_days() -> i32 {
    30
}
fn default_email_from() -> String {
    "no-reply@loyalty.example.com".to_string()
}

impl Config {
    /// Load configuration from config files and environment.
    ///
    /// Sources, later overriding earlier: `config/default.toml`, optional
    /// `config/local.toml`, environment variables prefixed `LOYALTY__`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("LOYALTY").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(config::ConfigError::Message)?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), String> {
        if self.database.url.is_empty() {
            return Err("database.url must be set".into());
        }
        if self.security.api_key_hash.len() != 64
            || !self.security.api_key_hash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err("security.api_key_hash must be a SHA-256 hex digest".into());
        }
        if self.core.max_lock_retries == 0 {
            return Err("core.max_lock_retries must be at least 1".into());
        }
        if self.email.enabled && self.email.endpoint.is_empty() {
            return Err("email.endpoint must be set when email is enabled".into());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Database configuration in the shape the persistence layer expects.
    pub fn database_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            min_connections: self.database.min_connections,
            connect_timeout_secs: self.database.connect_timeout_secs,
            idle_timeout_secs: self.database.idle_timeout_secs,
            lock_timeout_ms: self.database.lock_timeout_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                request_timeout_secs: default_request_timeout(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/loyalty_test".into(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
                lock_timeout_ms: default_lock_timeout_ms(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
            security: SecurityConfig {
                api_key_hash: "a".repeat(64),
                cors_origins: vec![],
            },
            core: CoreConfig {
                max_lock_retries: default_max_lock_retries(),
                lock_retry_backoff_ms: default_lock_retry_backoff_ms(),
                task_max_attempts: default_task_max_attempts(),
                task_batch_size: default_task_batch_size(),
                task_backoff_base_secs: default_task_backoff_base_secs(),
                job_batch_size: default_job_batch_size(),
                task_retention_days: default_task_retention_days(),
            },
            email: EmailConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_empty_database_url_fails_validation() {
        let mut cfg = test_config();
        cfg.database.url = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_api_key_hash_fails_validation() {
        let mut cfg = test_config();
        cfg.security.api_key_hash = "not-a-hash".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_lock_retries_fails_validation() {
        let mut cfg = test_config();
        cfg.core.max_lock_retries = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_email_enabled_requires_endpoint() {
        let mut cfg = test_config();
        cfg.email.enabled = true;
        assert!(cfg.validate().is_err());
        cfg.email.endpoint = "https://mail.example.com/send".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = test_config();
        assert_eq!(cfg.socket_addr().port(), 8080);
    }
}
