use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a whole number of milliseconds, got {value:?}")]
    InvalidMillis { key: String, value: String },
}

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub static_dir: String,
    pub lichess_api_url: String,
    pub lichess_api_token: Option<String>,
    /// Pause before every cloud-eval call, to stay under the rate limit.
    pub engine_request_delay: Duration,
    pub engine_timeout: Duration,
    /// How long the final move stays on screen before the result is shown.
    pub terminal_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1:8080".to_string(),
            static_dir: "./static".to_string(),
            lichess_api_url: "https://lichess.org/api/cloud-eval".to_string(),
            lichess_api_token: None,
            engine_request_delay: Duration::from_millis(1000),
            engine_timeout: Duration::from_millis(15_000),
            terminal_delay: Duration::from_millis(300),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let millis = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidMillis {
                        key: key.to_string(),
                        value,
                    }),
                None => Ok(default),
            }
        };

        Ok(Config {
            bind_addr: lookup("CHESS_BIND_ADDR").unwrap_or(defaults.bind_addr),
            static_dir: lookup("CHESS_STATIC_DIR").unwrap_or(defaults.static_dir),
            lichess_api_url: lookup("LICHESS_API_URL").unwrap_or(defaults.lichess_api_url),
            lichess_api_token: lookup("LICHESS_API_TOKEN").filter(|t| !t.trim().is_empty()),
            engine_request_delay: millis("ENGINE_REQUEST_DELAY_MS", defaults.engine_request_delay)?,
            engine_timeout: millis("ENGINE_TIMEOUT_MS", defaults.engine_timeout)?,
            terminal_delay: millis("TERMINAL_DELAY_MS", defaults.terminal_delay)?,
        })
    }
}
