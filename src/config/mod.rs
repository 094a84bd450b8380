//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,

    /// Allowed client origins for CORS; empty allows any origin
    pub client_origins: Vec<String>,

    /// Whether objects flagged `used` may be picked up again
    pub allow_used_reclaim: bool,
    /// Spawn the pill categories during round generation
    pub enable_pills: bool,
    /// Fixed seed for reproducible round layouts
    pub round_seed: Option<u64>,

    /// Leaderboard file; scores are kept in memory only when unset
    pub scores_file: Option<PathBuf>,

    /// Max inbound frames per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
        };

        let client_origins = lookup("CLIENT_ORIGIN")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let round_seed = lookup("ROUND_SEED")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::Invalid("ROUND_SEED", raw))
            })
            .transpose()?;

        let input_rate_limit = match lookup("INPUT_RATE_LIMIT") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid("INPUT_RATE_LIMIT", raw)),
            },
            None => 60,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: lookup("LOG_FORMAT").is_some_and(|f| f.trim().eq_ignore_ascii_case("json")),

            client_origins,

            allow_used_reclaim: parse_flag(&lookup, "ALLOW_USED_RECLAIM", false)?,
            enable_pills: parse_flag(&lookup, "ENABLE_PILLS", false)?,
            round_seed,

            scores_file: lookup("SCORES_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),

            input_rate_limit,
        })
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key, raw)),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),

    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert!(config.client_origins.is_empty());
        assert!(!config.allow_used_reclaim);
        assert!(!config.enable_pills);
        assert_eq!(config.round_seed, None);
        assert_eq!(config.scores_file, None);
        assert_eq!(config.input_rate_limit, 60);
    }

    #[test]
    fn test_port_wins_over_server_addr() {
        let config = load(&[("PORT", "9100"), ("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr.port(), 9100);

        let config = load(&[("SERVER_ADDR", "127.0.0.1:7000")]).unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("CLIENT_ORIGIN", "http://localhost:3000, https://play.example.com"),
            ("ALLOW_USED_RECLAIM", "true"),
            ("ENABLE_PILLS", "1"),
            ("ROUND_SEED", "1234"),
            ("SCORES_FILE", "/var/lib/relay/scores.json"),
            ("INPUT_RATE_LIMIT", "15"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(
            config.client_origins,
            ["http://localhost:3000", "https://play.example.com"]
        );
        assert!(config.allow_used_reclaim);
        assert!(config.enable_pills);
        assert_eq!(config.round_seed, Some(1234));
        assert_eq!(config.scores_file, Some(PathBuf::from("/var/lib/relay/scores.json")));
        assert_eq!(config.input_rate_limit, 15);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(matches!(
            load(&[("ENABLE_PILLS", "maybe")]),
            Err(ConfigError::Invalid("ENABLE_PILLS", _))
        ));
        assert!(matches!(
            load(&[("ROUND_SEED", "-1")]),
            Err(ConfigError::Invalid("ROUND_SEED", _))
        ));
        assert!(matches!(
            load(&[("INPUT_RATE_LIMIT", "0")]),
            Err(ConfigError::Invalid("INPUT_RATE_LIMIT", _))
        ));
        assert!(matches!(
            load(&[("SERVER_ADDR", "nowhere")]),
            Err(ConfigError::InvalidAddress(_))
        ));
    }
}
