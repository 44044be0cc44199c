//! Feeder configuration with TOML file support.

use feeder_gateway::http::DEFAULT_ORACLE_MODULE_PATH;
use feeder_types::{FeederAddress, ValidatorAddress};
use feeder_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{EngineError, RetryPolicy, VoterIdentity};

/// Configuration for a price feeder.
///
/// Can be loaded from a TOML file via [`FeederConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default
/// except the two addresses, which [`validate`](Self::validate) requires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeederConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Cosmos LCD (REST) endpoint for queries and broadcasts.
    #[serde(default = "default_lcd_endpoint")]
    pub lcd_endpoint: String,

    /// Tendermint RPC websocket for new-block events. Heights are polled
    /// from the LCD when unset.
    #[serde(default)]
    pub websocket_endpoint: Option<String>,

    #[serde(default = "default_oracle_module_path")]
    pub oracle_module_path: String,

    /// Signing service that turns oracle messages into tx bytes.
    #[serde(default = "default_signer_endpoint")]
    pub signer_endpoint: String,

    #[serde(default = "default_price_source_endpoint")]
    pub price_source_endpoint: String,

    /// Validator operator address the feeder votes for.
    #[serde(default)]
    pub validator: String,

    /// Account that signs the oracle transactions.
    #[serde(default)]
    pub feeder: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long fetched oracle params are trusted.
    #[serde(default = "default_params_ttl_secs")]
    pub params_ttl_secs: u64,

    /// Upper bound on one vote cycle.
    #[serde(default = "default_cycle_deadline_secs")]
    pub cycle_deadline_secs: u64,

    #[serde(default = "default_height_poll_interval_ms")]
    pub height_poll_interval_ms: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Serve Prometheus metrics on this port when set.
    #[serde(default)]
    pub metrics_port: Option<u16>,

    /// Kept last: TOML writes tables after plain values.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Backoff settings for gateway calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_chain_id() -> String {
    "nibiru-localnet-0".to_string()
}

fn default_lcd_endpoint() -> String {
    "http://localhost:1317".to_string()
}

fn default_oracle_module_path() -> String {
    DEFAULT_ORACLE_MODULE_PATH.to_string()
}

fn default_signer_endpoint() -> String {
    "http://localhost:9091".to_string()
}

fn default_price_source_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_params_ttl_secs() -> u64 {
    30
}

fn default_cycle_deadline_secs() -> u64 {
    30
}

fn default_height_poll_interval_ms() -> u64 {
    1_000
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    8_000
}

fn default_retry_max_attempts() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl FeederConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Configuration(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        toml::from_str(s).map_err(|e| EngineError::Configuration(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("FeederConfig is always serializable to TOML")
    }

    /// Check everything serde cannot: endpoint schemes, addresses, and
    /// non-zero timings.
    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |msg: String| Err(EngineError::Configuration(msg));

        if self.chain_id.trim().is_empty() {
            return bad("chain_id must not be empty".into());
        }
        for (name, url) in [
            ("lcd_endpoint", &self.lcd_endpoint),
            ("signer_endpoint", &self.signer_endpoint),
            ("price_source_endpoint", &self.price_source_endpoint),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return bad(format!("{name} must be an http(s) URL, got {url:?}"));
            }
        }
        if let Some(ws) = &self.websocket_endpoint {
            if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
                return bad(format!("websocket_endpoint must be a ws(s) URL, got {ws:?}"));
            }
        }
        self.identity()?;

        if self.request_timeout_ms == 0 {
            return bad("request_timeout_ms must be positive".into());
        }
        if self.cycle_deadline_secs == 0 {
            return bad("cycle_deadline_secs must be positive".into());
        }
        if self.height_poll_interval_ms == 0 {
            return bad("height_poll_interval_ms must be positive".into());
        }
        if self.retry.max_attempts == 0 {
            return bad("retry.max_attempts must be at least 1".into());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return bad("retry.base_delay_ms must not exceed retry.max_delay_ms".into());
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return bad(format!("unknown log_level {:?}", self.log_level));
        }
        Ok(())
    }

    pub fn identity(&self) -> Result<VoterIdentity, EngineError> {
        let validator = ValidatorAddress::new(self.validator.as_str())
            .map_err(|e| EngineError::Configuration(format!("validator: {e}")))?;
        let feeder = FeederAddress::new(self.feeder.as_str())
            .map_err(|e| EngineError::Configuration(format!("feeder: {e}")))?;
        Ok(VoterIdentity { validator, feeder })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            max_attempts: self.retry.max_attempts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn params_ttl(&self) -> Duration {
        Duration::from_secs(self.params_ttl_secs)
    }

    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }

    pub fn height_poll_interval(&self) -> Duration {
        Duration::from_millis(self.height_poll_interval_ms)
    }
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            lcd_endpoint: default_lcd_endpoint(),
            websocket_endpoint: None,
            oracle_module_path: default_oracle_module_path(),
            signer_endpoint: default_signer_endpoint(),
            price_source_endpoint: default_price_source_endpoint(),
            validator: String::new(),
            feeder: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            params_ttl_secs: default_params_ttl_secs(),
            cycle_deadline_secs: default_cycle_deadline_secs(),
            height_poll_interval_ms: default_height_poll_interval_ms(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            metrics_port: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
            max_attempts: default_retry_max_attempts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> FeederConfig {
        FeederConfig {
            validator: "nibivaloper1test".into(),
            feeder: "nibi1feeder".into(),
            ..FeederConfig::default()
        }
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = valid();
        let toml_str = config.to_toml_string();
        let parsed = FeederConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = FeederConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.lcd_endpoint, "http://localhost:1317");
        assert_eq!(config.oracle_module_path, "/nibiru/oracle/v1");
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.websocket_endpoint, None);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            validator = "nibivaloper1abc"
            feeder = "nibi1abc"
            websocket_endpoint = "ws://localhost:26657/websocket"
            log_format = "json"

            [retry]
            max_attempts = 7
        "#;
        let config = FeederConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.base_delay_ms, 500); // default
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.validate().is_ok());
        assert_eq!(config.retry_policy().max_attempts, 7);
    }

    #[test]
    fn missing_addresses_fail_validation() {
        let err = FeederConfig::default().validate().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn bad_values_fail_validation() {
        let cases: Vec<fn(&mut FeederConfig)> = vec![
            |c| c.lcd_endpoint = "localhost:1317".into(),
            |c| c.websocket_endpoint = Some("http://localhost:26657".into()),
            |c| c.cycle_deadline_secs = 0,
            |c| c.retry.max_attempts = 0,
            |c| c.retry.base_delay_ms = 10_000,
            |c| c.log_level = "loud".into(),
        ];
        for mutate in cases {
            let mut config = valid();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(FeederConfig::from_toml_str(r#"log_format = "xml""#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validator = \"nibivaloper1x\"\nfeeder = \"nibi1x\"\ncycle_deadline_secs = 12").unwrap();
        let config = FeederConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.cycle_deadline(), Duration::from_secs(12));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = FeederConfig::from_toml_file("/nonexistent/feeder.toml");
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }
}
