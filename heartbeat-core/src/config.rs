//! Module configuration, parsed once from the `init_` payload.
//!
//! Payload is a JSON object. Recognised keys: `plugin-name` (binding addressed by host calls)
//! and `limit` (string-encoded unsigned integer; Pongs the pinger accepts before going silent).
//! Unknown keys are ignored. An empty payload means all defaults.

use serde_json::Value;
use tracing::{debug, warn};

pub const KEY_PLUGIN_NAME: &str = "plugin-name";
pub const KEY_LIMIT: &str = "limit";

/// Limit used when `limit` is absent or unparsable.
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// Binding name from `plugin-name`. None: the module falls back to its role name.
    pub plugin_name: Option<String>,
    pub limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_name: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Config {
    /// Parse the init payload. Structural problems are errors; a bad `limit` is not.
    pub fn parse(payload: &[u8]) -> Result<Self, ConfigError> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            debug!("empty configuration, using defaults");
            return Ok(Self::default());
        }
        let value: Value = serde_json::from_slice(payload)?;
        let Value::Object(fields) = value else {
            return Err(ConfigError::NotAnObject);
        };
        let plugin_name = match fields.get(KEY_PLUGIN_NAME) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => {
                warn!("empty plugin-name, using the role name as binding");
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ConfigError::InvalidPluginName),
        };
        Ok(Self {
            plugin_name,
            limit: parse_limit(fields.get(KEY_LIMIT)),
        })
    }
}

fn parse_limit(raw: Option<&Value>) -> u64 {
    match raw {
        None | Some(Value::Null) => {
            debug!(limit = DEFAULT_LIMIT, "no limit configured, using default");
            DEFAULT_LIMIT
        }
        Some(Value::String(s)) => match s.trim().parse::<u64>() {
            Ok(limit) => limit,
            Err(e) => {
                warn!(value = %s, error = %e, default = DEFAULT_LIMIT, "unparsable limit, using default");
                DEFAULT_LIMIT
            }
        },
        Some(Value::Number(n)) => match n.as_u64() {
            Some(limit) => limit,
            None => {
                warn!(value = %n, default = DEFAULT_LIMIT, "limit is not an unsigned integer, using default");
                DEFAULT_LIMIT
            }
        },
        Some(other) => {
            warn!(value = %other, default = DEFAULT_LIMIT, "unsupported limit type, using default");
            DEFAULT_LIMIT
        }
    }
}

/// Error parsing the init payload. Fatal to module load.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("configuration must be a JSON object")]
    NotAnObject,
    #[error("plugin-name must be a string")]
    InvalidPluginName,
}
