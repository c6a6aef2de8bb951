//! Relay controller settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FRAME_ID_PREFIX: &str = "clientFrame_";

/// Settings for a `RelayController`. Missing keys take their defaults, so
/// `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Fire the completion callback only when the body arrives. When false,
    /// every `receive` fires it, including partial replies.
    pub deliver_only_on_completion: bool,

    /// Per-session deadline in milliseconds, enforced by `reap`.
    pub timeout_ms: Option<u64>,

    pub frame_id_prefix: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            deliver_only_on_completion: false,
            timeout_ms: None,
            frame_id_prefix: DEFAULT_FRAME_ID_PREFIX.to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let config = RelayConfig::from_json("{}").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.frame_id_prefix, "clientFrame_");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn partial_json_overrides() {
        let config =
            RelayConfig::from_json(r#"{"deliver_only_on_completion":true,"timeout_ms":1500}"#)
                .unwrap();
        assert!(config.deliver_only_on_completion);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.frame_id_prefix, DEFAULT_FRAME_ID_PREFIX);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(RelayConfig::from_json(r#"{"timeout_ms":"soon"}"#).is_err());
    }
}
