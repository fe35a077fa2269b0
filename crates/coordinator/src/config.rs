//! Coordinator configuration, persisted through `concord-settings`.

use std::path::PathBuf;

use concord_core::Address;
use serde::{Deserialize, Serialize};

/// Seconds a request stays inside its response window.
pub const DEFAULT_REQUEST_EXPIRY_SECS: u64 = 5 * 60;

/// Depth of the command queue in front of the coordinator task.
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

/// Events kept before the oldest undrained ones are dropped.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// The only identity allowed to deliver funded requests (the payment
    /// token). Callbacks into it are refused.
    #[serde(with = "hex_address")]
    pub funding_source: Address,
    pub request_expiry_secs: u64,
    pub queue_depth: usize,
    /// Bound on undrained events; zero disables the log.
    pub event_log_capacity: usize,
    /// Where the store snapshot is kept between runs, if anywhere.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            funding_source: [0u8; 20],
            request_expiry_secs: DEFAULT_REQUEST_EXPIRY_SECS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            snapshot_path: None,
        }
    }
}

mod hex_address {
    use concord_core::Address;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(address: &Address, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(address)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        let raw = String::deserialize(d)?;
        let bytes = hex::decode(raw.trim_start_matches("0x")).map_err(D::Error::custom)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| D::Error::custom(format!("expected 20 bytes, got {}", bytes.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.request_expiry_secs, 300);
        assert_eq!(cfg.queue_depth, 1024);
        assert_eq!(cfg.event_log_capacity, DEFAULT_EVENT_LOG_CAPACITY);
        assert!(cfg.snapshot_path.is_none());
    }

    #[test]
    fn test_funding_source_as_hex() {
        let cfg = CoordinatorConfig {
            funding_source: [0xab; 20],
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"0xabababababababababababababababababababab\""));
        let parsed: CoordinatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let parsed: CoordinatorConfig =
            serde_json::from_str(r#"{"request_expiry_secs": 60}"#).unwrap();
        assert_eq!(parsed.request_expiry_secs, 60);
        assert_eq!(parsed.queue_depth, DEFAULT_QUEUE_DEPTH);
    }

    #[test]
    fn test_short_address_rejected() {
        let res: Result<CoordinatorConfig, _> =
            serde_json::from_str(r#"{"funding_source": "0xabcd"}"#);
        assert!(res.is_err());
    }
}
