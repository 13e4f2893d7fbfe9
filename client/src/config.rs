use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::poll::PollPolicy;

/// Default fee in mojos attached to mints, oracle spends and fee coins.
pub const DEFAULT_FEE: u64 = 500_000_000;
/// Default fee paid to the oracle layer of a newly minted store.
pub const DEFAULT_ORACLE_FEE: u64 = 1338;
/// Default delay between mint confirmation and persisting the new descriptor.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

pub const DEFAULT_LABEL: &str = "An ordinary store with extraordinary delegation capabilities";
pub const DEFAULT_DESCRIPTION: &str = "A freshly-minted datastore";

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing slash.
    pub api_base: String,
    /// Shared secret sent as `X-Secret` on every request.
    pub secret: Option<String>,
    /// Human-readable part of encoded addresses.
    pub network_prefix: String,
    pub fee: u64,
    pub oracle_fee: u64,
    pub settle_delay: Duration,
    pub poll: PollPolicy,
    /// Label and description given to freshly minted stores.
    pub initial_label: String,
    pub initial_description: String,
    /// Directory holding the persisted descriptor. `None` uses [`default_state_dir`].
    pub state_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3030".to_string(),
            secret: None,
            network_prefix: "txch".to_string(),
            fee: DEFAULT_FEE,
            oracle_fee: DEFAULT_ORACLE_FEE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            poll: PollPolicy::default(),
            initial_label: DEFAULT_LABEL.to_string(),
            initial_description: DEFAULT_DESCRIPTION.to_string(),
            state_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Resolved state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }
}

/// `<data dir>/datalayer`, falling back to `/tmp/datalayer`.
pub fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("datalayer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ClientConfig::new("http://backend:8080/");
        assert_eq!(config.api_base, "http://backend:8080");
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_base": "http://x", "network_prefix": "xch"}"#).unwrap();
        assert_eq!(config.network_prefix, "xch");
        assert_eq!(config.fee, DEFAULT_FEE);
        assert_eq!(config.poll, PollPolicy::default());
        assert!(config.secret.is_none());
    }

    #[test]
    fn explicit_state_dir_wins() {
        let mut config = ClientConfig::default();
        config.state_dir = Some(PathBuf::from("/var/lib/dl"));
        assert_eq!(config.state_dir(), PathBuf::from("/var/lib/dl"));
    }
}
