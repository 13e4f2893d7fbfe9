use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata the backend reports about itself on `GET /info`.
///
/// Only `pk` is interpreted: it is the backend's public key, sent as the
/// admin or writer key in spend requests. Everything else is kept for display.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServerInfo {
    /// The backend public key without any `0x` prefix.
    pub fn public_key(&self) -> Option<&str> {
        self.pk
            .as_deref()
            .map(crate::address::strip_hex_prefix)
            .filter(|pk| !pk.is_empty())
    }
}
