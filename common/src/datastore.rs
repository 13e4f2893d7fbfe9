//! The data store descriptor and its delegated authority layers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root hash of a freshly minted store: 32 zero bytes.
pub fn empty_root_hash() -> String {
    "00".repeat(32)
}

/// The backend's description of the current on-chain state of a data store.
///
/// The client never interprets most of this structure: it is kept verbatim,
/// re-sent as the `info` field of spend requests and persisted as-is. Only a
/// few fields have typed accessors. Must be a JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct DataStoreDescriptor(Value);

impl TryFrom<Value> for DataStoreDescriptor {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(format!("data store descriptor must be a JSON object, got {value}"))
        }
    }
}

impl From<DataStoreDescriptor> for Value {
    fn from(descriptor: DataStoreDescriptor) -> Self {
        descriptor.0
    }
}

impl DataStoreDescriptor {
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Current metadata, if the descriptor carries a well-formed `metadata` object.
    pub fn metadata(&self) -> Option<DataStoreMetadata> {
        self.0
            .get("metadata")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
    }

    /// Puzzle hash of the current owner.
    pub fn owner_puzzle_hash(&self) -> Option<&str> {
        self.0.get("owner_puzzle_hash").and_then(Value::as_str)
    }

    /// Launcher id, when the backend reports one. Used only for display.
    pub fn launcher_id(&self) -> Option<&str> {
        self.0.get("launcher_id").and_then(Value::as_str)
    }
}

/// Store metadata: the committed root hash plus human-readable label and description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreMetadata {
    pub root_hash: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// One delegated authority layer of a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DelegatedPuzzle {
    /// May update metadata and ownership.
    Admin { key: String },
    /// May update metadata only.
    Writer { key: String },
    /// Anyone may spend by paying `fee` to `puzzle_hash`.
    Oracle { puzzle_hash: String, fee: u64 },
}

/// Layer kind, used to select layers without carrying their parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Admin,
    Writer,
    Oracle,
}

impl DelegatedPuzzle {
    pub fn kind(&self) -> LayerKind {
        match self {
            DelegatedPuzzle::Admin { .. } => LayerKind::Admin,
            DelegatedPuzzle::Writer { .. } => LayerKind::Writer,
            DelegatedPuzzle::Oracle { .. } => LayerKind::Oracle,
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Admin => write!(f, "admin"),
            LayerKind::Writer => write!(f, "writer"),
            LayerKind::Oracle => write!(f, "oracle"),
        }
    }
}

impl std::str::FromStr for LayerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(LayerKind::Admin),
            "writer" => Ok(LayerKind::Writer),
            "oracle" => Ok(LayerKind::Oracle),
            other => Err(format!("unknown layer kind '{other}'")),
        }
    }
}
