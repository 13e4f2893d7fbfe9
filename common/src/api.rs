//! Request and response bodies of the data store backend.
//!
//! All endpoints take and return JSON. Optional request fields are omitted
//! when absent rather than sent as `null`.

use serde::{Deserialize, Serialize};

use crate::coin::{Coin, CoinSpend};
use crate::datastore::{DataStoreDescriptor, DelegatedPuzzle};

// ─── Endpoints ───────────────────────────────────────────────────────────────

pub const INFO_PATH: &str = "/info";
pub const MINT_PATH: &str = "/mint";
pub const SYNC_PATH: &str = "/sync";
pub const UPDATE_METADATA_PATH: &str = "/update-metadata";
pub const UPDATE_OWNERSHIP_PATH: &str = "/update-ownership";
pub const ORACLE_PATH: &str = "/oracle";
pub const MELT_PATH: &str = "/melt";
pub const ADD_FEE_PATH: &str = "/add-fee";
/// Broadcast endpoint. The backend spells it this way.
pub const SIGN_AND_SEND_PATH: &str = "/sing-and-send";
pub const COIN_CONFIRMED_PATH: &str = "/coin-confirmed";

/// Header carrying the optional shared secret.
pub const SECRET_HEADER: &str = "X-Secret";

// ─── Mint ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MintRequest {
    pub root_hash: String,
    pub label: String,
    pub description: String,
    pub owner_address: String,
    pub fee: u64,
    pub oracle_fee: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MintResponse {
    pub new_info: DataStoreDescriptor,
    pub coin_spends: Vec<CoinSpend>,
}

// ─── Sync ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub info: DataStoreDescriptor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub info: DataStoreDescriptor,
}

// ─── Spends ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateMetadataRequest {
    pub info: DataStoreDescriptor,
    pub new_root_hash: String,
    pub new_label: String,
    pub new_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_public_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateOwnershipRequest {
    pub info: DataStoreDescriptor,
    pub new_owner_puzzle_hash: String,
    pub new_delegated_puzzle_keys_and_types: Vec<DelegatedPuzzle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_public_key: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub info: DataStoreDescriptor,
    pub fee: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeltRequest {
    pub info: DataStoreDescriptor,
    pub owner_public_key: String,
}

/// Unsigned spend built by the backend. `new_info` is the descriptor the
/// store will have once the spend confirms; burns have none.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpendResponse {
    pub coin_spends: Vec<CoinSpend>,
    #[serde(default)]
    pub new_info: Option<DataStoreDescriptor>,
}

// ─── Fees, broadcast, confirmation ───────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddFeeRequest {
    pub fee: u64,
    pub coins: Vec<Coin>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddFeeResponse {
    pub coin_spends: Vec<CoinSpend>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignAndSendRequest {
    pub coin_spends: Vec<CoinSpend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Broadcast result. `err` is set when the backend rejected the bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignAndSendResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl SignAndSendResponse {
    /// Rejection reason, treating an empty string as success.
    pub fn rejection(&self) -> Option<&str> {
        self.err.as_deref().filter(|e| !e.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoinConfirmedRequest {
    pub coin: Coin,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinConfirmedResponse {
    #[serde(default)]
    pub confirmed: bool,
}
