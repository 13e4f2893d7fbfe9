//! Test doubles: a scripted in-memory backend and a mock wallet.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use datalayer_common::api::*;
use datalayer_common::coin::{Coin, CoinSpend};
use datalayer_common::datastore::DataStoreDescriptor;
use datalayer_common::server_info::ServerInfo;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::backend::DataLayerApi;
use crate::wallet::{WalletError, WalletProvider};
use crate::{ClientError, Result};

pub fn coin(parent: &str) -> Coin {
    Coin {
        parent_coin_info: parent.to_string(),
        puzzle_hash: "ab".repeat(32),
        amount: 1,
    }
}

pub fn coin_spend(parent: &str) -> CoinSpend {
    CoinSpend {
        coin: coin(parent),
        puzzle_reveal: "ff02".to_string(),
        solution: "ff80".to_string(),
    }
}

/// A descriptor whose metadata label is `label`.
pub fn descriptor(label: &str) -> DataStoreDescriptor {
    let value = json!({
        "launcher_id": "11".repeat(32),
        "owner_puzzle_hash": MockWallet::PUZZLE_HASH,
        "metadata": {
            "root_hash": "00".repeat(32),
            "label": label,
            "description": format!("{label} description"),
        },
        "delegated_puzzles": [],
    });
    DataStoreDescriptor::try_from(value).unwrap_or_else(|e| panic!("{e}"))
}

// ─── Scripted backend ────────────────────────────────────────────────────────

struct ApiState {
    log: Vec<&'static str>,
    requests: Vec<(&'static str, Value)>,
    confirmations: VecDeque<bool>,
    broadcast_error: Option<String>,
    info_unavailable: bool,
    omit_new_info: bool,
    server_key: Option<String>,
    mint_info: DataStoreDescriptor,
    spend_info: DataStoreDescriptor,
    sync_info: DataStoreDescriptor,
}

/// In-memory [`DataLayerApi`] returning canned responses and recording every call.
///
/// Confirmation answers are taken from a script; once the script runs out the
/// coin is reported unconfirmed.
#[derive(Clone)]
pub struct ScriptedApi {
    state: Arc<Mutex<ApiState>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ApiState {
                log: Vec::new(),
                requests: Vec::new(),
                confirmations: VecDeque::new(),
                broadcast_error: None,
                info_unavailable: false,
                omit_new_info: false,
                server_key: Some("5e4e4".to_string()),
                mint_info: descriptor("minted"),
                spend_info: descriptor("updated"),
                sync_info: descriptor("synced"),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ApiState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_confirmations(self, script: impl IntoIterator<Item = bool>) -> Self {
        self.push_confirmations(script);
        self
    }

    pub fn push_confirmations(&self, script: impl IntoIterator<Item = bool>) {
        self.state().confirmations.extend(script);
    }

    pub fn with_server_key(self, key: &str) -> Self {
        self.set_server_key(key);
        self
    }

    pub fn set_server_key(&self, key: &str) {
        self.state().server_key = Some(key.to_string());
    }

    pub fn without_server_key(self) -> Self {
        self.state().server_key = None;
        self
    }

    pub fn set_broadcast_error(&self, err: Option<&str>) {
        self.state().broadcast_error = err.map(str::to_string);
    }

    pub fn set_info_unavailable(&self, unavailable: bool) {
        self.state().info_unavailable = unavailable;
    }

    /// Answer spends without `new_info`.
    pub fn set_omit_new_info(&self, omit: bool) {
        self.state().omit_new_info = omit;
    }

    pub fn mint_info(&self) -> DataStoreDescriptor {
        self.state().mint_info.clone()
    }

    pub fn spend_info(&self) -> DataStoreDescriptor {
        self.state().spend_info.clone()
    }

    pub fn sync_info(&self) -> DataStoreDescriptor {
        self.state().sync_info.clone()
    }

    /// Number of calls made to `endpoint` (path without the leading slash).
    pub fn calls(&self, endpoint: &str) -> usize {
        self.state().log.iter().filter(|e| **e == endpoint).count()
    }

    /// Every endpoint called, in order.
    pub fn call_log(&self) -> Vec<&'static str> {
        self.state().log.clone()
    }

    /// Body of the most recent request to `endpoint`.
    pub fn last_request(&self, endpoint: &str) -> Option<Value> {
        self.state()
            .requests
            .iter()
            .rev()
            .find(|(e, _)| *e == endpoint)
            .map(|(_, body)| body.clone())
    }

    fn record(&self, endpoint: &'static str, body: &impl Serialize) {
        let body = serde_json::to_value(body).unwrap_or(Value::Null);
        let mut state = self.state();
        state.log.push(endpoint);
        state.requests.push((endpoint, body));
    }

    fn spend_response(&self, with_info: bool) -> SpendResponse {
        let with_info = with_info && !self.state().omit_new_info;
        SpendResponse {
            coin_spends: vec![coin_spend("b1"), coin_spend("b2")],
            new_info: with_info.then(|| self.spend_info()),
        }
    }
}

impl DataLayerApi for ScriptedApi {
    async fn info(&self) -> Result<ServerInfo> {
        self.record("info", &Value::Null);
        let state = self.state();
        if state.info_unavailable {
            return Err(ClientError::Status {
                endpoint: INFO_PATH.to_string(),
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(ServerInfo {
            pk: state.server_key.clone(),
            extra: Default::default(),
        })
    }

    async fn mint(&self, req: &MintRequest) -> Result<MintResponse> {
        self.record("mint", req);
        Ok(MintResponse {
            new_info: self.mint_info(),
            coin_spends: vec![coin_spend("a1"), coin_spend("a2")],
        })
    }

    async fn sync(&self, req: &SyncRequest) -> Result<SyncResponse> {
        self.record("sync", req);
        Ok(SyncResponse {
            info: self.sync_info(),
        })
    }

    async fn update_metadata(&self, req: &UpdateMetadataRequest) -> Result<SpendResponse> {
        self.record("update-metadata", req);
        Ok(self.spend_response(true))
    }

    async fn update_ownership(&self, req: &UpdateOwnershipRequest) -> Result<SpendResponse> {
        self.record("update-ownership", req);
        Ok(self.spend_response(true))
    }

    async fn oracle(&self, req: &OracleRequest) -> Result<SpendResponse> {
        self.record("oracle", req);
        Ok(self.spend_response(true))
    }

    async fn melt(&self, req: &MeltRequest) -> Result<SpendResponse> {
        self.record("melt", req);
        Ok(self.spend_response(false))
    }

    async fn add_fee(&self, req: &AddFeeRequest) -> Result<AddFeeResponse> {
        self.record("add-fee", req);
        Ok(AddFeeResponse {
            coin_spends: vec![coin_spend("fee")],
        })
    }

    async fn sign_and_send(&self, req: &SignAndSendRequest) -> Result<SignAndSendResponse> {
        self.record("sing-and-send", req);
        Ok(SignAndSendResponse {
            err: self.state().broadcast_error.clone(),
        })
    }

    async fn coin_confirmed(&self, req: &CoinConfirmedRequest) -> Result<CoinConfirmedResponse> {
        self.record("coin-confirmed", req);
        let confirmed = self.state().confirmations.pop_front().unwrap_or(false);
        Ok(CoinConfirmedResponse { confirmed })
    }
}

// ─── Mock wallet ─────────────────────────────────────────────────────────────

struct WalletState {
    approved: bool,
    reject_signing: bool,
    puzzle_hash: String,
    connect_calls: Vec<bool>,
    signed: Vec<Vec<CoinSpend>>,
}

/// [`WalletProvider`] with a fixed key that records connect and sign requests.
#[derive(Clone)]
pub struct MockWallet {
    state: Arc<Mutex<WalletState>>,
    account_tx: Arc<watch::Sender<u64>>,
}

impl MockWallet {
    pub const PUZZLE_HASH: &'static str =
        "0b7a3d5e723e0b046fd51f95cabf2d3e2616f05d9d1833e8166052b43d9454ad";
    pub const PUBLIC_KEY: &'static str = "8a1b2c3d4e5f60718293a4b5c6d7e8f9";
    pub const SIGNATURE: &'static str = "c0ffee";

    fn with_approval(approved: bool) -> Self {
        let (account_tx, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(WalletState {
                approved,
                reject_signing: false,
                puzzle_hash: Self::PUZZLE_HASH.to_string(),
                connect_calls: Vec::new(),
                signed: Vec::new(),
            })),
            account_tx: Arc::new(account_tx),
        }
    }

    /// A wallet that already approved this client: eager connects succeed.
    pub fn approved() -> Self {
        Self::with_approval(true)
    }

    /// A wallet that needs an explicit connect, which the user then accepts.
    pub fn unapproved() -> Self {
        Self::with_approval(false)
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn reject_signing(&self) {
        self.state().reject_signing = true;
    }

    /// Select another account and notify subscribers.
    pub fn switch_account(&self, puzzle_hash: impl Into<String>) {
        self.state().puzzle_hash = puzzle_hash.into();
        self.account_tx.send_modify(|generation| *generation += 1);
    }

    /// The `eager` flag of every connect request.
    pub fn connect_calls(&self) -> Vec<bool> {
        self.state().connect_calls.clone()
    }

    /// Coin spends of every signing request.
    pub fn sign_requests(&self) -> Vec<Vec<CoinSpend>> {
        self.state().signed.clone()
    }
}

impl WalletProvider for MockWallet {
    async fn connect(&self, eager: bool) -> Result<bool, WalletError> {
        let mut state = self.state();
        state.connect_calls.push(eager);
        if !eager {
            state.approved = true;
        }
        Ok(state.approved)
    }

    async fn selected_puzzle_hash(&self) -> Result<String, WalletError> {
        Ok(self.state().puzzle_hash.clone())
    }

    async fn public_keys(&self, limit: u32, offset: u32) -> Result<Vec<String>, WalletError> {
        Ok(std::iter::once(format!("0x{}", Self::PUBLIC_KEY))
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn sign_coin_spends(&self, coin_spends: &[CoinSpend]) -> Result<String, WalletError> {
        let mut state = self.state();
        state.signed.push(coin_spends.to_vec());
        if state.reject_signing {
            return Err(WalletError::Rejected);
        }
        Ok(Self::SIGNATURE.to_string())
    }

    fn account_changes(&self) -> watch::Receiver<u64> {
        self.account_tx.subscribe()
    }

    fn wallet_name(&self) -> &str {
        "mock"
    }
}
