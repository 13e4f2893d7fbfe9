//! [`WalletProvider`] backed by a local wallet bridge speaking JSON over HTTP.
//!
//! The bridge exposes the injected wallet's request interface:
//! `GET /health` answers when a wallet is available and
//! `POST /request { method, params }` answers `{ result }` or `{ error }`.

use std::sync::Mutex;
use std::time::Duration;

use datalayer_client::wallet::{WalletError, WalletProvider};
use datalayer_common::coin::CoinSpend;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct BridgeRequest<'a> {
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct BridgeResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

pub struct BridgeWallet {
    client: reqwest::Client,
    url: String,
    last_puzzle_hash: Mutex<Option<String>>,
    account_tx: watch::Sender<u64>,
}

impl BridgeWallet {
    /// Probe `{url}/health`. An unreachable bridge means no wallet is installed.
    pub async fn detect(url: &str) -> Option<Self> {
        let url = url.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();
        match client
            .get(format!("{url}/health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                info!(%url, "Wallet bridge detected");
                let (account_tx, _) = watch::channel(0);
                Some(Self {
                    client,
                    url,
                    last_puzzle_hash: Mutex::new(None),
                    account_tx,
                })
            }
            Ok(resp) => {
                info!(%url, status = %resp.status(), "Wallet bridge not ready");
                None
            }
            Err(e) => {
                debug!(%url, "Wallet bridge unreachable: {e}");
                None
            }
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, WalletError> {
        let resp = self
            .client
            .post(format!("{}/request", self.url))
            .json(&BridgeRequest { method, params })
            .send()
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;
        let body: BridgeResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::Unavailable(e.to_string()))?;

        if let Some(message) = body.error {
            if message.to_lowercase().contains("reject") {
                return Err(WalletError::Rejected);
            }
            return Err(WalletError::Request {
                method: method.to_string(),
                message,
            });
        }
        serde_json::from_value(body.result.unwrap_or(Value::Null)).map_err(|e| {
            WalletError::Request {
                method: method.to_string(),
                message: format!("unexpected result: {e}"),
            }
        })
    }

    /// Bump the account generation when the selected account differs from the
    /// last one seen.
    fn observe_account(&self, puzzle_hash: &str) {
        let Ok(mut last) = self.last_puzzle_hash.lock() else {
            return;
        };
        let changed = last.as_deref().is_some_and(|prev| prev != puzzle_hash);
        *last = Some(puzzle_hash.to_string());
        if changed {
            info!(puzzle_hash, "Wallet account changed");
            self.account_tx.send_modify(|generation| *generation += 1);
        }
    }
}

impl WalletProvider for BridgeWallet {
    async fn connect(&self, eager: bool) -> Result<bool, WalletError> {
        self.request("connect", json!({ "eager": eager })).await
    }

    async fn selected_puzzle_hash(&self) -> Result<String, WalletError> {
        let puzzle_hash: String = self.request("selectedAddress", json!({})).await?;
        self.observe_account(&puzzle_hash);
        Ok(puzzle_hash)
    }

    async fn public_keys(&self, limit: u32, offset: u32) -> Result<Vec<String>, WalletError> {
        self.request("getPublicKeys", json!({ "limit": limit, "offset": offset }))
            .await
    }

    async fn sign_coin_spends(&self, coin_spends: &[CoinSpend]) -> Result<String, WalletError> {
        self.request("signCoinSpends", json!({ "coinSpends": coin_spends }))
            .await
    }

    fn account_changes(&self) -> watch::Receiver<u64> {
        self.account_tx.subscribe()
    }

    fn wallet_name(&self) -> &str {
        "wallet bridge"
    }
}
