use datalayer_common::coin::CoinSpend;
use tokio::sync::watch;

/// Errors reported by a wallet.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("user rejected the request")]
    Rejected,
    #[error("wallet unavailable: {0}")]
    Unavailable(String),
    #[error("wallet request {method} failed: {message}")]
    Request { method: String, message: String },
}

/// Capability exposed by a wallet (a browser extension, a local bridge, a test double).
///
/// Only the handful of calls the data store flow needs:
/// - `connect` → session handshake (eager = silent, never prompts)
/// - `selected_puzzle_hash` → the account to derive the address from
/// - `public_keys` → synthetic public keys of the account
/// - `sign_coin_spends` → aggregated signature for owner spends
#[allow(async_fn_in_trait)]
pub trait WalletProvider {
    /// Open a session. Returns `false` when the wallet is not connected
    /// (for an eager attempt: the user has not approved this client yet).
    async fn connect(&self, eager: bool) -> Result<bool, WalletError>;

    /// Hex puzzle hash of the selected account.
    async fn selected_puzzle_hash(&self) -> Result<String, WalletError>;

    /// Public keys of the selected account, paginated.
    async fn public_keys(&self, limit: u32, offset: u32) -> Result<Vec<String>, WalletError>;

    /// Sign the given coin spends, returning the aggregated signature.
    async fn sign_coin_spends(&self, coin_spends: &[CoinSpend]) -> Result<String, WalletError>;

    /// Account-change notifications. The value is a generation counter that
    /// the wallet bumps every time the selected account changes.
    fn account_changes(&self) -> watch::Receiver<u64>;

    /// Human-readable wallet name.
    fn wallet_name(&self) -> &str;
}
