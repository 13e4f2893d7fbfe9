//! Wallet detection and connection.

use datalayer_common::address::{encode_address, strip_hex_prefix};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::wallet::WalletProvider;
use crate::{ClientError, Result};

/// The connected account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Hex puzzle hash as the wallet reported it.
    pub puzzle_hash: String,
    /// Bech32m encoding of the puzzle hash.
    pub address: String,
    /// First synthetic public key of the account, without `0x`.
    pub public_key: Option<String>,
}

impl Account {
    pub fn require_public_key(&self) -> Result<&str> {
        self.public_key.as_deref().ok_or(ClientError::MissingPublicKey)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No wallet in this environment. Permanent.
    NotInstalled,
    /// Wallet present but not connected; an explicit [`WalletConnector::connect`] is needed.
    Disconnected,
    Connected(Account),
}

/// Owns the injected wallet and the account derived from it.
pub struct WalletConnector<W> {
    wallet: Option<W>,
    network_prefix: String,
    state: ConnectionState,
    account_changes: Option<watch::Receiver<u64>>,
}

impl<W: WalletProvider> WalletConnector<W> {
    /// Record whether a wallet is present, without talking to it.
    pub fn detect(wallet: Option<W>, network_prefix: impl Into<String>) -> Self {
        let state = if wallet.is_some() {
            ConnectionState::Disconnected
        } else {
            ConnectionState::NotInstalled
        };
        let account_changes = wallet.as_ref().map(|w| {
            let mut rx = w.account_changes();
            rx.borrow_and_update();
            rx
        });
        Self {
            wallet,
            network_prefix: network_prefix.into(),
            state,
            account_changes,
        }
    }

    /// Detect the wallet and attempt a silent connection.
    ///
    /// A wallet that reports "not connected" or fails the eager attempt leaves
    /// the connector [`ConnectionState::Disconnected`].
    pub async fn init(wallet: Option<W>, network_prefix: impl Into<String>) -> Self {
        let mut connector = Self::detect(wallet, network_prefix);
        connector.reconnect().await;
        connector
    }

    /// Silent connection attempt, as made on startup.
    pub async fn reconnect(&mut self) {
        if let Err(e) = self.connect_with(true).await {
            warn!("Eager wallet connection failed: {e}");
        }
    }

    /// Explicit, user-triggered connection.
    pub async fn connect(&mut self) -> Result<Account> {
        self.connect_with(false).await?.ok_or(ClientError::NotConnected)
    }

    async fn connect_with(&mut self, eager: bool) -> Result<Option<Account>> {
        let Some(wallet) = self.wallet.as_ref() else {
            if !eager {
                return Err(ClientError::WalletNotInstalled);
            }
            info!("No wallet installed");
            return Ok(None);
        };

        if !wallet.connect(eager).await? {
            info!(eager, "{} reports not connected", wallet.wallet_name());
            return Ok(None);
        }

        let puzzle_hash = wallet.selected_puzzle_hash().await?;
        let address = encode_address(&puzzle_hash, &self.network_prefix)?;
        let public_key = wallet
            .public_keys(1, 0)
            .await?
            .into_iter()
            .next()
            .map(|pk| strip_hex_prefix(&pk).to_string());

        info!(%address, has_public_key = public_key.is_some(), "Wallet connected");
        let account = Account {
            puzzle_hash,
            address,
            public_key,
        };
        self.state = ConnectionState::Connected(account.clone());
        Ok(Some(account))
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_installed(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn wallet(&self) -> Option<&W> {
        self.wallet.as_ref()
    }

    pub fn account(&self) -> Option<&Account> {
        match &self.state {
            ConnectionState::Connected(account) => Some(account),
            _ => None,
        }
    }

    /// The connected account, or the reason there is none.
    pub fn require_account(&self) -> Result<&Account> {
        match &self.state {
            ConnectionState::Connected(account) => Ok(account),
            ConnectionState::Disconnected => Err(ClientError::NotConnected),
            ConnectionState::NotInstalled => Err(ClientError::WalletNotInstalled),
        }
    }

    /// The connected wallet together with its account.
    pub fn require_connected(&self) -> Result<(&W, &Account)> {
        let account = self.require_account()?;
        let wallet = self.wallet.as_ref().ok_or(ClientError::WalletNotInstalled)?;
        Ok((wallet, account))
    }

    /// Whether the wallet switched accounts since the last call. Consumes the notification.
    pub fn take_account_change(&mut self) -> bool {
        match self.account_changes.as_mut() {
            Some(rx) => match rx.has_changed() {
                Ok(true) => {
                    rx.borrow_and_update();
                    true
                }
                _ => false,
            },
            None => false,
        }
    }

    /// Forget the current account. The wallet itself stays detected.
    pub fn reset(&mut self) {
        if self.wallet.is_some() {
            self.state = ConnectionState::Disconnected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWallet;

    #[tokio::test]
    async fn missing_wallet_is_permanent() {
        let mut connector = WalletConnector::<MockWallet>::init(None, "txch").await;
        assert_eq!(connector.state(), &ConnectionState::NotInstalled);
        assert!(matches!(
            connector.connect().await,
            Err(ClientError::WalletNotInstalled)
        ));
        assert!(matches!(
            connector.require_account(),
            Err(ClientError::WalletNotInstalled)
        ));
    }

    #[tokio::test]
    async fn eager_connect_derives_account() {
        let wallet = MockWallet::approved();
        let connector = WalletConnector::init(Some(wallet.clone()), "txch").await;
        let account = connector.account().unwrap();
        assert!(account.address.starts_with("txch1"));
        assert_eq!(account.public_key.as_deref(), Some(MockWallet::PUBLIC_KEY));
        assert_eq!(wallet.connect_calls(), vec![true]);
    }

    #[tokio::test]
    async fn unapproved_wallet_needs_explicit_connect() {
        let wallet = MockWallet::unapproved();
        let mut connector = WalletConnector::init(Some(wallet.clone()), "txch").await;
        assert_eq!(connector.state(), &ConnectionState::Disconnected);

        let account = connector.connect().await.unwrap();
        assert_eq!(connector.account(), Some(&account));
        assert_eq!(wallet.connect_calls(), vec![true, false]);
    }

    #[tokio::test]
    async fn same_puzzle_hash_gives_same_address() {
        let a = WalletConnector::init(Some(MockWallet::approved()), "txch").await;
        let b = WalletConnector::init(Some(MockWallet::approved()), "txch").await;
        assert_eq!(a.account().unwrap().address, b.account().unwrap().address);
    }

    #[tokio::test]
    async fn account_change_is_reported_once() {
        let wallet = MockWallet::approved();
        let mut connector = WalletConnector::init(Some(wallet.clone()), "txch").await;
        assert!(!connector.take_account_change());

        wallet.switch_account("cd".repeat(32));
        assert!(connector.take_account_change());
        assert!(!connector.take_account_change());
    }
}
