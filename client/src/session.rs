//! Top-level client state: one wallet connection plus one tracked store.

use datalayer_common::datastore::DataStoreDescriptor;
use datalayer_common::server_info::ServerInfo;
use tracing::{info, warn};

use crate::backend::DataLayerApi;
use crate::config::ClientConfig;
use crate::connector::{Account, WalletConnector};
use crate::draft::SpendDraft;
use crate::lifecycle::{DataStoreLifecycle, OperationOutcome};
use crate::persistence::DescriptorStore;
use crate::wallet::WalletProvider;
use crate::Result;

/// Owns the wallet connector and the data store lifecycle.
///
/// A wallet account switch invalidates everything derived from the old
/// account, so [`Session::handle_account_change`] rebuilds the state from
/// persistence and reconnects.
pub struct Session<A, W, S> {
    connector: WalletConnector<W>,
    lifecycle: DataStoreLifecycle<A, S>,
}

impl<A: DataLayerApi, W: WalletProvider, S: DescriptorStore> Session<A, W, S> {
    /// Detect the wallet, connect eagerly, load the persisted descriptor and
    /// fetch server info.
    ///
    /// An unreachable `/info` is logged; the session still starts.
    pub async fn start(api: A, wallet: Option<W>, store: S, config: ClientConfig) -> Self {
        let connector = WalletConnector::init(wallet, config.network_prefix.clone()).await;
        let lifecycle = DataStoreLifecycle::new(api, store, config);
        let mut session = Self {
            connector,
            lifecycle,
        };
        session.refresh_or_warn().await;
        session
    }

    async fn refresh_or_warn(&mut self) {
        if let Err(e) = self.lifecycle.refresh_server_info().await {
            warn!("Server info unavailable: {e}");
        }
    }

    pub fn connector(&self) -> &WalletConnector<W> {
        &self.connector
    }

    pub fn lifecycle(&self) -> &DataStoreLifecycle<A, S> {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut DataStoreLifecycle<A, S> {
        &mut self.lifecycle
    }

    pub fn account(&self) -> Option<&Account> {
        self.connector.account()
    }

    pub fn descriptor(&self) -> Option<&DataStoreDescriptor> {
        self.lifecycle.descriptor()
    }

    pub fn draft_mut(&mut self) -> &mut SpendDraft {
        self.lifecycle.draft_mut()
    }

    /// User-triggered wallet connection.
    pub async fn connect(&mut self) -> Result<Account> {
        self.connector.connect().await
    }

    pub async fn refresh_server_info(&mut self) -> Result<ServerInfo> {
        self.lifecycle.refresh_server_info().await
    }

    pub async fn mint(&mut self) -> Result<OperationOutcome> {
        self.handle_account_change().await;
        self.lifecycle.mint(&self.connector).await
    }

    pub async fn spend(&mut self) -> Result<OperationOutcome> {
        self.handle_account_change().await;
        self.lifecycle.spend(&self.connector).await
    }

    pub async fn sync(&mut self) -> Result<DataStoreDescriptor> {
        self.lifecycle.sync().await
    }

    /// If the wallet switched accounts, discard all client state and
    /// reinitialize it. Returns whether a reload happened.
    pub async fn handle_account_change(&mut self) -> bool {
        if !self.connector.take_account_change() {
            return false;
        }
        info!("Wallet account changed, reloading");
        self.lifecycle.reload();
        self.connector.reset();
        self.connector.reconnect().await;
        self.refresh_or_warn().await;
        true
    }
}
