//! Mint / spend / sync lifecycle of the tracked data store.
//!
//! Every operation follows the same shape: the backend builds an unsigned
//! transaction, owner spends are signed by the wallet, a fee coin is appended
//! where needed, the backend broadcasts it, and the client polls until the
//! terminal coin is confirmed before persisting the new descriptor. Progress is
//! tracked by [`MintPhase`] and [`SpendPhase`]; only legal transitions are
//! accepted.

use std::fmt;

use datalayer_common::api::*;
use datalayer_common::coin::{Coin, PendingTransaction};
use datalayer_common::datastore::{empty_root_hash, DataStoreDescriptor};
use datalayer_common::role::{SpendAction, SpendRole};
use datalayer_common::server_info::ServerInfo;
use tracing::{info, warn};

use crate::backend::DataLayerApi;
use crate::config::ClientConfig;
use crate::connector::WalletConnector;
use crate::draft::SpendDraft;
use crate::persistence::DescriptorStore;
use crate::poll::{CancelToken, ConfirmationPoller};
use crate::server_info::ServerInfoCache;
use crate::wallet::WalletProvider;
use crate::{ClientError, Result};

// ─── Phases ──────────────────────────────────────────────────────────────────

/// Progress of minting a new store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MintPhase {
    /// Nothing minted; a mint may start.
    NoStore,
    /// Backend is building the mint transaction.
    Minting,
    Broadcasting,
    Confirming,
    /// Confirmed on chain, waiting for the settle delay.
    Confirmed,
    /// Descriptor persisted; a store is tracked.
    Persisted,
    Failed(String),
}

impl MintPhase {
    /// Returns true if moving from self to `next` is valid.
    pub fn can_transition_to(&self, next: &MintPhase) -> bool {
        use MintPhase::*;
        matches!(
            (self, next),
            (NoStore, Minting)
                | (Minting, Broadcasting)
                | (Broadcasting, Confirming)
                | (Confirming, Confirmed)
                | (Confirmed, Persisted)
                | (Persisted, NoStore)
                | (Failed(_), NoStore)
        ) || (self.is_in_flight() && matches!(next, Failed(_)))
    }

    /// An operation is running and has not reached a terminal phase.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            MintPhase::Minting
                | MintPhase::Broadcasting
                | MintPhase::Confirming
                | MintPhase::Confirmed
        )
    }
}

impl fmt::Display for MintPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintPhase::NoStore => write!(f, "press button to mint"),
            MintPhase::Minting => write!(f, "building mint tx..."),
            MintPhase::Broadcasting => write!(f, "broadcasting mint tx..."),
            MintPhase::Confirming => write!(f, "waiting for mint tx to be confirmed..."),
            MintPhase::Confirmed => write!(f, "tx confirmed!"),
            MintPhase::Persisted => write!(f, "data store minted"),
            MintPhase::Failed(reason) => write!(f, "error sending mint tx: {reason}"),
        }
    }
}

/// Progress of a spend against the tracked store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpendPhase {
    Idle,
    Building,
    AwaitingSignature,
    AddingFee,
    Broadcasting,
    Confirming,
    Persisted,
    Failed(String),
}

impl SpendPhase {
    /// Returns true if moving from self to `next` is valid.
    pub fn can_transition_to(&self, next: &SpendPhase) -> bool {
        use SpendPhase::*;
        matches!(
            (self, next),
            (Idle, Building)
                | (Building, AwaitingSignature)
                | (Building, AddingFee)
                | (Building, Broadcasting)
                | (AwaitingSignature, AddingFee)
                | (AwaitingSignature, Broadcasting)
                | (AddingFee, Broadcasting)
                | (Broadcasting, Confirming)
                | (Confirming, Persisted)
                | (Persisted, Idle)
                | (Failed(_), Idle)
        ) || (self.is_in_flight() && matches!(next, Failed(_)))
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SpendPhase::Building
                | SpendPhase::AwaitingSignature
                | SpendPhase::AddingFee
                | SpendPhase::Broadcasting
                | SpendPhase::Confirming
                | SpendPhase::Persisted
        )
    }
}

impl fmt::Display for SpendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpendPhase::Idle => write!(f, "press button below to start tx"),
            SpendPhase::Building => write!(f, "building tx..."),
            SpendPhase::AwaitingSignature => write!(f, "waiting for wallet signature..."),
            SpendPhase::AddingFee => write!(f, "tx built, adding fee..."),
            SpendPhase::Broadcasting => write!(f, "broadcasting tx..."),
            SpendPhase::Confirming => write!(f, "waiting for tx confirmation..."),
            SpendPhase::Persisted => write!(f, "tx confirmed!"),
            SpendPhase::Failed(reason) => write!(f, "error sending tx: {reason}"),
        }
    }
}

fn illegal(from: &impl fmt::Debug, to: &impl fmt::Debug) -> ClientError {
    ClientError::IllegalTransition {
        from: format!("{from:?}"),
        to: format!("{to:?}"),
    }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of a confirmed mint or spend.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationOutcome {
    /// Descriptor now persisted. `None` after a burn.
    pub descriptor: Option<DataStoreDescriptor>,
    /// The coin whose confirmation was awaited.
    pub confirmed_coin: Coin,
    /// Number of confirmation polls issued.
    pub polls: u32,
    /// Whether the wallet signed the spend.
    pub wallet_signed: bool,
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

/// Drives operations on the single tracked data store.
pub struct DataStoreLifecycle<A, S> {
    api: A,
    store: S,
    config: ClientConfig,
    poller: ConfirmationPoller,
    cancel: CancelToken,
    server_info: ServerInfoCache,
    descriptor: Option<DataStoreDescriptor>,
    /// Descriptor returned by a broadcast whose confirmation was never observed.
    unconfirmed: Option<DataStoreDescriptor>,
    mint_phase: MintPhase,
    spend_phase: SpendPhase,
    draft: SpendDraft,
}

impl<A: DataLayerApi, S: DescriptorStore> DataStoreLifecycle<A, S> {
    /// Create a lifecycle and load any persisted descriptor.
    pub fn new(api: A, store: S, config: ClientConfig) -> Self {
        let poller = ConfirmationPoller::new(config.poll.clone());
        let mut lifecycle = Self {
            api,
            store,
            config,
            poller,
            cancel: CancelToken::new(),
            server_info: ServerInfoCache::new(),
            descriptor: None,
            unconfirmed: None,
            mint_phase: MintPhase::NoStore,
            spend_phase: SpendPhase::Idle,
            draft: SpendDraft::default(),
        };
        lifecycle.reload();
        lifecycle
    }

    /// Discard all in-memory state and re-read persistence.
    pub fn reload(&mut self) {
        self.descriptor = self.store.get();
        self.unconfirmed = None;
        self.mint_phase = self.initial_mint_phase();
        self.spend_phase = SpendPhase::Idle;
        self.server_info.clear();
        self.draft = SpendDraft::default();
        if let Some(descriptor) = &self.descriptor {
            self.draft.prefill_from(descriptor);
        }
        info!(has_store = self.descriptor.is_some(), "Lifecycle loaded");
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn descriptor(&self) -> Option<&DataStoreDescriptor> {
        self.descriptor.as_ref()
    }

    /// Descriptor the backend returned for the last broadcast transaction
    /// that has not been seen confirmed, including one whose operation was
    /// interrupted while polling. Nothing was persisted for it; once the
    /// transaction lands it can be recovered by persisting it and running a
    /// sync.
    pub fn unconfirmed_descriptor(&self) -> Option<&DataStoreDescriptor> {
        self.unconfirmed.as_ref()
    }

    pub fn mint_phase(&self) -> &MintPhase {
        &self.mint_phase
    }

    pub fn spend_phase(&self) -> &SpendPhase {
        &self.spend_phase
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.get()
    }

    pub fn draft(&self) -> &SpendDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut SpendDraft {
        &mut self.draft
    }

    /// Token that aborts the confirmation wait of the running operation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Fetch `/info`, replace the cached value and reset the draft's layers
    /// to the defaults derived from it.
    pub async fn refresh_server_info(&mut self) -> Result<ServerInfo> {
        let info = self.server_info.refresh(&self.api).await?.clone();
        self.draft.delegated_puzzles = self.server_info.default_delegated_puzzles();
        Ok(info)
    }

    /// Return failed and interrupted phases to their initial value.
    ///
    /// An operation whose future is dropped (timeout, `select!`, task abort)
    /// leaves its phase in flight, and later operations are refused with
    /// [`ClientError::OperationInProgress`] until this is called.
    pub fn reset(&mut self) {
        if self.mint_phase.is_in_flight() {
            warn!(phase = ?self.mint_phase, "Discarding interrupted mint");
            self.mint_phase = self.initial_mint_phase();
        }
        if self.spend_phase.is_in_flight() {
            warn!(phase = ?self.spend_phase, "Discarding interrupted spend");
            self.spend_phase = SpendPhase::Idle;
        }
        self.clear_failed();
    }

    fn clear_failed(&mut self) {
        if matches!(self.mint_phase, MintPhase::Failed(_)) {
            self.mint_phase = self.initial_mint_phase();
        }
        if matches!(self.spend_phase, SpendPhase::Failed(_)) {
            self.spend_phase = SpendPhase::Idle;
        }
    }

    fn initial_mint_phase(&self) -> MintPhase {
        if self.descriptor.is_some() {
            MintPhase::Persisted
        } else {
            MintPhase::NoStore
        }
    }

    fn advance_mint(&mut self, next: MintPhase) -> Result<()> {
        if !self.mint_phase.can_transition_to(&next) {
            return Err(illegal(&self.mint_phase, &next));
        }
        info!(status = %next, "Mint");
        self.mint_phase = next;
        Ok(())
    }

    fn advance_spend(&mut self, next: SpendPhase) -> Result<()> {
        if !self.spend_phase.can_transition_to(&next) {
            return Err(illegal(&self.spend_phase, &next));
        }
        info!(status = %next, "Spend");
        self.spend_phase = next;
        Ok(())
    }

    fn ensure_idle(&mut self) -> Result<()> {
        self.clear_failed();
        if self.mint_phase.is_in_flight() {
            return Err(ClientError::OperationInProgress(self.mint_phase.to_string()));
        }
        if self.spend_phase != SpendPhase::Idle {
            return Err(ClientError::OperationInProgress(self.spend_phase.to_string()));
        }
        Ok(())
    }

    // ─── Shared steps ────────────────────────────────────────────────────────

    async fn broadcast(&self, tx: &PendingTransaction) -> Result<()> {
        let resp = self
            .api
            .sign_and_send(&SignAndSendRequest {
                coin_spends: tx.coin_spends.clone(),
                signature: tx.signature.clone(),
            })
            .await?;
        match resp.rejection() {
            Some(err) => Err(ClientError::Broadcast(err.to_string())),
            None => Ok(()),
        }
    }

    async fn confirm(&self, tx: &PendingTransaction) -> Result<(Coin, u32)> {
        let coin = tx.terminal_coin().ok_or(ClientError::EmptySpendList)?.clone();
        let polls = self.poller.wait(&self.api, &coin, &self.cancel).await?;
        Ok((coin, polls))
    }

    fn persist(&mut self, descriptor: Option<DataStoreDescriptor>) -> Result<()> {
        self.store.set(descriptor.as_ref())?;
        if let Some(d) = &descriptor {
            self.draft.prefill_from(d);
        }
        info!(present = descriptor.is_some(), "Descriptor persisted");
        self.descriptor = descriptor;
        Ok(())
    }

    fn warn_unconfirmed(&self, err: &ClientError) {
        if let Some(descriptor) = &self.unconfirmed {
            warn!(
                descriptor = %descriptor.as_value(),
                "Transaction broadcast but not seen confirmed: {err}"
            );
        }
    }

    async fn refresh_after_operation(&mut self) {
        if let Err(e) = self.refresh_server_info().await {
            warn!("Server info refresh failed: {e}");
        }
    }

    // ─── Mint ────────────────────────────────────────────────────────────────

    /// Mint a new store owned by the connected account.
    pub async fn mint<W: WalletProvider>(
        &mut self,
        connector: &WalletConnector<W>,
    ) -> Result<OperationOutcome> {
        if self.descriptor.is_some() {
            return Err(ClientError::StoreExists);
        }
        self.ensure_idle()?;
        let owner_address = connector.require_account()?.address.clone();

        self.cancel.reset();
        self.advance_mint(MintPhase::Minting)?;
        match self.run_mint(owner_address).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("Mint failed: {e}");
                self.mint_phase = MintPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_mint(&mut self, owner_address: String) -> Result<OperationOutcome> {
        let req = MintRequest {
            root_hash: empty_root_hash(),
            label: self.config.initial_label.clone(),
            description: self.config.initial_description.clone(),
            owner_address,
            fee: self.config.fee,
            oracle_fee: self.config.oracle_fee,
        };
        let MintResponse {
            new_info,
            coin_spends,
        } = self.api.mint(&req).await?;
        let tx = PendingTransaction::new(coin_spends);
        if tx.is_empty() {
            return Err(ClientError::EmptySpendList);
        }

        self.advance_mint(MintPhase::Broadcasting)?;
        self.broadcast(&tx).await?;

        self.advance_mint(MintPhase::Confirming)?;
        self.unconfirmed = Some(new_info.clone());
        let (confirmed_coin, polls) = match self.confirm(&tx).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                self.warn_unconfirmed(&e);
                return Err(e);
            }
        };

        self.advance_mint(MintPhase::Confirmed)?;
        tokio::time::sleep(self.config.settle_delay).await;

        self.unconfirmed = None;
        self.persist(Some(new_info.clone()))?;
        self.advance_mint(MintPhase::Persisted)?;
        self.refresh_after_operation().await;

        Ok(OperationOutcome {
            descriptor: Some(new_info),
            confirmed_coin,
            polls,
            wallet_signed: false,
        })
    }

    // ─── Spend ───────────────────────────────────────────────────────────────

    /// Perform the spend described by the current draft.
    ///
    /// The connector is only consulted for owner spends (and burns), which
    /// need the wallet's public key and signature.
    pub async fn spend<W: WalletProvider>(
        &mut self,
        connector: &WalletConnector<W>,
    ) -> Result<OperationOutcome> {
        let descriptor = self.descriptor.clone().ok_or(ClientError::NoStore)?;
        self.ensure_idle()?;
        let draft = self.draft.clone();
        draft.validate()?;

        let owner = if draft.role() == SpendRole::Owner || draft.action() == SpendAction::Burn {
            Some(connector.require_connected()?)
        } else {
            None
        };
        let keys = SpendKeys {
            owner: owner
                .map(|(_, account)| account.require_public_key().map(str::to_string))
                .transpose()?,
            server: match draft.role() {
                SpendRole::Admin | SpendRole::Writer => {
                    Some(self.server_info.server_public_key()?.to_string())
                }
                SpendRole::Oracle | SpendRole::Owner => None,
            },
        };
        let signer = owner
            .filter(|_| draft.role().requires_wallet_signature())
            .map(|(wallet, _)| wallet);

        self.cancel.reset();
        self.advance_spend(SpendPhase::Building)?;
        match self.run_spend(descriptor, &draft, keys, signer).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(action = %draft.action(), role = %draft.role(), "Spend failed: {e}");
                self.spend_phase = SpendPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn build_spend(
        &self,
        info: DataStoreDescriptor,
        draft: &SpendDraft,
        keys: &SpendKeys,
    ) -> Result<SpendResponse> {
        let role = draft.role();
        let owner_key = || keys.owner.clone().filter(|_| role == SpendRole::Owner);
        let server_key_for = |r: SpendRole| keys.server.clone().filter(|_| role == r);

        match draft.action() {
            SpendAction::UpdateMetadata => {
                self.api
                    .update_metadata(&UpdateMetadataRequest {
                        info,
                        new_root_hash: draft.new_root_hash.clone(),
                        new_label: draft.new_label.clone(),
                        new_description: draft.new_description.clone(),
                        owner_public_key: owner_key(),
                        admin_public_key: server_key_for(SpendRole::Admin),
                        writer_public_key: server_key_for(SpendRole::Writer),
                    })
                    .await
            }
            SpendAction::UpdateOwnership => {
                let new_owner_puzzle_hash = draft
                    .new_owner_puzzle_hash
                    .clone()
                    .or_else(|| info.owner_puzzle_hash().map(str::to_string))
                    .ok_or(ClientError::MissingOwnerPuzzleHash)?;
                self.api
                    .update_ownership(&UpdateOwnershipRequest {
                        info,
                        new_owner_puzzle_hash,
                        new_delegated_puzzle_keys_and_types: draft.delegated_puzzles.clone(),
                        owner_public_key: owner_key(),
                        admin_public_key: server_key_for(SpendRole::Admin),
                    })
                    .await
            }
            SpendAction::Oracle => {
                self.api
                    .oracle(&OracleRequest {
                        info,
                        fee: self.config.fee,
                    })
                    .await
            }
            SpendAction::Burn => {
                let owner_public_key = keys.owner.clone().ok_or(ClientError::MissingPublicKey)?;
                self.api
                    .melt(&MeltRequest {
                        info,
                        owner_public_key,
                    })
                    .await
            }
        }
    }

    async fn run_spend<W: WalletProvider>(
        &mut self,
        descriptor: DataStoreDescriptor,
        draft: &SpendDraft,
        keys: SpendKeys,
        signer: Option<&W>,
    ) -> Result<OperationOutcome> {
        let action = draft.action();
        let SpendResponse {
            coin_spends,
            new_info,
        } = self.build_spend(descriptor, draft, &keys).await?;
        let mut tx = PendingTransaction::new(coin_spends);
        if tx.is_empty() {
            return Err(ClientError::EmptySpendList);
        }
        let new_descriptor = match action {
            SpendAction::Burn => None,
            _ => Some(new_info.ok_or(ClientError::MissingNewInfo(action))?),
        };

        if let Some(wallet) = signer {
            self.advance_spend(SpendPhase::AwaitingSignature)?;
            tx.signature = Some(wallet.sign_coin_spends(&tx.coin_spends).await?);
        }

        if action.needs_fee_coin() {
            self.advance_spend(SpendPhase::AddingFee)?;
            let fee = self
                .api
                .add_fee(&AddFeeRequest {
                    fee: self.config.fee,
                    coins: tx.coins(),
                })
                .await?;
            tx.append(fee.coin_spends);
        }

        self.advance_spend(SpendPhase::Broadcasting)?;
        self.broadcast(&tx).await?;

        self.advance_spend(SpendPhase::Confirming)?;
        self.unconfirmed = new_descriptor.clone();
        let (confirmed_coin, polls) = match self.confirm(&tx).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                self.warn_unconfirmed(&e);
                return Err(e);
            }
        };

        self.unconfirmed = None;
        self.persist(new_descriptor.clone())?;
        if action == SpendAction::Burn {
            info!("Data store melted");
            self.advance_mint(MintPhase::NoStore)?;
        }
        self.advance_spend(SpendPhase::Persisted)?;
        self.refresh_after_operation().await;
        self.advance_spend(SpendPhase::Idle)?;

        Ok(OperationOutcome {
            descriptor: new_descriptor,
            confirmed_coin,
            polls,
            wallet_signed: tx.signature.is_some(),
        })
    }

    // ─── Sync ────────────────────────────────────────────────────────────────

    /// Ask the backend for the store's latest on-chain state and persist it.
    pub async fn sync(&mut self) -> Result<DataStoreDescriptor> {
        let info = self.descriptor.clone().ok_or(ClientError::NoStore)?;
        self.ensure_idle()?;
        let SyncResponse { info } = self.api.sync(&SyncRequest { info }).await?;
        self.persist(Some(info.clone()))?;
        Ok(info)
    }
}

/// Public keys resolved before a spend starts.
struct SpendKeys {
    /// Wallet key of the connected account (owner spends and burns).
    owner: Option<String>,
    /// Backend key (admin and writer spends).
    server: Option<String>,
}
