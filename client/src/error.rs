use datalayer_common::address::AddressError;
use datalayer_common::role::{SpendAction, SpendRole};

use crate::wallet::WalletError;

/// Errors from client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid JSON from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("error when sending tx: {0}")]
    Broadcast(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("wallet is not installed")]
    WalletNotInstalled,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("wallet did not return a public key")]
    MissingPublicKey,

    #[error("server info has no public key")]
    MissingServerKey,

    #[error("descriptor has no owner puzzle hash")]
    MissingOwnerPuzzleHash,

    #[error("no data store has been minted")]
    NoStore,

    #[error("a data store is already tracked")]
    StoreExists,

    #[error("another operation is in progress ({0})")]
    OperationInProgress(String),

    #[error("role {role} may not perform {action}")]
    NotPermitted {
        role: SpendRole,
        action: SpendAction,
    },

    #[error("backend returned no coin spends")]
    EmptySpendList,

    #[error("backend returned no new descriptor for {0}")]
    MissingNewInfo(SpendAction),

    #[error("coin not confirmed after {attempts} polls")]
    ConfirmationExhausted { attempts: u32 },

    #[error("coin not confirmed within {0:?}")]
    ConfirmationTimeout(std::time::Duration),

    #[error("operation cancelled")]
    Cancelled,

    #[error("illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error(transparent)]
    Address(#[from] AddressError),
}
