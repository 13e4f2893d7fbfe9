//! Client for a backend-managed data store.
//!
//! A [`session::Session`] ties together the pieces:
//!
//! - [`connector::WalletConnector`] detects and connects an injected
//!   [`wallet::WalletProvider`] and derives the account address and key;
//! - [`lifecycle::DataStoreLifecycle`] drives mint, spend and sync operations
//!   against a [`backend::DataLayerApi`], polling for confirmation and
//!   persisting the resulting descriptor through a
//!   [`persistence::DescriptorStore`];
//! - [`server_info::ServerInfoCache`] holds the backend's reported info.

pub mod backend;
pub mod config;
pub mod connector;
pub mod draft;
pub mod error;
pub mod lifecycle;
pub mod persistence;
pub mod poll;
pub mod server_info;
pub mod session;
pub mod wallet;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::ClientError;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
