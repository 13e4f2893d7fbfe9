use datalayer_common::datastore::DelegatedPuzzle;
use datalayer_common::server_info::ServerInfo;
use tracing::info;

use crate::backend::DataLayerApi;
use crate::config::DEFAULT_ORACLE_FEE;
use crate::{ClientError, Result};

/// Puzzle hash the default oracle layer pays its fee to.
pub fn default_oracle_puzzle_hash() -> String {
    "11".repeat(32)
}

/// Last info reported by the backend.
#[derive(Clone, Debug, Default)]
pub struct ServerInfoCache {
    info: Option<ServerInfo>,
}

impl ServerInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch `/info` and replace the cached value.
    pub async fn refresh<A: DataLayerApi>(&mut self, api: &A) -> Result<&ServerInfo> {
        let info = api.info().await?;
        info!(has_public_key = info.public_key().is_some(), "Server info refreshed");
        Ok(&*self.info.insert(info))
    }

    pub fn get(&self) -> Option<&ServerInfo> {
        self.info.as_ref()
    }

    pub fn clear(&mut self) {
        self.info = None;
    }

    /// Backend public key, used as the admin and writer key.
    pub fn server_public_key(&self) -> Result<&str> {
        self.info
            .as_ref()
            .and_then(ServerInfo::public_key)
            .ok_or(ClientError::MissingServerKey)
    }

    /// Layers a store gets when its ownership is updated without edits:
    /// admin and writer held by the backend key, plus an oracle layer.
    pub fn default_delegated_puzzles(&self) -> Vec<DelegatedPuzzle> {
        let mut layers = Vec::with_capacity(3);
        if let Ok(key) = self.server_public_key() {
            layers.push(DelegatedPuzzle::Admin {
                key: key.to_string(),
            });
            layers.push(DelegatedPuzzle::Writer {
                key: key.to_string(),
            });
        }
        layers.push(DelegatedPuzzle::Oracle {
            puzzle_hash: default_oracle_puzzle_hash(),
            fee: DEFAULT_ORACLE_FEE,
        });
        layers
    }
}
