//! HTTP client for the data store backend.

use datalayer_common::api::*;
use datalayer_common::server_info::ServerInfo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::{ClientError, Result};

/// Operations offered by the backend.
///
/// The backend builds every transaction; the client only chooses what to
/// build, gets owner spends signed by the wallet, and asks the backend to
/// broadcast and report confirmation.
#[allow(async_fn_in_trait)]
pub trait DataLayerApi {
    async fn info(&self) -> Result<ServerInfo>;
    async fn mint(&self, req: &MintRequest) -> Result<MintResponse>;
    async fn sync(&self, req: &SyncRequest) -> Result<SyncResponse>;
    async fn update_metadata(&self, req: &UpdateMetadataRequest) -> Result<SpendResponse>;
    async fn update_ownership(&self, req: &UpdateOwnershipRequest) -> Result<SpendResponse>;
    async fn oracle(&self, req: &OracleRequest) -> Result<SpendResponse>;
    async fn melt(&self, req: &MeltRequest) -> Result<SpendResponse>;
    async fn add_fee(&self, req: &AddFeeRequest) -> Result<AddFeeResponse>;
    async fn sign_and_send(&self, req: &SignAndSendRequest) -> Result<SignAndSendResponse>;
    async fn coin_confirmed(&self, req: &CoinConfirmedRequest) -> Result<CoinConfirmedResponse>;
}

/// [`DataLayerApi`] over HTTP with `reqwest`.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, secret: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, secret)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        secret: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.api_base.clone(), config.secret.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.secret {
            Some(secret) => builder.header(SECRET_HEADER, secret),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.authorize(self.client.get(self.url(path)));
        self.send(path, builder).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let builder = self.authorize(self.client.post(self.url(path)).json(body));
        self.send(path, builder).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<T> {
        let http_err = |source| ClientError::Http {
            endpoint: path.to_string(),
            source,
        };
        let resp = builder.send().await.map_err(http_err)?;
        let status = resp.status();
        let body = resp.text().await.map_err(http_err)?;
        debug!(endpoint = path, status = status.as_u16(), "Backend response");

        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| ClientError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

impl DataLayerApi for HttpBackend {
    async fn info(&self) -> Result<ServerInfo> {
        self.get_json(INFO_PATH).await
    }

    async fn mint(&self, req: &MintRequest) -> Result<MintResponse> {
        self.post_json(MINT_PATH, req).await
    }

    async fn sync(&self, req: &SyncRequest) -> Result<SyncResponse> {
        self.post_json(SYNC_PATH, req).await
    }

    async fn update_metadata(&self, req: &UpdateMetadataRequest) -> Result<SpendResponse> {
        self.post_json(UPDATE_METADATA_PATH, req).await
    }

    async fn update_ownership(&self, req: &UpdateOwnershipRequest) -> Result<SpendResponse> {
        self.post_json(UPDATE_OWNERSHIP_PATH, req).await
    }

    async fn oracle(&self, req: &OracleRequest) -> Result<SpendResponse> {
        self.post_json(ORACLE_PATH, req).await
    }

    async fn melt(&self, req: &MeltRequest) -> Result<SpendResponse> {
        self.post_json(MELT_PATH, req).await
    }

    async fn add_fee(&self, req: &AddFeeRequest) -> Result<AddFeeResponse> {
        self.post_json(ADD_FEE_PATH, req).await
    }

    async fn sign_and_send(&self, req: &SignAndSendRequest) -> Result<SignAndSendResponse> {
        self.post_json(SIGN_AND_SEND_PATH, req).await
    }

    async fn coin_confirmed(&self, req: &CoinConfirmedRequest) -> Result<CoinConfirmedResponse> {
        self.post_json(COIN_CONFIRMED_PATH, req).await
    }
}
