use std::time::Duration;

use datalayer_client::backend::HttpBackend;
use datalayer_client::config::ClientConfig;
use datalayer_client::lifecycle::DataStoreLifecycle;
use datalayer_client::persistence::FileStore;
use datalayer_client::poll::PollPolicy;
use datalayer_client::session::Session;
use datalayer_client::testing::MockWallet;
use tempfile::TempDir;

use crate::MockBackend;

pub const SECRET: &str = "integration-secret";

pub type TestSession = Session<HttpBackend, MockWallet, FileStore>;

/// A mock backend, an approved mock wallet and a scratch state directory.
pub struct TestHarness {
    pub backend: MockBackend,
    pub wallet: MockWallet,
    pub state_dir: TempDir,
}

impl TestHarness {
    pub async fn setup() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("datalayer_client=debug")
            .with_test_writer()
            .try_init();
        Self {
            backend: MockBackend::start().await,
            wallet: MockWallet::approved(),
            state_dir: TempDir::new().expect("create state dir"),
        }
    }

    /// Fast polling and no settle delay, pointed at the mock backend.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.backend.url).with_secret(SECRET);
        config.state_dir = Some(self.state_dir.path().to_path_buf());
        config.settle_delay = Duration::ZERO;
        config.poll = PollPolicy {
            interval: Duration::from_millis(10),
            max_attempts: Some(50),
            timeout: Some(Duration::from_secs(5)),
        };
        config
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(self.state_dir.path())
    }

    /// Raw contents of the persisted descriptor file.
    pub fn stored_raw(&self) -> Option<String> {
        std::fs::read_to_string(self.store().path()).ok()
    }

    /// A session as the front end would start it: wallet present, eager connect.
    pub async fn session(&self) -> TestSession {
        let config = self.config();
        Session::start(
            HttpBackend::from_config(&config),
            Some(self.wallet.clone()),
            self.store(),
            config,
        )
        .await
    }

    /// A session in an environment without a wallet.
    pub async fn session_without_wallet(&self) -> TestSession {
        let config = self.config();
        Session::start(HttpBackend::from_config(&config), None, self.store(), config).await
    }

    pub fn lifecycle(&self) -> DataStoreLifecycle<HttpBackend, FileStore> {
        let config = self.config();
        DataStoreLifecycle::new(HttpBackend::from_config(&config), self.store(), config)
    }
}
