//! Confirmation polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use datalayer_common::api::CoinConfirmedRequest;
use datalayer_common::coin::Coin;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::debug;

use crate::backend::DataLayerApi;
use crate::{ClientError, Result};

/// How long to keep asking whether a coin is confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay between two polls.
    pub interval: Duration,
    /// Give up after this many polls. `None` polls until confirmed, cancelled or timed out.
    pub max_attempts: Option<u32>,
    /// Give up after this much wall-clock time.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: Some(400),
            timeout: None,
        }
    }
}

impl PollPolicy {
    /// Poll forever at the given interval.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            timeout: None,
        }
    }
}

/// Cancels an in-flight confirmation wait. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Re-arm the token for the next operation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Waits for a coin to be reported confirmed by the backend.
#[derive(Clone, Debug)]
pub struct ConfirmationPoller {
    policy: PollPolicy,
}

impl ConfirmationPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until `coin` is confirmed. The first poll is immediate; each later
    /// poll follows one interval after the previous answer. Returns the number
    /// of polls issued.
    pub async fn wait<A: DataLayerApi>(
        &self,
        api: &A,
        coin: &Coin,
        cancel: &CancelToken,
    ) -> Result<u32> {
        match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, self.poll_loop(api, coin, cancel))
                .await
                .map_err(|_| ClientError::ConfirmationTimeout(limit))?,
            None => self.poll_loop(api, coin, cancel).await,
        }
    }

    async fn poll_loop<A: DataLayerApi>(
        &self,
        api: &A,
        coin: &Coin,
        cancel: &CancelToken,
    ) -> Result<u32> {
        let req = CoinConfirmedRequest { coin: coin.clone() };
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }
            attempts += 1;
            let resp = api.coin_confirmed(&req).await?;
            debug!(attempts, confirmed = resp.confirmed, "Polled coin confirmation");
            if resp.confirmed {
                return Ok(attempts);
            }
            if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(ClientError::ConfirmationExhausted { attempts });
            }
            tokio::select! {
                _ = tokio::time::sleep(self.policy.interval) => {}
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            }
        }
    }
}
