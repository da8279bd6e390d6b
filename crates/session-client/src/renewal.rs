//! Single-flight renewal coordinator
//!
//! Collapses concurrent renewal attempts into one rotation call. The
//! two-phase state machine lives behind one mutex:
//!
//! - `Idle`: no rotation in flight. The first `renew()` call flips the
//!   phase to `Renewing` and spawns the rotation episode.
//! - `Renewing`: a rotation is outstanding. Further `renew()` calls only
//!   enqueue a waiter — they never start a second call.
//!
//! The phase flip happens under the lock before any I/O is issued, so two
//! callers racing from `Idle` cannot both start rotation calls. The
//! episode runs in a spawned task: a caller abandoning its future does
//! not abandon the in-flight call or strand the other waiters, and the
//! coordinator always runs to completion. Completion resolves every
//! waiter queued up to that point with one shared outcome, then returns
//! to `Idle`; a caller arriving afterwards starts a fresh episode.

use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

use crate::api::RenewalApi;
use crate::error::{Error, Result};
use crate::store::{AccessTokenCell, RefreshTokenFile};

type Waiter = oneshot::Sender<Result<String>>;

enum Phase {
    Idle,
    Renewing { waiters: Vec<Waiter> },
}

/// Client-side single-flight engine. One per principal session,
/// process-wide.
pub struct RenewalCoordinator {
    phase: Mutex<Phase>,
    api: Arc<dyn RenewalApi>,
    access: Arc<AccessTokenCell>,
    refresh: Arc<RefreshTokenFile>,
}

impl RenewalCoordinator {
    pub fn new(
        api: Arc<dyn RenewalApi>,
        access: Arc<AccessTokenCell>,
        refresh: Arc<RefreshTokenFile>,
    ) -> Self {
        Self {
            phase: Mutex::new(Phase::Idle),
            api,
            access,
            refresh,
        }
    }

    /// Obtain a fresh access token, joining the in-flight rotation if one
    /// exists.
    ///
    /// Every caller suspended here is resolved by the episode's
    /// completion with the same outcome: the new access token on success,
    /// or the shared failure after local credentials have been cleared.
    pub async fn renew(self: Arc<Self>) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let start_episode = {
            let mut phase = self.phase.lock().await;
            match &mut *phase {
                Phase::Renewing { waiters } => {
                    waiters.push(tx);
                    debug!(queued = waiters.len(), "joined in-flight renewal");
                    false
                }
                Phase::Idle => {
                    *phase = Phase::Renewing { waiters: vec![tx] };
                    true
                }
            }
        };

        if start_episode {
            let coordinator = Arc::clone(&self);
            tokio::spawn(async move {
                coordinator.run_episode().await;
            });
        }

        match rx.await {
            Ok(outcome) => outcome,
            // The episode resolves every waiter before dropping its
            // senders; a closed channel means the runtime is shutting
            // down mid-episode.
            Err(_) => Err(Error::RenewalFailed("renewal task aborted".into())),
        }
    }

    /// One complete Renewing episode: rotate, publish or clear the
    /// credential stores, then resolve every queued waiter and return to
    /// Idle.
    async fn run_episode(&self) {
        let outcome = self.rotate_once().await;

        match &outcome {
            Ok(_) => debug!("renewal succeeded"),
            Err(e) => warn!(error = %e, "renewal failed, credentials cleared"),
        }

        // Stores are settled before any waiter wakes, so no caller can
        // observe a half-updated credential state.
        let waiters = {
            let mut phase = self.phase.lock().await;
            match std::mem::replace(&mut *phase, Phase::Idle) {
                Phase::Renewing { waiters } => waiters,
                Phase::Idle => Vec::new(),
            }
        };

        for waiter in waiters {
            // A waiter that abandoned its future just drops the receiver
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Perform the rotation call and settle both credential stores.
    ///
    /// Any failure — missing refresh token, rejected rotation, storage
    /// error — clears both stores (fail-closed) so the next request
    /// surfaces an unauthenticated state instead of retrying forever.
    async fn rotate_once(&self) -> Result<String> {
        let result = async {
            let refresh_token = self
                .refresh
                .get()
                .await
                .ok_or_else(|| Error::RenewalFailed("no refresh token stored".into()))?;

            let pair = self
                .api
                .rotate(&refresh_token)
                .await
                .map_err(|e| Error::RenewalFailed(e.to_string()))?;

            self.refresh
                .set(&pair.refresh_token)
                .await
                .map_err(|e| Error::RenewalFailed(format!("persisting refresh token: {e}")))?;
            self.access.set(pair.access_token.clone()).await;

            Ok(pair.access_token)
        }
        .await;

        if result.is_err() {
            self.access.clear().await;
            if let Err(e) = self.refresh.clear().await {
                warn!(error = %e, "failed to clear refresh token file");
            }
        }

        result
    }
}
