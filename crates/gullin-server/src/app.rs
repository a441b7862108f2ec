//! Service wiring.

use std::sync::Arc;
use std::time::Duration;

use gullin_auth::{AuthService, MemoryChallengeStore, NoGeoLocation};
use gullin_db::SurrealStore;
use gullin_kyc::{HttpIdentityProvider, ProviderError, VerificationService};
use surrealdb::{Connection, Surreal};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::gateway::TracingGateway;

pub type Auth<C> =
    AuthService<SurrealStore<C>, MemoryChallengeStore, TracingGateway, NoGeoLocation>;
pub type Kyc<C> = VerificationService<SurrealStore<C>, TracingGateway, HttpIdentityProvider>;

/// The services a request handler works with, sharing one store.
pub struct App<C: Connection> {
    pub auth: Arc<Auth<C>>,
    pub kyc: Arc<Kyc<C>>,
}

impl<C: Connection> App<C> {
    /// Wire the services over a migrated database.
    pub fn build(db: Surreal<C>, config: &ServerConfig) -> Result<Self, ProviderError> {
        let store = SurrealStore::new(db);
        let auth = AuthService::new(
            store.clone(),
            MemoryChallengeStore::new(),
            TracingGateway,
            NoGeoLocation,
            config.auth.clone(),
        );
        let kyc = VerificationService::new(
            store,
            TracingGateway,
            HttpIdentityProvider::new(config.provider.clone())?,
            config.auth.clone(),
            config.kyc.clone(),
        );
        info!(provider = %config.provider.endpoint, "Services wired");
        Ok(Self {
            auth: Arc::new(auth),
            kyc: Arc::new(kyc),
        })
    }

    /// Drop expired login and reset challenges every `every`.
    pub fn spawn_challenge_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let auth = Arc::clone(&self.auth);
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match auth.challenges().purge_expired() {
                    Ok(0) => {}
                    Ok(purged) => debug!(purged, "Expired challenges purged"),
                    Err(e) => warn!(error = %e, "Challenge sweep failed"),
                }
            }
        })
    }
}
