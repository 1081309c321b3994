pub mod allocator;
pub mod registration;
pub mod rounds;
pub mod scoring;
pub mod teams;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::{StorageError, StorageResult};
use crate::repository::{CounterStore, Store};

pub use allocator::ChestNumberAllocator;
pub use registration::RegistrationService;
pub use rounds::RoundEngine;
pub use scoring::{ScoringService, achievements_for, compute_standings};
pub use teams::{Resolved, TeamResolver};

/// Bounds a storage call. Expiry becomes `StorageError::Timeout`.
pub(crate) async fn timed<T, F>(limit: Duration, call: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(limit)),
    }
}

/// Entry point to the meet core: every read and write a presentation layer may
/// perform goes through one of these services.
#[derive(Clone)]
pub struct Meet {
    registration: RegistrationService,
    teams: TeamResolver,
    rounds: RoundEngine,
    scoring: ScoringService,
}

impl Meet {
    pub fn new<S>(store: S, config: EngineConfig) -> Self
    where
        S: Store + 'static,
    {
        let shared = Arc::new(store);
        let counters: Arc<dyn CounterStore> = shared.clone();
        let store: Arc<dyn Store> = shared;

        let allocator = ChestNumberAllocator::new(counters, &config);
        let teams = TeamResolver::new(store.clone(), config.store_timeout);

        Self {
            registration: RegistrationService::new(store.clone(), allocator, config.store_timeout),
            rounds: RoundEngine::new(store.clone(), teams.clone(), config.store_timeout),
            scoring: ScoringService::new(store, config.store_timeout),
            teams,
        }
    }

    pub fn registration(&self) -> &RegistrationService {
        &self.registration
    }

    pub fn teams(&self) -> &TeamResolver {
        &self.teams
    }

    pub fn rounds(&self) -> &RoundEngine {
        &self.rounds
    }

    pub fn scoring(&self) -> &ScoringService {
        &self.scoring
    }
}
