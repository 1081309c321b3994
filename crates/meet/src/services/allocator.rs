use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::timed;
use crate::config::EngineConfig;
use crate::error::{MeetError, Result};
use crate::models::ChestNumber;
use crate::repository::{CHEST_NUMBER_COUNTER, CounterStore};

/// Issues chest numbers from the durable counter with compare-and-advance.
///
/// Every successful call moves the counter by exactly one, so issued numbers
/// are contiguous and unique across processes sharing the store. Lost races are
/// retried with a linear backoff; once the bound is spent the call fails with
/// `ResourceContention` and nothing is issued.
#[derive(Clone)]
pub struct ChestNumberAllocator {
    counters: Arc<dyn CounterStore>,
    seed: i64,
    max_attempts: u32,
    backoff: Duration,
    timeout: Duration,
}

impl ChestNumberAllocator {
    pub fn new(counters: Arc<dyn CounterStore>, config: &EngineConfig) -> Self {
        Self {
            counters,
            seed: i64::from(config.chest_number_seed),
            max_attempts: config.allocator_max_attempts.max(1),
            backoff: config.allocator_backoff,
            timeout: config.store_timeout,
        }
    }

    pub async fn allocate(&self) -> Result<ChestNumber> {
        for attempt in 1..=self.max_attempts {
            let current = match timed(self.timeout, self.counters.read_counter(CHEST_NUMBER_COUNTER))
                .await?
            {
                Some(value) => value,
                None => {
                    timed(self.timeout, self.counters.bootstrap_chest_counter(self.seed)).await?
                }
            };

            let candidate = current + 1;
            let number = i32::try_from(candidate).map_err(|_| {
                MeetError::invalid_state(format!("chest number space exhausted at {}", current))
            })?;

            match timed(
                self.timeout,
                self.counters
                    .compare_and_advance(CHEST_NUMBER_COUNTER, current, candidate),
            )
            .await
            {
                Ok(true) => {
                    debug!(chest_number = number, attempt, "Issued chest number");
                    return Ok(ChestNumber(number));
                }
                Ok(false) => {
                    warn!(attempt, expected = current, "Chest number counter moved, retrying");
                }
                Err(e) if e.is_serialization_failure() => {
                    warn!(attempt, error = %e, "Chest number write conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        warn!(
            attempts = self.max_attempts,
            "Chest number allocation exhausted its retries"
        );
        Err(MeetError::ResourceContention {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::error::StorageResult;
    use crate::repository::{InMemoryStore, ParticipantStore};

    fn allocator(store: InMemoryStore, config: &EngineConfig) -> ChestNumberAllocator {
        ChestNumberAllocator::new(Arc::new(store), config)
    }

    /// Reads succeed but every advance loses the race.
    struct AlwaysContended;

    #[async_trait]
    impl CounterStore for AlwaysContended {
        async fn read_counter(&self, _name: &str) -> StorageResult<Option<i64>> {
            Ok(Some(150))
        }

        async fn bootstrap_chest_counter(&self, floor: i64) -> StorageResult<i64> {
            Ok(floor)
        }

        async fn compare_and_advance(
            &self,
            _name: &str,
            _expected: i64,
            _next: i64,
        ) -> StorageResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_first_number_follows_seed() {
        let alloc = allocator(InMemoryStore::new(), &EngineConfig::default());

        assert_eq!(alloc.allocate().await.unwrap(), ChestNumber(101));
        assert_eq!(alloc.allocate().await.unwrap(), ChestNumber(102));
    }

    #[tokio::test]
    async fn test_bootstrap_starts_above_existing_numbers() {
        let store = InMemoryStore::new();
        store
            .insert_participant(&crate::models::Participant {
                participant_id: uuid::Uuid::new_v4(),
                name: "Imported".to_string(),
                registration_code: "OLD-1".to_string(),
                department_id: uuid::Uuid::new_v4(),
                cohort: None,
                semester: None,
                gender: crate::models::Gender::Female,
                chest_number: ChestNumber(250),
                created_at: chrono::Utc::now().naive_utc(),
            })
            .await
            .unwrap();

        let alloc = allocator(store, &EngineConfig::default());
        assert_eq!(alloc.allocate().await.unwrap(), ChestNumber(251));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_never_duplicates() {
        let config = EngineConfig {
            allocator_max_attempts: 64,
            allocator_backoff: Duration::from_millis(1),
            ..EngineConfig::default()
        };
        let alloc = allocator(InMemoryStore::new(), &config);

        let mut handles = Vec::new();
        for _ in 0..40 {
            let alloc = alloc.clone();
            handles.push(tokio::spawn(async move { alloc.allocate().await }));
        }

        let mut issued = Vec::new();
        for handle in handles {
            if let Ok(number) = handle.await.unwrap() {
                issued.push(number.0);
            }
        }

        assert_eq!(issued.len(), 40);
        let unique: HashSet<i32> = issued.iter().copied().collect();
        assert_eq!(unique.len(), issued.len());

        issued.sort_unstable();
        let expected: Vec<i32> = (101..101 + issued.len() as i32).collect();
        assert_eq!(issued, expected);
    }

    #[tokio::test]
    async fn test_contention_gives_up_after_bound() {
        let config = EngineConfig {
            allocator_backoff: Duration::from_millis(1),
            ..EngineConfig::default()
        };
        let alloc = ChestNumberAllocator::new(Arc::new(AlwaysContended), &config);

        let result = alloc.allocate().await;
        assert!(matches!(
            result,
            Err(MeetError::ResourceContention { attempts: 3 })
        ));
    }
}
