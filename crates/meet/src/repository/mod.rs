//! Storage collaborator interfaces consumed by the services, plus the two
//! implementations shipped with the crate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::models::{Department, Event, Participant, Team};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Name of the durable counter chest numbers are drawn from.
pub const CHEST_NUMBER_COUNTER: &str = "chest_number";

#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn get_participant(&self, id: Uuid) -> StorageResult<Option<Participant>>;

    async fn find_participant_by_code(&self, code: &str) -> StorageResult<Option<Participant>>;

    /// All participants ordered by chest number.
    async fn list_participants(&self) -> StorageResult<Vec<Participant>>;

    /// Fails with `ConstraintViolation` when the registration code or chest number is taken.
    async fn insert_participant(&self, participant: &Participant) -> StorageResult<()>;

    async fn update_participant(&self, participant: &Participant) -> StorageResult<()>;
}

#[async_trait]
pub trait DepartmentStore: Send + Sync {
    async fn get_department(&self, id: Uuid) -> StorageResult<Option<Department>>;

    async fn list_departments(&self) -> StorageResult<Vec<Department>>;

    /// Fails with `ConstraintViolation` when the code is taken.
    async fn insert_department(&self, department: &Department) -> StorageResult<()>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn get_team(&self, id: Uuid) -> StorageResult<Option<Team>>;

    async fn list_teams(&self) -> StorageResult<Vec<Team>>;

    async fn list_teams_for_event(&self, event_id: Uuid) -> StorageResult<Vec<Team>>;

    async fn insert_team(&self, team: &Team) -> StorageResult<()>;

    /// Returns whether a team was removed.
    async fn delete_team(&self, id: Uuid) -> StorageResult<bool>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, id: Uuid) -> StorageResult<Option<Event>>;

    async fn list_events(&self) -> StorageResult<Vec<Event>>;

    async fn insert_event(&self, event: &Event) -> StorageResult<()>;

    /// Persists the aggregate if the stored version still equals `event.version()`
    /// and returns the new version. A stale version fails with `Conflict`.
    async fn save_event(&self, event: &Event) -> StorageResult<i64>;
}

/// Durable counters with an atomic compare-and-advance primitive.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn read_counter(&self, name: &str) -> StorageResult<Option<i64>>;

    /// Ensures the chest number counter exists and is at least
    /// `max(floor, highest chest number on record)`. Never lowers the counter,
    /// so concurrent first runs are harmless. Returns the counter value.
    async fn bootstrap_chest_counter(&self, floor: i64) -> StorageResult<i64>;

    /// Sets the counter to `next` only if it still holds `expected`.
    async fn compare_and_advance(&self, name: &str, expected: i64, next: i64)
    -> StorageResult<bool>;
}

/// Everything the meet services need from storage.
pub trait Store: ParticipantStore + DepartmentStore + TeamStore + EventStore + CounterStore {}

impl<T> Store for T where T: ParticipantStore + DepartmentStore + TeamStore + EventStore + CounterStore
{}
