use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CHEST_NUMBER_COUNTER, CounterStore, DepartmentStore, EventStore, ParticipantStore, TeamStore,
};
use crate::error::{StorageError, StorageResult};
use crate::models::{Department, Event, Participant, Team};

/// Process-local store. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    participants: HashMap<Uuid, Participant>,
    departments: HashMap<Uuid, Department>,
    teams: HashMap<Uuid, Team>,
    events: HashMap<Uuid, Event>,
    counters: HashMap<String, i64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantStore for InMemoryStore {
    async fn get_participant(&self, id: Uuid) -> StorageResult<Option<Participant>> {
        Ok(self.tables.read().await.participants.get(&id).cloned())
    }

    async fn find_participant_by_code(&self, code: &str) -> StorageResult<Option<Participant>> {
        Ok(self
            .tables
            .read()
            .await
            .participants
            .values()
            .find(|p| p.registration_code == code)
            .cloned())
    }

    async fn list_participants(&self) -> StorageResult<Vec<Participant>> {
        let mut participants: Vec<Participant> =
            self.tables.read().await.participants.values().cloned().collect();
        participants.sort_by_key(|p| p.chest_number);
        Ok(participants)
    }

    async fn insert_participant(&self, participant: &Participant) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        for existing in tables.participants.values() {
            if existing.registration_code == participant.registration_code {
                return Err(StorageError::ConstraintViolation(format!(
                    "registration code '{}' already exists",
                    participant.registration_code
                )));
            }
            if existing.chest_number == participant.chest_number {
                return Err(StorageError::ConstraintViolation(format!(
                    "chest number {} already exists",
                    participant.chest_number
                )));
            }
        }
        tables
            .participants
            .insert(participant.participant_id, participant.clone());
        Ok(())
    }

    async fn update_participant(&self, participant: &Participant) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        match tables.participants.get_mut(&participant.participant_id) {
            Some(slot) => {
                *slot = participant.clone();
                Ok(())
            }
            None => Err(StorageError::Conflict(format!(
                "participant {} no longer exists",
                participant.participant_id
            ))),
        }
    }
}

#[async_trait]
impl DepartmentStore for InMemoryStore {
    async fn get_department(&self, id: Uuid) -> StorageResult<Option<Department>> {
        Ok(self.tables.read().await.departments.get(&id).cloned())
    }

    async fn list_departments(&self) -> StorageResult<Vec<Department>> {
        let mut departments: Vec<Department> =
            self.tables.read().await.departments.values().cloned().collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn insert_department(&self, department: &Department) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.departments.values().any(|d| d.code == department.code) {
            return Err(StorageError::ConstraintViolation(format!(
                "department code '{}' already exists",
                department.code
            )));
        }
        tables
            .departments
            .insert(department.department_id, department.clone());
        Ok(())
    }
}

#[async_trait]
impl TeamStore for InMemoryStore {
    async fn get_team(&self, id: Uuid) -> StorageResult<Option<Team>> {
        Ok(self.tables.read().await.teams.get(&id).cloned())
    }

    async fn list_teams(&self) -> StorageResult<Vec<Team>> {
        let mut teams: Vec<Team> = self.tables.read().await.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.team_id.cmp(&b.team_id)));
        Ok(teams)
    }

    async fn list_teams_for_event(&self, event_id: Uuid) -> StorageResult<Vec<Team>> {
        let mut teams = self.list_teams().await?;
        teams.retain(|t| t.event_id == event_id);
        Ok(teams)
    }

    async fn insert_team(&self, team: &Team) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .teams
            .insert(team.team_id, team.clone());
        Ok(())
    }

    async fn delete_team(&self, id: Uuid) -> StorageResult<bool> {
        Ok(self.tables.write().await.teams.remove(&id).is_some())
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn get_event(&self, id: Uuid) -> StorageResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> StorageResult<Vec<Event>> {
        let mut events: Vec<Event> = self.tables.read().await.events.values().cloned().collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.event_id.cmp(&b.event_id)));
        Ok(events)
    }

    async fn insert_event(&self, event: &Event) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.event_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "event {} already exists",
                event.event_id
            )));
        }
        tables.events.insert(event.event_id, event.clone());
        Ok(())
    }

    async fn save_event(&self, event: &Event) -> StorageResult<i64> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .events
            .get_mut(&event.event_id)
            .ok_or_else(|| StorageError::Conflict(format!("event {} was deleted", event.event_id)))?;

        if stored.version() != event.version() {
            return Err(StorageError::Conflict(format!(
                "event {} is at version {}, write was based on {}",
                event.event_id,
                stored.version(),
                event.version()
            )));
        }

        let next = event.version() + 1;
        let mut saved = event.clone();
        saved.set_version(next);
        *stored = saved;
        Ok(next)
    }
}

#[async_trait]
impl CounterStore for InMemoryStore {
    async fn read_counter(&self, name: &str) -> StorageResult<Option<i64>> {
        Ok(self.tables.read().await.counters.get(name).copied())
    }

    async fn bootstrap_chest_counter(&self, floor: i64) -> StorageResult<i64> {
        let mut tables = self.tables.write().await;
        let highest = tables
            .participants
            .values()
            .map(|p| i64::from(p.chest_number.0))
            .max()
            .unwrap_or(0);
        let value = tables
            .counters
            .entry(CHEST_NUMBER_COUNTER.to_string())
            .or_insert(0);
        *value = (*value).max(floor).max(highest);
        Ok(*value)
    }

    async fn compare_and_advance(
        &self,
        name: &str,
        expected: i64,
        next: i64,
    ) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.counters.get_mut(name) {
            Some(value) if *value == expected => {
                *value = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
