use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::teams::TeamResolver;
use super::timed;
use crate::dto::event::{
    CreateEventRequest, HeatOutcome, PendingHeat, RoundSnapshot, UpdateCurrentRoundRequest,
};
use crate::error::{MeetError, Result};
use crate::models::{Event, HeatCommand, HeatDraft, HeatEntry, Rank, RosterEntry};
use crate::repository::Store;

/// Drives events through their rounds.
///
/// Every write loads the event aggregate, applies one state transition and saves
/// it back against the version it was loaded at. A concurrent writer on the same
/// event makes the save fail with a persistence conflict rather than overwrite.
#[derive(Clone)]
pub struct RoundEngine {
    store: Arc<dyn Store>,
    teams: TeamResolver,
    timeout: Duration,
}

impl RoundEngine {
    pub fn new(store: Arc<dyn Store>, teams: TeamResolver, timeout: Duration) -> Self {
        Self {
            store,
            teams,
            timeout,
        }
    }

    pub async fn create_event(&self, req: CreateEventRequest) -> Result<Event> {
        req.validate()?;
        req.validate_shape()
            .map_err(|msg| MeetError::Validation(msg.to_string()))?;

        let event = Event::new(req.into());
        timed(self.timeout, self.store.insert_event(&event)).await?;

        info!(event_id = %event.event_id, name = %event.name, "Created event");
        Ok(event)
    }

    pub async fn list_events(&self) -> Result<Vec<Event>> {
        Ok(timed(self.timeout, self.store.list_events()).await?)
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<Event> {
        timed(self.timeout, self.store.get_event(event_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Event {}", event_id)))
    }

    pub async fn admit_roster(&self, event_id: Uuid, ids: &[Uuid]) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        let entries = self.teams.admission_entries(&event, ids).await?;
        event.admit_roster(entries)?;
        let event = self.commit(event).await?;

        info!(
            event = %event.name,
            admitted = event.admission_roster().len(),
            "Admission roster set"
        );
        Ok(event)
    }

    pub async fn open_heat(
        &self,
        event_id: Uuid,
        round_index: usize,
        ids: &[Uuid],
        heat_number: u16,
    ) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        let entries = entries_for(&event, ids)?;
        event.open_heat(round_index, &entries, heat_number)?;
        let event = self.commit(event).await?;

        debug!(event = %event.name, round_index, heat_number, "Opened heat");
        Ok(event)
    }

    /// Returns the entry's qualified flag after the toggle.
    pub async fn record_qualification(
        &self,
        event_id: Uuid,
        round_index: usize,
        id: Uuid,
        heat_number: u16,
    ) -> Result<bool> {
        let mut event = self.get_event(event_id).await?;
        let entry = event.entry_for(id)?;
        let qualified = event.record_qualification(round_index, entry, heat_number)?;
        self.commit(event).await?;
        Ok(qualified)
    }

    /// Returns the entry's rank after the call; `None` when the call cleared it.
    pub async fn record_rank(
        &self,
        event_id: Uuid,
        round_index: usize,
        id: Uuid,
        heat_number: u16,
        rank: Rank,
    ) -> Result<Option<Rank>> {
        let mut event = self.get_event(event_id).await?;
        let entry = event.entry_for(id)?;
        let settled = event.record_rank(round_index, entry, heat_number, rank)?;
        self.commit(event).await?;
        Ok(settled)
    }

    /// Replaces a heat's rows with the submitted outcomes.
    pub async fn close_heat(
        &self,
        event_id: Uuid,
        round_index: usize,
        heat_number: u16,
        outcomes: Vec<HeatOutcome>,
    ) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        let entries = outcomes
            .into_iter()
            .map(|outcome| {
                Ok(HeatEntry {
                    entry: event.entry_for(outcome.id)?,
                    qualified: outcome.qualified,
                    rank: outcome.rank,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        event.close_heat(round_index, heat_number, entries)?;
        let event = self.commit(event).await?;

        debug!(event = %event.name, round_index, heat_number, "Closed heat");
        Ok(event)
    }

    /// Applies draft commands to the stored rows of a heat in the current round
    /// and commits the result as one heat close.
    pub async fn apply_heat_commands(
        &self,
        event_id: Uuid,
        heat_number: u16,
        commands: Vec<HeatCommand>,
    ) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        let draft = draft_from(&event, heat_number, commands)?;
        let round_index = draft.round_index();
        event.close_heat(round_index, heat_number, draft.into_entries())?;
        let event = self.commit(event).await?;

        debug!(event = %event.name, round_index, heat_number, "Committed heat draft");
        Ok(event)
    }

    pub async fn advance_round(
        &self,
        event_id: Uuid,
        next_name: Option<String>,
        is_final: bool,
    ) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        event.advance_round(next_name, is_final)?;
        let event = self.commit(event).await?;

        let round = event.current_round();
        info!(
            event = %event.name,
            round = %round.name,
            sequence = round.sequence,
            is_final = round.is_final,
            "Advanced to next round"
        );
        Ok(event)
    }

    pub async fn rename_current_round(&self, event_id: Uuid, name: &str) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        event.rename_current_round(name)?;
        self.commit(event).await
    }

    pub async fn mark_current_round_final(&self, event_id: Uuid, is_final: bool) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        event.mark_current_round_final(is_final)?;
        self.commit(event).await
    }

    /// Applies both metadata edits in one write.
    pub async fn update_current_round(
        &self,
        event_id: Uuid,
        req: UpdateCurrentRoundRequest,
    ) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        if let Some(name) = req.name.as_deref() {
            event.rename_current_round(name)?;
        }
        if let Some(is_final) = req.is_final {
            event.mark_current_round_final(is_final)?;
        }
        self.commit(event).await
    }

    pub async fn close_event(&self, event_id: Uuid, pending: Option<PendingHeat>) -> Result<Event> {
        let mut event = self.get_event(event_id).await?;
        let draft = pending
            .map(|heat| draft_from(&event, heat.heat_number, heat.commands))
            .transpose()?;
        event.close_event(draft)?;
        let event = self.commit(event).await?;

        info!(
            event = %event.name,
            winners = event.winners().len(),
            "Closed event"
        );
        Ok(event)
    }

    pub async fn round_snapshot(&self, event_id: Uuid, round_index: usize) -> Result<RoundSnapshot> {
        let event = self.get_event(event_id).await?;
        let eligible = event.eligible_roster(round_index)?;
        RoundSnapshot::of(&event, round_index, eligible)
            .ok_or_else(|| MeetError::NotFound(format!("Round {} of {}", round_index, event_id)))
    }

    async fn commit(&self, mut event: Event) -> Result<Event> {
        let version = timed(self.timeout, self.store.save_event(&event)).await?;
        event.set_version(version);
        Ok(event)
    }
}

fn entries_for(event: &Event, ids: &[Uuid]) -> Result<Vec<RosterEntry>> {
    ids.iter().map(|id| event.entry_for(*id)).collect()
}

fn draft_from(event: &Event, heat_number: u16, commands: Vec<HeatCommand>) -> Result<HeatDraft> {
    let mut draft = HeatDraft::new(event, heat_number)?;
    for command in commands {
        draft.apply(command)?;
    }
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::error::StorageError;
    use crate::models::{
        ChestNumber, Department, Discipline, EventStatus, Gender, GenderCategory, Participant,
        PointSchedule, RoundStatus,
    };
    use crate::repository::{DepartmentStore, EventStore, InMemoryStore, ParticipantStore};

    struct Fixture {
        store: InMemoryStore,
        engine: RoundEngine,
        department_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let department_id = Uuid::new_v4();
        store
            .insert_department(&Department {
                department_id,
                name: "Chemistry".to_string(),
                code: "CHEM".to_string(),
            })
            .await
            .unwrap();

        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let timeout = Duration::from_secs(1);
        let teams = TeamResolver::new(shared.clone(), timeout);
        Fixture {
            store,
            engine: RoundEngine::new(shared, teams, timeout),
            department_id,
        }
    }

    async fn runners(fx: &Fixture, n: i32, gender: Gender) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for i in 0..n {
            let participant = Participant {
                participant_id: Uuid::new_v4(),
                name: format!("Runner {}", i),
                registration_code: format!("{:?}-{}", gender, i),
                department_id: fx.department_id,
                cohort: None,
                semester: None,
                gender,
                chest_number: ChestNumber(200 + i),
                created_at: Utc::now().naive_utc(),
            };
            fx.store.insert_participant(&participant).await.unwrap();
            ids.push(participant.participant_id);
        }
        ids
    }

    async fn sprint(fx: &Fixture) -> Event {
        fx.engine
            .create_event(CreateEventRequest {
                name: "200m".to_string(),
                discipline: Discipline::Individual,
                gender_category: GenderCategory::Male,
                points: PointSchedule::new(5, 3, 1),
                team_size: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_event_rejects_bad_shape() {
        let fx = fixture().await;
        let result = fx
            .engine
            .create_event(CreateEventRequest {
                name: "Relay".to_string(),
                discipline: Discipline::Group,
                gender_category: GenderCategory::Mixed,
                points: PointSchedule::default(),
                team_size: None,
            })
            .await;
        assert!(matches!(result, Err(MeetError::Validation(_))));
    }

    #[tokio::test]
    async fn test_admission_checks_gender() {
        let fx = fixture().await;
        let event = sprint(&fx).await;
        let women = runners(&fx, 1, Gender::Female).await;

        let result = fx.engine.admit_roster(event.event_id, &women).await;
        assert!(matches!(result, Err(MeetError::InvalidParticipant { .. })));
    }

    #[tokio::test]
    async fn test_open_heat_moves_lifecycle_forward() {
        let fx = fixture().await;
        let event = sprint(&fx).await;
        let ids = runners(&fx, 4, Gender::Male).await;
        fx.engine.admit_roster(event.event_id, &ids).await.unwrap();

        let event = fx
            .engine
            .open_heat(event.event_id, 0, &ids[..2], 1)
            .await
            .unwrap();

        assert_eq!(event.status(), EventStatus::Ongoing);
        assert_eq!(event.current_round().status, RoundStatus::Active);

        let snapshot = fx.engine.round_snapshot(event.event_id, 0).await.unwrap();
        assert_eq!(snapshot.eligible.len(), 4);
        assert_eq!(snapshot.unassigned.len(), 2);
        assert!(snapshot.unassigned.contains(&RosterEntry::Individual(ids[2])));
        assert!(snapshot.unassigned.contains(&RosterEntry::Individual(ids[3])));
    }

    #[tokio::test]
    async fn test_heat_commands_commit_in_one_write() {
        let fx = fixture().await;
        let event = sprint(&fx).await;
        let ids = runners(&fx, 3, Gender::Male).await;
        fx.engine.admit_roster(event.event_id, &ids).await.unwrap();
        fx.engine.open_heat(event.event_id, 0, &ids, 1).await.unwrap();

        let event = fx
            .engine
            .apply_heat_commands(
                event.event_id,
                1,
                vec![
                    HeatCommand::ToggleQualified { id: ids[0] },
                    HeatCommand::ToggleQualified { id: ids[1] },
                    HeatCommand::ToggleQualified { id: ids[1] },
                    HeatCommand::SetQualified {
                        id: ids[2],
                        qualified: true,
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            event.current_round().qualified_entries().len(),
            2,
            "ids[1] was toggled twice"
        );
    }

    #[tokio::test]
    async fn test_stale_write_surfaces_as_persistence_error() {
        let fx = fixture().await;
        let event = sprint(&fx).await;
        let ids = runners(&fx, 2, Gender::Male).await;
        fx.engine.admit_roster(event.event_id, &ids).await.unwrap();

        let mut stale = fx.store.get_event(event.event_id).await.unwrap().unwrap();
        fx.engine.open_heat(event.event_id, 0, &ids, 1).await.unwrap();

        stale.rename_current_round("Heats").unwrap();
        let result = fx.engine.commit(stale).await;
        assert!(matches!(
            result,
            Err(MeetError::Persistence(StorageError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn test_rank_on_preliminary_round_is_rejected() {
        let fx = fixture().await;
        let event = sprint(&fx).await;
        let ids = runners(&fx, 2, Gender::Male).await;
        fx.engine.admit_roster(event.event_id, &ids).await.unwrap();
        fx.engine.open_heat(event.event_id, 0, &ids, 1).await.unwrap();

        let result = fx
            .engine
            .record_rank(event.event_id, 0, ids[0], 1, Rank::FIRST)
            .await;
        assert!(matches!(result, Err(MeetError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_close_event_flushes_pending_heat() {
        let fx = fixture().await;
        let event = sprint(&fx).await;
        let ids = runners(&fx, 3, Gender::Male).await;
        fx.engine.admit_roster(event.event_id, &ids).await.unwrap();
        fx.engine
            .mark_current_round_final(event.event_id, true)
            .await
            .unwrap();
        fx.engine.open_heat(event.event_id, 0, &ids, 1).await.unwrap();

        let event = fx
            .engine
            .close_event(
                event.event_id,
                Some(PendingHeat {
                    heat_number: 1,
                    commands: vec![
                        HeatCommand::SetRank {
                            id: ids[2],
                            rank: Rank::FIRST,
                        },
                        HeatCommand::SetRank {
                            id: ids[0],
                            rank: Rank::SECOND,
                        },
                    ],
                }),
            )
            .await
            .unwrap();

        assert!(event.is_completed());
        assert_eq!(
            event.winners(),
            &[RosterEntry::Individual(ids[2]), RosterEntry::Individual(ids[0])]
        );

        let result = fx.engine.rename_current_round(event.event_id, "Again").await;
        assert!(matches!(result, Err(MeetError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let fx = fixture().await;
        let result = fx.engine.get_event(Uuid::new_v4()).await;
        assert!(matches!(result, Err(MeetError::NotFound(_))));
    }
}
