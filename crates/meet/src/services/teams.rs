use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::timed;
use crate::dto::team::{CreateTeamRequest, TeamDetail};
use crate::error::{MeetError, Result};
use crate::models::{Discipline, Event, Participant, RosterEntry, Team};
use crate::repository::Store;

/// What a roster entry stands for once looked up.
#[derive(Debug, Clone)]
pub enum Resolved {
    Individual(Participant),
    Team {
        team: Team,
        members: Vec<Participant>,
    },
}

impl Resolved {
    /// The individuals credited for this entry, in slot order for teams.
    pub fn members(&self) -> &[Participant] {
        match self {
            Self::Individual(participant) => std::slice::from_ref(participant),
            Self::Team { members, .. } => members,
        }
    }
}

/// Bridges team roster entries to the participants behind them.
#[derive(Clone)]
pub struct TeamResolver {
    store: Arc<dyn Store>,
    timeout: Duration,
}

impl TeamResolver {
    pub fn new(store: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn resolve(&self, entry: RosterEntry) -> Result<Resolved> {
        match entry {
            RosterEntry::Individual(id) => {
                let participant = self.participant(id).await?;
                Ok(Resolved::Individual(participant))
            }
            RosterEntry::Team(id) => {
                let team = self.team(id).await?;
                let members = self.members_of(&team).await?;
                Ok(Resolved::Team { team, members })
            }
        }
    }

    pub async fn get_team(&self, team_id: Uuid) -> Result<TeamDetail> {
        let team = timed(self.timeout, self.store.get_team(team_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Team {}", team_id)))?;
        let members = self.members_of(&team).await?;
        Ok(TeamDetail { team, members })
    }

    pub async fn list_teams(&self, event_id: Option<Uuid>) -> Result<Vec<Team>> {
        let teams = match event_id {
            Some(event_id) => timed(self.timeout, self.store.list_teams_for_event(event_id)).await?,
            None => timed(self.timeout, self.store.list_teams()).await?,
        };
        Ok(teams)
    }

    /// Members in slot order. A member that no longer resolves is an error.
    pub async fn members_of(&self, team: &Team) -> Result<Vec<Participant>> {
        let mut members = Vec::with_capacity(team.members.len());
        for id in &team.members {
            members.push(self.participant(*id).await?);
        }
        Ok(members)
    }

    /// Checks a proposed member list against a group event and returns the
    /// members in slot order.
    pub async fn validate_team(&self, event: &Event, member_ids: &[Uuid]) -> Result<Vec<Participant>> {
        if event.discipline != Discipline::Group {
            return Err(MeetError::Validation(format!(
                "'{}' is an individual event and takes no teams",
                event.name
            )));
        }

        let mut seen = HashSet::new();
        for id in member_ids {
            if !seen.insert(*id) {
                return Err(MeetError::Validation(format!(
                    "participant {} fills more than one slot",
                    id
                )));
            }
        }

        let expected = event.team_size.unwrap_or_default();
        if member_ids.len() != expected.max(0) as usize {
            return Err(MeetError::Validation(format!(
                "'{}' needs exactly {} members, got {}",
                event.name,
                expected,
                member_ids.len()
            )));
        }

        let mut members = Vec::with_capacity(member_ids.len());
        for id in member_ids {
            let participant = self.participant(*id).await?;
            if !event.gender_category.admits(participant.gender) {
                return Err(MeetError::invalid_participant(
                    *id,
                    format!(
                        "gender {} does not fit the {} category of '{}'",
                        participant.gender.as_str(),
                        event.gender_category.as_str(),
                        event.name
                    ),
                ));
            }
            members.push(participant);
        }

        Ok(members)
    }

    pub async fn register_team(&self, req: CreateTeamRequest) -> Result<TeamDetail> {
        req.validate()?;

        timed(self.timeout, self.store.get_department(req.department_id))
            .await?
            .ok_or_else(|| {
                MeetError::Validation(format!("department {} does not exist", req.department_id))
            })?;

        let event = timed(self.timeout, self.store.get_event(req.event_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Event {}", req.event_id)))?;
        if event.is_completed() {
            return Err(MeetError::invalid_state(format!(
                "'{}' is completed and takes no new teams",
                event.name
            )));
        }

        let members = self.validate_team(&event, &req.members).await?;

        let team = Team {
            team_id: Uuid::new_v4(),
            name: req.name.trim().to_string(),
            department_id: req.department_id,
            event_id: event.event_id,
            members: req.members,
            created_at: Utc::now().naive_utc(),
        };
        timed(self.timeout, self.store.insert_team(&team)).await?;

        info!(team_id = %team.team_id, event = %event.name, "Registered team");
        Ok(TeamDetail { team, members })
    }

    /// Team membership is fixed; edits are a delete followed by a new registration.
    /// A team already admitted to its event cannot be removed.
    pub async fn delete_team(&self, team_id: Uuid) -> Result<()> {
        let team = timed(self.timeout, self.store.get_team(team_id))
            .await?
            .ok_or_else(|| MeetError::NotFound(format!("Team {}", team_id)))?;

        if let Some(event) = timed(self.timeout, self.store.get_event(team.event_id)).await?
            && event.admission_roster().contains(&RosterEntry::Team(team_id))
        {
            return Err(MeetError::invalid_state(format!(
                "team '{}' is on the roster of '{}'",
                team.name, event.name
            )));
        }

        if !timed(self.timeout, self.store.delete_team(team_id)).await? {
            return Err(MeetError::NotFound(format!("Team {}", team_id)));
        }

        info!(team_id = %team_id, "Deleted team");
        Ok(())
    }

    /// Turns raw admission ids into roster entries of the event's kind, checking
    /// each one exists and that every individual behind it fits the event.
    pub async fn admission_entries(&self, event: &Event, ids: &[Uuid]) -> Result<Vec<RosterEntry>> {
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let entry = match event.discipline {
                Discipline::Individual => RosterEntry::Individual(*id),
                Discipline::Group => RosterEntry::Team(*id),
            };

            let resolved = self.resolve(entry).await?;
            if let Resolved::Team { team, .. } = &resolved
                && team.event_id != event.event_id
            {
                return Err(MeetError::invalid_participant(
                    *id,
                    format!("team '{}' was registered for another event", team.name),
                ));
            }
            for member in resolved.members() {
                if !event.gender_category.admits(member.gender) {
                    return Err(MeetError::invalid_participant(
                        *id,
                        format!(
                            "gender {} of {} does not fit the {} category of '{}'",
                            member.gender.as_str(),
                            member.name,
                            event.gender_category.as_str(),
                            event.name
                        ),
                    ));
                }
            }

            entries.push(entry);
        }
        Ok(entries)
    }

    async fn participant(&self, id: Uuid) -> Result<Participant> {
        timed(self.timeout, self.store.get_participant(id))
            .await?
            .ok_or_else(|| MeetError::invalid_participant(id, "no such participant"))
    }

    async fn team(&self, id: Uuid) -> Result<Team> {
        timed(self.timeout, self.store.get_team(id))
            .await?
            .ok_or_else(|| MeetError::invalid_participant(id, "no such team"))
    }
}
