use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Discipline, Event, GenderCategory, HeatCommand, NewEvent, PointSchedule, Rank, RosterEntry,
    Round,
};

/// Request payload for creating a new event
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEventRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    pub discipline: Discipline,

    pub gender_category: GenderCategory,

    #[serde(default)]
    pub points: PointSchedule,

    /// Required for group events, forbidden for individual ones.
    pub team_size: Option<i16>,
}

impl CreateEventRequest {
    /// Additional validation that requires multiple fields
    pub fn validate_shape(&self) -> Result<(), &'static str> {
        match (self.discipline, self.team_size) {
            (Discipline::Group, None) => return Err("Group events require a team size"),
            (Discipline::Group, Some(size)) if size < 2 => {
                return Err("Team size must be at least 2");
            }
            (Discipline::Individual, Some(_)) => {
                return Err("Individual events cannot have a team size");
            }
            _ => {}
        }

        let points = [self.points.first, self.points.second, self.points.third];
        if points.iter().flatten().any(|p| *p < 0) {
            return Err("Points cannot be negative");
        }

        Ok(())
    }
}

impl From<CreateEventRequest> for NewEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            discipline: req.discipline,
            gender_category: req.gender_category,
            points: req.points,
            team_size: req.team_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdmitRosterRequest {
    /// Participant ids for individual events, team ids for group events.
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpenHeatRequest {
    pub heat_number: u16,
    pub ids: Vec<Uuid>,
}

/// Outcome of one roster id when a heat is submitted wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeatOutcome {
    pub id: Uuid,
    #[serde(default)]
    pub qualified: bool,
    #[serde(default)]
    pub rank: Option<Rank>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CloseHeatRequest {
    pub entries: Vec<HeatOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HeatCommandsRequest {
    pub commands: Vec<HeatCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordQualificationRequest {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordRankRequest {
    pub id: Uuid,
    pub rank: Rank,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QualificationResponse {
    pub id: Uuid,
    pub qualified: bool,
}

/// `rank` is absent when the call cleared the entry's previous rank.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RankResponse {
    pub id: Uuid,
    pub rank: Option<Rank>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AdvanceRoundRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCurrentRoundRequest {
    pub name: Option<String>,
    pub is_final: Option<bool>,
}

/// A heat still being edited when the event is closed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PendingHeat {
    pub heat_number: u16,
    pub commands: Vec<HeatCommand>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CloseEventRequest {
    pub pending_heat: Option<PendingHeat>,
}

/// Read model of one round: its rows plus who may still be placed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoundSnapshot {
    pub event_id: Uuid,
    pub round_index: usize,
    pub is_current: bool,
    pub round: Round,
    pub eligible: Vec<RosterEntry>,
    pub unassigned: Vec<RosterEntry>,
}

impl RoundSnapshot {
    pub fn of(event: &Event, round_index: usize, eligible: Vec<RosterEntry>) -> Option<Self> {
        let round = event.rounds().get(round_index)?.clone();
        let is_current = round_index == event.current_round_index() && !event.is_completed();
        let unassigned = if is_current {
            event.unassigned_entries()
        } else {
            Vec::new()
        };

        Some(Self {
            event_id: event.event_id,
            round_index,
            is_current,
            round,
            eligible,
            unassigned,
        })
    }
}
