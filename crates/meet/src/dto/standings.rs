use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ChestNumber, Gender, Medal, Rank};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MedalTally {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
}

impl MedalTally {
    pub fn add(&mut self, medal: Medal) {
        match medal {
            Medal::Gold => self.gold += 1,
            Medal::Silver => self.silver += 1,
            Medal::Bronze => self.bronze += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.gold + self.silver + self.bronze
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParticipantStats {
    pub participant_id: Uuid,
    pub name: String,
    pub chest_number: ChestNumber,
    pub department_id: Uuid,
    pub gender: Gender,
    pub points: i64,
    pub medals: MedalTally,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DepartmentStats {
    pub department_id: Uuid,
    pub name: String,
    pub code: String,
    pub points: i64,
    pub medals: MedalTally,
}

/// Full recomputed standings. Both lists are sorted by points descending, then
/// gold, silver and bronze counts, then name and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Standings {
    pub participants: Vec<ParticipantStats>,
    pub departments: Vec<DepartmentStats>,
}

impl Standings {
    pub fn participant(&self, participant_id: Uuid) -> Option<&ParticipantStats> {
        self.participants
            .iter()
            .find(|p| p.participant_id == participant_id)
    }

    pub fn department(&self, department_id: Uuid) -> Option<&DepartmentStats> {
        self.departments
            .iter()
            .find(|d| d.department_id == department_id)
    }

    /// Participants of one gender with at least one point or medal.
    pub fn leaderboard_for(&self, gender: Gender) -> Vec<&ParticipantStats> {
        self.participants
            .iter()
            .filter(|p| p.gender == gender && (p.points > 0 || p.medals.total() > 0))
            .collect()
    }
}

/// One scoring credit a participant received, the data a certificate needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Achievement {
    pub event_id: Uuid,
    pub event_name: String,
    pub round_name: String,
    pub rank: Rank,
    pub medal: Medal,
    pub points: i64,
    /// Set when the credit came through a team placement.
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    pub departments: Vec<DepartmentStats>,
    pub men: Vec<ParticipantStats>,
    pub women: Vec<ParticipantStats>,
}

impl From<Standings> for LeaderboardResponse {
    fn from(standings: Standings) -> Self {
        let men = standings
            .leaderboard_for(Gender::Male)
            .into_iter()
            .cloned()
            .collect();
        let women = standings
            .leaderboard_for(Gender::Female)
            .into_iter()
            .cloned()
            .collect();

        Self {
            departments: standings.departments,
            men,
            women,
        }
    }
}
