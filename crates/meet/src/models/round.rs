use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// What a roster slot refers to. Resolved once at admission time so later reads
/// never have to probe the participant and team collections.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RosterEntry {
    Individual(Uuid),
    Team(Uuid),
}

impl RosterEntry {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Individual(id) | Self::Team(id) => *id,
        }
    }

    pub fn is_team(&self) -> bool {
        matches!(self, Self::Team(_))
    }
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Individual(id) => write!(f, "individual {}", id),
            Self::Team(id) => write!(f, "team {}", id),
        }
    }
}

/// A podium place, 1 to 3.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rank(u8);

impl Rank {
    pub const FIRST: Rank = Rank(1);
    pub const SECOND: Rank = Rank(2);
    pub const THIRD: Rank = Rank(3);

    pub fn new(place: u8) -> Option<Self> {
        (1..=3).contains(&place).then_some(Self(place))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn medal(self) -> Medal {
        match self.0 {
            1 => Medal::Gold,
            2 => Medal::Silver,
            _ => Medal::Bronze,
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = String;

    fn try_from(place: u8) -> Result<Self, Self::Error> {
        Rank::new(place).ok_or_else(|| format!("rank must be 1, 2 or 3, got {}", place))
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Medal {
    Gold,
    Silver,
    Bronze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

/// One roster entry's placement and outcome within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoundParticipant {
    pub entry: RosterEntry,
    pub heat_number: u16,
    pub qualified: bool,
    /// Only ever set on the final round.
    pub rank: Option<Rank>,
}

/// Outcome of one entry as submitted when a heat is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HeatEntry {
    pub entry: RosterEntry,
    #[serde(default)]
    pub qualified: bool,
    #[serde(default)]
    pub rank: Option<Rank>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Round {
    pub round_id: Uuid,
    pub name: String,
    /// 1-based and dense within the event.
    pub sequence: u32,
    pub status: RoundStatus,
    pub is_final: bool,
    pub participants: Vec<RoundParticipant>,
}

impl Round {
    pub(crate) fn new(sequence: u32, name: String, is_final: bool) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            name,
            sequence,
            status: RoundStatus::Pending,
            is_final,
            participants: Vec::new(),
        }
    }

    pub fn default_name(sequence: u32) -> String {
        format!("Round {}", sequence)
    }

    pub fn heat_of(&self, entry: RosterEntry) -> Option<u16> {
        self.participants
            .iter()
            .find(|p| p.entry == entry)
            .map(|p| p.heat_number)
    }

    pub fn heats(&self) -> BTreeSet<u16> {
        self.participants.iter().map(|p| p.heat_number).collect()
    }

    pub fn heat(&self, heat_number: u16) -> impl Iterator<Item = &RoundParticipant> {
        self.participants
            .iter()
            .filter(move |p| p.heat_number == heat_number)
    }

    /// Entries that advance out of this round, ordered by heat then insertion.
    pub fn qualified_entries(&self) -> Vec<RosterEntry> {
        let mut qualified: Vec<&RoundParticipant> =
            self.participants.iter().filter(|p| p.qualified).collect();
        qualified.sort_by_key(|p| p.heat_number);
        qualified.into_iter().map(|p| p.entry).collect()
    }

    pub fn holder_of(&self, rank: Rank) -> Option<RosterEntry> {
        self.participants
            .iter()
            .find(|p| p.rank == Some(rank))
            .map(|p| p.entry)
    }

    pub fn has_ranks(&self) -> bool {
        self.participants.iter().any(|p| p.rank.is_some())
    }

    /// Ranked entries ordered 1st, 2nd, 3rd.
    pub fn podium(&self) -> Vec<(Rank, RosterEntry)> {
        let mut podium: Vec<(Rank, RosterEntry)> = self
            .participants
            .iter()
            .filter_map(|p| p.rank.map(|r| (r, p.entry)))
            .collect();
        podium.sort_by_key(|(rank, _)| *rank);
        podium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_bounds() {
        assert!(Rank::new(0).is_none());
        assert_eq!(Rank::new(2), Some(Rank::SECOND));
        assert!(Rank::new(4).is_none());
        assert!(Rank::try_from(7).is_err());
    }

    #[test]
    fn test_rank_medals() {
        assert_eq!(Rank::FIRST.medal(), Medal::Gold);
        assert_eq!(Rank::SECOND.medal(), Medal::Silver);
        assert_eq!(Rank::THIRD.medal(), Medal::Bronze);
    }

    #[test]
    fn test_rank_rejects_out_of_range_json() {
        assert!(serde_json::from_str::<Rank>("3").is_ok());
        assert!(serde_json::from_str::<Rank>("4").is_err());
    }

    #[test]
    fn test_roster_entry_wire_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(RosterEntry::Team(id)).unwrap();
        assert_eq!(json["kind"], "team");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn test_qualified_entries_follow_heat_order() {
        let a = RosterEntry::Individual(Uuid::new_v4());
        let b = RosterEntry::Individual(Uuid::new_v4());
        let c = RosterEntry::Individual(Uuid::new_v4());
        let mut round = Round::new(1, Round::default_name(1), false);
        round.participants = vec![
            RoundParticipant { entry: a, heat_number: 2, qualified: true, rank: None },
            RoundParticipant { entry: b, heat_number: 1, qualified: false, rank: None },
            RoundParticipant { entry: c, heat_number: 1, qualified: true, rank: None },
        ];

        assert_eq!(round.qualified_entries(), vec![c, a]);
        assert_eq!(round.heats().into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }
}
