use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::heat::HeatDraft;
use super::participant::Gender;
use super::round::{HeatEntry, Rank, RosterEntry, Round, RoundParticipant, RoundStatus};
use crate::error::{MeetError, Result, StorageError, StorageResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    Individual,
    Group,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Group => "group",
        }
    }
}

impl FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "individual" => Ok(Self::Individual),
            "group" => Ok(Self::Group),
            other => Err(format!("unknown discipline '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum GenderCategory {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "MX")]
    Mixed,
}

impl GenderCategory {
    pub fn admits(&self, gender: Gender) -> bool {
        match self {
            Self::Male => gender == Gender::Male,
            Self::Female => gender == Gender::Female,
            Self::Mixed => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Mixed => "MX",
        }
    }
}

impl FromStr for GenderCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "M" => Ok(Self::Male),
            "F" => Ok(Self::Female),
            "MX" => Ok(Self::Mixed),
            other => Err(format!("unknown gender category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown event status '{}'", other)),
        }
    }
}

/// Points awarded per podium place. Unset places fall back to the
/// discipline default (5/3/1 individual, 10/6/4 group).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PointSchedule {
    pub first: Option<i32>,
    pub second: Option<i32>,
    pub third: Option<i32>,
}

impl PointSchedule {
    pub fn new(first: i32, second: i32, third: i32) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
            third: Some(third),
        }
    }

    pub fn points_for(&self, rank: Rank, discipline: Discipline) -> i32 {
        let (configured, fallback) = match (rank.get(), discipline) {
            (1, Discipline::Individual) => (self.first, 5),
            (2, Discipline::Individual) => (self.second, 3),
            (_, Discipline::Individual) => (self.third, 1),
            (1, Discipline::Group) => (self.first, 10),
            (2, Discipline::Group) => (self.second, 6),
            (_, Discipline::Group) => (self.third, 4),
        };
        configured.unwrap_or(fallback)
    }
}

/// Everything needed to create an event. Round 1 is seeded automatically.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub discipline: Discipline,
    pub gender_category: GenderCategory,
    pub points: PointSchedule,
    pub team_size: Option<i16>,
}

/// Aggregate root for one event and its rounds.
///
/// Round state is private: it changes only through the operations below, each of
/// which either applies completely or returns an error without touching `self`.
/// Stores persist the whole aggregate and use `version` as an optimistic lock.
/// Stores rebuild it from [`EventParts`]; it is serialized but never deserialized.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Event {
    pub event_id: Uuid,
    pub name: String,
    pub discipline: Discipline,
    pub gender_category: GenderCategory,
    pub points: PointSchedule,
    pub team_size: Option<i16>,
    pub created_at: NaiveDateTime,
    status: EventStatus,
    rounds: Vec<Round>,
    current_round_index: usize,
    admission_roster: Vec<RosterEntry>,
    winners: Vec<RosterEntry>,
    version: i64,
}

/// Raw persisted state, used by stores to rebuild an [`Event`].
#[derive(Debug, Clone)]
pub struct EventParts {
    pub event_id: Uuid,
    pub name: String,
    pub discipline: Discipline,
    pub gender_category: GenderCategory,
    pub points: PointSchedule,
    pub team_size: Option<i16>,
    pub created_at: NaiveDateTime,
    pub status: EventStatus,
    pub rounds: Vec<Round>,
    pub current_round_index: usize,
    pub admission_roster: Vec<RosterEntry>,
    pub winners: Vec<RosterEntry>,
    pub version: i64,
}

impl Event {
    pub fn new(new: NewEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            name: new.name,
            discipline: new.discipline,
            gender_category: new.gender_category,
            points: new.points,
            team_size: new.team_size,
            created_at: chrono::Utc::now().naive_utc(),
            status: EventStatus::Upcoming,
            rounds: vec![Round::new(1, Round::default_name(1), false)],
            current_round_index: 0,
            admission_roster: Vec::new(),
            winners: Vec::new(),
            version: 0,
        }
    }

    /// Rebuilds a stored event, rejecting state no operation could have produced.
    pub(crate) fn from_parts(parts: EventParts) -> StorageResult<Self> {
        if parts.current_round_index >= parts.rounds.len() {
            return Err(StorageError::Corrupt(format!(
                "event {} points at missing round {}",
                parts.event_id, parts.current_round_index
            )));
        }

        Ok(Self {
            event_id: parts.event_id,
            name: parts.name,
            discipline: parts.discipline,
            gender_category: parts.gender_category,
            points: parts.points,
            team_size: parts.team_size,
            created_at: parts.created_at,
            status: parts.status,
            rounds: parts.rounds,
            current_round_index: parts.current_round_index,
            admission_roster: parts.admission_roster,
            winners: parts.winners,
            version: parts.version,
        })
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn current_round_index(&self) -> usize {
        self.current_round_index
    }

    pub fn current_round(&self) -> &Round {
        &self.rounds[self.current_round_index]
    }

    pub fn admission_roster(&self) -> &[RosterEntry] {
        &self.admission_roster
    }

    pub fn winners(&self) -> &[RosterEntry] {
        &self.winners
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    pub fn is_completed(&self) -> bool {
        self.status == EventStatus::Completed
    }

    /// Maps a raw id to the roster entry it was admitted as.
    pub fn entry_for(&self, id: Uuid) -> Result<RosterEntry> {
        self.admission_roster
            .iter()
            .copied()
            .find(|entry| entry.id() == id)
            .ok_or_else(|| MeetError::invalid_participant(id, "not admitted to this event"))
    }

    /// Round 0 draws from the admission roster; every later round from the
    /// entries that qualified out of the previous one.
    pub fn eligible_roster(&self, round_index: usize) -> Result<Vec<RosterEntry>> {
        if round_index >= self.rounds.len() {
            return Err(MeetError::invalid_state(format!(
                "round index {} does not exist (event has {} rounds)",
                round_index,
                self.rounds.len()
            )));
        }

        if round_index == 0 {
            Ok(self.admission_roster.clone())
        } else {
            Ok(self.rounds[round_index - 1].qualified_entries())
        }
    }

    /// Eligible entries of the current round that have not been placed in a heat.
    pub fn unassigned_entries(&self) -> Vec<RosterEntry> {
        if self.is_completed() {
            return Vec::new();
        }

        let round = self.current_round();
        self.eligible_roster(self.current_round_index)
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| round.heat_of(*entry).is_none())
            .collect()
    }

    pub fn admit_roster(&mut self, entries: Vec<RosterEntry>) -> Result<()> {
        self.ensure_mutable()?;

        if self.current_round_index > 0 || self.rounds[0].status == RoundStatus::Completed {
            return Err(MeetError::invalid_state(
                "admission closes once the first round is completed",
            ));
        }

        let expect_team = self.discipline == Discipline::Group;
        let mut seen = HashSet::new();
        let mut roster = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.is_team() != expect_team {
                return Err(MeetError::invalid_participant(
                    entry.id(),
                    format!("a {} event cannot admit a {}", self.discipline.as_str(), entry),
                ));
            }
            if seen.insert(entry) {
                roster.push(entry);
            }
        }

        if let Some(stranded) = self.rounds[0]
            .participants
            .iter()
            .find(|p| !seen.contains(&p.entry))
        {
            return Err(MeetError::invalid_state(format!(
                "{} is already placed in heat {} and cannot be removed from the roster",
                stranded.entry, stranded.heat_number
            )));
        }

        self.admission_roster = roster;
        Ok(())
    }

    pub fn open_heat(
        &mut self,
        round_index: usize,
        entries: &[RosterEntry],
        heat_number: u16,
    ) -> Result<()> {
        ensure_heat_number(heat_number)?;
        self.writable_round(round_index)?;
        let eligible: HashSet<RosterEntry> =
            self.eligible_roster(round_index)?.into_iter().collect();

        let round = &self.rounds[round_index];
        let mut additions = Vec::new();
        for entry in entries {
            if !eligible.contains(entry) {
                return Err(MeetError::invalid_participant(
                    entry.id(),
                    format!("not eligible for {}", round.name),
                ));
            }
            match round.heat_of(*entry) {
                Some(existing) if existing != heat_number => {
                    return Err(MeetError::invalid_participant(
                        entry.id(),
                        format!("already placed in heat {} of {}", existing, round.name),
                    ));
                }
                Some(_) => {}
                None if additions.contains(entry) => {}
                None => additions.push(*entry),
            }
        }

        let round = &mut self.rounds[round_index];
        round
            .participants
            .extend(additions.into_iter().map(|entry| RoundParticipant {
                entry,
                heat_number,
                qualified: false,
                rank: None,
            }));
        self.activate(round_index);
        Ok(())
    }

    /// Flips the qualified flag of an entry in a non-final round and returns the new value.
    pub fn record_qualification(
        &mut self,
        round_index: usize,
        entry: RosterEntry,
        heat_number: u16,
    ) -> Result<bool> {
        let round = self.writable_round(round_index)?;
        if round.is_final {
            return Err(MeetError::invalid_state(format!(
                "{} is the final round; record ranks instead of qualification",
                round.name
            )));
        }

        let row = round
            .participants
            .iter_mut()
            .find(|p| p.entry == entry && p.heat_number == heat_number)
            .ok_or_else(|| {
                MeetError::invalid_participant(entry.id(), format!("not in heat {}", heat_number))
            })?;
        row.qualified = !row.qualified;
        Ok(row.qualified)
    }

    /// Assigns `rank` to an entry of the final round, displacing any previous
    /// holder. Assigning the rank the entry already holds clears it. Returns the
    /// entry's rank afterwards.
    pub fn record_rank(
        &mut self,
        round_index: usize,
        entry: RosterEntry,
        heat_number: u16,
        rank: Rank,
    ) -> Result<Option<Rank>> {
        let round = self.writable_round(round_index)?;
        if !round.is_final {
            return Err(MeetError::invalid_state(format!(
                "ranks can only be recorded on the final round, not {}",
                round.name
            )));
        }

        let position = round
            .participants
            .iter()
            .position(|p| p.entry == entry && p.heat_number == heat_number)
            .ok_or_else(|| {
                MeetError::invalid_participant(entry.id(), format!("not in heat {}", heat_number))
            })?;

        if round.participants[position].rank == Some(rank) {
            let row = &mut round.participants[position];
            row.rank = None;
            row.qualified = false;
            return Ok(None);
        }

        for other in round.participants.iter_mut() {
            if other.rank == Some(rank) {
                other.rank = None;
                other.qualified = false;
            }
        }
        let row = &mut round.participants[position];
        row.rank = Some(rank);
        row.qualified = true;
        Ok(Some(rank))
    }

    /// Replaces every row of `heat_number` in the round with `entries`.
    pub fn close_heat(
        &mut self,
        round_index: usize,
        heat_number: u16,
        entries: Vec<HeatEntry>,
    ) -> Result<()> {
        ensure_heat_number(heat_number)?;
        self.writable_round(round_index)?;
        let eligible: HashSet<RosterEntry> =
            self.eligible_roster(round_index)?.into_iter().collect();
        let round = &self.rounds[round_index];

        let mut seen = HashSet::new();
        let mut ranks = HashSet::new();
        for item in &entries {
            if !seen.insert(item.entry) {
                return Err(MeetError::Validation(format!(
                    "{} appears more than once in heat {}",
                    item.entry, heat_number
                )));
            }
            if !eligible.contains(&item.entry) {
                return Err(MeetError::invalid_participant(
                    item.entry.id(),
                    format!("not eligible for {}", round.name),
                ));
            }
            if let Some(existing) = round.heat_of(item.entry)
                && existing != heat_number
            {
                return Err(MeetError::invalid_participant(
                    item.entry.id(),
                    format!("already placed in heat {} of {}", existing, round.name),
                ));
            }
            if let Some(rank) = item.rank {
                if !round.is_final {
                    return Err(MeetError::invalid_state(format!(
                        "ranks can only be recorded on the final round, not {}",
                        round.name
                    )));
                }
                if !ranks.insert(rank) {
                    return Err(MeetError::Validation(format!(
                        "rank {} is assigned twice in heat {}",
                        rank.get(),
                        heat_number
                    )));
                }
            }
        }

        let is_final = round.is_final;
        let round = &mut self.rounds[round_index];
        round.participants.retain(|p| p.heat_number != heat_number);
        for other in round.participants.iter_mut() {
            if let Some(rank) = other.rank
                && ranks.contains(&rank)
            {
                other.rank = None;
                other.qualified = false;
            }
        }
        round
            .participants
            .extend(entries.into_iter().map(|item| RoundParticipant {
                entry: item.entry,
                heat_number,
                qualified: if is_final {
                    item.rank.is_some()
                } else {
                    item.qualified
                },
                rank: item.rank,
            }));
        self.activate(round_index);
        Ok(())
    }

    /// Completes the current round and appends the next one.
    pub fn advance_round(&mut self, next_name: Option<String>, is_final: bool) -> Result<&Round> {
        self.ensure_mutable()?;
        let current = &self.rounds[self.current_round_index];
        if current.is_final {
            return Err(MeetError::invalid_state(format!(
                "{} is the final round; close the event instead",
                current.name
            )));
        }
        if current.qualified_entries().is_empty() {
            return Err(MeetError::invalid_state(format!(
                "{} has no qualified entries to advance",
                current.name
            )));
        }

        let sequence = self.current_round_index as u32 + 2;
        let name = match next_name.map(|n| n.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            _ if is_final => "Final".to_string(),
            _ => Round::default_name(sequence),
        };

        self.rounds[self.current_round_index].status = RoundStatus::Completed;
        self.rounds.push(Round::new(sequence, name, is_final));
        self.current_round_index += 1;
        Ok(&self.rounds[self.current_round_index])
    }

    pub fn rename_current_round(&mut self, name: &str) -> Result<()> {
        self.ensure_mutable()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MeetError::Validation("round name cannot be empty".to_string()));
        }
        self.rounds[self.current_round_index].name = name.to_string();
        Ok(())
    }

    pub fn mark_current_round_final(&mut self, is_final: bool) -> Result<()> {
        self.ensure_mutable()?;
        let round = &mut self.rounds[self.current_round_index];
        if !is_final && round.has_ranks() {
            return Err(MeetError::invalid_state(format!(
                "{} already carries ranks and must stay the final round",
                round.name
            )));
        }
        if is_final && !round.is_final && round.participants.iter().any(|p| p.qualified) {
            return Err(MeetError::invalid_state(format!(
                "{} already has qualified entries and cannot become the final round",
                round.name
            )));
        }
        round.is_final = is_final;
        Ok(())
    }

    /// Flushes a pending heat, completes the current round and settles the
    /// winners. No round mutation is legal afterwards.
    pub fn close_event(&mut self, pending: Option<HeatDraft>) -> Result<()> {
        self.ensure_mutable()?;

        if let Some(draft) = pending {
            if draft.round_index() != self.current_round_index {
                return Err(MeetError::invalid_state(format!(
                    "pending heat belongs to round index {}, current is {}",
                    draft.round_index(),
                    self.current_round_index
                )));
            }
            let heat_number = draft.heat_number();
            self.close_heat(self.current_round_index, heat_number, draft.into_entries())?;
        }

        let round = &mut self.rounds[self.current_round_index];
        round.status = RoundStatus::Completed;
        self.winners = round.podium().into_iter().map(|(_, entry)| entry).collect();
        self.status = EventStatus::Completed;
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_completed() {
            return Err(MeetError::invalid_state(format!(
                "event '{}' is completed",
                self.name
            )));
        }
        Ok(())
    }

    fn writable_round(&mut self, round_index: usize) -> Result<&mut Round> {
        self.ensure_mutable()?;
        if round_index != self.current_round_index {
            return Err(MeetError::invalid_state(format!(
                "round index {} is not the current round ({})",
                round_index, self.current_round_index
            )));
        }
        let round = &mut self.rounds[round_index];
        if round.status == RoundStatus::Completed {
            return Err(MeetError::invalid_state(format!(
                "{} is completed",
                round.name
            )));
        }
        Ok(round)
    }

    fn activate(&mut self, round_index: usize) {
        let round = &mut self.rounds[round_index];
        if round.status == RoundStatus::Pending {
            round.status = RoundStatus::Active;
        }
        if self.status == EventStatus::Upcoming {
            self.status = EventStatus::Ongoing;
        }
    }
}

fn ensure_heat_number(heat_number: u16) -> Result<()> {
    if heat_number == 0 {
        return Err(MeetError::Validation("heat numbers start at 1".to_string()));
    }
    Ok(())
}
