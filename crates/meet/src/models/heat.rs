use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::event::Event;
use super::round::{HeatEntry, Rank, RoundStatus};
use crate::error::{MeetError, Result};

/// An edit to a heat draft. Every command except `ToggleQualified` is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HeatCommand {
    SetRank { id: Uuid, rank: Rank },
    ClearRank { id: Uuid },
    SetQualified { id: Uuid, qualified: bool },
    ToggleQualified { id: Uuid },
}

/// Unsaved outcomes for one heat of an event's current round.
///
/// Operators click through a heat, the draft absorbs the commands, and the
/// result is committed in one piece with [`Event::close_heat`] (or flushed by
/// [`Event::close_event`]).
#[derive(Debug, Clone)]
pub struct HeatDraft {
    round_index: usize,
    heat_number: u16,
    is_final: bool,
    entries: Vec<HeatEntry>,
}

impl HeatDraft {
    /// Starts a draft from the rows already stored for `heat_number`.
    pub fn new(event: &Event, heat_number: u16) -> Result<Self> {
        let round = event.current_round();
        if event.is_completed() || round.status == RoundStatus::Completed {
            return Err(MeetError::invalid_state(format!(
                "{} of '{}' no longer accepts heat results",
                round.name, event.name
            )));
        }

        let entries = round
            .heat(heat_number)
            .map(|p| HeatEntry {
                entry: p.entry,
                qualified: p.qualified,
                rank: p.rank,
            })
            .collect();

        Ok(Self {
            round_index: event.current_round_index(),
            heat_number,
            is_final: round.is_final,
            entries,
        })
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn heat_number(&self) -> u16 {
        self.heat_number
    }

    pub fn entries(&self) -> &[HeatEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HeatEntry> {
        self.entries
    }

    pub fn apply(&mut self, command: HeatCommand) -> Result<()> {
        match command {
            HeatCommand::SetRank { id, rank } => {
                self.require_final(true)?;
                let position = self.position(id)?;
                for (idx, other) in self.entries.iter_mut().enumerate() {
                    if idx != position && other.rank == Some(rank) {
                        other.rank = None;
                        other.qualified = false;
                    }
                }
                let entry = &mut self.entries[position];
                entry.rank = Some(rank);
                entry.qualified = true;
            }
            HeatCommand::ClearRank { id } => {
                self.require_final(true)?;
                let position = self.position(id)?;
                let entry = &mut self.entries[position];
                entry.rank = None;
                entry.qualified = false;
            }
            HeatCommand::SetQualified { id, qualified } => {
                self.require_final(false)?;
                let position = self.position(id)?;
                self.entries[position].qualified = qualified;
            }
            HeatCommand::ToggleQualified { id } => {
                self.require_final(false)?;
                let position = self.position(id)?;
                let entry = &mut self.entries[position];
                entry.qualified = !entry.qualified;
            }
        }
        Ok(())
    }

    fn require_final(&self, want_final: bool) -> Result<()> {
        match (want_final, self.is_final) {
            (true, false) => Err(MeetError::invalid_state(
                "ranks can only be recorded on the final round",
            )),
            (false, true) => Err(MeetError::invalid_state(
                "the final round records ranks, not qualification",
            )),
            _ => Ok(()),
        }
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.entry.id() == id)
            .ok_or_else(|| {
                MeetError::invalid_participant(id, format!("not in heat {}", self.heat_number))
            })
    }
}
