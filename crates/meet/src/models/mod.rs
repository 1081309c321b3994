pub mod department;
pub mod event;
pub mod heat;
pub mod participant;
pub mod round;
pub mod team;

pub use department::Department;
pub use event::{Discipline, Event, EventParts, EventStatus, GenderCategory, NewEvent, PointSchedule};
pub use heat::{HeatCommand, HeatDraft};
pub use participant::{ChestNumber, Gender, Participant};
pub use round::{HeatEntry, Medal, Rank, RosterEntry, Round, RoundParticipant, RoundStatus};
pub use team::Team;
