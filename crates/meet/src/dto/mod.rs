pub mod department;
pub mod event;
pub mod participant;
pub mod standings;
pub mod team;
