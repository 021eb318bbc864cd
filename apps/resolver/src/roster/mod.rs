// Roster intake and the evidence left join.

pub mod columns;
pub mod merge;
pub mod reader;

pub use merge::merge_evidence;
pub use reader::{read_roster, RosterError};
