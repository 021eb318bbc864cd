pub mod applicant;
pub mod decision;
pub mod evidence;
pub mod roster;
