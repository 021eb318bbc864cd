// Decision stage: prompt building, oracle calls, reply parsing, resume checkpoint.
// All oracle calls go through the DecisionOracle trait, never reqwest directly.

pub mod checkpoint;
pub mod generator;
pub mod parser;
pub mod prompts;

pub use checkpoint::Checkpoint;
pub use generator::{generate_decisions, DecisionError, Decisions, GenerationOptions};
