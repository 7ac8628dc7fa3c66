//! momentum-protocol is the shared plan model: the chunk and sub-step types
//! produced by generation and consumed by the diff engine and session state.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod plan;

pub use plan::{Chunk, EnergyTag, Plan, PlanShapeError, SubStep, parse_acceptance_criteria};
