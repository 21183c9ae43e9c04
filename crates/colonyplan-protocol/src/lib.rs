//! Ids and value types shared between the planner core and its callers.
//!
//! Nothing in here knows how classification works; these are the shapes the
//! presentation layer reads (verdicts, blockers, annotated queue entries) and
//! the shape handed back to the game-state layer on commit.

mod ids;
mod types;

pub use crate::ids::*;
pub use crate::types::*;
