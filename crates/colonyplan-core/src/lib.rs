//! Colony build-queue planner.
//!
//! Given a compiled [`Catalog`] of structures and produced units, a point-in-time
//! [`ColonyView`], and the user's production queue, the planner decides which
//! items are available, locked or infeasible, where an item may legally sit in
//! the queue, and keeps the queue ordered as it is edited.
//!
//! The planner is synchronous and single-threaded. A [`PlannerSession`] owns the
//! queue and the infeasible memo for one editing session; the colony snapshot is
//! passed to every call because the game-state layer refreshes it between calls.

mod catalog;
mod classify;
mod colony;
pub mod config;
mod error;
mod hash;
mod placement;
mod queue;
mod rules;

pub use crate::catalog::*;
pub use crate::classify::*;
pub use crate::colony::*;
pub use crate::config::{MemoPolicy, PlannerConfig, RemoveMode};
pub use crate::error::*;
pub use crate::placement::*;
pub use crate::queue::*;
pub use crate::rules::*;

pub use colonyplan_protocol as protocol;
