use colonyplan_protocol::{Blocker, ItemTypeId};
use thiserror::Error;

/// Structured refusal from the queue engine. The queue is untouched whenever
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{item} can never be built ({blocker:?})")]
    Infeasible { item: ItemTypeId, blocker: Blocker },
    #[error("{item} is locked ({blocker:?})")]
    Locked { item: ItemTypeId, blocker: Blocker },
    #[error("no valid queue position for {item} ({missing:?})")]
    NoValidPosition { item: ItemTypeId, missing: Blocker },
    #[error("structure {item} is already built or queued")]
    DuplicateStructure { item: ItemTypeId },
    #[error("{item} is provided automatically and cannot be queued")]
    NotQueueable { item: ItemTypeId },
    #[error("{item} is not in the queue")]
    NotQueued { item: ItemTypeId },
    #[error("moving {item} would leave {dependents:?} ahead of their prerequisites")]
    StrandsDependents {
        item: ItemTypeId,
        dependents: Vec<ItemTypeId>,
    },
}

impl PlanError {
    pub fn item(&self) -> ItemTypeId {
        match self {
            PlanError::Infeasible { item, .. }
            | PlanError::Locked { item, .. }
            | PlanError::NoValidPosition { item, .. }
            | PlanError::DuplicateStructure { item }
            | PlanError::NotQueueable { item }
            | PlanError::NotQueued { item }
            | PlanError::StrandsDependents { item, .. } => *item,
        }
    }

    /// The blocking reason to surface next to the refusal, when there is one.
    pub fn blocker(&self) -> Option<&Blocker> {
        match self {
            PlanError::Infeasible { blocker, .. } | PlanError::Locked { blocker, .. } => {
                Some(blocker)
            }
            PlanError::NoValidPosition { missing, .. } => Some(missing),
            _ => None,
        }
    }
}
