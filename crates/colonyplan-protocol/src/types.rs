use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{CapabilityId, ItemTypeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Structure,
    Unit,
}

/// The first gate that kept an item from being available.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Blocker {
    /// Colony is too small; population is expected to grow.
    Population { required: u32, current: u32 },
    /// A capability is not present yet, but something in the catalog grants it.
    Capability {
        capability: CapabilityId,
        required: bool,
    },
    /// The previous upgrade tier is neither built nor queued.
    Prerequisite { structure: ItemTypeId },
    /// Nothing in the catalog can ever grant this capability.
    NoProvider {
        capability: CapabilityId,
        required: bool,
    },
    /// The previous upgrade tier can never be built.
    DeadPrerequisite { structure: ItemTypeId },
}

impl Blocker {
    /// True for blockers that no amount of queue editing or colony growth can lift.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Blocker::NoProvider { .. } | Blocker::DeadPrerequisite { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Available,
    Locked(Blocker),
    Infeasible(Blocker),
    /// Colony-unique structure that is already built or already queued.
    Satisfied,
}

impl Verdict {
    pub fn blocker(&self) -> Option<&Blocker> {
        match self {
            Verdict::Locked(b) | Verdict::Infeasible(b) => Some(b),
            Verdict::Available | Verdict::Satisfied => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Verdict::Available)
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Verdict::Locked(_))
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, Verdict::Infeasible(_))
    }
}

/// Result of one classification pass over the whole catalog.
///
/// Free items (no resource cost) never appear here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub catalog_hash: u64,
    pub verdicts: BTreeMap<ItemTypeId, Verdict>,
}

impl Classification {
    pub fn verdict(&self, item: ItemTypeId) -> Option<&Verdict> {
        self.verdicts.get(&item)
    }

    /// "Why is this locked?" for tooltips.
    pub fn blocker(&self, item: ItemTypeId) -> Option<&Blocker> {
        self.verdicts.get(&item).and_then(Verdict::blocker)
    }

    pub fn available(&self) -> BTreeSet<ItemTypeId> {
        self.collect(Verdict::is_available)
    }

    pub fn locked(&self) -> BTreeSet<ItemTypeId> {
        self.collect(Verdict::is_locked)
    }

    pub fn infeasible(&self) -> BTreeSet<ItemTypeId> {
        self.collect(Verdict::is_infeasible)
    }

    pub fn satisfied(&self) -> BTreeSet<ItemTypeId> {
        self.collect(|v| matches!(v, Verdict::Satisfied))
    }

    fn collect(&self, pred: impl Fn(&Verdict) -> bool) -> BTreeSet<ItemTypeId> {
        self.verdicts
            .iter()
            .filter(|(_, v)| pred(v))
            .map(|(&id, _)| id)
            .collect()
    }
}

/// One queue slot as the list renderer sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub index: usize,
    pub item: ItemTypeId,
    /// Set when the entry cannot be built yet given the colony and the entries ahead of it.
    #[serde(default)]
    pub blocker: Option<Blocker>,
}

impl QueueEntryView {
    pub fn is_locked(&self) -> bool {
        self.blocker.is_some()
    }
}

/// What `remove` did to the queue.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalReport {
    pub item: Option<ItemTypeId>,
    /// Number of occurrences of `item` taken out.
    pub removed: usize,
    /// Entries dropped because their prerequisites went away, in eviction order.
    pub evicted: Vec<ItemTypeId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MoveOutcome {
    /// Target was inside the item's own block.
    Unchanged { index: usize },
    Moved { from: usize, to: usize },
}

/// The final ordered queue handed back to the game-state layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedQueue {
    pub catalog_hash: u64,
    pub items: Vec<ItemTypeId>,
}
