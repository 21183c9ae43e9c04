use std::collections::{BTreeMap, HashMap};

use colonyplan_protocol::{Blocker, CapabilityId, DataId, ItemTypeId, ResourceId};

use crate::colony::ColonyView;
use crate::error::PlanError;
use crate::rules::ItemType;

/// Compiled, read-only registry of every item-type.
///
/// Built once by [`crate::load_catalog`]; the planner never mutates it.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub items: Vec<ItemType>,
    pub capabilities: Vec<DataId>,
    pub resources: Vec<DataId>,

    pub item_ids: HashMap<DataId, ItemTypeId>,
    pub capability_ids: HashMap<DataId, CapabilityId>,
    pub resource_ids: HashMap<DataId, ResourceId>,

    /// Deterministic hash of the compiled content.
    pub catalog_hash: u64,

    pub(crate) evaluation_order: Vec<ItemTypeId>,
    /// Position of each item in `evaluation_order`, indexed by raw id.
    pub(crate) evaluation_rank: Vec<u32>,
    pub(crate) providers: HashMap<(CapabilityId, bool), Vec<ItemTypeId>>,
    /// Capabilities granted by free structures, in every scope.
    pub(crate) base_capabilities: BTreeMap<CapabilityId, bool>,
}

impl Catalog {
    /// # Panics
    ///
    /// Panics if `id` did not come from this catalog.
    pub fn item(&self, id: ItemTypeId) -> &ItemType {
        &self.items[id.raw as usize]
    }

    pub fn contains(&self, id: ItemTypeId) -> bool {
        (id.raw as usize) < self.items.len()
    }

    pub fn item_id(&self, data_id: &str) -> Option<ItemTypeId> {
        self.item_ids.get(data_id).copied()
    }

    pub fn capability_id(&self, data_id: &str) -> Option<CapabilityId> {
        self.capability_ids.get(data_id).copied()
    }

    pub fn capability_name(&self, id: CapabilityId) -> &str {
        &self.capabilities[id.raw as usize]
    }

    pub fn resource_name(&self, id: ResourceId) -> &str {
        &self.resources[id.raw as usize]
    }

    /// Structures first, then units; prerequisites and providers always precede
    /// the items that depend on them within each half.
    pub fn evaluation_order(&self) -> &[ItemTypeId] {
        &self.evaluation_order
    }

    pub fn evaluated_before(&self, a: ItemTypeId, b: ItemTypeId) -> bool {
        self.evaluation_rank[a.raw as usize] < self.evaluation_rank[b.raw as usize]
    }

    pub fn structures(&self) -> impl Iterator<Item = ItemTypeId> + '_ {
        self.evaluation_order
            .iter()
            .copied()
            .filter(|&id| self.item(id).is_structure())
    }

    pub fn units(&self) -> impl Iterator<Item = ItemTypeId> + '_ {
        self.evaluation_order
            .iter()
            .copied()
            .filter(|&id| self.item(id).is_unit())
    }

    /// Every item-type that grants `capability` at `value`, in either scope.
    pub fn providers(&self, capability: CapabilityId, value: bool) -> &[ItemTypeId] {
        self.providers
            .get(&(capability, value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Does the colony hold `capability` at `required`?
    ///
    /// A value the colony reports wins; otherwise grants of free structures
    /// apply, and anything still unset reads as `false`.
    pub fn holds(
        &self,
        colony: &dyn ColonyView,
        capability: CapabilityId,
        required: bool,
    ) -> bool {
        colony
            .capability(capability)
            .or_else(|| self.base_capabilities.get(&capability).copied())
            .unwrap_or(false)
            == required
    }

    /// True when the colony already has `structure` or a later tier of its family.
    ///
    /// Free structures count as built: they are provided automatically.
    pub fn structure_built(&self, colony: &dyn ColonyView, structure: ItemTypeId) -> bool {
        let item = self.item(structure);
        if item.is_free() || colony.has_structure(structure) {
            return true;
        }
        colony
            .built_tier(item.family)
            .is_some_and(|built| self.item(built).tier >= item.tier)
    }

    /// Human-readable text for a blocker, for tooltips and CLI output.
    pub fn describe(&self, blocker: &Blocker) -> String {
        match blocker {
            Blocker::Population { required, current } => {
                format!("requires population {required} (colony has {current})")
            }
            Blocker::Capability {
                capability,
                required,
            } => {
                let verb = if *required { "requires" } else { "must lack" };
                format!("{verb} {}, not yet present", self.capability_name(*capability))
            }
            Blocker::Prerequisite { structure } => {
                format!("requires {}, not yet queued", self.item(*structure).name)
            }
            Blocker::NoProvider {
                capability,
                required,
            } => {
                let state = if *required { "granted" } else { "removed" };
                format!(
                    "{} can never be {state} in this colony",
                    self.capability_name(*capability)
                )
            }
            Blocker::DeadPrerequisite { structure } => {
                format!(
                    "upgrades from {}, which can never be built",
                    self.item(*structure).name
                )
            }
        }
    }

    /// Human-readable text for a refused queue edit, naming items by display name.
    pub fn describe_refusal(&self, err: &PlanError) -> String {
        let name = &self.item(err.item()).name;
        match err {
            PlanError::Infeasible { blocker, .. } => {
                format!("{name} can never be built: {}", self.describe(blocker))
            }
            PlanError::Locked { blocker, .. } => {
                format!("{name} is locked: {}", self.describe(blocker))
            }
            PlanError::NoValidPosition { missing, .. } => {
                format!("{name} has no valid queue position: {}", self.describe(missing))
            }
            PlanError::DuplicateStructure { .. } => {
                format!("{name} is already built or queued")
            }
            PlanError::NotQueueable { .. } => {
                format!("{name} is provided automatically")
            }
            PlanError::NotQueued { .. } => format!("{name} is not in the queue"),
            PlanError::StrandsDependents { dependents, .. } => {
                let names: Vec<&str> = dependents
                    .iter()
                    .map(|&d| self.item(d).name.as_str())
                    .collect();
                format!(
                    "moving {name} would leave {} ahead of their prerequisites",
                    names.join(", ")
                )
            }
        }
    }
}
