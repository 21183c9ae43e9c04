use std::collections::{BTreeMap, HashMap};

use colonyplan_protocol::{CapabilityId, DataId, ItemCategory, ItemTypeId, ResourceId};
use serde::{Deserialize, Serialize};

use crate::rules::RulesError;

/// When a granted capability starts counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// Counts as soon as the item sits in the queue.
    #[default]
    Queued,
    /// Counts only once the colony reports the item built.
    Built,
}

fn default_grant_value() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCost {
    pub resource: String,
    pub amount: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGrant {
    pub capability: String,
    #[serde(default = "default_grant_value")]
    pub value: bool,
    #[serde(default)]
    pub scope: GrantScope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStructureType {
    pub name: String,
    /// Empty means the structure is provided automatically.
    #[serde(default)]
    pub cost: Vec<RawCost>,
    #[serde(default)]
    pub population: u32,
    #[serde(default)]
    pub upgrades_from: Option<String>,
    #[serde(default)]
    pub requires: BTreeMap<String, bool>,
    #[serde(default)]
    pub grants: Vec<RawGrant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUnitType {
    pub name: String,
    #[serde(default)]
    pub cost: Vec<RawCost>,
    #[serde(default)]
    pub population: u32,
    #[serde(default)]
    pub requires: BTreeMap<String, bool>,
    #[serde(default)]
    pub grants: Vec<RawGrant>,
}

/// Lookup tables shared by the per-item compile steps.
pub(crate) struct IdTables<'a> {
    pub items: &'a HashMap<DataId, ItemTypeId>,
    pub capabilities: &'a HashMap<DataId, CapabilityId>,
    pub resources: &'a HashMap<DataId, ResourceId>,
}

impl IdTables<'_> {
    fn costs(&self, raw: Vec<RawCost>) -> Result<Vec<ResourceCost>, RulesError> {
        raw.into_iter()
            .map(|c| {
                let resource = *self
                    .resources
                    .get(&c.resource)
                    .ok_or(RulesError::MissingId(c.resource))?;
                Ok(ResourceCost {
                    resource,
                    amount: c.amount,
                })
            })
            .collect()
    }

    fn requires(
        &self,
        raw: BTreeMap<String, bool>,
    ) -> Result<BTreeMap<CapabilityId, bool>, RulesError> {
        raw.into_iter()
            .map(|(cap, value)| {
                let id = *self
                    .capabilities
                    .get(&cap)
                    .ok_or(RulesError::MissingId(cap))?;
                Ok((id, value))
            })
            .collect()
    }

    fn grants(&self, raw: Vec<RawGrant>) -> Result<Vec<CapabilityGrant>, RulesError> {
        raw.into_iter()
            .map(|g| {
                let capability = *self
                    .capabilities
                    .get(&g.capability)
                    .ok_or(RulesError::MissingId(g.capability))?;
                Ok(CapabilityGrant {
                    capability,
                    value: g.value,
                    scope: g.scope,
                })
            })
            .collect()
    }
}

impl RawStructureType {
    pub(crate) fn compile(
        self,
        data_id: DataId,
        ids: &IdTables<'_>,
    ) -> Result<ItemType, RulesError> {
        let upgrades_from = match self.upgrades_from {
            Some(id) => Some(*ids.items.get(&id).ok_or(RulesError::MissingId(id))?),
            None => None,
        };
        // Family and tier are filled in once every upgrade link is known.
        let placeholder = *ids
            .items
            .get(&data_id)
            .ok_or_else(|| RulesError::MissingId(data_id.clone()))?;
        Ok(ItemType {
            data_id,
            name: self.name,
            category: ItemCategory::Structure,
            costs: ids.costs(self.cost)?,
            population_required: self.population,
            requires: ids.requires(self.requires)?,
            grants: ids.grants(self.grants)?,
            upgrades_from,
            family: placeholder,
            tier: 0,
        })
    }
}

impl RawUnitType {
    pub(crate) fn compile(
        self,
        data_id: DataId,
        ids: &IdTables<'_>,
    ) -> Result<ItemType, RulesError> {
        let own = *ids
            .items
            .get(&data_id)
            .ok_or_else(|| RulesError::MissingId(data_id.clone()))?;
        Ok(ItemType {
            data_id,
            name: self.name,
            category: ItemCategory::Unit,
            costs: ids.costs(self.cost)?,
            population_required: self.population,
            requires: ids.requires(self.requires)?,
            grants: ids.grants(self.grants)?,
            upgrades_from: None,
            family: own,
            tier: 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCost {
    pub resource: ResourceId,
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityGrant {
    pub capability: CapabilityId,
    pub value: bool,
    pub scope: GrantScope,
}

#[derive(Debug, Clone)]
pub struct ItemType {
    pub data_id: DataId,
    pub name: String,
    pub category: ItemCategory,
    pub costs: Vec<ResourceCost>,
    pub population_required: u32,
    pub requires: BTreeMap<CapabilityId, bool>,
    pub grants: Vec<CapabilityGrant>,
    /// Previous tier of the same structure family.
    pub upgrades_from: Option<ItemTypeId>,
    /// Root of the upgrade chain (the item itself for units and base tiers).
    pub family: ItemTypeId,
    /// Depth in the upgrade chain, root = 0.
    pub tier: u8,
}

impl ItemType {
    pub fn is_structure(&self) -> bool {
        self.category == ItemCategory::Structure
    }

    pub fn is_unit(&self) -> bool {
        self.category == ItemCategory::Unit
    }

    /// Items without a resource cost come for free and never enter a queue.
    pub fn is_free(&self) -> bool {
        self.costs.is_empty()
    }

    /// Does this item grant `capability` at `value`?
    ///
    /// With `queued_only`, grants scoped to built items are ignored.
    pub fn grants_capability(
        &self,
        capability: CapabilityId,
        value: bool,
        queued_only: bool,
    ) -> bool {
        self.grants.iter().any(|g| {
            g.capability == capability
                && g.value == value
                && (!queued_only || g.scope == GrantScope::Queued)
        })
    }
}
