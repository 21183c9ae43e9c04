use std::collections::BTreeMap;

use colonyplan_protocol::{CapabilityId, ItemTypeId};
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::Catalog;

/// Point-in-time read of a colony, supplied by the game-state layer.
///
/// The planner never mutates the colony; callers refresh the snapshot before
/// each planner call.
pub trait ColonyView {
    fn population(&self) -> u32;

    /// Polarity the colony currently holds for `capability`, `None` when unset.
    fn capability(&self, capability: CapabilityId) -> Option<bool>;

    /// Currently built tier of the structure family rooted at `family`.
    fn built_tier(&self, family: ItemTypeId) -> Option<ItemTypeId>;

    /// Whether this exact structure instance exists in the colony.
    fn has_structure(&self, structure: ItemTypeId) -> bool;

    /// Unset capabilities read as `false`.
    fn satisfies(&self, capability: CapabilityId, required: bool) -> bool {
        self.capability(capability).unwrap_or(false) == required
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unknown structure: {0}")]
    UnknownStructure(String),
    #[error("{0} is a unit, not a structure")]
    NotAStructure(String),
    #[error("{first} and {second} belong to the same structure family")]
    ConflictingTiers { first: String, second: String },
}

/// Colony snapshot as written in YAML fixtures and scenario files.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawColonySnapshot {
    #[serde(default)]
    pub population: u32,
    /// Built structures, one entry per family (the highest tier built).
    #[serde(default)]
    pub structures: Vec<String>,
    /// Capabilities granted by something other than a structure.
    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColonySnapshot {
    pub population: u32,
    pub capabilities: BTreeMap<CapabilityId, bool>,
    /// family root -> built tier
    pub built: BTreeMap<ItemTypeId, ItemTypeId>,
}

impl ColonySnapshot {
    pub fn new(population: u32) -> Self {
        Self {
            population,
            ..Self::default()
        }
    }

    pub fn compile(raw: RawColonySnapshot, catalog: &Catalog) -> Result<Self, SnapshotError> {
        let mut snapshot = Self::new(raw.population);
        for data_id in raw.structures {
            let id = catalog
                .item_id(&data_id)
                .ok_or_else(|| SnapshotError::UnknownStructure(data_id.clone()))?;
            let item = catalog.item(id);
            if !item.is_structure() {
                return Err(SnapshotError::NotAStructure(data_id));
            }
            if let Some(&other) = snapshot.built.get(&item.family) {
                return Err(SnapshotError::ConflictingTiers {
                    first: catalog.item(other).data_id.clone(),
                    second: data_id,
                });
            }
            snapshot.set_built(catalog, id);
        }
        for (name, value) in raw.capabilities {
            match catalog.capability_id(&name) {
                Some(cap) => {
                    snapshot.capabilities.insert(cap, value);
                }
                None => {
                    tracing::debug!(capability = %name, "ignoring capability unknown to catalog")
                }
            }
        }
        Ok(snapshot)
    }

    /// Records `structure` as the built tier of its family and applies the
    /// grants of every tier up to it, later tiers overriding earlier ones.
    ///
    /// # Panics
    ///
    /// Panics if `structure` is not a structure of `catalog`.
    pub fn set_built(&mut self, catalog: &Catalog, structure: ItemTypeId) {
        let item = catalog.item(structure);
        assert!(item.is_structure(), "{} is not a structure", item.data_id);
        self.built.insert(item.family, structure);

        let mut chain = vec![structure];
        let mut cursor = item.upgrades_from;
        while let Some(prev) = cursor {
            chain.push(prev);
            cursor = catalog.item(prev).upgrades_from;
        }
        for tier in chain.into_iter().rev() {
            for grant in &catalog.item(tier).grants {
                self.capabilities.insert(grant.capability, grant.value);
            }
        }
    }

    pub fn set_capability(&mut self, capability: CapabilityId, value: bool) {
        self.capabilities.insert(capability, value);
    }

    pub fn set_population(&mut self, population: u32) {
        self.population = population;
    }
}

impl ColonyView for ColonySnapshot {
    fn population(&self) -> u32 {
        self.population
    }

    fn capability(&self, capability: CapabilityId) -> Option<bool> {
        self.capabilities.get(&capability).copied()
    }

    fn built_tier(&self, family: ItemTypeId) -> Option<ItemTypeId> {
        self.built.get(&family).copied()
    }

    fn has_structure(&self, structure: ItemTypeId) -> bool {
        self.built.values().any(|&b| b == structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_catalog, RulesSource};

    fn catalog() -> Catalog {
        load_catalog(RulesSource::Bytes {
            structures: br#"
warehouse:
  name: Warehouse
  cost: [{ resource: hammers, amount: 80 }]
  grants: [{ capability: storage }]
warehouse_expansion:
  name: Warehouse Expansion
  cost: [{ resource: hammers, amount: 80 }, { resource: tools, amount: 20 }]
  upgrades_from: warehouse
  grants: [{ capability: bulk_storage, scope: built }]
"#,
            units: br#"
scout: { name: Scout, cost: [{ resource: hammers, amount: 30 }] }
"#,
        })
        .unwrap()
    }

    #[test]
    fn compile_applies_grants_of_the_whole_chain() {
        let catalog = catalog();
        let raw: RawColonySnapshot = serde_yaml::from_str(
            r#"
population: 5
structures: [warehouse_expansion]
capabilities: { coastal: true }
"#,
        )
        .unwrap();
        let colony = ColonySnapshot::compile(raw, &catalog).unwrap();

        let storage = catalog.capability_id("storage").unwrap();
        let bulk = catalog.capability_id("bulk_storage").unwrap();
        assert_eq!(colony.population(), 5);
        assert!(colony.satisfies(storage, true));
        assert!(colony.satisfies(bulk, true));
        assert!(colony.has_structure(catalog.item_id("warehouse_expansion").unwrap()));
        assert!(!colony.has_structure(catalog.item_id("warehouse").unwrap()));
    }

    #[test]
    fn compile_rejects_units_and_duplicate_families() {
        let catalog = catalog();

        let raw = RawColonySnapshot {
            structures: vec!["scout".into()],
            ..Default::default()
        };
        assert!(matches!(
            ColonySnapshot::compile(raw, &catalog),
            Err(SnapshotError::NotAStructure(_))
        ));

        let raw = RawColonySnapshot {
            structures: vec!["warehouse".into(), "warehouse_expansion".into()],
            ..Default::default()
        };
        assert!(matches!(
            ColonySnapshot::compile(raw, &catalog),
            Err(SnapshotError::ConflictingTiers { .. })
        ));
    }

    #[test]
    fn unset_capabilities_satisfy_negative_requirements() {
        let catalog = catalog();
        let colony = ColonySnapshot::new(1);
        let storage = catalog.capability_id("storage").unwrap();
        assert!(colony.satisfies(storage, false));
        assert!(!colony.satisfies(storage, true));
    }
}
