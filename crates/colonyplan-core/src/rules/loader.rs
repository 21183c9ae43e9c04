use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use colonyplan_protocol::{CapabilityId, ItemTypeId, ResourceId};
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::Catalog;
use crate::rules::{IdTables, ItemType, RawStructureType, RawUnitType};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing referenced id: {0}")]
    MissingId(String),
    #[error("id defined as both structure and unit: {0}")]
    DuplicateId(String),
    #[error("{item} upgrades from {target}, which is not a structure")]
    InvalidUpgrade { item: String, target: String },
    #[error("{structure} has more than one upgrade: {upgrades:?}")]
    BranchingUpgrade {
        structure: String,
        upgrades: Vec<String>,
    },
    #[error("prerequisite cycle between: {items:?}")]
    DependencyCycle { items: Vec<String> },
    #[error("too many {kind} ids ({count})")]
    TooManyIds { kind: &'static str, count: usize },
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum RulesSource<'a> {
    Embedded,
    /// Directory holding `structures.yaml` and `units.yaml`.
    Path(PathBuf),
    Bytes {
        structures: &'a [u8],
        units: &'a [u8],
    },
}

#[derive(Debug, Deserialize)]
struct RawRules {
    structures: BTreeMap<String, RawStructureType>,
    units: BTreeMap<String, RawUnitType>,
}

pub fn load_catalog(source: RulesSource<'_>) -> Result<Catalog, RulesError> {
    let raw = match source {
        RulesSource::Embedded => {
            let structures_yaml = include_str!("../../data/base/structures.yaml");
            let units_yaml = include_str!("../../data/base/units.yaml");
            parse_raw_rules(structures_yaml, units_yaml)?
        }
        RulesSource::Path(dir) => {
            let structures_yaml = std::fs::read_to_string(dir.join("structures.yaml"))?;
            let units_yaml = std::fs::read_to_string(dir.join("units.yaml"))?;
            parse_raw_rules(&structures_yaml, &units_yaml)?
        }
        RulesSource::Bytes { structures, units } => parse_raw_rules(
            std::str::from_utf8(structures)?,
            std::str::from_utf8(units)?,
        )?,
    };

    compile_catalog(raw)
}

fn parse_raw_rules(structures_yaml: &str, units_yaml: &str) -> Result<RawRules, RulesError> {
    // An empty document deserializes as unit, not as an empty map.
    let structures = if structures_yaml.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_yaml::from_str(structures_yaml)?
    };
    let units = if units_yaml.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_yaml::from_str(units_yaml)?
    };
    Ok(RawRules { structures, units })
}

fn dense_ids<'k, T>(
    kind: &'static str,
    keys: impl Iterator<Item = &'k String>,
    make: impl Fn(u16) -> T,
) -> Result<HashMap<String, T>, RulesError> {
    let keys: Vec<&String> = keys.collect();
    if keys.len() > u16::MAX as usize {
        return Err(RulesError::TooManyIds {
            kind,
            count: keys.len(),
        });
    }
    Ok(keys
        .into_iter()
        .enumerate()
        .map(|(i, k)| (k.clone(), make(i as u16)))
        .collect())
}

fn compile_catalog(raw: RawRules) -> Result<Catalog, RulesError> {
    if let Some(dup) = raw
        .units
        .keys()
        .find(|k| raw.structures.contains_key(k.as_str()))
    {
        return Err(RulesError::DuplicateId(dup.clone()));
    }

    // Structures take the low ids, units follow; both in sorted data-id order.
    let item_ids = dense_ids(
        "item",
        raw.structures.keys().chain(raw.units.keys()),
        ItemTypeId::new,
    )?;

    let mut capability_names = BTreeSet::new();
    let mut resource_names = BTreeSet::new();
    for s in raw.structures.values() {
        capability_names.extend(s.requires.keys().cloned());
        capability_names.extend(s.grants.iter().map(|g| g.capability.clone()));
        resource_names.extend(s.cost.iter().map(|c| c.resource.clone()));
    }
    for u in raw.units.values() {
        capability_names.extend(u.requires.keys().cloned());
        capability_names.extend(u.grants.iter().map(|g| g.capability.clone()));
        resource_names.extend(u.cost.iter().map(|c| c.resource.clone()));
    }
    let capability_ids = dense_ids("capability", capability_names.iter(), CapabilityId::new)?;
    let resource_ids = dense_ids("resource", resource_names.iter(), ResourceId::new)?;

    let tables = IdTables {
        items: &item_ids,
        capabilities: &capability_ids,
        resources: &resource_ids,
    };

    let mut items = Vec::with_capacity(item_ids.len());
    for (data_id, s) in raw.structures {
        items.push(s.compile(data_id, &tables)?);
    }
    for (data_id, u) in raw.units {
        items.push(u.compile(data_id, &tables)?);
    }

    assign_families(&mut items)?;
    let providers = index_providers(&items);
    let base_capabilities = base_capabilities(&items);
    let evaluation_order = evaluation_order(&items, &providers)?;
    let mut evaluation_rank = vec![0u32; items.len()];
    for (rank, id) in evaluation_order.iter().enumerate() {
        evaluation_rank[id.raw as usize] = rank as u32;
    }

    let mut catalog = Catalog {
        items,
        capabilities: capability_names.into_iter().collect(),
        resources: resource_names.into_iter().collect(),
        item_ids,
        capability_ids,
        resource_ids,
        catalog_hash: 0,
        evaluation_order,
        evaluation_rank,
        providers,
        base_capabilities,
    };
    catalog.catalog_hash = crate::hash::catalog_hash(&catalog);

    tracing::info!(
        structures = catalog.structures().count(),
        units = catalog.units().count(),
        capabilities = catalog.capabilities.len(),
        hash = catalog.catalog_hash,
        "catalog loaded"
    );
    Ok(catalog)
}

/// Resolves every structure's family root and tier, rejecting branching chains.
fn assign_families(items: &mut [ItemType]) -> Result<(), RulesError> {
    let mut upgraded_by: HashMap<ItemTypeId, ItemTypeId> = HashMap::new();
    for (raw, item) in items.iter().enumerate() {
        let Some(prev) = item.upgrades_from else {
            continue;
        };
        let target = &items[prev.raw as usize];
        if !target.is_structure() {
            return Err(RulesError::InvalidUpgrade {
                item: item.data_id.clone(),
                target: target.data_id.clone(),
            });
        }
        if let Some(other) = upgraded_by.insert(prev, ItemTypeId::new(raw as u16)) {
            let mut upgrades = vec![
                items[other.raw as usize].data_id.clone(),
                item.data_id.clone(),
            ];
            upgrades.sort();
            return Err(RulesError::BranchingUpgrade {
                structure: target.data_id.clone(),
                upgrades,
            });
        }
    }

    for raw in 0..items.len() {
        if !items[raw].is_structure() {
            continue;
        }
        let mut cursor = ItemTypeId::new(raw as u16);
        let mut tier = 0usize;
        while let Some(prev) = items[cursor.raw as usize].upgrades_from {
            tier += 1;
            if tier > items.len() {
                return Err(RulesError::DependencyCycle {
                    items: vec![items[raw].data_id.clone()],
                });
            }
            cursor = prev;
        }
        items[raw].family = cursor;
        items[raw].tier = tier.min(u8::MAX as usize) as u8;
    }
    Ok(())
}

fn index_providers(items: &[ItemType]) -> HashMap<(CapabilityId, bool), Vec<ItemTypeId>> {
    let mut providers: HashMap<(CapabilityId, bool), Vec<ItemTypeId>> = HashMap::new();
    for (raw, item) in items.iter().enumerate() {
        for grant in &item.grants {
            let list = providers.entry((grant.capability, grant.value)).or_default();
            let id = ItemTypeId::new(raw as u16);
            if !list.contains(&id) {
                list.push(id);
            }
        }
    }
    providers
}

/// Grants of the free structures, which every colony holds from the start.
fn base_capabilities(items: &[ItemType]) -> BTreeMap<CapabilityId, bool> {
    items
        .iter()
        .filter(|item| item.is_structure() && item.is_free())
        .flat_map(|item| item.grants.iter())
        .map(|grant| (grant.capability, grant.value))
        .collect()
}

/// Topological order over upgrade links and capability-provider links
/// (Kahn's algorithm, smallest id first), structures before units.
fn evaluation_order(
    items: &[ItemType],
    providers: &HashMap<(CapabilityId, bool), Vec<ItemTypeId>>,
) -> Result<Vec<ItemTypeId>, RulesError> {
    let n = items.len();
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
    let mut in_degree = vec![0usize; n];

    for (raw, item) in items.iter().enumerate() {
        let mut deps = BTreeSet::new();
        if let Some(prev) = item.upgrades_from {
            deps.insert(prev.raw as usize);
        }
        for (&capability, &value) in &item.requires {
            for provider in providers.get(&(capability, value)).into_iter().flatten() {
                if provider.raw as usize != raw {
                    deps.insert(provider.raw as usize);
                }
            }
        }
        in_degree[raw] = deps.len();
        for dep in deps {
            dependents[dep].insert(raw);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < n {
        let items = (0..n)
            .filter(|&i| in_degree[i] > 0)
            .map(|i| items[i].data_id.clone())
            .collect();
        return Err(RulesError::DependencyCycle { items });
    }

    let (structures, units): (Vec<ItemTypeId>, Vec<ItemTypeId>) = order
        .into_iter()
        .map(|i| ItemTypeId::new(i as u16))
        .partition(|id| items[id.raw as usize].is_structure());
    Ok(structures.into_iter().chain(units).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(structures: &str, units: &str) -> Result<Catalog, RulesError> {
        load_catalog(RulesSource::Bytes {
            structures: structures.as_bytes(),
            units: units.as_bytes(),
        })
    }

    #[test]
    fn embedded_catalog_loads() {
        let catalog = load_catalog(RulesSource::Embedded).expect("embedded catalog");
        assert!(catalog.item_id("docks").is_some());
        assert!(catalog.item_id("artillery").is_some());
        assert_ne!(catalog.catalog_hash, 0);
    }

    #[test]
    fn upgrade_chains_get_family_and_tier() {
        let catalog = load(
            r#"
stockade: { name: Stockade, cost: [{ resource: hammers, amount: 64 }] }
fort: { name: Fort, cost: [{ resource: hammers, amount: 120 }], upgrades_from: stockade }
fortress: { name: Fortress, cost: [{ resource: hammers, amount: 320 }], upgrades_from: fort }
"#,
            "",
        )
        .unwrap();

        let stockade = catalog.item_id("stockade").unwrap();
        let fortress = catalog.item(catalog.item_id("fortress").unwrap());
        assert_eq!(fortress.family, stockade);
        assert_eq!(fortress.tier, 2);
        assert_eq!(catalog.item(stockade).tier, 0);
    }

    #[test]
    fn missing_upgrade_target_is_reported() {
        let err = load(
            "fort: { name: Fort, cost: [{ resource: hammers, amount: 1 }], upgrades_from: nowhere }",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::MissingId(id) if id == "nowhere"));
    }

    #[test]
    fn branching_upgrades_are_rejected() {
        let err = load(
            r#"
base: { name: Base, cost: [{ resource: hammers, amount: 1 }] }
left: { name: Left, cost: [{ resource: hammers, amount: 1 }], upgrades_from: base }
right: { name: Right, cost: [{ resource: hammers, amount: 1 }], upgrades_from: base }
"#,
            "",
        )
        .unwrap_err();
        match err {
            RulesError::BranchingUpgrade {
                structure,
                upgrades,
            } => {
                assert_eq!(structure, "base");
                assert_eq!(upgrades, vec!["left".to_string(), "right".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn capability_cycles_fail_loudly() {
        let err = load(
            r#"
mill:
  name: Mill
  cost: [{ resource: hammers, amount: 1 }]
  requires: { lumber: true }
  grants: [{ capability: grain }]
camp:
  name: Camp
  cost: [{ resource: hammers, amount: 1 }]
  requires: { grain: true }
  grants: [{ capability: lumber }]
"#,
            "",
        )
        .unwrap_err();
        match err {
            RulesError::DependencyCycle { items } => {
                assert_eq!(items, vec!["camp".to_string(), "mill".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn units_cannot_be_upgrade_targets() {
        let err = load(
            "barracks: { name: Barracks, cost: [{ resource: hammers, amount: 1 }], upgrades_from: scout }",
            "scout: { name: Scout, cost: [{ resource: hammers, amount: 1 }] }",
        )
        .unwrap_err();
        assert!(matches!(err, RulesError::InvalidUpgrade { .. }));
    }

    #[test]
    fn evaluation_order_puts_structures_first_and_prerequisites_early() {
        let catalog = load(
            r#"
armory:
  name: Armory
  cost: [{ resource: hammers, amount: 52 }]
  grants: [{ capability: build_artillery }]
magazine: { name: Magazine, cost: [{ resource: hammers, amount: 120 }], upgrades_from: armory }
"#,
            r#"
artillery:
  name: Artillery
  cost: [{ resource: hammers, amount: 192 }]
  requires: { build_artillery: true }
"#,
        )
        .unwrap();

        let order = catalog.evaluation_order();
        let pos = |id: &str| {
            let id = catalog.item_id(id).unwrap();
            order.iter().position(|&o| o == id).unwrap()
        };
        assert!(pos("armory") < pos("magazine"));
        assert!(pos("magazine") < pos("artillery"));
        assert_eq!(
            catalog.providers(catalog.capability_id("build_artillery").unwrap(), true),
            &[catalog.item_id("armory").unwrap()]
        );
    }
}
