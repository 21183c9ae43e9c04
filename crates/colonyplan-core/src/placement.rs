//! Earliest legal queue positions.

use colonyplan_protocol::{Blocker, ItemTypeId};

use crate::catalog::Catalog;
use crate::colony::ColonyView;

/// Earliest index at which `item` may sit in `queue`, or `None` when nothing
/// built or queued can satisfy its ordering constraints.
///
/// Population is not an ordering constraint; a population-locked item still
/// gets an index.
pub fn minimum_index(
    catalog: &Catalog,
    colony: &dyn ColonyView,
    queue: &[ItemTypeId],
    item: ItemTypeId,
) -> Option<usize> {
    placement(catalog, colony, queue, item).ok()
}

/// Like [`minimum_index`], but names the missing piece on failure.
pub(crate) fn placement(
    catalog: &Catalog,
    colony: &dyn ColonyView,
    queue: &[ItemTypeId],
    item: ItemTypeId,
) -> Result<usize, Blocker> {
    let ty = catalog.item(item);

    if ty.is_structure() {
        let Some(prev) = ty.upgrades_from else {
            return Ok(0);
        };
        if catalog.structure_built(colony, prev) {
            return Ok(0);
        }
        return queue
            .iter()
            .position(|&q| q == prev)
            .map(|p| p + 1)
            .ok_or(Blocker::Prerequisite { structure: prev });
    }

    let mut index = 0;
    for (&capability, &required) in &ty.requires {
        if catalog.holds(colony, capability, required) {
            continue;
        }
        let provider = queue.iter().position(|&q| {
            q != item
                && catalog
                    .item(q)
                    .grants_capability(capability, required, true)
        });
        match provider {
            Some(p) => index = index.max(p + 1),
            None => {
                return Err(Blocker::Capability {
                    capability,
                    required,
                })
            }
        }
    }
    Ok(index)
}

/// Queue entries sitting ahead of their minimum index (or with none at all),
/// as `(position, item)` pairs in queue order.
pub(crate) fn misplaced_entries(
    catalog: &Catalog,
    colony: &dyn ColonyView,
    queue: &[ItemTypeId],
) -> Vec<(usize, ItemTypeId)> {
    queue
        .iter()
        .enumerate()
        .filter(|&(position, &item)| match placement(catalog, colony, queue, item) {
            Ok(min) => min > position,
            Err(_) => true,
        })
        .map(|(position, &item)| (position, item))
        .collect()
}
