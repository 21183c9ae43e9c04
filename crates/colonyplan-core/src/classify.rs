//! Feasibility classification.
//!
//! Every non-free item-type lands in exactly one of four buckets per pass:
//! available, locked (could become buildable), infeasible (never), or satisfied
//! (a colony-unique structure that is already built or queued).

use std::collections::BTreeMap;

use colonyplan_protocol::{Blocker, CapabilityId, Classification, ItemTypeId, Verdict};

use crate::catalog::Catalog;
use crate::colony::ColonyView;
use crate::config::MemoPolicy;
use crate::rules::GrantScope;

/// Item-types known to be permanently unbuildable.
///
/// Monotonic: entries are only ever added, until the memo is cleared or bound
/// to a different catalog.
#[derive(Debug, Clone, Default)]
pub struct InfeasibleMemo {
    catalog_hash: Option<u64>,
    entries: BTreeMap<ItemTypeId, Blocker>,
}

impl InfeasibleMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys the memo to a catalog, dropping entries recorded against another one.
    pub fn bind(&mut self, catalog_hash: u64) {
        if self.catalog_hash != Some(catalog_hash) {
            if !self.entries.is_empty() {
                tracing::debug!(
                    dropped = self.entries.len(),
                    "catalog changed, resetting infeasible memo"
                );
            }
            self.entries.clear();
            self.catalog_hash = Some(catalog_hash);
        }
    }

    pub fn get(&self, item: ItemTypeId) -> Option<&Blocker> {
        self.entries.get(&item)
    }

    pub fn contains(&self, item: ItemTypeId) -> bool {
        self.entries.contains_key(&item)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = ItemTypeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn record(&mut self, item: ItemTypeId, blocker: Blocker) {
        self.entries.entry(item).or_insert(blocker);
    }
}

/// Colony capabilities overlaid with what queued items grant speculatively.
pub struct EffectiveCapabilities<'a> {
    catalog: &'a Catalog,
    colony: &'a dyn ColonyView,
    overlay: BTreeMap<CapabilityId, bool>,
}

impl<'a> EffectiveCapabilities<'a> {
    pub fn new(catalog: &'a Catalog, colony: &'a dyn ColonyView, queued: &[ItemTypeId]) -> Self {
        let mut effective = Self {
            catalog,
            colony,
            overlay: BTreeMap::new(),
        };
        for &item in queued {
            effective.push(item);
        }
        effective
    }

    /// Adds the queue-scoped grants of one more queued item.
    pub fn push(&mut self, item: ItemTypeId) {
        for grant in &self.catalog.item(item).grants {
            if grant.scope == GrantScope::Queued {
                self.overlay.insert(grant.capability, grant.value);
            }
        }
    }

    pub fn satisfies(&self, capability: CapabilityId, required: bool) -> bool {
        match self.overlay.get(&capability) {
            Some(&value) => value == required,
            None => self.catalog.holds(self.colony, capability, required),
        }
    }
}

/// Inputs for judging items against one view of the queue.
struct Pass<'a> {
    catalog: &'a Catalog,
    colony: &'a dyn ColonyView,
    effective: &'a EffectiveCapabilities<'a>,
    queued: &'a [ItemTypeId],
}

impl Pass<'_> {
    fn prerequisite_present(&self, structure: ItemTypeId) -> bool {
        self.catalog.structure_built(self.colony, structure) || self.queued.contains(&structure)
    }

    /// Can anything still grant `capability` at `required`, other than `item`?
    ///
    /// Providers memoized as infeasible only count as dead when they were
    /// evaluated before `item`, so repeated passes agree.
    fn has_live_provider(
        &self,
        memo: &InfeasibleMemo,
        item: ItemTypeId,
        capability: CapabilityId,
        required: bool,
    ) -> bool {
        self.catalog
            .providers(capability, required)
            .iter()
            .any(|&p| {
                p != item && !(memo.contains(p) && self.catalog.evaluated_before(p, item))
            })
    }

    /// Judges a non-free item that is not memoized as infeasible.
    fn assess(&self, memo: &InfeasibleMemo, id: ItemTypeId) -> Verdict {
        let item = self.catalog.item(id);

        if let Some(prev) = item.upgrades_from {
            if memo.contains(prev) {
                return Verdict::Infeasible(Blocker::DeadPrerequisite { structure: prev });
            }
        }

        let population = self.colony.population();
        if item.population_required > population {
            return Verdict::Locked(Blocker::Population {
                required: item.population_required,
                current: population,
            });
        }

        let mut lock = None;
        for (&capability, &required) in &item.requires {
            if self.effective.satisfies(capability, required) {
                continue;
            }
            if !self.has_live_provider(memo, id, capability, required) {
                return Verdict::Infeasible(Blocker::NoProvider {
                    capability,
                    required,
                });
            }
            lock.get_or_insert(Blocker::Capability {
                capability,
                required,
            });
        }
        if let Some(blocker) = lock {
            return Verdict::Locked(blocker);
        }

        if let Some(prev) = item.upgrades_from {
            if !self.prerequisite_present(prev) {
                return Verdict::Locked(Blocker::Prerequisite { structure: prev });
            }
        }

        Verdict::Available
    }
}

/// Classifies the whole catalog against the colony and the current queue.
///
/// Structures are judged before units (in the catalog's evaluation order), so
/// infeasible structures are already memoized when units that depend on what
/// they grant are judged. Newly infeasible items are added to `memo`.
pub fn classify(
    catalog: &Catalog,
    colony: &dyn ColonyView,
    queue: &[ItemTypeId],
    memo: &mut InfeasibleMemo,
    policy: MemoPolicy,
) -> Classification {
    if policy == MemoPolicy::Recompute {
        memo.clear();
    }
    memo.bind(catalog.catalog_hash);

    let effective = EffectiveCapabilities::new(catalog, colony, queue);
    let pass = Pass {
        catalog,
        colony,
        effective: &effective,
        queued: queue,
    };

    let mut verdicts = BTreeMap::new();
    for &id in catalog.evaluation_order() {
        let item = catalog.item(id);
        if let Some(blocker) = memo.get(id) {
            verdicts.insert(id, Verdict::Infeasible(blocker.clone()));
            continue;
        }
        if item.is_free() {
            continue;
        }
        if item.is_structure() && (catalog.structure_built(colony, id) || queue.contains(&id)) {
            verdicts.insert(id, Verdict::Satisfied);
            continue;
        }

        let verdict = pass.assess(memo, id);
        if let Verdict::Infeasible(blocker) = &verdict {
            tracing::debug!(item = %item.data_id, ?blocker, "memoizing infeasible item");
            memo.record(id, blocker.clone());
        }
        verdicts.insert(id, verdict);
    }

    Classification {
        catalog_hash: catalog.catalog_hash,
        verdicts,
    }
}

/// Blocker for every queue entry, judged against the colony plus the entries
/// ahead of it. `None` means the entry is buildable where it sits.
pub fn entry_blockers(
    catalog: &Catalog,
    colony: &dyn ColonyView,
    queue: &[ItemTypeId],
    memo: &InfeasibleMemo,
) -> Vec<Option<Blocker>> {
    let mut effective = EffectiveCapabilities::new(catalog, colony, &[]);
    let mut out = Vec::with_capacity(queue.len());
    for (index, &id) in queue.iter().enumerate() {
        let blocker = match memo.get(id) {
            Some(blocker) => Some(blocker.clone()),
            None => {
                let pass = Pass {
                    catalog,
                    colony,
                    effective: &effective,
                    queued: &queue[..index],
                };
                pass.assess(memo, id).blocker().cloned()
            }
        };
        out.push(blocker);
        effective.push(id);
    }
    out
}
