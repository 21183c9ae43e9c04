//! Randomized edit walks over the embedded catalog, checking the queue
//! invariants after every step.

use std::collections::BTreeSet;

use colonyplan_core::protocol::ItemTypeId;
use colonyplan_core::{
    load_catalog, minimum_index, Catalog, ColonySnapshot, ColonyView, MemoPolicy, PlannerConfig,
    PlannerSession, RemoveMode, RulesSource,
};

/// SplitMix64; enough to drive a reproducible walk.
struct Walk {
    state: u64,
}

impl Walk {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n.max(1) as u64) as usize
    }
}

fn colony(catalog: &Catalog) -> ColonySnapshot {
    let mut colony = ColonySnapshot::new(3);
    colony.set_capability(catalog.capability_id("coastal").unwrap(), true);
    colony.set_built(catalog, catalog.item_id("stockade").unwrap());
    colony
}

fn assert_ordered(catalog: &Catalog, colony: &dyn ColonyView, queue: &[ItemTypeId]) {
    for (position, &item) in queue.iter().enumerate() {
        let min = minimum_index(catalog, colony, queue, item);
        assert!(
            min.is_some_and(|m| m <= position),
            "{} at {position} has minimum index {min:?} in {queue:?}",
            catalog.item(item).data_id
        );
    }

    let mut seen = BTreeSet::new();
    for &item in queue {
        if catalog.item(item).is_structure() {
            assert!(seen.insert(item), "{} queued twice", catalog.item(item).data_id);
            assert!(!catalog.structure_built(colony, item));
        }
    }
}

fn walk(seed: u64, policy: MemoPolicy) {
    let catalog = load_catalog(RulesSource::Embedded).unwrap();
    let mut colony = colony(&catalog);
    let config = PlannerConfig {
        memo: policy,
        ..PlannerConfig::default()
    };
    let mut session = PlannerSession::new(&catalog, config);
    let queueable: Vec<ItemTypeId> = catalog
        .evaluation_order()
        .iter()
        .copied()
        .filter(|&id| !catalog.item(id).is_free())
        .collect();

    let mut rng = Walk::new(seed);
    let mut infeasible = session.recompute(&colony).infeasible();

    for step in 0..400 {
        if step == 200 {
            colony.set_population(10);
        }
        let before = session.queue().to_vec();

        match rng.below(4) {
            0 | 1 => {
                let item = queueable[rng.below(queueable.len())];
                let preferred = rng.below(before.len() + 2);
                let min = minimum_index(&catalog, &colony, &before, item);
                match session.insert(&colony, item, preferred) {
                    Ok(index) => {
                        let min = min.expect("inserted item had a position");
                        assert_eq!(index, preferred.min(before.len()).max(min));
                        assert_eq!(session.queue()[index], item);
                        assert_eq!(session.queue().len(), before.len() + 1);
                    }
                    Err(_) => assert_eq!(session.queue(), before.as_slice()),
                }
            }
            2 if !before.is_empty() => {
                let item = before[rng.below(before.len())];
                let report = session
                    .remove(&colony, item, RemoveMode::First)
                    .expect("queued item can be removed");
                assert_eq!(
                    session.queue().len(),
                    before.len() - report.removed - report.evicted.len()
                );
                for evicted in &report.evicted {
                    assert!(
                        !session.queue().contains(evicted) || catalog.item(*evicted).is_unit()
                    );
                }
            }
            3 if !before.is_empty() => {
                let item = before[rng.below(before.len())];
                let target = rng.below(before.len() + 1);
                if session.move_item(&colony, item, target).is_err() {
                    assert_eq!(session.queue(), before.as_slice());
                } else {
                    assert_eq!(session.queue().len(), before.len());
                }
            }
            _ => {}
        }

        assert_ordered(&catalog, &colony, session.queue());

        let first = session.recompute(&colony).clone();
        let second = session.recompute(&colony).clone();
        assert_eq!(first, second, "recompute is not idempotent at step {step}");

        let now = first.infeasible();
        if policy == MemoPolicy::Session {
            assert!(
                now.is_superset(&infeasible),
                "infeasible set shrank at step {step}"
            );
        }
        infeasible = now;
    }

    let committed = session.commit();
    assert_eq!(committed.catalog_hash, catalog.catalog_hash);
}

#[test]
fn session_memo_walks_keep_invariants() {
    for seed in [1, 7, 42, 2024] {
        walk(seed, MemoPolicy::Session);
    }
}

#[test]
fn recompute_memo_walks_keep_invariants() {
    for seed in [3, 99] {
        walk(seed, MemoPolicy::Recompute);
    }
}

#[test]
fn embedded_catalog_classifies_the_landlocked_case() {
    let catalog = load_catalog(RulesSource::Embedded).unwrap();
    let colony = ColonySnapshot::new(10);
    let mut session = PlannerSession::new(&catalog, PlannerConfig::default());
    let classification = session.recompute(&colony).clone();

    for data_id in ["docks", "drydock", "shipyard", "caravel", "frigate", "custom_house"] {
        let id = catalog.item_id(data_id).unwrap();
        assert!(
            classification.infeasible().contains(&id),
            "{data_id} should be infeasible away from the coast"
        );
    }
    let artillery = catalog.item_id("artillery").unwrap();
    assert!(classification.locked().contains(&artillery));
    assert!(classification
        .verdict(catalog.item_id("town_hall").unwrap())
        .is_none());
}
