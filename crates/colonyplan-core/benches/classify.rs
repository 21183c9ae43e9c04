use colonyplan_core::protocol::ItemTypeId;
use colonyplan_core::{
    classify, load_catalog, Catalog, ColonySnapshot, InfeasibleMemo, MemoPolicy, PlannerConfig,
    PlannerSession, RulesSource,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn coastal_colony(catalog: &Catalog) -> ColonySnapshot {
    let mut colony = ColonySnapshot::new(8);
    colony.set_capability(catalog.capability_id("coastal").expect("coastal"), true);
    colony
}

fn full_queue(catalog: &Catalog, colony: &ColonySnapshot) -> Vec<ItemTypeId> {
    let mut session = PlannerSession::new(catalog, PlannerConfig::default());
    for &id in catalog.evaluation_order() {
        if session.recompute(colony).available().contains(&id) {
            session
                .insert(colony, id, usize::MAX)
                .expect("available item is queueable");
        }
    }
    session.commit().items
}

fn bench_classify(c: &mut Criterion) {
    let catalog = load_catalog(RulesSource::Embedded).expect("embedded catalog");
    let colony = coastal_colony(&catalog);
    let queue = full_queue(&catalog, &colony);

    c.bench_function("colonyplan/classify(empty queue, recompute)", |b| {
        let mut memo = InfeasibleMemo::new();
        b.iter(|| {
            let classification =
                classify(&catalog, &colony, &[], &mut memo, MemoPolicy::Recompute);
            black_box(classification.verdicts.len());
        })
    });

    c.bench_function("colonyplan/classify(full queue, session)", |b| {
        let mut memo = InfeasibleMemo::new();
        b.iter(|| {
            let classification =
                classify(&catalog, &colony, &queue, &mut memo, MemoPolicy::Session);
            black_box(classification.verdicts.len());
        })
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
