//! Queue-edit scripts for `colonyplan plan`.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use colonyplan_core::{Catalog, ColonySnapshot, PlannerSession, RemoveMode};
use colonyplan_protocol::{ItemTypeId, MoveOutcome};
use serde::Deserialize;

/// A starting queue plus the edits to replay against it.
///
/// ```yaml
/// queue: [docks]
/// steps:
///   - insert: { item: drydock, at: 0 }
///   - move: { item: docks, to: 3 }
///   - remove: { item: docks, mode: all }
///   - set_population: 6
///   - recompute
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub queue: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Queue an item, at the end unless `at` is given.
    Insert {
        item: String,
        #[serde(default)]
        at: Option<usize>,
    },
    /// Remove an item, using the configured removal mode unless `mode` is given.
    Remove {
        item: String,
        #[serde(default)]
        mode: Option<RemoveMode>,
    },
    Move {
        item: String,
        to: usize,
    },
    /// Colony grew (or shrank) between edits.
    SetPopulation(u32),
    Recompute,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script from {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse script from {}", path.display()))
    }

    /// Seeds the session with `queue`, then replays every step, writing one
    /// line per edit. Refused edits are reported and the replay carries on.
    pub fn replay(
        &self,
        session: &mut PlannerSession<'_>,
        colony: &mut ColonySnapshot,
        out: &mut impl Write,
    ) -> Result<()> {
        let catalog = session.catalog();

        for data_id in &self.queue {
            let item = resolve(catalog, data_id)?;
            let end = session.queue().len();
            if let Err(err) = session.insert(&*colony, item, end) {
                anyhow::bail!(
                    "starting queue entry {data_id} refused: {}",
                    catalog.describe_refusal(&err)
                );
            }
        }

        for step in &self.steps {
            match step {
                Step::Insert { item: data_id, at } => {
                    let item = resolve(catalog, data_id)?;
                    let preferred = at.unwrap_or(session.queue().len());
                    match session.insert(&*colony, item, preferred) {
                        Ok(index) => writeln!(out, "insert {data_id} -> {index}")?,
                        Err(err) => writeln!(
                            out,
                            "insert {data_id} refused: {}",
                            catalog.describe_refusal(&err)
                        )?,
                    }
                }
                Step::Remove { item: data_id, mode } => {
                    let item = resolve(catalog, data_id)?;
                    let mode = mode.unwrap_or(session.config().remove_mode);
                    match session.remove(&*colony, item, mode) {
                        Ok(report) => {
                            write!(out, "remove {data_id} x{}", report.removed)?;
                            if !report.evicted.is_empty() {
                                write!(out, ", evicted {}", data_ids(catalog, &report.evicted))?;
                            }
                            writeln!(out)?;
                        }
                        Err(err) => writeln!(
                            out,
                            "remove {data_id} refused: {}",
                            catalog.describe_refusal(&err)
                        )?,
                    }
                }
                Step::Move { item: data_id, to } => {
                    let item = resolve(catalog, data_id)?;
                    match session.move_item(&*colony, item, *to) {
                        Ok(MoveOutcome::Moved { from, to }) => {
                            writeln!(out, "move {data_id} {from} -> {to}")?
                        }
                        Ok(MoveOutcome::Unchanged { index }) => {
                            writeln!(out, "move {data_id} stays at {index}")?
                        }
                        Err(err) => writeln!(
                            out,
                            "move {data_id} refused: {}",
                            catalog.describe_refusal(&err)
                        )?,
                    }
                }
                Step::SetPopulation(population) => {
                    colony.set_population(*population);
                    session.recompute(&*colony);
                    writeln!(out, "population {population}")?;
                }
                Step::Recompute => {
                    let classification = session.recompute(&*colony);
                    writeln!(
                        out,
                        "recompute: {} available, {} locked, {} infeasible",
                        classification.available().len(),
                        classification.locked().len(),
                        classification.infeasible().len()
                    )?;
                }
            }
        }
        Ok(())
    }
}

pub fn resolve(catalog: &Catalog, data_id: &str) -> Result<ItemTypeId> {
    catalog
        .item_id(data_id)
        .with_context(|| format!("Unknown item: {data_id}"))
}

fn data_ids(catalog: &Catalog, items: &[ItemTypeId]) -> String {
    items
        .iter()
        .map(|&id| catalog.item(id).data_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
