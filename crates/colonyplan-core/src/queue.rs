use colonyplan_protocol::{
    Blocker, Classification, CommittedQueue, ItemTypeId, MoveOutcome, QueueEntryView,
    RemovalReport, Verdict,
};

use crate::catalog::Catalog;
use crate::classify::{classify, entry_blockers, InfeasibleMemo};
use crate::colony::ColonyView;
use crate::config::{PlannerConfig, RemoveMode};
use crate::error::PlanError;
use crate::placement::{misplaced_entries, placement};

/// One editing session over a colony's production queue.
///
/// Owns the queue and the infeasible memo. The colony is read fresh on every
/// call; nothing here holds on to it. Every edit either succeeds and leaves the
/// queue ordered, or fails with a [`PlanError`] and leaves it untouched.
#[derive(Debug, Clone)]
pub struct PlannerSession<'a> {
    catalog: &'a Catalog,
    config: PlannerConfig,
    queue: Vec<ItemTypeId>,
    memo: InfeasibleMemo,
    classification: Classification,
}

impl<'a> PlannerSession<'a> {
    pub fn new(catalog: &'a Catalog, config: PlannerConfig) -> Self {
        Self {
            catalog,
            config,
            queue: Vec::new(),
            memo: InfeasibleMemo::new(),
            classification: Classification {
                catalog_hash: catalog.catalog_hash,
                ..Classification::default()
            },
        }
    }

    /// Starts from an existing queue, e.g. one committed by an earlier session.
    ///
    /// Entries that could not have been inserted are dropped: free items,
    /// structures already built or listed earlier, items that can never be
    /// built, and anything left out of order, in the same way a removal evicts
    /// stranded entries.
    pub fn with_queue(
        catalog: &'a Catalog,
        config: PlannerConfig,
        colony: &dyn ColonyView,
        items: impl IntoIterator<Item = ItemTypeId>,
    ) -> Self {
        let mut session = Self::new(catalog, config);
        // Against an empty queue, so the memo holds everything unbuildable.
        session.recompute(colony);

        let mut dropped = Vec::new();
        for id in items {
            let item = catalog.item(id);
            let duplicate = item.is_structure()
                && (catalog.structure_built(colony, id) || session.queue.contains(&id));
            if item.is_free() || duplicate || session.memo.contains(id) {
                dropped.push(id);
            } else {
                session.queue.push(id);
            }
        }
        dropped.extend(session.evict_misplaced(colony));
        if !dropped.is_empty() {
            tracing::debug!(
                dropped = dropped.len(),
                kept = session.queue.len(),
                "dropped entries from restored queue"
            );
        }
        session.recompute(colony);
        session
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn queue(&self) -> &[ItemTypeId] {
        &self.queue
    }

    pub fn memo(&self) -> &InfeasibleMemo {
        &self.memo
    }

    /// Latest classification; refreshed after every successful edit.
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    /// Reclassifies the catalog against `colony` and the current queue.
    pub fn recompute(&mut self, colony: &dyn ColonyView) -> &Classification {
        self.classification = classify(
            self.catalog,
            colony,
            &self.queue,
            &mut self.memo,
            self.config.memo,
        );
        &self.classification
    }

    /// Why `item` is not available, as of the latest classification.
    pub fn why_locked(&self, item: ItemTypeId) -> Option<&Blocker> {
        self.classification.blocker(item)
    }

    pub fn minimum_index(&self, colony: &dyn ColonyView, item: ItemTypeId) -> Option<usize> {
        placement(self.catalog, colony, &self.queue, item).ok()
    }

    /// Queue in order, each entry flagged when it cannot be built yet given the
    /// colony and the entries ahead of it.
    pub fn entries(&self, colony: &dyn ColonyView) -> Vec<QueueEntryView> {
        entry_blockers(self.catalog, colony, &self.queue, &self.memo)
            .into_iter()
            .zip(&self.queue)
            .enumerate()
            .map(|(index, (blocker, &item))| QueueEntryView {
                index,
                item,
                blocker,
            })
            .collect()
    }

    /// Queues `item` at `max(preferred, minimum_index)`, returning where it landed.
    pub fn insert(
        &mut self,
        colony: &dyn ColonyView,
        item: ItemTypeId,
        preferred: usize,
    ) -> Result<usize, PlanError> {
        let catalog = self.catalog;
        let ty = catalog.item(item);
        if ty.is_free() {
            return Err(self.refuse(PlanError::NotQueueable { item }));
        }

        let verdict = self
            .recompute(colony)
            .verdict(item)
            .cloned()
            .unwrap_or(Verdict::Available);
        match verdict {
            Verdict::Infeasible(blocker) => {
                return Err(self.refuse(PlanError::Infeasible { item, blocker }));
            }
            Verdict::Satisfied => {
                return Err(self.refuse(PlanError::DuplicateStructure { item }));
            }
            Verdict::Locked(blocker) if !self.config.admit_locked => {
                return Err(self.refuse(PlanError::Locked { item, blocker }));
            }
            Verdict::Locked(_) | Verdict::Available => {}
        }

        let min = placement(catalog, colony, &self.queue, item)
            .map_err(|missing| self.refuse(PlanError::NoValidPosition { item, missing }))?;
        let index = preferred.min(self.queue.len()).max(min);
        self.queue.insert(index, item);
        tracing::debug!(item = %ty.data_id, index, preferred, "inserted");

        self.recompute(colony);
        Ok(index)
    }

    /// Removes `item` (first occurrence or all, per `mode`) and evicts every
    /// entry left ahead of its prerequisite, cascading until the queue is valid.
    pub fn remove(
        &mut self,
        colony: &dyn ColonyView,
        item: ItemTypeId,
        mode: RemoveMode,
    ) -> Result<RemovalReport, PlanError> {
        let removed = match mode {
            RemoveMode::First => match self.queue.iter().position(|&q| q == item) {
                Some(index) => {
                    self.queue.remove(index);
                    1
                }
                None => 0,
            },
            RemoveMode::All => {
                let before = self.queue.len();
                self.queue.retain(|&q| q != item);
                before - self.queue.len()
            }
        };
        if removed == 0 {
            return Err(self.refuse(PlanError::NotQueued { item }));
        }

        let evicted = self.evict_misplaced(colony);
        tracing::debug!(
            item = %self.catalog.item(item).data_id,
            removed,
            evicted = evicted.len(),
            "removed"
        );

        self.recompute(colony);
        Ok(RemovalReport {
            item: Some(item),
            removed,
            evicted,
        })
    }

    /// Removes `config.remove_mode` occurrences of `item`.
    pub fn remove_default(
        &mut self,
        colony: &dyn ColonyView,
        item: ItemTypeId,
    ) -> Result<RemovalReport, PlanError> {
        self.remove(colony, item, self.config.remove_mode)
    }

    /// Moves the first occurrence of `item` so it lands as close to `target` as
    /// its own constraints allow.
    ///
    /// `target` is an index into the queue as it is now. Dropping the item
    /// anywhere in its own run of identical entries changes nothing. The move is
    /// refused when it would leave another entry ahead of its prerequisite.
    pub fn move_item(
        &mut self,
        colony: &dyn ColonyView,
        item: ItemTypeId,
        target: usize,
    ) -> Result<MoveOutcome, PlanError> {
        let Some(from) = self.queue.iter().position(|&q| q == item) else {
            return Err(self.refuse(PlanError::NotQueued { item }));
        };
        let end = from + self.queue[from..].iter().take_while(|&&q| q == item).count();
        if (from..=end).contains(&target) {
            return Ok(MoveOutcome::Unchanged { index: from });
        }

        let mut tentative = self.queue.clone();
        tentative.remove(from);
        let adjusted = if target > from { target - 1 } else { target };
        let min = placement(self.catalog, colony, &tentative, item)
            .map_err(|missing| self.refuse(PlanError::NoValidPosition { item, missing }))?;
        let to = adjusted.min(tentative.len()).max(min);
        tentative.insert(to, item);

        let stranded = misplaced_entries(self.catalog, colony, &tentative);
        if !stranded.is_empty() {
            let dependents = stranded.into_iter().map(|(_, id)| id).collect();
            return Err(self.refuse(PlanError::StrandsDependents { item, dependents }));
        }
        if to == from {
            return Ok(MoveOutcome::Unchanged { index: from });
        }

        self.queue = tentative;
        tracing::debug!(item = %self.catalog.item(item).data_id, from, to, "moved");
        self.recompute(colony);
        Ok(MoveOutcome::Moved { from, to })
    }

    /// Empties the queue. The infeasible memo is kept.
    pub fn clear(&mut self, colony: &dyn ColonyView) {
        self.queue.clear();
        self.recompute(colony);
    }

    /// Ends the session, handing the ordered queue back to the game-state layer.
    pub fn commit(self) -> CommittedQueue {
        tracing::info!(entries = self.queue.len(), "queue committed");
        CommittedQueue {
            catalog_hash: self.catalog.catalog_hash,
            items: self.queue,
        }
    }

    fn evict_misplaced(&mut self, colony: &dyn ColonyView) -> Vec<ItemTypeId> {
        let mut evicted = Vec::new();
        loop {
            let misplaced = misplaced_entries(self.catalog, colony, &self.queue);
            if misplaced.is_empty() {
                return evicted;
            }
            for &(position, item) in misplaced.iter().rev() {
                self.queue.remove(position);
                tracing::debug!(item = %self.catalog.item(item).data_id, position, "evicted");
            }
            evicted.extend(misplaced.into_iter().map(|(_, item)| item));
        }
    }

    fn refuse(&self, err: PlanError) -> PlanError {
        tracing::debug!(item = %self.catalog.item(err.item()).data_id, %err, "edit refused");
        err
    }
}
