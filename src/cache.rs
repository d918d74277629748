//! Read-through cache of block plans keyed by block id.
//!
//! Entries are never updated in place: every write that touches a block calls
//! `invalidate`, and the next read reloads the whole tree.
//!
//! Each block also carries a generation counter, bumped by `invalidate`. A
//! reader records the generation before loading and only stores its plan if
//! no invalidation happened in between, so a load that raced a write is
//! served once and then dropped.

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::BlockPlan;

#[derive(Default)]
pub struct PlanCache {
  plans: DashMap<Uuid, BlockPlan>,
  generations: DashMap<Uuid, u64>,
}

impl PlanCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, block_id: &Uuid) -> Option<BlockPlan> {
    self.plans.get(block_id).map(|entry| entry.value().clone())
  }

  /// Current generation of a block; read this before loading its plan
  pub fn generation(&self, block_id: &Uuid) -> u64 {
    self.generations.get(block_id).map(|g| *g.value()).unwrap_or(0)
  }

  /// Store a plan loaded at `generation`. Returns false (and stores nothing)
  /// when the block was invalidated since.
  pub fn insert_if_current(&self, plan: BlockPlan, generation: u64) -> bool {
    let block_id = plan.block.id;
    // Holding the generation entry keeps `invalidate` out until the plan is in
    let current = self.generations.entry(block_id).or_insert(0);
    if *current != generation {
      debug!(%block_id, loaded = generation, current = *current, "discarding plan loaded before a write");
      return false;
    }
    self.plans.insert(block_id, plan);
    true
  }

  pub fn invalidate(&self, block_id: &Uuid) {
    *self.generations.entry(*block_id).or_insert(0) += 1;
    if self.plans.remove(block_id).is_some() {
      debug!(%block_id, "plan cache entry invalidated");
    }
  }
}

#[cfg(test)]
impl PlanCache {
  pub fn len(&self) -> usize {
    self.plans.len()
  }

  pub fn is_empty(&self) -> bool {
    self.plans.is_empty()
  }
}
