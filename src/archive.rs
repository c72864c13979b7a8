//! Append-only hand archive: `hand:<handId>` rows plus a per-table feed
//! capped at the last 50 hands (spec.md §6).

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::engine::HandRecord;
use crate::ids::{HandId, TableId};

const MAX_RETAINED_PER_TABLE: usize = 50;

#[derive(Default)]
struct Rows {
    by_hand_id: HashMap<HandId, HandRecord>,
    seen: HashSet<HandId>,
    by_table: HashMap<TableId, Vec<HandId>>,
}

/// Insert is idempotent by `HandId` so a retried post-commit flush (see
/// spec.md §5 "insert or ignore") never double-counts a hand.
pub struct HandArchive {
    inner: RwLock<Rows>,
}

impl HandArchive {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Rows::default()),
        }
    }

    /// Returns `true` the first time a given `hand_id` is inserted, `false`
    /// on every later call (e.g. a gateway re-checking the actor's last
    /// finished hand after subsequent actions) — callers use this to gate
    /// one-shot side effects like collusion scoring and identity tallies.
    pub fn insert(&self, record: HandRecord) -> bool {
        let mut rows = self.inner.write().expect("hand archive poisoned");
        if !rows.seen.insert(record.hand_id) {
            return false;
        }
        let table_id = record.table_id;
        let feed = rows.by_table.entry(table_id).or_default();
        feed.push(record.hand_id);
        if feed.len() > MAX_RETAINED_PER_TABLE {
            let evicted = feed.remove(0);
            rows.by_hand_id.remove(&evicted);
        }
        rows.by_hand_id.insert(record.hand_id, record);
        true
    }

    pub fn get(&self, hand_id: HandId) -> Option<HandRecord> {
        self.inner
            .read()
            .expect("hand archive poisoned")
            .by_hand_id
            .get(&hand_id)
            .cloned()
    }

    pub fn recent_for_table(&self, table_id: TableId, limit: usize) -> Vec<HandRecord> {
        let rows = self.inner.read().expect("hand archive poisoned");
        let Some(ids) = rows.by_table.get(&table_id) else {
            return Vec::new();
        };
        ids.iter()
            .rev()
            .take(limit)
            .filter_map(|id| rows.by_hand_id.get(id).cloned())
            .collect()
    }
}

impl Default for HandArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TableId;
    use uuid::Uuid;

    fn sample_record(table_id: TableId) -> HandRecord {
        HandRecord {
            hand_id: Uuid::new_v4(),
            table_id,
            starting_stacks: Vec::new(),
            hole_cards: Vec::new(),
            community_cards: Vec::new(),
            actions: Vec::new(),
            chat: Vec::new(),
            pot: 0,
            winners: Vec::new(),
            started_at_millis: 0,
            ended_at_millis: Some(1),
        }
    }

    #[test]
    fn insert_is_idempotent_by_hand_id() {
        let archive = HandArchive::new();
        let record = sample_record(TableId(1));
        let id = record.hand_id;
        archive.insert(record.clone());
        archive.insert(record);
        assert_eq!(archive.recent_for_table(TableId(1), 10).len(), 1);
        assert!(archive.get(id).is_some());
    }

    #[test]
    fn retains_only_the_last_fifty_hands_per_table() {
        let archive = HandArchive::new();
        for _ in 0..60 {
            archive.insert(sample_record(TableId(1)));
        }
        assert_eq!(archive.recent_for_table(TableId(1), 100).len(), MAX_RETAINED_PER_TABLE);
    }
}
