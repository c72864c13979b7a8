//! Pairwise anti-collusion accumulator (spec.md §4.7).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::engine::{ActionKind, HandRecord};
use crate::ids::AgentId;

pub const MIN_HANDS_FOR_SCORE: u32 = 5;
pub const WATCHLIST_THRESHOLD: f64 = 0.75;

#[derive(Clone, Copy, Debug, Default)]
pub struct PairStats {
    pub hands_together: u32,
    pub a_folds_to_b: u32,
    pub b_folds_to_a: u32,
    pub chip_flow_a_to_b: i64,
    pub score: f64,
}

fn canonical_pair(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn recompute_score(stats: &mut PairStats) {
    let n = stats.hands_together as f64;
    let fold_score = (f64::from(stats.a_folds_to_b + stats.b_folds_to_a) / n / 0.6).min(1.0);
    let fold_bias = f64::from(stats.a_folds_to_b.max(stats.b_folds_to_a))
        / f64::from(1.max(stats.a_folds_to_b + stats.b_folds_to_a));
    let chip_bias = (stats.chip_flow_a_to_b.unsigned_abs() as f64) / n;
    let confidence = (n / 20.0).min(1.0);
    stats.score = (0.35 * fold_score + 0.35 * fold_bias + 0.30 * chip_bias) * confidence;
}

/// Same per-key `RwLock<HashMap<...>>` idiom used by the identity store and
/// hand archive, keyed on a lexically-canonicalised agent pair.
pub struct CollusionAccumulator {
    inner: RwLock<HashMap<(AgentId, AgentId), PairStats>>,
}

impl CollusionAccumulator {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Feeds one completed hand into every participating pair's accumulator.
    pub fn record_hand(&self, record: &HandRecord) {
        let participants: Vec<AgentId> = record
            .starting_stacks
            .iter()
            .map(|(agent_id, _, _)| *agent_id)
            .collect();
        if participants.len() < 2 {
            return;
        }

        let winner_ids: Vec<AgentId> = record.winners.iter().map(|w| w.agent_id).collect();
        let last_raiser = last_raiser_before_each_fold(record);

        let mut inner = self.inner.write().expect("collusion accumulator poisoned");
        for i in 0..participants.len() {
            for j in (i + 1)..participants.len() {
                let (a, b) = canonical_pair(participants[i], participants[j]);
                let entry = inner.entry((a, b)).or_default();
                entry.hands_together += 1;

                if let Some(raiser) = last_raiser.get(&a) {
                    if *raiser == b {
                        entry.a_folds_to_b += 1;
                    }
                }
                if let Some(raiser) = last_raiser.get(&b) {
                    if *raiser == a {
                        entry.b_folds_to_a += 1;
                    }
                }

                if winner_ids.contains(&b) {
                    entry.chip_flow_a_to_b += 1;
                } else if winner_ids.contains(&a) {
                    entry.chip_flow_a_to_b -= 1;
                }

                if entry.hands_together >= MIN_HANDS_FOR_SCORE {
                    recompute_score(entry);
                }
            }
        }
    }

    pub fn watchlist(&self) -> Vec<(AgentId, AgentId, PairStats)> {
        let inner = self.inner.read().expect("collusion accumulator poisoned");
        inner
            .iter()
            .filter(|(_, stats)| stats.score >= WATCHLIST_THRESHOLD)
            .map(|(&(a, b), &stats)| (a, b, stats))
            .collect()
    }
}

impl Default for CollusionAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// For each agent that folded in the hand, the id of the most recent
/// raiser (`Raise` or `AllIn`) at the moment they folded, if any.
fn last_raiser_before_each_fold(record: &HandRecord) -> HashMap<AgentId, AgentId> {
    let mut result = HashMap::new();
    let mut current_raiser: Option<AgentId> = None;
    for entry in &record.actions {
        match entry.action {
            ActionKind::Raise | ActionKind::AllIn => current_raiser = Some(entry.agent_id),
            ActionKind::Fold => {
                if let Some(raiser) = current_raiser {
                    if raiser != entry.agent_id {
                        result.insert(entry.agent_id, raiser);
                    }
                }
            }
            _ => {}
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ActionLogEntry, WinnerInfo};
    use crate::ids::TableId;
    use uuid::Uuid;

    fn hand_with(a: AgentId, b: AgentId, a_folds: bool, winner: AgentId) -> HandRecord {
        let mut actions = vec![ActionLogEntry {
            agent_id: b,
            name: "b".into(),
            action: ActionKind::Raise,
            amount: 60,
            at_millis: 0,
        }];
        if a_folds {
            actions.push(ActionLogEntry {
                agent_id: a,
                name: "a".into(),
                action: ActionKind::Fold,
                amount: 0,
                at_millis: 1,
            });
        }
        HandRecord {
            hand_id: Uuid::new_v4(),
            table_id: TableId(1),
            starting_stacks: vec![(a, "a".into(), 1000), (b, "b".into(), 1000)],
            hole_cards: Vec::new(),
            community_cards: Vec::new(),
            actions,
            chat: Vec::new(),
            pot: 80,
            winners: vec![WinnerInfo {
                agent_id: winner,
                name: "w".into(),
                amount: 80,
                hand_description: "x".into(),
            }],
            started_at_millis: 0,
            ended_at_millis: Some(2),
        }
    }

    #[test]
    fn repeated_fold_to_same_raiser_raises_the_score() {
        let acc = CollusionAccumulator::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for _ in 0..20 {
            acc.record_hand(&hand_with(a, b, true, b));
        }
        let watchlist = acc.watchlist();
        assert_eq!(watchlist.len(), 1);
        assert!(watchlist[0].2.score >= WATCHLIST_THRESHOLD);
    }

    #[test]
    fn below_minimum_hands_together_never_scores() {
        let acc = CollusionAccumulator::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        for _ in 0..(MIN_HANDS_FOR_SCORE - 1) {
            acc.record_hand(&hand_with(a, b, true, b));
        }
        assert!(acc.watchlist().is_empty());
    }
}
