//! Background sweep that feeds completed hands into the hand archive, the
//! anti-collusion accumulator and identity win/loss tallies. Chip balances
//! are not this module's concern — `TableActor` writes those back to the
//! identity store synchronously on every action and tick (see
//! `actor::sync_chips`), since a chip change is authoritative the moment
//! it commits rather than on the next 500ms sweep.
//!
//! Kept independent of the request path (unlike an earlier draft that did
//! this inline in `table_act`) because a hand can finish without anyone
//! calling `/table/act` again — the actor's own tick loop folds out a
//! timed-out player and deals the next hand on its own. Grounded on the
//! same periodic-poll idiom as `actor::run_ticker`.

use std::time::Duration;

use tokio::time::sleep;

use super::AppState;

const SWEEP_INTERVAL_MS: u64 = 500;
const HISTORY_SWEEP_DEPTH: usize = 50;

pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        loop {
            sweep_once(&state).await;
            sleep(Duration::from_millis(SWEEP_INTERVAL_MS)).await;
        }
    });
}

async fn sweep_once(state: &AppState) {
    let actors: Vec<_> = state.tables.read().await.values().cloned().collect();
    for actor in actors {
        for record in actor.get_hand_history(HISTORY_SWEEP_DEPTH).await {
            // `archive.insert` is idempotent by hand id, so only the first
            // sweep to observe a given finished hand runs the one-shot
            // collusion/identity bookkeeping for it.
            if state.archive.insert(record.clone()) {
                state.collusion.record_hand(&record);
                for (participant_id, _, _) in &record.starting_stacks {
                    let won = record.winners.iter().any(|w| w.agent_id == *participant_id);
                    let _ = state.identity.record_hand_result(*participant_id, won);
                }
            }
        }
    }
}
