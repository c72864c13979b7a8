//! Table actor: the single-writer boundary for one table's state (spec.md
//! §4.4). Every mutating call takes the table's `tokio::sync::Mutex` so two
//! `act`/`join`/`chat` invocations can never interleave; a background tick
//! loop is the "timer" that fires the 15s action-timeout and the 3s
//! post-showdown cooldown, mirroring `vincev-freezeout`'s `State::tick`
//! polling rather than per-event deferred timer handles (see DESIGN.md).

use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::thread_rng;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::engine::{self, ActionKind, EngineError, HandRecord, Phase, TableState, MAX_CHAT_LOG, SHOWDOWN_COOLDOWN_MS};
use crate::identity::IdentityStore;
use crate::ids::{AgentId, TableId};
use crate::view::{self, AgentView, PublicView, TableSummary};

const TICK_INTERVAL_MS: u64 = 250;
const MAX_LOCAL_HISTORY: usize = 50;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Writes every seated player's current table balance back into the
/// identity store, which is the authoritative chip ledger (spec.md §5).
/// Called after anything that might change a chip count so `/me`,
/// `/leaderboard` and `/rebuy` eligibility never see a stale balance.
fn sync_chips(identity: &IdentityStore, state: &TableState) {
    for p in &state.players {
        let _ = identity.update_chips(p.agent_id, p.chips);
    }
}

struct ActorHandle {
    table_id: TableId,
    state: Mutex<TableState>,
    history: Mutex<Vec<HandRecord>>,
    identity: Arc<IdentityStore>,
}

/// Cheaply `Clone`-able handle to one table's actor; every clone shares the
/// same lock and the same background tick task.
#[derive(Clone)]
pub struct TableActor {
    handle: Arc<ActorHandle>,
}

impl TableActor {
    pub fn spawn(table_id: TableId, identity: Arc<IdentityStore>) -> Self {
        let handle = Arc::new(ActorHandle {
            table_id,
            state: Mutex::new(TableState::new(table_id)),
            history: Mutex::new(Vec::new()),
            identity,
        });
        tokio::spawn(run_ticker(Arc::downgrade(&handle)));
        Self { handle }
    }

    pub fn table_id(&self) -> TableId {
        self.handle.table_id
    }

    pub async fn join(&self, agent_id: AgentId, name: String, chips: u64) -> Result<(), EngineError> {
        let mut state = self.handle.state.lock().await;
        engine::join(&mut state, agent_id, name, chips)
    }

    pub async fn leave(&self, agent_id: AgentId) -> Result<(), EngineError> {
        let mut state = self.handle.state.lock().await;
        engine::leave(&mut state, agent_id)
    }

    pub async fn sit_out(&self, agent_id: AgentId) -> Result<(), EngineError> {
        let mut state = self.handle.state.lock().await;
        engine::sit_out(&mut state, agent_id)
    }

    pub async fn sit_in(&self, agent_id: AgentId) -> Result<(), EngineError> {
        let mut state = self.handle.state.lock().await;
        engine::sit_in(&mut state, agent_id)
    }

    pub async fn act(
        &self,
        agent_id: AgentId,
        action: ActionKind,
        amount: Option<u64>,
    ) -> Result<(), EngineError> {
        let mut state = self.handle.state.lock().await;
        let now = now_millis();
        engine::act(&mut state, agent_id, action, amount, now)?;
        record_if_new(&self.handle, &state).await;
        sync_chips(&self.handle.identity, &state);
        Ok(())
    }

    /// Chat is sanitized by the gateway before reaching the actor; this
    /// just appends to the table's rolling log, capped at
    /// [`MAX_CHAT_LOG`] entries, and to the active hand's record if any.
    pub async fn chat(&self, agent_id: AgentId, text: String) -> Result<(), EngineError> {
        let mut state = self.handle.state.lock().await;
        let idx = state.player_index(agent_id).ok_or(EngineError::NotSeated)?;
        let entry = crate::engine::ChatLogEntry {
            agent_id,
            name: state.players[idx].name.clone(),
            text,
            at_millis: now_millis(),
        };
        if let Some(record) = state.hand_record.as_mut() {
            record.chat.push(entry);
            let len = record.chat.len();
            if len > MAX_CHAT_LOG {
                record.chat.drain(0..len - MAX_CHAT_LOG);
            }
        }
        Ok(())
    }

    pub async fn get_agent_view(&self, agent_id: AgentId) -> Option<AgentView> {
        let state = self.handle.state.lock().await;
        view::agent_view(&state, agent_id, now_millis())
    }

    pub async fn get_public_view(&self) -> PublicView {
        let state = self.handle.state.lock().await;
        view::public_view(&state)
    }

    pub async fn get_summary(&self) -> TableSummary {
        let state = self.handle.state.lock().await;
        view::table_summary(&state)
    }

    pub async fn get_hand_history(&self, limit: usize) -> Vec<HandRecord> {
        let history = self.handle.history.lock().await;
        history.iter().rev().take(limit).cloned().collect()
    }

    /// Writes back a chip balance the identity store changed out-of-band
    /// (a `/rebuy` while seated). No-op if the agent is not currently
    /// seated at this table.
    pub async fn update_chips(&self, agent_id: AgentId, chips: u64) {
        let mut state = self.handle.state.lock().await;
        if let Some(idx) = state.player_index(agent_id) {
            state.players[idx].chips = chips;
        }
    }

    pub async fn reset(&self) {
        let mut state = self.handle.state.lock().await;
        *state = TableState::new(self.handle.table_id);
        let mut history = self.handle.history.lock().await;
        history.clear();
    }
}

/// Pushes the table's current hand record into local history, once, the
/// moment it finishes (`phase == Showdown` and `ended_at_millis` is set).
async fn record_if_new(handle: &Arc<ActorHandle>, state: &TableState) {
    if state.phase != Phase::Showdown {
        return;
    }
    let Some(record) = state.hand_record.clone() else {
        return;
    };
    if record.ended_at_millis.is_none() {
        return;
    }
    let mut history = handle.history.lock().await;
    if history.last().map(|r| r.hand_id) == Some(record.hand_id) {
        return;
    }
    history.push(record);
    if history.len() > MAX_LOCAL_HISTORY {
        history.remove(0);
    }
}

async fn run_ticker(weak: Weak<ActorHandle>) {
    loop {
        sleep(Duration::from_millis(TICK_INTERVAL_MS)).await;
        let Some(handle) = weak.upgrade() else {
            return;
        };
        let now = now_millis();
        let mut state = handle.state.lock().await;
        let _ = engine::timeout(&mut state, now);
        record_if_new(&handle, &state).await;
        maybe_advance_showdown(&mut state, now);
        sync_chips(&handle.identity, &state);
    }
}

/// Starts the next hand once the 3s post-showdown cooldown has elapsed, or
/// immediately if the table is simply waiting for enough players.
fn maybe_advance_showdown(state: &mut TableState, now: u64) {
    match state.phase {
        Phase::Waiting => {
            let mut rng = thread_rng();
            let _ = engine::start_hand(state, &mut rng, now);
        }
        Phase::Showdown => {
            let ended_at = state
                .hand_record
                .as_ref()
                .and_then(|r| r.ended_at_millis)
                .unwrap_or(state.last_action_time_millis);
            if now.saturating_sub(ended_at) >= SHOWDOWN_COOLDOWN_MS {
                let mut rng = thread_rng();
                let _ = engine::start_hand(state, &mut rng, now);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::engine::ActionKind;
    use crate::identity::IdentityStore;
    use crate::ids::TableId;

    use super::TableActor;

    fn spawn_actor(table_id: TableId) -> TableActor {
        TableActor::spawn(table_id, Arc::new(IdentityStore::new()))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_joins_auto_deal_and_post_blinds() {
        let actor = spawn_actor(TableId(1));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        actor.join(a, "alice".into(), 1_000).await.unwrap();
        actor.join(b, "bob".into(), 1_000).await.unwrap();

        // The background ticker deals the first hand once two players are
        // seated; give it a few tick intervals to run.
        tokio::time::sleep(std::time::Duration::from_millis(800)).await;

        let view_a = actor.get_agent_view(a).await.expect("seated");
        assert_eq!(view_a.pot, 30, "small blind 10 + big blind 20 posted");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn fold_ends_hand_and_awards_pot_to_survivor() {
        let actor = spawn_actor(TableId(2));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        actor.join(a, "alice".into(), 1_000).await.unwrap();
        actor.join(b, "bob".into(), 1_000).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(800)).await;

        let view_a = actor.get_agent_view(a).await.expect("seated");
        let to_act = if view_a.is_your_turn { a } else { b };

        let result = actor.act(to_act, ActionKind::Fold, None).await;
        assert!(result.is_ok());

        let history = actor.get_hand_history(10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].winners.len(), 1);
    }

    #[tokio::test]
    async fn chat_rejects_agents_not_seated() {
        let actor = spawn_actor(TableId(3));
        let stranger = Uuid::new_v4();
        let result = actor.chat(stranger, "gg".into()).await;
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn table_chip_changes_are_written_back_to_identity() {
        let identity = Arc::new(IdentityStore::new());
        let (alice, _) = identity.register("alice", None, None).unwrap();
        let (bob, _) = identity.register("bob", None, None).unwrap();
        let actor = TableActor::spawn(TableId(4), identity.clone());

        actor.join(alice.id, "alice".into(), 1_000).await.unwrap();
        actor.join(bob.id, "bob".into(), 1_000).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(800)).await;

        // Blinds have been posted straight into the table's own state; the
        // background tick must have already copied the reduced balances
        // back into the identity store without anyone calling `/table/act`.
        let alice_now = identity.get(alice.id).unwrap();
        let bob_now = identity.get(bob.id).unwrap();
        assert!(alice_now.chips < 1_000 || bob_now.chips < 1_000);
        assert_eq!(alice_now.chips + bob_now.chips, 2_000);
    }
}
