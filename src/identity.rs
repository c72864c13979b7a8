//! Identity store: agent registration, profile lookup and chip bookkeeping.
//!
//! Same map-of-state idiom as the teacher's `AppState` (an outer
//! `RwLock<HashMap<...>>` guarding per-row data), applied to agents instead
//! of table sessions, with extra name/api-key indices per spec.md §6.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::STARTING_CHIPS;
use crate::ids::{AgentId, TableId};

pub const MAX_REBUYS: u32 = 3;
pub const REBUY_THRESHOLD_CHIPS: u64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("name already registered")]
    NameTaken,
    #[error("unknown agent")]
    UnknownAgent,
    #[error("agent is banned")]
    Banned,
    #[error("no rebuys remaining")]
    NoRebuysLeft,
    #[error("chips above the rebuy threshold")]
    RebuyNotEligible,
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub api_key_hash: String,
    pub chips: u64,
    pub hands_played: u64,
    pub hands_won: u64,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub created_at_millis: u64,
    pub banned: bool,
    pub current_table: Option<TableId>,
    pub rebuys: u32,
}

impl Agent {
    pub fn rebuys_left(&self) -> u32 {
        MAX_REBUYS.saturating_sub(self.rebuys)
    }
}

pub fn hash_api_key(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    hex::encode(digest)
}

fn new_api_key() -> String {
    format!("apk_{}", Uuid::new_v4().simple())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Default)]
struct Indices {
    by_id: HashMap<AgentId, Agent>,
    by_name: HashMap<String, AgentId>,
    by_api_key_hash: HashMap<String, AgentId>,
}

/// In-process realization of the `agents` table from spec.md §6: an
/// append-mostly row store plus the two lookup indices the schema declares.
pub struct IdentityStore {
    inner: RwLock<Indices>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Indices::default()),
        }
    }

    /// Registers a new agent, returning the plaintext API key (shown once;
    /// only its hash is ever stored).
    pub fn register(
        &self,
        name: &str,
        llm_provider: Option<String>,
        llm_model: Option<String>,
    ) -> Result<(Agent, String), IdentityError> {
        let mut idx = self.inner.write().expect("identity store poisoned");
        if idx.by_name.contains_key(name) {
            return Err(IdentityError::NameTaken);
        }
        let api_key = new_api_key();
        let api_key_hash = hash_api_key(&api_key);
        let agent = Agent {
            id: Uuid::new_v4(),
            name: name.to_string(),
            api_key_hash: api_key_hash.clone(),
            chips: STARTING_CHIPS,
            hands_played: 0,
            hands_won: 0,
            llm_provider,
            llm_model,
            created_at_millis: now_millis(),
            banned: false,
            current_table: None,
            rebuys: 0,
        };
        idx.by_name.insert(agent.name.clone(), agent.id);
        idx.by_api_key_hash.insert(api_key_hash, agent.id);
        idx.by_id.insert(agent.id, agent.clone());
        Ok((agent, api_key))
    }

    pub fn get(&self, id: AgentId) -> Option<Agent> {
        self.inner
            .read()
            .expect("identity store poisoned")
            .by_id
            .get(&id)
            .cloned()
    }

    pub fn authenticate(&self, api_key: &str) -> Result<Agent, IdentityError> {
        let hash = hash_api_key(api_key);
        let idx = self.inner.read().expect("identity store poisoned");
        let id = idx
            .by_api_key_hash
            .get(&hash)
            .ok_or(IdentityError::UnknownAgent)?;
        let agent = idx.by_id.get(id).cloned().ok_or(IdentityError::UnknownAgent)?;
        if agent.banned {
            return Err(IdentityError::Banned);
        }
        Ok(agent)
    }

    pub fn set_current_table(&self, id: AgentId, table: Option<TableId>) -> Result<(), IdentityError> {
        let mut idx = self.inner.write().expect("identity store poisoned");
        let agent = idx.by_id.get_mut(&id).ok_or(IdentityError::UnknownAgent)?;
        agent.current_table = table;
        Ok(())
    }

    /// Overwrites an agent's chip count (table commits and `/rebuy` both
    /// call this — the identity store is the authoritative balance).
    pub fn update_chips(&self, id: AgentId, chips: u64) -> Result<(), IdentityError> {
        let mut idx = self.inner.write().expect("identity store poisoned");
        let agent = idx.by_id.get_mut(&id).ok_or(IdentityError::UnknownAgent)?;
        agent.chips = chips;
        Ok(())
    }

    pub fn record_hand_result(&self, id: AgentId, won: bool) -> Result<(), IdentityError> {
        let mut idx = self.inner.write().expect("identity store poisoned");
        let agent = idx.by_id.get_mut(&id).ok_or(IdentityError::UnknownAgent)?;
        agent.hands_played += 1;
        if won {
            agent.hands_won += 1;
        }
        Ok(())
    }

    pub fn rebuy(&self, id: AgentId) -> Result<Agent, IdentityError> {
        let mut idx = self.inner.write().expect("identity store poisoned");
        let agent = idx.by_id.get_mut(&id).ok_or(IdentityError::UnknownAgent)?;
        if agent.banned {
            return Err(IdentityError::Banned);
        }
        if agent.chips >= REBUY_THRESHOLD_CHIPS {
            return Err(IdentityError::RebuyNotEligible);
        }
        if agent.rebuys >= MAX_REBUYS {
            return Err(IdentityError::NoRebuysLeft);
        }
        agent.rebuys += 1;
        agent.chips = STARTING_CHIPS;
        Ok(agent.clone())
    }

    pub fn set_banned(&self, id: AgentId, banned: bool) -> Result<(), IdentityError> {
        let mut idx = self.inner.write().expect("identity store poisoned");
        let agent = idx.by_id.get_mut(&id).ok_or(IdentityError::UnknownAgent)?;
        agent.banned = banned;
        Ok(())
    }

    pub fn leaderboard(&self, limit: usize) -> Vec<Agent> {
        let idx = self.inner.read().expect("identity store poisoned");
        let mut agents: Vec<Agent> = idx.by_id.values().cloned().collect();
        agents.sort_by(|a, b| b.chips.cmp(&a.chips));
        agents.truncate(limit);
        agents
    }

    pub fn stats(&self) -> (usize, u64, u64) {
        let idx = self.inner.read().expect("identity store poisoned");
        let count = idx.by_id.len();
        let hands_played: u64 = idx.by_id.values().map(|a| a.hands_played).sum();
        let hands_won: u64 = idx.by_id.values().map(|a| a.hands_won).sum();
        (count, hands_played, hands_won)
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_duplicate_name_is_rejected() {
        let store = IdentityStore::new();
        store.register("Leroy", None, None).unwrap();
        let err = store.register("Leroy", None, None).unwrap_err();
        assert_eq!(err, IdentityError::NameTaken);
    }

    #[test]
    fn authenticate_round_trips_the_issued_key() {
        let store = IdentityStore::new();
        let (agent, api_key) = store.register("Ada", None, None).unwrap();
        let authed = store.authenticate(&api_key).unwrap();
        assert_eq!(authed.id, agent.id);
        assert_eq!(authed.chips, STARTING_CHIPS);
    }

    #[test]
    fn rebuy_requires_low_chips_and_respects_cap() {
        let store = IdentityStore::new();
        let (agent, _) = store.register("Grace", None, None).unwrap();
        assert_eq!(
            store.rebuy(agent.id).unwrap_err(),
            IdentityError::RebuyNotEligible
        );
        store.update_chips(agent.id, 50).unwrap();
        for _ in 0..MAX_REBUYS {
            store.update_chips(agent.id, 50).unwrap();
            store.rebuy(agent.id).unwrap();
            store.update_chips(agent.id, 50).unwrap();
        }
        assert_eq!(
            store.rebuy(agent.id).unwrap_err(),
            IdentityError::NoRebuysLeft
        );
    }
}
