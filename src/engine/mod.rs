//! Pure game engine: table state and the transition functions that mutate
//! it in place. No I/O, no clock reads — callers supply `now_millis`
//! (see DESIGN.md).

pub mod actions;
pub mod error;
pub mod resolve;

use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::deck::Deck;
use crate::ids::{AgentId, HandId, TableId};

pub use actions::{act, join, leave, sit_in, sit_out, start_hand, timeout};
pub use error::EngineError;

pub const STARTING_CHIPS: u64 = 1000;
pub const DEFAULT_SMALL_BLIND: u64 = 10;
pub const DEFAULT_BIG_BLIND: u64 = 20;
pub const ACTION_TIMEOUT_MS: u64 = 15_000;
pub const SHOWDOWN_COOLDOWN_MS: u64 = 3_000;
pub const MIN_TABLE_SIZE: usize = 2;
pub const MAX_TABLE_SIZE: usize = 6;
pub const MAX_SIT_OUT_HANDS: u32 = 10;
pub const MAX_CHAT_LOG: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStatus {
    Active,
    Folded,
    AllIn,
    SittingOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
    PostSmallBlind,
    PostBigBlind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub agent_id: AgentId,
    pub name: String,
    pub chips: u64,
    pub hole_cards: Option<(Card, Card)>,
    pub bet: u64,
    pub total_bet: u64,
    pub status: PlayerStatus,
    pub seat_index: usize,
    pub has_acted: bool,
    pub sit_out_count: u32,
}

impl Player {
    pub fn new(agent_id: AgentId, name: String, chips: u64, seat_index: usize) -> Self {
        Self {
            agent_id,
            name,
            chips,
            hole_cards: None,
            bet: 0,
            total_bet: 0,
            status: PlayerStatus::SittingOut,
            seat_index,
            has_acted: false,
            sit_out_count: 0,
        }
    }

    pub fn is_dealt_in(&self) -> bool {
        !matches!(self.status, PlayerStatus::SittingOut)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub agent_id: AgentId,
    pub name: String,
    pub action: ActionKind,
    pub amount: u64,
    pub at_millis: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatLogEntry {
    pub agent_id: AgentId,
    pub name: String,
    pub text: String,
    pub at_millis: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WinnerInfo {
    pub agent_id: AgentId,
    pub name: String,
    pub amount: u64,
    pub hand_description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandRecord {
    pub hand_id: HandId,
    pub table_id: TableId,
    pub starting_stacks: Vec<(AgentId, String, u64)>,
    pub hole_cards: Vec<(AgentId, Card, Card)>,
    pub community_cards: Vec<Card>,
    pub actions: Vec<ActionLogEntry>,
    pub chat: Vec<ChatLogEntry>,
    pub pot: u64,
    pub winners: Vec<WinnerInfo>,
    pub started_at_millis: u64,
    pub ended_at_millis: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LastHandResult {
    pub hand_id: HandId,
    pub winners: Vec<WinnerInfo>,
    pub pot: u64,
}

/// One table's full mutable state. Owned behind the table actor's mutex
/// (see `crate::actor`); every field here is persisted verbatim on commit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableState {
    pub table_id: TableId,
    pub hand_id: Option<HandId>,
    pub phase: Phase,
    pub players: Vec<Player>,
    pub community_cards: Vec<Card>,
    pub deck: Deck,
    pub pot: u64,
    pub current_bet: u64,
    pub current_turn_index: Option<usize>,
    pub dealer_index: usize,
    pub small_blind: u64,
    pub big_blind: u64,
    pub last_action_time_millis: u64,
    pub action_timeout_ms: u64,
    pub hand_record: Option<HandRecord>,
    pub last_hand_result: Option<LastHandResult>,
}

impl TableState {
    pub fn new(table_id: TableId) -> Self {
        Self {
            table_id,
            hand_id: None,
            phase: Phase::Waiting,
            players: Vec::new(),
            community_cards: Vec::new(),
            deck: Deck::new(),
            pot: 0,
            current_bet: 0,
            current_turn_index: None,
            dealer_index: 0,
            small_blind: DEFAULT_SMALL_BLIND,
            big_blind: DEFAULT_BIG_BLIND,
            last_action_time_millis: 0,
            action_timeout_ms: ACTION_TIMEOUT_MS,
            hand_record: None,
            last_hand_result: None,
        }
    }

    pub fn player_index(&self, agent_id: AgentId) -> Option<usize> {
        self.players.iter().position(|p| p.agent_id == agent_id)
    }

    pub fn seated_count(&self) -> usize {
        self.players.len()
    }

    pub fn active_player_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.status == PlayerStatus::Active)
            .count()
    }

    pub fn non_folded_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| !matches!(p.status, PlayerStatus::Folded | PlayerStatus::SittingOut))
            .count()
    }
}
