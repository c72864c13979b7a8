//! Read-only projections of `TableState` served to agents and spectators.
//! Kept separate from `engine` so the wire shape can evolve independently
//! of the internal state representation.

use serde::Serialize;

use crate::card::Card;
use crate::engine::{ChatLogEntry, Phase, Player, PlayerStatus, TableState};
use crate::ids::AgentId;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailableAction {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicPlayerInfo {
    pub id: AgentId,
    pub name: String,
    pub chips: u64,
    pub status: PlayerStatus,
    pub bet: u64,
    /// Only populated during showdown for non-folded players.
    pub hole_cards: Option<(Card, Card)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatMessageView {
    pub name: String,
    pub text: String,
    pub at_millis: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentView {
    pub table_id: u64,
    pub phase: Phase,
    pub hole_cards: Option<(Card, Card)>,
    pub community_cards: Vec<Card>,
    pub pot: u64,
    pub current_bet: u64,
    pub your_chips: u64,
    pub your_bet: u64,
    pub is_your_turn: bool,
    pub ms_remaining: Option<u64>,
    pub players: Vec<PublicPlayerInfo>,
    pub recent_chat: Vec<ChatMessageView>,
    pub available_actions: Vec<AvailableAction>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicView {
    pub table_id: u64,
    pub phase: Phase,
    pub community_cards: Vec<Card>,
    pub pot: u64,
    pub current_bet: u64,
    pub players: Vec<PublicPlayerInfo>,
    pub recent_chat: Vec<ChatMessageView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableSummary {
    pub table_id: u64,
    pub phase: Phase,
    pub seated: usize,
    pub small_blind: u64,
    pub big_blind: u64,
}

fn public_player_info(p: &Player, reveal_hole_cards: bool) -> PublicPlayerInfo {
    PublicPlayerInfo {
        id: p.agent_id,
        name: p.name.clone(),
        chips: p.chips,
        status: p.status,
        bet: p.bet,
        hole_cards: if reveal_hole_cards && p.status != PlayerStatus::Folded {
            p.hole_cards
        } else {
            None
        },
    }
}

fn recent_chat(log: &[ChatLogEntry]) -> Vec<ChatMessageView> {
    log.iter()
        .rev()
        .take(crate::engine::MAX_CHAT_LOG)
        .rev()
        .map(|m| ChatMessageView {
            name: m.name.clone(),
            text: m.text.clone(),
            at_millis: m.at_millis,
        })
        .collect()
}

/// spec.md §4.4: always fold/all_in; check iff `currentBet <= player.bet`,
/// else call; raise iff the player can contribute more than a call costs.
pub fn available_actions(state: &TableState, player: &Player) -> Vec<AvailableAction> {
    let mut actions = vec![AvailableAction::Fold, AvailableAction::AllIn];
    if state.current_bet <= player.bet {
        actions.push(AvailableAction::Check);
    } else {
        actions.push(AvailableAction::Call);
    }
    if player.chips > state.current_bet.saturating_sub(player.bet) {
        actions.push(AvailableAction::Raise);
    }
    actions
}

pub fn agent_view(state: &TableState, agent_id: AgentId, now_millis: u64) -> Option<AgentView> {
    let idx = state.player_index(agent_id)?;
    let you = &state.players[idx];
    let is_your_turn = state.current_turn_index == Some(idx) && you.status == PlayerStatus::Active;
    let ms_remaining = if is_your_turn {
        Some(
            state
                .action_timeout_ms
                .saturating_sub(now_millis.saturating_sub(state.last_action_time_millis)),
        )
    } else {
        None
    };
    let reveal = state.phase == Phase::Showdown;
    Some(AgentView {
        table_id: state.table_id.0,
        phase: state.phase,
        hole_cards: you.hole_cards,
        community_cards: state.community_cards.clone(),
        pot: state.pot,
        current_bet: state.current_bet,
        your_chips: you.chips,
        your_bet: you.bet,
        is_your_turn,
        ms_remaining,
        players: state
            .players
            .iter()
            .map(|p| public_player_info(p, reveal))
            .collect(),
        recent_chat: state
            .hand_record
            .as_ref()
            .map(|r| recent_chat(&r.chat))
            .unwrap_or_default(),
        available_actions: if is_your_turn {
            available_actions(state, you)
        } else {
            Vec::new()
        },
    })
}

pub fn public_view(state: &TableState) -> PublicView {
    let reveal = state.phase == Phase::Showdown;
    PublicView {
        table_id: state.table_id.0,
        phase: state.phase,
        community_cards: state.community_cards.clone(),
        pot: state.pot,
        current_bet: state.current_bet,
        players: state
            .players
            .iter()
            .map(|p| public_player_info(p, reveal))
            .collect(),
        recent_chat: state
            .hand_record
            .as_ref()
            .map(|r| recent_chat(&r.chat))
            .unwrap_or_default(),
    }
}

pub fn table_summary(state: &TableState) -> TableSummary {
    TableSummary {
        table_id: state.table_id.0,
        phase: state.phase,
        seated: state.seated_count(),
        small_blind: state.small_blind,
        big_blind: state.big_blind,
    }
}
