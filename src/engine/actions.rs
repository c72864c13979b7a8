//! Join / leave / sit-out / sit-in / start-hand / act / timeout.
//!
//! Mirrors the shape of the teacher's round-advance logic in spirit
//! (`vincev-freezeout`'s `State` methods), reworked as free functions over
//! `&mut TableState` since this crate's actor already owns the lock the
//! teacher's struct methods assumed implicitly.

use rand::Rng;
use uuid::Uuid;

use crate::deck::Deck;
use crate::ids::AgentId;

use super::error::EngineError;
use super::resolve::{advance_phase, resolve, round_advance};
use super::{
    ActionKind, ActionLogEntry, HandRecord, Phase, Player, PlayerStatus, TableState,
    MAX_SIT_OUT_HANDS, MAX_TABLE_SIZE,
};

pub fn join(
    state: &mut TableState,
    agent_id: AgentId,
    name: String,
    chips: u64,
) -> Result<(), EngineError> {
    if state.player_index(agent_id).is_some() {
        return Err(EngineError::AlreadySeated);
    }
    if state.players.len() >= MAX_TABLE_SIZE {
        return Err(EngineError::TableFull);
    }
    if chips < 5 * state.big_blind {
        return Err(EngineError::InsufficientBuyIn);
    }
    let seat_index = state.players.len();
    let mut player = Player::new(agent_id, name, chips, seat_index);
    player.status = PlayerStatus::Active;
    state.players.push(player);
    Ok(())
}

pub fn leave(state: &mut TableState, agent_id: AgentId) -> Result<(), EngineError> {
    let idx = state.player_index(agent_id).ok_or(EngineError::NotSeated)?;
    let mid_hand = matches!(
        state.players[idx].status,
        PlayerStatus::Active | PlayerStatus::AllIn
    ) && !matches!(state.phase, Phase::Waiting | Phase::Showdown);
    if mid_hand {
        return Err(EngineError::InHandCannotLeave);
    }
    state.players.remove(idx);
    for (i, p) in state.players.iter_mut().enumerate() {
        p.seat_index = i;
    }
    Ok(())
}

pub fn sit_out(state: &mut TableState, agent_id: AgentId) -> Result<(), EngineError> {
    if !matches!(state.phase, Phase::Waiting | Phase::Showdown) {
        return Err(EngineError::InvalidSitRequest);
    }
    let idx = state.player_index(agent_id).ok_or(EngineError::NotSeated)?;
    state.players[idx].status = PlayerStatus::SittingOut;
    Ok(())
}

pub fn sit_in(state: &mut TableState, agent_id: AgentId) -> Result<(), EngineError> {
    if !matches!(state.phase, Phase::Waiting | Phase::Showdown) {
        return Err(EngineError::InvalidSitRequest);
    }
    let idx = state.player_index(agent_id).ok_or(EngineError::NotSeated)?;
    if state.players[idx].status != PlayerStatus::SittingOut {
        return Err(EngineError::InvalidSitRequest);
    }
    state.players[idx].status = PlayerStatus::Active;
    state.players[idx].sit_out_count = 0;
    Ok(())
}

/// Begin a new hand: blind computation, eviction, dealing, blind posting.
/// See spec.md §4.3 "StartHand" — the seven numbered steps below mirror it.
pub fn start_hand<R: Rng + ?Sized>(
    state: &mut TableState,
    rng: &mut R,
    now_millis: u64,
) -> Result<(), EngineError> {
    if !matches!(state.phase, Phase::Waiting | Phase::Showdown) {
        return Err(EngineError::WrongPhase);
    }
    if state.players.is_empty() {
        return Err(EngineError::NotEnoughPlayers);
    }

    // 1. Blinds from the average stack of all seated players.
    let avg_stack: u64 =
        state.players.iter().map(|p| p.chips).sum::<u64>() / state.players.len() as u64;
    let small_blind = std::cmp::max(10, avg_stack / 100);
    let big_blind = 2 * small_blind;

    let eligible = state
        .players
        .iter()
        .filter(|p| p.status != PlayerStatus::SittingOut && p.chips >= big_blind)
        .count();
    if eligible < 2 {
        return Err(EngineError::NotEnoughPlayers);
    }
    state.small_blind = small_blind;
    state.big_blind = big_blind;

    // 2. Sitting-out players count this hand as a miss.
    for p in state.players.iter_mut() {
        if p.status == PlayerStatus::SittingOut {
            p.sit_out_count += 1;
        }
    }

    // 3. Evict undercovered players and long-absent sitters.
    state.players.retain(|p| {
        if p.status == PlayerStatus::SittingOut {
            p.sit_out_count < MAX_SIT_OUT_HANDS
        } else {
            p.chips >= big_blind
        }
    });

    // 4. Reorder to contiguous seats, preserving relative order.
    for (i, p) in state.players.iter_mut().enumerate() {
        p.seat_index = i;
    }

    let dealt_in: Vec<usize> = state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.status != PlayerStatus::SittingOut)
        .map(|(i, _)| i)
        .collect();
    let k = dealt_in.len();
    if k < 2 {
        return Err(EngineError::NotEnoughPlayers);
    }

    // 5. Fresh shuffled deck; deal two hole cards per dealt-in player.
    state.deck = Deck::shuffled(rng);
    state.community_cards.clear();
    state.pot = 0;
    state.current_bet = 0;

    let mut starting_stacks = Vec::with_capacity(k);
    let mut hole_cards_log = Vec::with_capacity(k);
    for &i in &dealt_in {
        let p = &mut state.players[i];
        p.status = PlayerStatus::Active;
        p.bet = 0;
        p.total_bet = 0;
        p.has_acted = false;
        starting_stacks.push((p.agent_id, p.name.clone(), p.chips));
        let cards = state.deck.deal(2)?;
        p.hole_cards = Some((cards[0], cards[1]));
        hole_cards_log.push((p.agent_id, cards[0], cards[1]));
    }

    // 6. Blind posting, short stacks capped to their remaining chips.
    let dealer_pos = dealt_in
        .iter()
        .position(|&i| i == state.dealer_index)
        .unwrap_or(0);
    let (sb_pos, bb_pos) = if k == 2 {
        (dealer_pos, (dealer_pos + 1) % k)
    } else {
        ((dealer_pos + 1) % k, (dealer_pos + 2) % k)
    };

    let mut actions = Vec::new();
    post_blind(
        state,
        dealt_in[sb_pos],
        small_blind,
        ActionKind::PostSmallBlind,
        now_millis,
        &mut actions,
    );
    post_blind(
        state,
        dealt_in[bb_pos],
        big_blind,
        ActionKind::PostBigBlind,
        now_millis,
        &mut actions,
    );

    // 7. First to act is the seat after the big blind.
    let first_to_act_pos = (bb_pos + 1) % k;
    let hand_id = Uuid::new_v4();
    state.hand_id = Some(hand_id);
    state.phase = Phase::Preflop;
    state.current_bet = big_blind;
    state.current_turn_index = Some(dealt_in[first_to_act_pos]);
    state.last_action_time_millis = now_millis;
    state.last_hand_result = None;
    state.hand_record = Some(HandRecord {
        hand_id,
        table_id: state.table_id,
        starting_stacks,
        hole_cards: hole_cards_log,
        community_cards: Vec::new(),
        actions,
        chat: Vec::new(),
        pot: 0,
        winners: Vec::new(),
        started_at_millis: now_millis,
        ended_at_millis: None,
    });

    // Blinds may already leave fewer than two players able to act (e.g. a
    // short stack covers the big blind only partially); chain straight
    // through to showdown in that case instead of disturbing the
    // just-computed first-to-act pointer.
    if state.non_folded_count() <= 1 {
        resolve(state, now_millis);
    } else if state.active_player_count() < 2 {
        advance_phase(state, now_millis);
    }
    Ok(())
}

fn post_blind(
    state: &mut TableState,
    idx: usize,
    blind: u64,
    kind: ActionKind,
    now_millis: u64,
    log: &mut Vec<ActionLogEntry>,
) {
    let p = &mut state.players[idx];
    let amount = std::cmp::min(blind, p.chips);
    p.bet = amount;
    p.total_bet = amount;
    p.chips -= amount;
    if amount < blind {
        p.status = PlayerStatus::AllIn;
    }
    state.pot += amount;
    log.push(ActionLogEntry {
        agent_id: p.agent_id,
        name: p.name.clone(),
        action: kind,
        amount,
        at_millis: now_millis,
    });
}

pub fn act(
    state: &mut TableState,
    agent_id: AgentId,
    action: ActionKind,
    amount: Option<u64>,
    now_millis: u64,
) -> Result<(), EngineError> {
    if !matches!(
        state.phase,
        Phase::Preflop | Phase::Flop | Phase::Turn | Phase::River
    ) {
        return Err(EngineError::WrongPhase);
    }
    let idx = state.player_index(agent_id).ok_or(EngineError::NotSeated)?;
    if state.current_turn_index != Some(idx) {
        return Err(EngineError::NotYourTurn);
    }
    if state.players[idx].status != PlayerStatus::Active {
        return Err(EngineError::WrongPhase);
    }

    apply_action(state, idx, action, amount, now_millis)?;
    round_advance(state, now_millis);
    Ok(())
}

/// Applies one player's action to the table, without advancing the round.
/// Shared by `act` (explicit input) and `timeout` (synthesized fold).
pub(super) fn apply_action(
    state: &mut TableState,
    idx: usize,
    action: ActionKind,
    amount: Option<u64>,
    now_millis: u64,
) -> Result<(), EngineError> {
    let current_bet = state.current_bet;
    let mut logged_amount = 0u64;
    let mut raised = false;

    {
        let p = &mut state.players[idx];
        match action {
            ActionKind::Fold => {
                p.status = PlayerStatus::Folded;
            }
            ActionKind::Check => {
                if current_bet != p.bet {
                    return Err(EngineError::BetToMatch);
                }
            }
            ActionKind::Call => {
                let owed = current_bet.saturating_sub(p.bet);
                let contribution = std::cmp::min(owed, p.chips);
                p.chips -= contribution;
                p.bet += contribution;
                p.total_bet += contribution;
                state.pot += contribution;
                logged_amount = contribution;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
            }
            ActionKind::Raise => {
                let new_bet = amount.ok_or(EngineError::BelowMinRaise)?;
                let min_raise = 2 * current_bet;
                let going_all_in_for_less = new_bet == p.bet + p.chips;
                if new_bet < min_raise && !going_all_in_for_less {
                    return Err(EngineError::BelowMinRaise);
                }
                if new_bet <= current_bet {
                    return Err(EngineError::BelowMinRaise);
                }
                let contribution = new_bet.saturating_sub(p.bet);
                if contribution > p.chips {
                    return Err(EngineError::InsufficientChips);
                }
                p.chips -= contribution;
                p.bet = new_bet;
                p.total_bet += contribution;
                state.pot += contribution;
                logged_amount = new_bet;
                raised = true;
                if p.chips == 0 {
                    p.status = PlayerStatus::AllIn;
                }
            }
            ActionKind::AllIn => {
                let contribution = p.chips;
                p.chips = 0;
                p.bet += contribution;
                p.total_bet += contribution;
                state.pot += contribution;
                p.status = PlayerStatus::AllIn;
                logged_amount = p.bet;
                if p.bet > current_bet {
                    raised = true;
                }
            }
            ActionKind::PostSmallBlind | ActionKind::PostBigBlind => {
                return Err(EngineError::InvalidAction);
            }
        }
        p.has_acted = true;
    }

    if raised {
        let new_bet = state.players[idx].bet;
        state.current_bet = new_bet;
        for (i, p) in state.players.iter_mut().enumerate() {
            if i != idx && p.status == PlayerStatus::Active {
                p.has_acted = false;
            }
        }
    }

    if let Some(record) = state.hand_record.as_mut() {
        let p = &state.players[idx];
        record.actions.push(ActionLogEntry {
            agent_id: p.agent_id,
            name: p.name.clone(),
            action,
            amount: logged_amount,
            at_millis: now_millis,
        });
    }

    Ok(())
}

/// Synthesize a fold for the stalled player if the action clock has expired.
/// Idempotent: a second call with the same `now_millis` after the first has
/// already advanced the turn is a no-op (the stalled player is no longer on
/// the clock).
pub fn timeout(state: &mut TableState, now_millis: u64) -> Result<(), EngineError> {
    if !matches!(
        state.phase,
        Phase::Preflop | Phase::Flop | Phase::Turn | Phase::River
    ) {
        return Ok(());
    }
    let Some(idx) = state.current_turn_index else {
        return Ok(());
    };
    if now_millis.saturating_sub(state.last_action_time_millis) < state.action_timeout_ms {
        return Ok(());
    }
    apply_action(state, idx, ActionKind::Fold, None, now_millis)?;
    round_advance(state, now_millis);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::engine::{Phase, PlayerStatus, TableState};
    use crate::ids::TableId;

    use super::*;

    fn seated_table(stacks: &[u64]) -> TableState {
        let mut state = TableState::new(TableId(1));
        for &chips in stacks {
            join(&mut state, Uuid::new_v4(), "agent".to_string(), chips).unwrap();
        }
        state
    }

    #[test]
    fn heads_up_fold_out_awards_pot_to_survivor() {
        let mut state = seated_table(&[1000, 1000]);
        let mut rng = StdRng::seed_from_u64(1);
        start_hand(&mut state, &mut rng, 0).unwrap();
        assert_eq!(state.phase, Phase::Preflop);

        // Heads-up: dealer (small blind) acts first preflop.
        let sb_idx = state.current_turn_index.unwrap();
        act(&mut state, state.players[sb_idx].agent_id, ActionKind::Raise, Some(60), 100).unwrap();

        let bb_idx = state.current_turn_index.unwrap();
        act(&mut state, state.players[bb_idx].agent_id, ActionKind::Fold, None, 200).unwrap();

        assert_eq!(state.phase, Phase::Showdown);
        let result = state.last_hand_result.as_ref().unwrap();
        assert_eq!(result.pot, 80);
        assert_eq!(result.winners.len(), 1);
        assert_eq!(state.players[sb_idx].chips, 1000 - 60 + 80);
        assert_eq!(state.players[bb_idx].chips, 1000 - 20);
    }

    #[test]
    fn join_rejects_short_buy_in() {
        let mut state = TableState::new(TableId(2));
        let err = join(&mut state, Uuid::new_v4(), "agent".to_string(), 10).unwrap_err();
        assert_eq!(err, EngineError::InsufficientBuyIn);
    }

    #[test]
    fn leave_mid_hand_is_rejected() {
        let mut state = seated_table(&[1000, 1000]);
        let mut rng = StdRng::seed_from_u64(2);
        start_hand(&mut state, &mut rng, 0).unwrap();
        let idx = state.current_turn_index.unwrap();
        let agent_id = state.players[idx].agent_id;
        assert_eq!(
            leave(&mut state, agent_id).unwrap_err(),
            EngineError::InHandCannotLeave
        );
    }

    #[test]
    fn min_raise_violation_is_rejected() {
        let mut state = seated_table(&[1000, 1000, 1000]);
        let mut rng = StdRng::seed_from_u64(3);
        start_hand(&mut state, &mut rng, 0).unwrap();
        assert_eq!(state.current_bet, 20);
        let idx = state.current_turn_index.unwrap();
        let agent_id = state.players[idx].agent_id;
        let err = act(&mut state, agent_id, ActionKind::Raise, Some(30), 0).unwrap_err();
        assert_eq!(err, EngineError::BelowMinRaise);
        // Rejected actions never mutate state: the turn is unchanged.
        assert_eq!(state.current_turn_index, Some(idx));
    }

    #[test]
    fn sit_out_then_sit_in_round_trips() {
        let mut state = seated_table(&[1000, 1000]);
        let agent_id = state.players[0].agent_id;
        sit_out(&mut state, agent_id).unwrap();
        assert_eq!(state.players[0].status, PlayerStatus::SittingOut);
        sit_in(&mut state, agent_id).unwrap();
        assert_eq!(state.players[0].status, PlayerStatus::Active);
    }

    #[test]
    fn sitting_out_counter_increments_without_eviction_below_threshold() {
        let mut state = seated_table(&[1000, 1000, 1000]);
        state.players[2].status = PlayerStatus::SittingOut;
        let sitting_id = state.players[2].agent_id;

        let mut rng = StdRng::seed_from_u64(5);
        start_hand(&mut state, &mut rng, 0).unwrap();

        let idx = state.player_index(sitting_id).expect("still seated");
        assert_eq!(state.players[idx].sit_out_count, 1);
    }

    #[test]
    fn sitting_out_player_is_evicted_after_missing_max_hands() {
        let mut state = seated_table(&[1000, 1000, 1000]);
        state.players[2].status = PlayerStatus::SittingOut;
        state.players[2].sit_out_count = MAX_SIT_OUT_HANDS - 1;
        let sitting_id = state.players[2].agent_id;

        let mut rng = StdRng::seed_from_u64(6);
        start_hand(&mut state, &mut rng, 0).unwrap();

        assert!(
            state.player_index(sitting_id).is_none(),
            "evicted after the 10th consecutive missed hand"
        );
        assert_eq!(state.players.len(), 2);
    }
}
