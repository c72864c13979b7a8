//! Round/phase advance and showdown resolution.
//!
//! The side-pot layering algorithm is grounded on `vincev-freezeout`'s
//! `update_pots`/`pay_bets` (bucket players by distinct contribution
//! levels, award each layer to its best eligible hand).

use std::collections::HashMap;

use crate::hand_eval::{self, HandRank};

use super::{LastHandResult, Phase, PlayerStatus, TableState, WinnerInfo};

pub(super) fn round_advance(state: &mut TableState, now_millis: u64) {
    if matches!(state.phase, Phase::Waiting | Phase::Showdown) {
        return;
    }
    if state.non_folded_count() <= 1 {
        resolve(state, now_millis);
        return;
    }
    let all_settled = state
        .players
        .iter()
        .filter(|p| p.status == PlayerStatus::Active)
        .all(|p| p.has_acted && p.bet == state.current_bet);
    if all_settled {
        advance_phase(state, now_millis);
        return;
    }
    match next_active_seat(state, state.current_turn_index) {
        Some(next) => {
            state.current_turn_index = Some(next);
            state.last_action_time_millis = now_millis;
        }
        None => advance_phase(state, now_millis),
    }
}

fn next_active_seat(state: &TableState, from: Option<usize>) -> Option<usize> {
    let n = state.players.len();
    if n == 0 {
        return None;
    }
    let start = from.map(|i| (i + 1) % n).unwrap_or(0);
    (0..n)
        .map(|step| (start + step) % n)
        .find(|&idx| state.players[idx].status == PlayerStatus::Active)
}

pub(super) fn advance_phase(state: &mut TableState, now_millis: u64) {
    for p in state.players.iter_mut() {
        p.bet = 0;
        p.has_acted = p.status != PlayerStatus::Active;
    }
    state.current_bet = 0;

    match state.phase {
        Phase::Preflop => {
            deal_community(state, 3);
            state.phase = Phase::Flop;
        }
        Phase::Flop => {
            deal_community(state, 1);
            state.phase = Phase::Turn;
        }
        Phase::Turn => {
            deal_community(state, 1);
            state.phase = Phase::River;
        }
        Phase::River => {
            resolve(state, now_millis);
            return;
        }
        Phase::Waiting | Phase::Showdown => return,
    }

    if let Some(record) = state.hand_record.as_mut() {
        record.community_cards = state.community_cards.clone();
    }

    if state.active_player_count() < 2 {
        advance_phase(state, now_millis);
        return;
    }

    state.current_turn_index = next_active_seat(state, Some(state.dealer_index));
    state.last_action_time_millis = now_millis;
}

fn deal_community(state: &mut TableState, n: usize) {
    match state.deck.deal(n) {
        Ok(cards) => state.community_cards.extend(cards),
        Err(_) => {
            // Should not occur: a 52-card deck always has enough cards left
            // to deal two hole cards per seated player plus five community
            // cards at table sizes up to MAX_TABLE_SIZE.
        }
    }
}

/// Side-pot construction and award (spec.md §4.3 "Resolve").
pub(super) fn resolve(state: &mut TableState, now_millis: u64) {
    let pot_total = state.pot;
    let non_folded: Vec<usize> = state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| !matches!(p.status, PlayerStatus::Folded | PlayerStatus::SittingOut))
        .map(|(i, _)| i)
        .collect();

    let winners = if non_folded.len() <= 1 {
        resolve_fold_out(state, non_folded.first().copied(), pot_total)
    } else {
        resolve_showdown(state, &non_folded, pot_total)
    };

    finish_hand(state, now_millis, pot_total, winners);
}

fn resolve_fold_out(state: &mut TableState, survivor: Option<usize>, pot_total: u64) -> Vec<WinnerInfo> {
    let Some(idx) = survivor else { return Vec::new() };
    state.players[idx].chips += pot_total;
    vec![WinnerInfo {
        agent_id: state.players[idx].agent_id,
        name: state.players[idx].name.clone(),
        amount: pot_total,
        hand_description: hand_eval::LAST_PLAYER_STANDING.to_string(),
    }]
}

fn resolve_showdown(state: &mut TableState, non_folded: &[usize], pot_total: u64) -> Vec<WinnerInfo> {
    let mut hand_ranks: HashMap<usize, HandRank> = HashMap::new();
    for &i in non_folded {
        if matches!(state.players[i].status, PlayerStatus::Active | PlayerStatus::AllIn) {
            let mut cards = state.community_cards.clone();
            if let Some((a, b)) = state.players[i].hole_cards {
                cards.push(a);
                cards.push(b);
            }
            hand_ranks.insert(i, hand_eval::evaluate(&cards));
        }
    }

    let mut totals: Vec<u64> = non_folded
        .iter()
        .map(|&i| state.players[i].total_bet)
        .filter(|&t| t > 0)
        .collect();
    totals.sort_unstable();
    totals.dedup();

    let mut awarded: HashMap<usize, (u64, String)> = HashMap::new();
    let mut prev = 0u64;

    for level in totals {
        let contributors: Vec<usize> = non_folded
            .iter()
            .copied()
            .filter(|&i| state.players[i].total_bet >= level)
            .collect();
        let layer_amount = (level - prev) * contributors.len() as u64;
        prev = level;
        if layer_amount == 0 {
            continue;
        }

        let eligible: Vec<usize> = contributors
            .into_iter()
            .filter(|i| hand_ranks.contains_key(i))
            .collect();
        if eligible.is_empty() {
            continue;
        }

        let best = eligible
            .iter()
            .map(|i| hand_ranks[i].clone())
            .max()
            .expect("eligible is non-empty");
        let mut layer_winners: Vec<usize> = eligible
            .into_iter()
            .filter(|i| hand_ranks[i] == best)
            .collect();
        layer_winners.sort_by_key(|&i| state.players[i].seat_index);

        let share = layer_amount / layer_winners.len() as u64;
        let remainder = layer_amount % layer_winners.len() as u64;
        let description = best.describe();
        for (pos, &i) in layer_winners.iter().enumerate() {
            let amount = share + if pos == 0 { remainder } else { 0 };
            let entry = awarded.entry(i).or_insert((0, description.clone()));
            entry.0 += amount;
            entry.1 = description.clone();
        }
    }

    let awarded_total: u64 = awarded.values().map(|(amount, _)| *amount).sum();
    debug_assert_eq!(awarded_total, pot_total, "side-pot award must equal the pot");

    let mut winners: Vec<WinnerInfo> = Vec::new();
    for (idx, (amount, description)) in awarded {
        state.players[idx].chips += amount;
        winners.push(WinnerInfo {
            agent_id: state.players[idx].agent_id,
            name: state.players[idx].name.clone(),
            amount,
            hand_description: description,
        });
    }
    winners.sort_by_key(|w| state.player_index(w.agent_id).unwrap_or(0));
    winners
}

fn finish_hand(state: &mut TableState, now_millis: u64, pot_total: u64, winners: Vec<WinnerInfo>) {
    if let Some(record) = state.hand_record.as_mut() {
        record.pot = pot_total;
        record.winners = winners.clone();
        record.community_cards = state.community_cards.clone();
        record.ended_at_millis = Some(now_millis);
    }
    state.last_hand_result = Some(LastHandResult {
        hand_id: state.hand_id.unwrap_or_default(),
        winners,
        pot: pot_total,
    });
    state.phase = Phase::Showdown;
    state.current_turn_index = None;
    state.pot = 0;
    rotate_dealer(state);
}

fn rotate_dealer(state: &mut TableState) {
    let n = state.players.len();
    if n == 0 {
        return;
    }
    let start = (state.dealer_index + 1) % n;
    if let Some(idx) = (0..n)
        .map(|step| (start + step) % n)
        .find(|&idx| state.players[idx].status != PlayerStatus::SittingOut)
    {
        state.dealer_index = idx;
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::card::{Card, Rank, Suit};
    use crate::ids::TableId;

    use super::super::Player;
    use super::{resolve, PlayerStatus, TableState};

    fn player_at(seat_index: usize, total_bet: u64, status: PlayerStatus, hole: (Card, Card)) -> Player {
        let mut p = Player::new(Uuid::new_v4(), format!("p{seat_index}"), 0, seat_index);
        p.hole_cards = Some(hole);
        p.total_bet = total_bet;
        p.status = status;
        p
    }

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn identical_hands_split_the_pot_evenly() {
        let mut state = TableState::new(TableId(1));
        state.players = vec![
            player_at(
                0,
                100,
                PlayerStatus::Active,
                (c(Rank::Ace, Suit::Hearts), c(Rank::Queen, Suit::Hearts)),
            ),
            player_at(
                1,
                100,
                PlayerStatus::Active,
                (c(Rank::Ace, Suit::Diamonds), c(Rank::Queen, Suit::Diamonds)),
            ),
        ];
        state.community_cards = vec![
            c(Rank::Two, Suit::Hearts),
            c(Rank::Five, Suit::Diamonds),
            c(Rank::Nine, Suit::Clubs),
            c(Rank::Jack, Suit::Hearts),
            c(Rank::King, Suit::Hearts),
        ];
        state.pot = 200;
        state.hand_id = Some(Uuid::new_v4());

        resolve(&mut state, 1_000);

        assert_eq!(state.players[0].chips, 100);
        assert_eq!(state.players[1].chips, 100);
        assert_eq!(state.last_hand_result.as_ref().unwrap().winners.len(), 2);
    }

    #[test]
    fn side_pot_awards_each_layer_to_its_own_best_hand() {
        let mut state = TableState::new(TableId(2));
        state.players = vec![
            player_at(0, 50, PlayerStatus::AllIn, (c(Rank::Two, Suit::Clubs), c(Rank::Three, Suit::Clubs))),
            player_at(1, 100, PlayerStatus::AllIn, (c(Rank::Seven, Suit::Clubs), c(Rank::Seven, Suit::Diamonds))),
            player_at(2, 100, PlayerStatus::AllIn, (c(Rank::Eight, Suit::Clubs), c(Rank::Eight, Suit::Diamonds))),
        ];
        state.community_cards = vec![
            c(Rank::Two, Suit::Hearts),
            c(Rank::Five, Suit::Spades),
            c(Rank::Jack, Suit::Diamonds),
            c(Rank::Queen, Suit::Clubs),
            c(Rank::King, Suit::Hearts),
        ];
        state.pot = 250;
        state.hand_id = Some(Uuid::new_v4());

        resolve(&mut state, 1_000);

        // Main pot (50*3=150) and the side pot (50*2=100) both go to the
        // pocket-eights hand, the best at every contribution level.
        assert_eq!(state.players[0].chips, 0);
        assert_eq!(state.players[1].chips, 0);
        assert_eq!(state.players[2].chips, 250);
    }
}
