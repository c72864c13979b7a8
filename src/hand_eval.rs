//! Poker hand evaluation for 5-7 card sets.
//!
//! Grounded on the teacher's `hand_eval.rs`: the same C(7,5)=21-subset
//! enumeration and straight/wheel detection, reworked from a packed `u32`
//! score into a typed [`HandRank`] (category + descending kicker vector) so
//! the gateway can render the hand-name strings spec.md §3 requires for
//! `HandRecord`/`lastHandResult` without re-deriving them from a bare score.

use std::collections::HashMap;

use crate::card::{Card, Rank};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandCategory {
    HighCard,
    Pair,
    TwoPair,
    Trips,
    Straight,
    Flush,
    FullHouse,
    Quads,
    StraightFlush,
    RoyalFlush,
}

/// A total-orderable hand grade: category first, then kickers (ranks listed
/// high-to-low, with paired/tripped/quaded ranks excluded where spec.md
/// §4.1 says so).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandRank {
    pub category: HandCategory,
    pub kickers: Vec<Rank>,
}

impl HandRank {
    /// Human-readable hand name, as stored in `HandRecord`/`lastHandResult`.
    pub fn describe(&self) -> String {
        let k = &self.kickers;
        match self.category {
            HandCategory::HighCard => format!("{} high", k[0].name()),
            HandCategory::Pair => format!("Pair of {}", plural(k[0])),
            HandCategory::TwoPair => format!("Two Pair, {} and {}", plural(k[0]), plural(k[1])),
            HandCategory::Trips => format!("Three of a Kind, {}", plural(k[0])),
            HandCategory::Straight => format!("Straight, {} high", k[0].name()),
            HandCategory::Flush => format!("Flush, {} high", k[0].name()),
            HandCategory::FullHouse => {
                format!("Full House, {} full of {}", plural(k[0]), plural(k[1]))
            }
            HandCategory::Quads => format!("Four of a Kind, {}", plural(k[0])),
            HandCategory::StraightFlush => format!("Straight Flush, {} high", k[0].name()),
            HandCategory::RoyalFlush => "Royal Flush".to_string(),
        }
    }
}

fn plural(rank: Rank) -> String {
    match rank {
        Rank::Six => "Sixes".to_string(),
        other => format!("{}s", other.name()),
    }
}

/// "Last player standing" is not a graded hand; callers use this constant
/// when a hand ends by everyone else folding (spec.md §4.3 Resolve).
pub const LAST_PLAYER_STANDING: &str = "Last player standing";

/// Evaluate the best 5-card hand out of 5-7 cards.
pub fn evaluate(cards: &[Card]) -> HandRank {
    assert!(
        (5..=7).contains(&cards.len()),
        "evaluate expects 5 to 7 cards, got {}",
        cards.len()
    );

    let n = cards.len();
    let mut best: Option<HandRank> = None;
    for mask in 0u8..(1 << n) {
        if mask.count_ones() != 5 {
            continue;
        }
        let mut five: Vec<Card> = Vec::with_capacity(5);
        for (i, c) in cards.iter().enumerate() {
            if mask & (1 << i) != 0 {
                five.push(*c);
            }
        }
        let rank = score_five(&five);
        if best.as_ref().map_or(true, |b| rank > *b) {
            best = Some(rank);
        }
    }
    best.expect("at least one 5-card subset exists")
}

fn score_five(cards: &[Card]) -> HandRank {
    debug_assert_eq!(cards.len(), 5);

    let mut ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.suit == cards[0].suit);

    let straight_high = straight_high_card(&ranks);

    let mut counts: HashMap<Rank, u8> = HashMap::new();
    for r in &ranks {
        *counts.entry(*r).or_insert(0) += 1;
    }
    let mut groups: Vec<(Rank, u8)> = counts.into_iter().collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));

    let is_royal = straight_high == Some(Rank::Ace) && ranks.contains(&Rank::King);

    if is_flush && straight_high.is_some() && is_royal {
        return HandRank {
            category: HandCategory::RoyalFlush,
            kickers: vec![Rank::Ace],
        };
    }
    if is_flush {
        if let Some(high) = straight_high {
            return HandRank {
                category: HandCategory::StraightFlush,
                kickers: vec![high],
            };
        }
    }
    if groups[0].1 == 4 {
        return HandRank {
            category: HandCategory::Quads,
            kickers: vec![groups[0].0, groups[1].0],
        };
    }
    if groups[0].1 == 3 && groups[1].1 >= 2 {
        return HandRank {
            category: HandCategory::FullHouse,
            kickers: vec![groups[0].0, groups[1].0],
        };
    }
    if is_flush {
        return HandRank {
            category: HandCategory::Flush,
            kickers: ranks,
        };
    }
    if let Some(high) = straight_high {
        return HandRank {
            category: HandCategory::Straight,
            kickers: vec![high],
        };
    }
    if groups[0].1 == 3 {
        let rest: Vec<Rank> = ranks
            .iter()
            .copied()
            .filter(|r| *r != groups[0].0)
            .collect();
        return HandRank {
            category: HandCategory::Trips,
            kickers: vec![groups[0].0, rest[0], rest[1]],
        };
    }
    if groups[0].1 == 2 && groups[1].1 == 2 {
        let kicker = ranks
            .iter()
            .copied()
            .find(|r| *r != groups[0].0 && *r != groups[1].0)
            .expect("two pair always leaves exactly one kicker");
        return HandRank {
            category: HandCategory::TwoPair,
            kickers: vec![groups[0].0, groups[1].0, kicker],
        };
    }
    if groups[0].1 == 2 {
        let rest: Vec<Rank> = ranks
            .iter()
            .copied()
            .filter(|r| *r != groups[0].0)
            .collect();
        let mut kickers = vec![groups[0].0];
        kickers.extend(rest);
        return HandRank {
            category: HandCategory::Pair,
            kickers,
        };
    }
    HandRank {
        category: HandCategory::HighCard,
        kickers: ranks,
    }
}

/// Returns the straight's high card, if the five ranks form a straight
/// (Ace may play low in the wheel A-2-3-4-5, no wrap-around straights).
fn straight_high_card(ranks_desc: &[Rank]) -> Option<Rank> {
    let mut values: Vec<i8> = ranks_desc.iter().map(|r| r.value() as i8).collect();
    values.sort_unstable();
    values.dedup();
    if values.len() != 5 {
        return None;
    }

    if values == [0, 1, 2, 3, 12] {
        // Wheel: A-2-3-4-5, high card is the Five.
        return Some(Rank::Five);
    }

    if values[4] - values[0] == 4 {
        return Some(ranks_desc[0]);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    #[test]
    fn pair_beats_high_card() {
        let pair = evaluate(&[
            c(Rank::Ace, Suit::Clubs),
            c(Rank::Ace, Suit::Diamonds),
            c(Rank::Two, Suit::Clubs),
            c(Rank::Four, Suit::Hearts),
            c(Rank::Six, Suit::Spades),
            c(Rank::Eight, Suit::Clubs),
            c(Rank::Ten, Suit::Diamonds),
        ]);
        let high = evaluate(&[
            c(Rank::King, Suit::Clubs),
            c(Rank::Queen, Suit::Diamonds),
            c(Rank::Two, Suit::Clubs),
            c(Rank::Four, Suit::Hearts),
            c(Rank::Six, Suit::Spades),
            c(Rank::Eight, Suit::Clubs),
            c(Rank::Ten, Suit::Diamonds),
        ]);
        assert!(pair > high);
        assert_eq!(pair.category, HandCategory::Pair);
    }

    #[test]
    fn flush_beats_straight() {
        let flush = evaluate(&[
            c(Rank::Two, Suit::Clubs),
            c(Rank::Four, Suit::Clubs),
            c(Rank::Six, Suit::Clubs),
            c(Rank::Eight, Suit::Clubs),
            c(Rank::Ten, Suit::Clubs),
            c(Rank::Three, Suit::Hearts),
            c(Rank::Nine, Suit::Spades),
        ]);
        let straight = evaluate(&[
            c(Rank::Four, Suit::Clubs),
            c(Rank::Five, Suit::Diamonds),
            c(Rank::Six, Suit::Hearts),
            c(Rank::Seven, Suit::Spades),
            c(Rank::Eight, Suit::Clubs),
            c(Rank::Two, Suit::Hearts),
            c(Rank::Nine, Suit::Diamonds),
        ]);
        assert!(flush > straight);
    }

    #[test]
    fn full_house_beats_flush() {
        let full_house = evaluate(&[
            c(Rank::Ace, Suit::Clubs),
            c(Rank::Ace, Suit::Diamonds),
            c(Rank::Ace, Suit::Hearts),
            c(Rank::King, Suit::Clubs),
            c(Rank::King, Suit::Diamonds),
            c(Rank::Two, Suit::Spades),
            c(Rank::Three, Suit::Hearts),
        ]);
        let flush = evaluate(&[
            c(Rank::Two, Suit::Clubs),
            c(Rank::Four, Suit::Clubs),
            c(Rank::Six, Suit::Clubs),
            c(Rank::Eight, Suit::Clubs),
            c(Rank::Ten, Suit::Clubs),
            c(Rank::Three, Suit::Hearts),
            c(Rank::Nine, Suit::Spades),
        ]);
        assert!(full_house > flush);
    }

    #[test]
    fn wheel_straight_ranks_below_six_high() {
        let wheel = evaluate(&[
            c(Rank::Ace, Suit::Clubs),
            c(Rank::Two, Suit::Diamonds),
            c(Rank::Three, Suit::Hearts),
            c(Rank::Four, Suit::Spades),
            c(Rank::Five, Suit::Clubs),
            c(Rank::Nine, Suit::Hearts),
            c(Rank::Ten, Suit::Diamonds),
        ]);
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.kickers, vec![Rank::Five]);

        let six_high = evaluate(&[
            c(Rank::Two, Suit::Clubs),
            c(Rank::Three, Suit::Diamonds),
            c(Rank::Four, Suit::Hearts),
            c(Rank::Five, Suit::Spades),
            c(Rank::Six, Suit::Clubs),
            c(Rank::Nine, Suit::Hearts),
            c(Rank::Ten, Suit::Diamonds),
        ]);
        assert!(six_high > wheel);
    }

    #[test]
    fn no_wrap_around_straight() {
        // Q-K-A-2-3 is not a straight.
        let hand = evaluate(&[
            c(Rank::Queen, Suit::Clubs),
            c(Rank::King, Suit::Diamonds),
            c(Rank::Ace, Suit::Hearts),
            c(Rank::Two, Suit::Spades),
            c(Rank::Three, Suit::Clubs),
        ]);
        assert_ne!(hand.category, HandCategory::Straight);
    }

    #[test]
    fn identical_ace_high_hands_are_equal() {
        let community = [
            c(Rank::Two, Suit::Hearts),
            c(Rank::Five, Suit::Diamonds),
            c(Rank::Nine, Suit::Clubs),
            c(Rank::Jack, Suit::Hearts),
            c(Rank::King, Suit::Hearts),
        ];
        let mut p1 = vec![c(Rank::Ace, Suit::Hearts), c(Rank::Queen, Suit::Hearts)];
        p1.extend(community);
        let mut p2 = vec![c(Rank::Ace, Suit::Diamonds), c(Rank::Queen, Suit::Diamonds)];
        p2.extend(community);

        let h1 = evaluate(&p1);
        let h2 = evaluate(&p2);
        assert_eq!(h1.cmp(&h2), std::cmp::Ordering::Equal);
        assert_eq!(h1.describe(), "Ace high");
    }

    #[test]
    fn royal_flush_outranks_straight_flush() {
        let royal = evaluate(&[
            c(Rank::Ten, Suit::Spades),
            c(Rank::Jack, Suit::Spades),
            c(Rank::Queen, Suit::Spades),
            c(Rank::King, Suit::Spades),
            c(Rank::Ace, Suit::Spades),
        ]);
        assert_eq!(royal.category, HandCategory::RoyalFlush);

        let sf = evaluate(&[
            c(Rank::Nine, Suit::Spades),
            c(Rank::Ten, Suit::Spades),
            c(Rank::Jack, Suit::Spades),
            c(Rank::Queen, Suit::Spades),
            c(Rank::King, Suit::Spades),
        ]);
        assert!(royal > sf);
    }
}
