//! Deck construction, shuffling and dealing.
//!
//! Mirrors the teacher's `deck.rs` shuffle-then-deal shape (Fisher-Yates via
//! `rand::seq::SliceRandom`), without the ZK commitment machinery that
//! module built on top of the shuffle — this spec has no commit-reveal
//! requirement (see DESIGN.md).

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::{Card, Rank, Suit};

pub const DECK_SIZE: usize = 52;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck exhausted: requested {requested} cards, {remaining} remain")]
    DeckExhausted { requested: usize, remaining: usize },
}

/// The remaining cards in a table's deck, in deal order (front = next dealt).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A fresh 52-card deck in canonical order (unshuffled).
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }

    /// A freshly shuffled 52-card deck.
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::new();
        deck.shuffle(rng);
        deck
    }

    /// Fisher-Yates shuffle in place, using the given RNG for every swap.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Deal `n` cards from the front of the deck, leaving the remainder
    /// in its original relative order.
    pub fn deal(&mut self, n: usize) -> Result<Vec<Card>, DeckError> {
        if n > self.cards.len() {
            return Err(DeckError::DeckExhausted {
                requested: n,
                remaining: self.cards.len(),
            });
        }
        Ok(self.cards.drain(0..n).collect())
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn new_deck_has_52_unique_cards() {
        let deck = Deck::new();
        assert_eq!(deck.remaining(), DECK_SIZE);
        let mut seen = std::collections::HashSet::new();
        for c in deck.cards() {
            assert!(seen.insert((c.rank, c.suit)));
        }
    }

    #[test]
    fn shuffle_preserves_card_set() {
        let mut rng = StdRng::seed_from_u64(7);
        let deck = Deck::shuffled(&mut rng);
        assert_eq!(deck.remaining(), DECK_SIZE);
        let mut seen = std::collections::HashSet::new();
        for c in deck.cards() {
            assert!(seen.insert((c.rank, c.suit)));
        }
    }

    #[test]
    fn deal_does_not_reorder_remainder() {
        let mut deck = Deck::new();
        let before = deck.cards()[5..].to_vec();
        let dealt = deck.deal(5).unwrap();
        assert_eq!(dealt.len(), 5);
        assert_eq!(deck.cards(), &before[..]);
    }

    #[test]
    fn deal_more_than_remaining_fails() {
        let mut deck = Deck::new();
        deck.deal(50).unwrap();
        let err = deck.deal(5).unwrap_err();
        assert_eq!(
            err,
            DeckError::DeckExhausted {
                requested: 5,
                remaining: 2
            }
        );
    }
}
