//! Typed errors returned by the pure engine (spec.md §4.3, §7).

use thiserror::Error;

use crate::deck::DeckError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("table is full")]
    TableFull,
    #[error("agent is already seated at this table")]
    AlreadySeated,
    #[error("buy-in below minimum (5x big blind)")]
    InsufficientBuyIn,
    #[error("agent is not seated at this table")]
    NotSeated,
    #[error("cannot leave while in hand")]
    InHandCannotLeave,
    #[error("sit-out/sit-in is only allowed between hands")]
    InvalidSitRequest,
    #[error("not enough players to start a hand")]
    NotEnoughPlayers,
    #[error("it is not this agent's turn to act")]
    NotYourTurn,
    #[error("no action is expected right now")]
    WrongPhase,
    #[error("must call or fold to match the current bet")]
    BetToMatch,
    #[error("raise is below the minimum raise")]
    BelowMinRaise,
    #[error("insufficient chips for this action")]
    InsufficientChips,
    #[error("unknown or unavailable action")]
    InvalidAction,
    #[error(transparent)]
    Deck(#[from] DeckError),
}
