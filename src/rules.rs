//! Pure predicates over a game snapshot and the local account.
//!
//! Nothing here talks to the ledger; the reconcilers and views call these on
//! whatever snapshot they currently hold.

use crate::types::{
    Address,
    Choice,
    GameRecord,
    GameResult,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Draw,
    FirstWins,
    SecondWins,
}

impl Resolution {
    pub fn flipped(self) -> Resolution {
        match self {
            Resolution::Draw => Resolution::Draw,
            Resolution::FirstWins => Resolution::SecondWins,
            Resolution::SecondWins => Resolution::FirstWins,
        }
    }
}

/// Rotating dominance: Rock beats Scissors, Scissors beats Paper, Paper
/// beats Rock.
pub fn beats(a: Choice, b: Choice) -> bool {
    matches!(
        (a, b),
        (Choice::Rock, Choice::Scissors)
            | (Choice::Scissors, Choice::Paper)
            | (Choice::Paper, Choice::Rock)
    )
}

pub fn resolve(first: Choice, second: Choice) -> Resolution {
    if first == second {
        Resolution::Draw
    } else if beats(first, second) {
        Resolution::FirstWins
    } else {
        Resolution::SecondWins
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seat {
    First,
    Second,
}

/// Which seat `account` occupies, if any. An open second seat never matches.
pub fn seat_of(game: &GameRecord, account: &Address) -> Option<Seat> {
    if account.is_zero() {
        return None;
    }
    if game.first == *account {
        Some(Seat::First)
    } else if !game.seat_open() && game.second == *account {
        Some(Seat::Second)
    } else {
        None
    }
}

pub fn is_participant(game: &GameRecord, account: &Address) -> bool {
    seat_of(game, account).is_some()
}

/// The local account sits at the table and has not committed yet.
pub fn can_act(game: &GameRecord, account: &Address) -> bool {
    if game.finished {
        return false;
    }
    match seat_of(game, account) {
        Some(Seat::First) => !game.first_committed,
        Some(Seat::Second) => !game.second_committed,
        None => false,
    }
}

/// The local account has committed and the opponent has not.
pub fn waiting_on_opponent(game: &GameRecord, account: &Address) -> bool {
    if game.finished {
        return false;
    }
    match seat_of(game, account) {
        Some(Seat::First) => game.first_committed && !game.second_committed,
        Some(Seat::Second) => game.second_committed && !game.first_committed,
        None => false,
    }
}

pub fn can_join(game: &GameRecord, account: &Address) -> bool {
    !account.is_zero() && !game.finished && game.seat_open() && game.first != *account
}

pub fn both_committed(game: &GameRecord) -> bool {
    game.first_committed && game.second_committed
}

/// Resolution of a finished game, `None` while running or if a choice was
/// never revealed.
pub fn resolution(game: &GameRecord) -> Option<Resolution> {
    if !game.finished {
        return None;
    }
    Some(resolve(game.first_choice?, game.second_choice?))
}

/// The winner's address; `None` for a draw or an unresolved game.
pub fn winner(game: &GameRecord) -> Option<Address> {
    match resolution(game)? {
        Resolution::Draw => None,
        Resolution::FirstWins => Some(game.first),
        Resolution::SecondWins => Some(game.second),
    }
}

/// Result from the point of view of `account`; `None` for spectators.
pub fn local_result(game: &GameRecord, account: &Address) -> Option<GameResult> {
    let seat = seat_of(game, account)?;
    let result = match (resolution(game)?, seat) {
        (Resolution::Draw, _) => GameResult::Draw,
        (Resolution::FirstWins, Seat::First) | (Resolution::SecondWins, Seat::Second) => {
            GameResult::Win
        }
        _ => GameResult::Loss,
    };
    Some(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Finished,
    AwaitingOpponent,
    FirstChoosing,
    SecondChoosing,
    BothCommitted,
}

pub fn status(game: &GameRecord) -> GameStatus {
    if game.finished {
        GameStatus::Finished
    } else if game.seat_open() {
        GameStatus::AwaitingOpponent
    } else if !game.first_committed {
        GameStatus::FirstChoosing
    } else if !game.second_committed {
        GameStatus::SecondChoosing
    } else {
        GameStatus::BothCommitted
    }
}
