use crate::types::{
    Address,
    Choice,
    GameId,
    GameResult,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, Serialize, Deserialize)]
pub enum EventCategory {
    SingleGameResult,
    MultiplayerGameResult,
}

impl EventCategory {
    pub const ALL: [EventCategory; 2] = [
        EventCategory::SingleGameResult,
        EventCategory::MultiplayerGameResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::SingleGameResult => "SingleGameResult",
            EventCategory::MultiplayerGameResult => "MultiplayerGameResult",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    SingleGameResult(SingleGameResultEvent),
    MultiplayerGameResult(MultiplayerGameResultEvent),
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct SingleGameResultEvent {
    pub player: Address,
    pub player_choice: Option<Choice>,
    pub house_choice: Option<Choice>,
    pub result: GameResult,
    pub payout: u128,
    pub token: Option<Address>,
}

#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct MultiplayerGameResultEvent {
    pub game_id: GameId,
    /// `Address::ZERO` on a draw.
    pub winner: Address,
    pub payout: u128,
    pub token: Option<Address>,
}

impl EventPayload {
    pub fn category(&self) -> EventCategory {
        match self {
            EventPayload::SingleGameResult(_) => EventCategory::SingleGameResult,
            EventPayload::MultiplayerGameResult(_) => {
                EventCategory::MultiplayerGameResult
            }
        }
    }

    pub fn participant(&self) -> Address {
        match self {
            EventPayload::SingleGameResult(inner) => inner.player,
            EventPayload::MultiplayerGameResult(inner) => inner.winner,
        }
    }
}

/// A ledger event as delivered to views.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub category: EventCategory,
    pub participant: Address,
    pub payload: EventPayload,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub block_height: u64,
}

/// Dedup identity. Block height is not part of it: two events
/// in the same block from different participants are distinct, a re-scan
/// of the same event is not.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct EventKey {
    pub category: EventCategory,
    pub timestamp: u64,
    pub participant: Address,
}

impl Event {
    pub fn new(payload: EventPayload, timestamp: u64, block_height: u64) -> Self {
        Self {
            category: payload.category(),
            participant: payload.participant(),
            payload,
            timestamp,
            block_height,
        }
    }

    pub fn single_result(
        player: Address,
        player_choice: Choice,
        house_choice: Choice,
        result: GameResult,
        payout: u128,
        timestamp: u64,
        block_height: u64,
    ) -> Self {
        let inner = SingleGameResultEvent {
            player,
            player_choice: Some(player_choice),
            house_choice: Some(house_choice),
            result,
            payout,
            token: None,
        };
        Self::new(EventPayload::SingleGameResult(inner), timestamp, block_height)
    }

    pub fn multiplayer_result(
        game_id: GameId,
        winner: Address,
        payout: u128,
        timestamp: u64,
        block_height: u64,
    ) -> Self {
        let inner = MultiplayerGameResultEvent {
            game_id,
            winner,
            payout,
            token: None,
        };
        Self::new(
            EventPayload::MultiplayerGameResult(inner),
            timestamp,
            block_height,
        )
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            category: self.category,
            timestamp: self.timestamp,
            participant: self.participant,
        }
    }
}
