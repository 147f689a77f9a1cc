use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};

pub type GameId = u64;

/// 20-byte account or token address. The all-zero value is the "unset"
/// sentinel the ledger uses for an empty second seat and for the native coin.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// `0x1234...abcd`, or `None` for the unset sentinel.
    pub fn short(&self) -> Option<String> {
        if self.is_zero() {
            return None;
        }
        let full = self.to_string();
        Some(format!("{}...{}", &full[..6], &full[full.len() - 4..]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    #[error("address is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("address must be 20 bytes, got {0}")]
    Length(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    // Case-insensitive; checksummed and lowercase forms compare equal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = hex::decode(digits)?;
        let array: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::Length(bytes.len()))?;
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The three-way choice. Raw ledger values are `1..=3`; `0` means nothing
/// has been revealed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    pub fn from_raw(raw: u8) -> Option<Choice> {
        match raw {
            1 => Some(Choice::Rock),
            2 => Some(Choice::Paper),
            3 => Some(Choice::Scissors),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            Choice::Rock => 1,
            Choice::Paper => 2,
            Choice::Scissors => 3,
        }
    }
}

/// Point-in-time copy of a two-player game. Replaced wholesale on every
/// poll, never patched locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub first: Address,
    /// `Address::ZERO` while the seat is open.
    pub second: Address,
    pub first_choice: Option<Choice>,
    pub second_choice: Option<Choice>,
    pub first_committed: bool,
    pub second_committed: bool,
    pub stake: u128,
    pub finished: bool,
    pub is_token_stake: bool,
    pub token: Address,
}

impl GameRecord {
    pub fn open(id: GameId, creator: Address, stake: u128) -> Self {
        Self {
            id,
            first: creator,
            second: Address::ZERO,
            first_choice: None,
            second_choice: None,
            first_committed: false,
            second_committed: false,
            stake,
            finished: false,
            is_token_stake: false,
            token: Address::ZERO,
        }
    }

    pub fn seat_open(&self) -> bool {
        self.second.is_zero()
    }

    /// Stake token, `None` for the native coin.
    pub fn stake_token(&self) -> Option<Address> {
        (self.is_token_stake && !self.token.is_zero()).then_some(self.token)
    }

    pub fn prize_pool(&self) -> u128 {
        self.stake.saturating_mul(2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameKind {
    Single,
    Multi,
}

impl GameKind {
    pub fn from_raw(raw: u8) -> GameKind {
        if raw == 0 {
            GameKind::Single
        } else {
            GameKind::Multi
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    Draw,
    Win,
    Loss,
}

impl GameResult {
    pub fn from_raw(raw: u8) -> Option<GameResult> {
        match raw {
            0 => Some(GameResult::Draw),
            1 => Some(GameResult::Win),
            2 => Some(GameResult::Loss),
            _ => None,
        }
    }
}

/// One row of a player's append-only game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub game_id: GameId,
    pub kind: GameKind,
    /// `Address::ZERO` for games played against the house.
    pub opponent: Address,
    pub player_choice: Option<Choice>,
    pub opponent_choice: Option<Choice>,
    pub stake: u128,
    pub token: Address,
    pub result: GameResult,
    pub payout: u128,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub wins: u64,
    pub losses: u64,
    pub total_profit: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenProfit {
    pub token: Address,
    pub profit: u128,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn address__parses_mixed_case_with_and_without_prefix() {
        // given
        let lower = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";
        let upper = "ABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD";

        // when
        let a: Address = lower.parse().unwrap();
        let b: Address = upper.parse().unwrap();

        // then
        assert_eq!(a, b);
        assert_eq!(a.to_string(), lower);
    }

    #[test]
    fn address__rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(err, AddressParseError::Length(2));
    }

    #[test]
    fn address__short_form_hides_the_middle() {
        let addr: Address = "0x1111111111111111111111111111111111112222"
            .parse()
            .unwrap();
        assert_eq!(addr.short().unwrap(), "0x1111...2222");
        assert_eq!(Address::ZERO.short(), None);
    }

    #[test]
    fn choice__raw_zero_is_unrevealed() {
        assert_eq!(Choice::from_raw(0), None);
        assert_eq!(Choice::from_raw(4), None);
        for choice in Choice::ALL {
            assert_eq!(Choice::from_raw(choice.to_raw()), Some(choice));
        }
    }

    #[test]
    fn game_record__native_stake_has_no_token() {
        let mut game = GameRecord::open(3, Address::new([1; 20]), 10);
        assert_eq!(game.stake_token(), None);

        game.is_token_stake = true;
        game.token = Address::new([9; 20]);
        assert_eq!(game.stake_token(), Some(Address::new([9; 20])));
        assert_eq!(game.prize_pool(), 20);
    }
}
