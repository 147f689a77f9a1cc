//! [`LedgerAdapter`] backed by a JSON ledger gateway.
//!
//! The gateway exposes the contract's read surface over plain HTTP:
//!
//! | route                                   | body                     |
//! |-----------------------------------------|--------------------------|
//! | `GET /height`                           | `{"height": u64}`        |
//! | `GET /events/{category}?from=&to=`      | `[EventDto]`             |
//! | `GET /games/count`                      | `{"count": u64}`         |
//! | `GET /games/{id}`                       | `GameDto`                |
//! | `GET /players/{addr}/history/count`     | `{"count": u64}`         |
//! | `GET /players/{addr}/history?cursor=&count=` | `[HistoryDto]`      |
//! | `GET /players/{addr}/stats`             | `StatsDto`               |
//! | `GET /players/{addr}/token-profits`     | `[TokenProfitDto]`       |
//!
//! Amounts travel as decimal strings since they exceed `u64`.

use crate::{
    Result,
    SyncError,
    adapter::LedgerAdapter,
    error::RecordKind,
    events::{
        Event,
        EventCategory,
        EventPayload,
        MultiplayerGameResultEvent,
        SingleGameResultEvent,
    },
    types::{
        Address,
        Choice,
        GameId,
        GameKind,
        GameRecord,
        GameResult,
        HistoryEntry,
        PlayerStats,
        TokenProfit,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpLedgerClient {
    base_url: Url,
    http: reqwest::Client,
    account: Option<Address>,
}

impl HttpLedgerClient {
    pub fn new(base_url: &str, account: Option<Address>) -> Result<Self> {
        let mut normalized = base_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized)
            .map_err(|e| SyncError::Config(format!("invalid gateway url {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            http,
            account,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::Config(format!("invalid route {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        kind: RecordKind,
        id: impl ToString,
    ) -> Result<T> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SyncError::transient(format!("gateway request failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(classify_status(status, kind, id, &body));
        }
        let body = res
            .bytes()
            .await
            .map_err(|e| SyncError::transient(format!("reading gateway response: {e}")))?;
        decode(&body)
    }
}

fn classify_status(
    status: StatusCode,
    kind: RecordKind,
    id: impl ToString,
    body: &str,
) -> SyncError {
    if status == StatusCode::NOT_FOUND {
        return SyncError::not_found(kind, id);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return SyncError::transient(format!("gateway responded with {status}: {body}"));
    }
    tracing::error!(%status, body, "gateway rejected request");
    SyncError::malformed(format!("gateway rejected request with {status}: {body}"))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| SyncError::malformed(format!("invalid gateway payload: {e}")))
}

// A single unreadable record is dropped so the rest of its window still
// reaches the poller.
fn decode_events(records: Vec<serde_json::Value>, category: EventCategory) -> Vec<Event> {
    records
        .into_iter()
        .filter_map(|record| {
            let decoded = serde_json::from_value::<EventDto>(record)
                .map_err(|e| SyncError::malformed(format!("invalid event record: {e}")))
                .and_then(|dto| dto.into_event(category));
            match decoded {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(%category, "skipping unreadable event: {e}");
                    None
                }
            }
        })
        .collect()
}

impl LedgerAdapter for HttpLedgerClient {
    async fn current_height(&self) -> Result<u64> {
        let url = self.endpoint("height")?;
        let dto: HeightDto = self.get_json(url, RecordKind::Height, "latest").await?;
        Ok(dto.height)
    }

    async fn query_events(
        &self,
        category: EventCategory,
        from: u64,
        to: u64,
    ) -> Result<Vec<Event>> {
        let mut url = self.endpoint(&format!("events/{}", category.as_str()))?;
        url.query_pairs_mut()
            .append_pair("from", &from.to_string())
            .append_pair("to", &to.to_string());
        let records: Vec<serde_json::Value> = self
            .get_json(url, RecordKind::Events, category.as_str())
            .await?;
        Ok(decode_events(records, category))
    }

    async fn read_game(&self, id: GameId) -> Result<GameRecord> {
        let url = self.endpoint(&format!("games/{id}"))?;
        let dto: GameDto = self.get_json(url, RecordKind::Game, id).await?;
        dto.into_record(id)
    }

    async fn game_count(&self) -> Result<u64> {
        let url = self.endpoint("games/count")?;
        let dto: CountDto = self.get_json(url, RecordKind::Game, "count").await?;
        Ok(dto.count)
    }

    async fn history_count(&self, account: Address) -> Result<u64> {
        let url = self.endpoint(&format!("players/{account}/history/count"))?;
        let dto: CountDto = self.get_json(url, RecordKind::History, account).await?;
        Ok(dto.count)
    }

    async fn read_history(
        &self,
        account: Address,
        start: u64,
        count: u64,
    ) -> Result<Vec<HistoryEntry>> {
        let mut url = self.endpoint(&format!("players/{account}/history"))?;
        url.query_pairs_mut()
            .append_pair("cursor", &start.to_string())
            .append_pair("count", &count.to_string());
        let dtos: Vec<HistoryDto> =
            self.get_json(url, RecordKind::History, account).await?;
        dtos.into_iter().map(HistoryEntry::try_from).collect()
    }

    async fn player_stats(&self, account: Address) -> Result<PlayerStats> {
        let url = self.endpoint(&format!("players/{account}/stats"))?;
        let dto: StatsDto = self.get_json(url, RecordKind::Stats, account).await?;
        Ok(PlayerStats {
            wins: dto.wins,
            losses: dto.losses,
            total_profit: parse_amount(&dto.total_profit)?,
        })
    }

    async fn token_profits(&self, account: Address) -> Result<Vec<TokenProfit>> {
        let url = self.endpoint(&format!("players/{account}/token-profits"))?;
        let dtos: Vec<TokenProfitDto> =
            self.get_json(url, RecordKind::Stats, account).await?;
        dtos.into_iter()
            .map(|dto| {
                Ok(TokenProfit {
                    token: dto.token,
                    profit: parse_amount(&dto.profit)?,
                })
            })
            .collect()
    }

    fn account_identity(&self) -> Option<Address> {
        self.account
    }
}

fn parse_amount(raw: &str) -> Result<u128> {
    raw.trim()
        .parse()
        .map_err(|e| SyncError::malformed(format!("invalid amount {raw:?}: {e}")))
}

fn token_of(is_token: bool, token: Option<Address>) -> Option<Address> {
    token.filter(|addr| is_token && !addr.is_zero())
}

#[derive(Deserialize)]
struct HeightDto {
    height: u64,
}

#[derive(Deserialize)]
struct CountDto {
    count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDto {
    block_number: u64,
    timestamp: u64,
    #[serde(default)]
    player: Option<Address>,
    #[serde(default)]
    player_choice: u8,
    #[serde(default)]
    house_choice: u8,
    #[serde(default)]
    result: u8,
    #[serde(default)]
    game_id: Option<GameId>,
    #[serde(default)]
    winner: Option<Address>,
    payout: String,
    #[serde(default)]
    is_token_game: bool,
    #[serde(default)]
    token: Option<Address>,
}

impl EventDto {
    fn into_event(self, category: EventCategory) -> Result<Event> {
        let payout = parse_amount(&self.payout)?;
        let token = token_of(self.is_token_game, self.token);
        let payload = match category {
            EventCategory::SingleGameResult => {
                EventPayload::SingleGameResult(SingleGameResultEvent {
                    player: self.player.unwrap_or(Address::ZERO),
                    player_choice: Choice::from_raw(self.player_choice),
                    house_choice: Choice::from_raw(self.house_choice),
                    result: GameResult::from_raw(self.result).ok_or_else(|| {
                        SyncError::malformed(format!("unknown result {}", self.result))
                    })?,
                    payout,
                    token,
                })
            }
            EventCategory::MultiplayerGameResult => {
                let game_id = self.game_id.ok_or_else(|| {
                    SyncError::malformed("multiplayer result without game id")
                })?;
                EventPayload::MultiplayerGameResult(MultiplayerGameResultEvent {
                    game_id,
                    winner: self.winner.unwrap_or(Address::ZERO),
                    payout,
                    token,
                })
            }
        };
        Ok(Event::new(payload, self.timestamp, self.block_number))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameDto {
    player1: Address,
    player2: Address,
    player1_choice: u8,
    player2_choice: u8,
    player1_committed: bool,
    player2_committed: bool,
    bet_amount: String,
    finished: bool,
    is_token_game: bool,
    token: Address,
}

impl GameDto {
    fn into_record(self, id: GameId) -> Result<GameRecord> {
        Ok(GameRecord {
            id,
            first: self.player1,
            second: self.player2,
            first_choice: Choice::from_raw(self.player1_choice),
            second_choice: Choice::from_raw(self.player2_choice),
            first_committed: self.player1_committed,
            second_committed: self.player2_committed,
            stake: parse_amount(&self.bet_amount)?,
            finished: self.finished,
            is_token_stake: self.is_token_game,
            token: self.token,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDto {
    game_id: GameId,
    game_type: u8,
    opponent: Address,
    player_choice: u8,
    opponent_choice: u8,
    bet_amount: String,
    token: Address,
    result: u8,
    payout: String,
    /// Unix seconds.
    timestamp: i64,
}

impl TryFrom<HistoryDto> for HistoryEntry {
    type Error = SyncError;

    fn try_from(dto: HistoryDto) -> Result<Self> {
        let timestamp: DateTime<Utc> = DateTime::from_timestamp(dto.timestamp, 0)
            .ok_or_else(|| {
                SyncError::malformed(format!("invalid timestamp {}", dto.timestamp))
            })?;
        Ok(HistoryEntry {
            game_id: dto.game_id,
            kind: GameKind::from_raw(dto.game_type),
            opponent: dto.opponent,
            player_choice: Choice::from_raw(dto.player_choice),
            opponent_choice: Choice::from_raw(dto.opponent_choice),
            stake: parse_amount(&dto.bet_amount)?,
            token: dto.token,
            result: GameResult::from_raw(dto.result).ok_or_else(|| {
                SyncError::malformed(format!("unknown result {}", dto.result))
            })?,
            payout: parse_amount(&dto.payout)?,
            timestamp,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsDto {
    wins: u64,
    losses: u64,
    total_profit: String,
}

#[derive(Deserialize)]
struct TokenProfitDto {
    token: Address,
    profit: String,
}
