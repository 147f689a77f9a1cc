use crate::{
    Result,
    events::{
        Event,
        EventCategory,
    },
    types::{
        Address,
        GameId,
        GameRecord,
        HistoryEntry,
        PlayerStats,
        TokenProfit,
    },
};

pub mod http;
pub mod in_memory;

/// Read access to the remote ledger. Every call may fail independently with
/// `TransientUnavailable`; record reads may also fail with `NotFound`.
/// Implementations are shared read-only between all pollers.
pub trait LedgerAdapter: Send + Sync + 'static {
    fn current_height(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Events of one category in the inclusive block range `[from, to]`,
    /// in ledger order.
    fn query_events(
        &self,
        category: EventCategory,
        from: u64,
        to: u64,
    ) -> impl Future<Output = Result<Vec<Event>>> + Send;

    fn read_game(&self, id: GameId) -> impl Future<Output = Result<GameRecord>> + Send;

    /// Number of games ever created; ids are `0..count`.
    fn game_count(&self) -> impl Future<Output = Result<u64>> + Send;

    fn history_count(&self, account: Address) -> impl Future<Output = Result<u64>> + Send;

    /// Up to `count` history entries of `account` starting at index `start`.
    fn read_history(
        &self,
        account: Address,
        start: u64,
        count: u64,
    ) -> impl Future<Output = Result<Vec<HistoryEntry>>> + Send;

    fn player_stats(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<PlayerStats>> + Send;

    fn token_profits(
        &self,
        account: Address,
    ) -> impl Future<Output = Result<Vec<TokenProfit>>> + Send;

    /// The local participant, absent when no session is established.
    fn account_identity(&self) -> Option<Address>;
}
