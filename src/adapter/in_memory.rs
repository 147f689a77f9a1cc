//! Scriptable ledger kept entirely in memory.
//!
//! Used by the test-suite and for offline runs of the watcher. Failures and
//! latency can be injected per operation so the pollers' retry and
//! stale-response behaviour can be exercised deterministically.

use crate::{
    Result,
    SyncError,
    adapter::LedgerAdapter,
    error::RecordKind,
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
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Height,
    Events(EventCategory),
    ReadGame,
    GameCount,
    HistoryCount,
    ReadHistory,
    Stats,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    events: Vec<Event>,
    games: Vec<GameRecord>,
    history: HashMap<Address, Vec<HistoryEntry>>,
    stats: HashMap<Address, PlayerStats>,
    token_profits: HashMap<Address, Vec<TokenProfit>>,
    account: Option<Address>,
    pending_failures: HashMap<Op, VecDeque<SyncError>>,
    calls: HashMap<Op, usize>,
    event_queries: Vec<(EventCategory, u64, u64)>,
    history_delays: HashMap<u64, Duration>,
    game_read_delay: Option<Duration>,
    outstanding_game_reads: usize,
    max_outstanding_game_reads: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(account: Address) -> Self {
        let ledger = Self::new();
        ledger.set_account(Some(account));
        ledger
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_account(&self, account: Option<Address>) {
        self.state().account = account;
    }

    pub fn set_height(&self, height: u64) {
        self.state().height = height;
    }

    pub fn height(&self) -> u64 {
        self.state().height
    }

    /// Appends an event; it becomes visible to range queries covering its
    /// block height.
    pub fn push_event(&self, event: Event) {
        self.state().events.push(event);
    }

    /// Adds a game and returns its id.
    pub fn push_game(&self, mut game: GameRecord) -> GameId {
        let mut state = self.state();
        let id = state.games.len() as GameId;
        game.id = id;
        state.games.push(game);
        id
    }

    /// Replaces the stored game with the same id.
    pub fn update_game(&self, game: GameRecord) {
        let mut state = self.state();
        if let Some(slot) = state.games.get_mut(game.id as usize) {
            *slot = game;
        }
    }

    pub fn game(&self, id: GameId) -> Option<GameRecord> {
        self.state().games.get(id as usize).cloned()
    }

    pub fn push_history(&self, account: Address, entry: HistoryEntry) {
        self.state().history.entry(account).or_default().push(entry);
    }

    pub fn set_stats(&self, account: Address, stats: PlayerStats) {
        self.state().stats.insert(account, stats);
    }

    pub fn set_token_profits(&self, account: Address, profits: Vec<TokenProfit>) {
        self.state().token_profits.insert(account, profits);
    }

    /// The next `times` calls of `op` fail with `TransientUnavailable`.
    pub fn fail_next(&self, op: Op, times: u32) {
        self.inject(op, times, || {
            SyncError::transient(format!("injected failure for {op:?}"))
        });
    }

    /// The next `times` calls of `op` fail with `Malformed`, as if the
    /// ledger had returned data that cannot be decoded.
    pub fn corrupt_next(&self, op: Op, times: u32) {
        self.inject(op, times, || {
            SyncError::malformed(format!("injected corrupt data for {op:?}"))
        });
    }

    fn inject(&self, op: Op, times: u32, error: impl Fn() -> SyncError) {
        let mut state = self.state();
        let queue = state.pending_failures.entry(op).or_default();
        queue.extend((0..times).map(|_| error()));
    }

    /// Delays history reads that start at `start`.
    pub fn delay_history_read(&self, start: u64, delay: Duration) {
        self.state().history_delays.insert(start, delay);
    }

    pub fn set_game_read_delay(&self, delay: Option<Duration>) {
        self.state().game_read_delay = delay;
    }

    pub fn calls(&self, op: Op) -> usize {
        self.state().calls.get(&op).copied().unwrap_or_default()
    }

    pub fn event_queries(&self) -> Vec<(EventCategory, u64, u64)> {
        self.state().event_queries.clone()
    }

    pub fn outstanding_game_reads(&self) -> usize {
        self.state().outstanding_game_reads
    }

    /// Highest number of game reads that were in flight at the same time.
    pub fn max_outstanding_game_reads(&self) -> usize {
        self.state().max_outstanding_game_reads
    }

    fn enter(&self, op: Op) -> Result<()> {
        let mut state = self.state();
        *state.calls.entry(op).or_default() += 1;
        match state
            .pending_failures
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Counts a game read as finished when dropped, including when the reading
/// future is aborted mid-delay.
struct OutstandingRead<'a>(&'a InMemoryLedger);

impl Drop for OutstandingRead<'_> {
    fn drop(&mut self) {
        self.0.state().outstanding_game_reads -= 1;
    }
}

impl LedgerAdapter for InMemoryLedger {
    async fn current_height(&self) -> Result<u64> {
        self.enter(Op::Height)?;
        Ok(self.state().height)
    }

    async fn query_events(
        &self,
        category: EventCategory,
        from: u64,
        to: u64,
    ) -> Result<Vec<Event>> {
        self.state().event_queries.push((category, from, to));
        self.enter(Op::Events(category))?;
        let state = self.state();
        Ok(state
            .events
            .iter()
            .filter(|event| event.category == category)
            .filter(|event| (from..=to).contains(&event.block_height))
            .cloned()
            .collect())
    }

    async fn read_game(&self, id: GameId) -> Result<GameRecord> {
        self.enter(Op::ReadGame)?;
        let delay = {
            let mut state = self.state();
            state.outstanding_game_reads += 1;
            state.max_outstanding_game_reads = state
                .max_outstanding_game_reads
                .max(state.outstanding_game_reads);
            state.game_read_delay
        };
        let _outstanding = OutstandingRead(self);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let game = self.state().games.get(id as usize).cloned();
        game.ok_or_else(|| SyncError::not_found(RecordKind::Game, id))
    }

    async fn game_count(&self) -> Result<u64> {
        self.enter(Op::GameCount)?;
        Ok(self.state().games.len() as u64)
    }

    async fn history_count(&self, account: Address) -> Result<u64> {
        self.enter(Op::HistoryCount)?;
        Ok(self
            .state()
            .history
            .get(&account)
            .map(|entries| entries.len() as u64)
            .unwrap_or_default())
    }

    async fn read_history(
        &self,
        account: Address,
        start: u64,
        count: u64,
    ) -> Result<Vec<HistoryEntry>> {
        self.enter(Op::ReadHistory)?;
        let delay = self.state().history_delays.get(&start).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state();
        let entries = state.history.get(&account).map(Vec::as_slice).unwrap_or(&[]);
        Ok(entries
            .iter()
            .skip(start as usize)
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn player_stats(&self, account: Address) -> Result<PlayerStats> {
        self.enter(Op::Stats)?;
        self.state()
            .stats
            .get(&account)
            .copied()
            .ok_or_else(|| SyncError::not_found(RecordKind::Stats, account))
    }

    async fn token_profits(&self, account: Address) -> Result<Vec<TokenProfit>> {
        self.enter(Op::Stats)?;
        Ok(self
            .state()
            .token_profits
            .get(&account)
            .cloned()
            .unwrap_or_default())
    }

    fn account_identity(&self) -> Option<Address> {
        self.state().account
    }
}
