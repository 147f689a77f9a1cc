//! Change detection for mutable game records.
//!
//! Both reconcilers re-read records on every tick and only surface a result
//! when it differs structurally from the last one delivered. Milestones are
//! evaluated on those change ticks only, so an unchanged re-read can never
//! fire one twice.

use crate::{
    Outcome,
    Result,
    SyncError,
    adapter::LedgerAdapter,
    config::{
        DisplayOrder,
        SyncConfig,
    },
    error::absent_as_empty,
    rules,
    scheduler::{
        SingleFlight,
        lock,
    },
    types::{
        Address,
        GameId,
        GameRecord,
        GameResult,
    },
};
use futures::future::join_all;
use std::sync::{
    Arc,
    Mutex,
};
use tracing::{
    debug,
    warn,
};


/// One-shot notification distinct from the snapshot update itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Milestone {
    BothCommitted {
        game_id: GameId,
    },
    Concluded {
        game_id: GameId,
        /// `None` on a draw.
        winner: Option<Address>,
        /// From the local account's point of view.
        result: Option<GameResult>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameUpdate {
    Skipped,
    Unchanged,
    Changed {
        snapshot: GameRecord,
        milestones: Vec<Milestone>,
    },
}

#[derive(Default)]
struct RoomState {
    last: Option<GameRecord>,
    both_committed_announced: bool,
}

impl RoomState {
    fn milestones(&mut self, next: &GameRecord, account: Option<Address>) -> Vec<Milestone> {
        let Some(account) = account.filter(|a| rules::is_participant(next, a)) else {
            return Vec::new();
        };
        let mut fired = Vec::new();
        if rules::both_committed(next) && !next.finished && !self.both_committed_announced {
            self.both_committed_announced = true;
            fired.push(Milestone::BothCommitted { game_id: next.id });
        }
        if next.finished && self.last.as_ref().is_some_and(|prev| !prev.finished) {
            fired.push(Milestone::Concluded {
                game_id: next.id,
                winner: rules::winner(next),
                result: rules::local_result(next, &account),
            });
        }
        fired
    }
}

/// Single record variant: the game room.
pub struct GameReconciler<A> {
    adapter: Arc<A>,
    game_id: GameId,
    state: Mutex<RoomState>,
    flight: SingleFlight,
}

impl<A: LedgerAdapter> GameReconciler<A> {
    pub fn new(adapter: Arc<A>, game_id: GameId) -> Self {
        Self {
            adapter,
            game_id,
            state: Mutex::new(RoomState::default()),
            flight: SingleFlight::new(),
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Last snapshot handed out.
    pub fn snapshot(&self) -> Option<GameRecord> {
        lock(&self.state).last.clone()
    }

    /// `Empty` when the game does not exist (yet).
    pub async fn reconcile(&self) -> Result<Outcome<GameUpdate>> {
        let Some(_guard) = self.flight.try_acquire() else {
            return Ok(Outcome::Data(GameUpdate::Skipped));
        };
        let fetched = absent_as_empty(self.adapter.read_game(self.game_id).await)?;
        let Outcome::Data(next) = fetched else {
            debug!(game_id = self.game_id, "game not found");
            return Ok(Outcome::Empty);
        };

        let account = self.adapter.account_identity();
        let mut state = lock(&self.state);
        if state.last.as_ref() == Some(&next) {
            return Ok(Outcome::Data(GameUpdate::Unchanged));
        }
        let milestones = state.milestones(&next, account);
        state.last = Some(next.clone());
        Ok(Outcome::Data(GameUpdate::Changed {
            snapshot: next,
            milestones,
        }))
    }
}

/// The lobby as a view renders it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbyView {
    /// Display ordered and capped.
    pub games: Vec<GameRecord>,
    /// Unfinished games the local account sits in, from all records.
    pub my_active: Vec<GameRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyUpdate {
    Skipped,
    Unchanged,
    Changed(LobbyView),
}

/// Batch variant: every game `0..count`, read in bounded sub-batches.
pub struct LobbyReconciler<A> {
    adapter: Arc<A>,
    batch_size: usize,
    display_cap: usize,
    order: DisplayOrder,
    last: Mutex<Option<LobbyView>>,
    flight: SingleFlight,
}

impl<A: LedgerAdapter> LobbyReconciler<A> {
    pub fn new(adapter: Arc<A>, config: &SyncConfig) -> Self {
        Self {
            adapter,
            batch_size: config.lobby_batch_size.max(1),
            display_cap: config.lobby_display_cap,
            order: config.lobby_order,
            last: Mutex::new(None),
            flight: SingleFlight::new(),
        }
    }

    pub fn view(&self) -> Option<LobbyView> {
        lock(&self.last).clone()
    }

    pub async fn reconcile(&self) -> Result<LobbyUpdate> {
        let Some(_guard) = self.flight.try_acquire() else {
            return Ok(LobbyUpdate::Skipped);
        };
        let games = self.read_all().await?;
        let account = self.adapter.account_identity();
        let next = self.arrange(games, account);

        let mut last = lock(&self.last);
        if last.as_ref() == Some(&next) {
            return Ok(LobbyUpdate::Unchanged);
        }
        *last = Some(next.clone());
        Ok(LobbyUpdate::Changed(next))
    }

    /// Records in creation order. Ids that vanished between the count and the
    /// read, or whose record cannot be decoded, are skipped; any other failure
    /// aborts the whole tick.
    async fn read_all(&self) -> Result<Vec<GameRecord>> {
        let count = self.adapter.game_count().await?;
        let ids: Vec<GameId> = (0..count).collect();
        let mut games = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.batch_size) {
            let reads = chunk.iter().map(|&id| self.adapter.read_game(id));
            for read in join_all(reads).await {
                match read {
                    Ok(game) => games.push(game),
                    Err(SyncError::NotFound { id, .. }) => {
                        debug!(%id, "game disappeared during lobby read");
                    }
                    Err(SyncError::Malformed(reason)) => {
                        warn!("skipping unreadable lobby game: {reason}");
                    }
                    Err(e) => {
                        warn!("lobby batch read failed: {e}");
                        return Err(e);
                    }
                }
            }
        }
        Ok(games)
    }

    fn arrange(&self, mut games: Vec<GameRecord>, account: Option<Address>) -> LobbyView {
        if self.order == DisplayOrder::NewestFirst {
            games.reverse();
        }
        let my_active = match account {
            Some(account) => games
                .iter()
                .filter(|game| !game.finished && rules::is_participant(game, &account))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        games.truncate(self.display_cap);
        LobbyView { games, my_active }
    }
}
