use crate::{
    Outcome,
    Result,
    adapter::LedgerAdapter,
    config::SyncConfig,
    events::Event,
    history::{
        HistoryPage,
        HistoryPaginator,
    },
    poller::{
        BlockRangePoller,
        ScanOutcome,
    },
    reconcile::{
        GameReconciler,
        GameUpdate,
        LobbyReconciler,
        LobbyUpdate,
        LobbyView,
        Milestone,
    },
    scheduler::{
        Liveness,
        Subscription,
        lock,
        spawn_periodic,
    },
    stats::PlayerSummary,
    types::{
        Address,
        GameId,
        GameRecord,
    },
};
use std::sync::{
    Arc,
    Mutex,
};
use tracing::{
    debug,
    info,
    warn,
};

#[cfg(test)]
mod tests;

/// Caller supplied callback shared with a periodic task. Invoked only while
/// the owning subscription is alive, on the task itself and under the sink's
/// lock, so a callback that blocks stalls its subscription.
struct Sink<F>(Arc<Mutex<F>>);

impl<F> Clone for Sink<F> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<F> Sink<F> {
    fn new(callback: F) -> Self {
        Self(Arc::new(Mutex::new(callback)))
    }

    fn deliver<T>(&self, liveness: &Liveness, value: T)
    where
        F: FnMut(T),
    {
        if !liveness.is_live() {
            debug!("subscription cancelled, discarding result");
            return;
        }
        let mut callback = lock(&self.0);
        (*callback)(value);
    }
}

/// Entry point for views: hands out cancellable subscriptions and answers
/// on-demand history and statistics requests. The adapter is shared by
/// everything created from one instance.
///
/// Subscription callbacks run on the polling task and must not block or wait
/// on that subscription's next delivery. Views that need to do more should
/// forward into a channel, e.g. `tokio::sync::mpsc`, and consume from there.
pub struct LedgerSync<A> {
    adapter: Arc<A>,
    config: SyncConfig,
    history: Mutex<Option<Arc<HistoryPaginator<A>>>>,
}

impl<A: LedgerAdapter> LedgerSync<A> {
    pub fn new(adapter: A, config: SyncConfig) -> Self {
        Self::with_shared(Arc::new(adapter), config)
    }

    pub fn with_shared(adapter: Arc<A>, config: SyncConfig) -> Self {
        Self {
            adapter,
            config,
            history: Mutex::new(None),
        }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Delivers every deduplicated event as it is admitted. Starts observing
    /// at the current head; nothing older is replayed.
    pub fn subscribe_events<F>(&self, on_event: F) -> Subscription
    where
        F: FnMut(Event) + Send + 'static,
    {
        let poller = Arc::new(BlockRangePoller::new(self.adapter.clone(), &self.config));
        let sink = Sink::new(on_event);
        info!(period = ?self.config.event_poll_interval(), "subscribing to events");
        spawn_periodic("events", self.config.event_poll_interval(), move |liveness| {
            let poller = poller.clone();
            let sink = sink.clone();
            async move {
                if let ScanOutcome::Scanned { admitted, .. } = poller.scan().await {
                    for event in admitted {
                        sink.deliver(&liveness, event);
                    }
                }
            }
        })
    }

    pub fn subscribe_game<S, M>(
        &self,
        game_id: GameId,
        on_snapshot: S,
        on_milestone: M,
    ) -> Subscription
    where
        S: FnMut(GameRecord) + Send + 'static,
        M: FnMut(Milestone) + Send + 'static,
    {
        let reconciler = Arc::new(GameReconciler::new(self.adapter.clone(), game_id));
        let snapshots = Sink::new(on_snapshot);
        let milestones = Sink::new(on_milestone);
        info!(game_id, "subscribing to game");
        spawn_periodic("game", self.config.game_poll_interval(), move |liveness| {
            let reconciler = reconciler.clone();
            let snapshots = snapshots.clone();
            let milestones = milestones.clone();
            async move {
                match reconciler.reconcile().await {
                    Ok(Outcome::Data(GameUpdate::Changed {
                        snapshot,
                        milestones: fired,
                    })) => {
                        snapshots.deliver(&liveness, snapshot);
                        for milestone in fired {
                            milestones.deliver(&liveness, milestone);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => warn!(game_id, "game poll failed: {e}"),
                }
            }
        })
    }

    /// Delivers the full display ordered batch whenever it changes.
    pub fn subscribe_lobby<F>(&self, on_batch: F) -> Subscription
    where
        F: FnMut(LobbyView) + Send + 'static,
    {
        let reconciler = Arc::new(LobbyReconciler::new(self.adapter.clone(), &self.config));
        let sink = Sink::new(on_batch);
        info!("subscribing to lobby");
        spawn_periodic("lobby", self.config.lobby_poll_interval(), move |liveness| {
            let reconciler = reconciler.clone();
            let sink = sink.clone();
            async move {
                match reconciler.reconcile().await {
                    Ok(LobbyUpdate::Changed(view)) => sink.deliver(&liveness, view),
                    Ok(_) => {}
                    Err(e) => warn!("lobby poll failed: {e}"),
                }
            }
        })
    }

    pub fn history(&self, account: Address) -> HistoryPaginator<A> {
        HistoryPaginator::new(
            self.adapter.clone(),
            account,
            self.config.history_page_size,
        )
    }

    /// History page of the local account; `Empty` without a session.
    /// Overlapping calls resolve last-writer-wins, superseded ones return
    /// `StaleResponse`.
    pub async fn fetch_history_page(&self, index: u64) -> Result<Outcome<HistoryPage>> {
        let Some(account) = self.adapter.account_identity() else {
            return Ok(Outcome::Empty);
        };
        let paginator = self.paginator_for(account);
        paginator.fetch_page(index).await.map(Outcome::Data)
    }

    /// Statistics of the local account; `Empty` without a session.
    pub async fn player_summary(&self) -> Result<Outcome<PlayerSummary>> {
        let Some(account) = self.adapter.account_identity() else {
            return Ok(Outcome::Empty);
        };
        PlayerSummary::load(self.adapter.as_ref(), account).await
    }

    fn paginator_for(&self, account: Address) -> Arc<HistoryPaginator<A>> {
        let mut slot = lock(&self.history);
        match slot.as_ref() {
            Some(paginator) if paginator.account() == account => paginator.clone(),
            _ => {
                let paginator = Arc::new(self.history(account));
                *slot = Some(paginator.clone());
                paginator
            }
        }
    }
}
