use crate::{
    SyncError,
    adapter::LedgerAdapter,
    config::SyncConfig,
    cursor::{
        Cursor,
        NextStep,
        ScanWindow,
    },
    dedup::EventWindow,
    events::{
        Event,
        EventCategory,
    },
    scheduler::{
        SingleFlight,
        lock,
    },
};
use std::{
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};
use tracing::{
    debug,
    error,
    trace,
    warn,
};


/// What one call to [`BlockRangePoller::scan`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Another scan was still in flight; this one was dropped.
    Skipped,
    /// First observation: the cursor jumped to this height, nothing was read.
    Synchronized(u64),
    UpToDate,
    Scanned {
        window: ScanWindow,
        /// Events that passed deduplication, in query order.
        admitted: Vec<Event>,
    },
    /// A retryable failure; the window will be retried on the next tick.
    /// Categories answering with unreadable data are skipped instead, so a
    /// corrupt window cannot hold the cursor back.
    Failed(SyncError),
}

impl ScanOutcome {
    pub fn admitted(&self) -> &[Event] {
        match self {
            ScanOutcome::Scanned { admitted, .. } => admitted,
            _ => &[],
        }
    }
}

/// Turns "current height" and a cursor into bounded, range scoped event
/// queries. One instance owns one cursor.
pub struct BlockRangePoller<A> {
    adapter: Arc<A>,
    categories: Vec<EventCategory>,
    max_window: u64,
    category_pause: Duration,
    cursor: Mutex<Cursor>,
    window: Mutex<EventWindow>,
    flight: SingleFlight,
}

impl<A: LedgerAdapter> BlockRangePoller<A> {
    pub fn new(adapter: Arc<A>, config: &SyncConfig) -> Self {
        Self {
            adapter,
            categories: config.categories.clone(),
            max_window: config.max_window_blocks,
            category_pause: config.category_pause(),
            cursor: Mutex::new(Cursor::UNINITIALIZED),
            window: Mutex::new(EventWindow::new(config.dedup_capacity)),
            flight: SingleFlight::new(),
        }
    }

    /// Starts from a known position instead of synchronizing on first tick.
    pub fn resume_from(self, cursor: Cursor) -> Self {
        *lock(&self.cursor) = cursor;
        self
    }

    pub fn cursor(&self) -> Cursor {
        *lock(&self.cursor)
    }

    /// Snapshot of the deduplication window, newest first.
    pub fn recent_events(&self) -> Vec<Event> {
        lock(&self.window).to_vec()
    }

    pub async fn scan(&self) -> ScanOutcome {
        let Some(_guard) = self.flight.try_acquire() else {
            trace!("scan already in flight, dropping tick");
            return ScanOutcome::Skipped;
        };

        let height = match self.adapter.current_height().await {
            Ok(height) => height,
            Err(e) => {
                warn!("failed to read current height: {e}");
                return ScanOutcome::Failed(e);
            }
        };

        let step = self.cursor().next_step(height, self.max_window);
        let window = match step {
            NextStep::Synchronize(height) => {
                debug!(height, "cursor synchronized to ledger head");
                lock(&self.cursor).advance_to(height);
                return ScanOutcome::Synchronized(height);
            }
            NextStep::UpToDate => return ScanOutcome::UpToDate,
            NextStep::Scan(window) => window,
        };
        debug!(from = window.from, to = window.to, height, "scanning block window");

        let mut fetched = Vec::new();
        for (i, category) in self.categories.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.category_pause).await;
            }
            match self
                .adapter
                .query_events(*category, window.from, window.to)
                .await
            {
                Ok(events) => fetched.extend(events),
                Err(SyncError::Malformed(reason)) => {
                    error!(
                        %category,
                        from = window.from,
                        to = window.to,
                        "unreadable event data, skipping category for this window: {reason}"
                    );
                }
                Err(e) => {
                    warn!(
                        %category,
                        from = window.from,
                        to = window.to,
                        "event query failed, window will be retried: {e}"
                    );
                    return ScanOutcome::Failed(e);
                }
            }
        }

        // no retryable failure: admit, then commit the cursor
        let admitted = {
            let mut dedup = lock(&self.window);
            fetched
                .into_iter()
                .filter(|event| dedup.admit(event.clone()))
                .collect::<Vec<_>>()
        };
        lock(&self.cursor).advance_to(window.to);

        ScanOutcome::Scanned { window, admitted }
    }
}
