use crate::{
    Result,
    SyncError,
    adapter::LedgerAdapter,
    error::absent_as_empty,
    scheduler::lock,
    types::{
        Address,
        HistoryEntry,
    },
};
use serde::Serialize;
use std::sync::{
    Arc,
    Mutex,
    atomic::{
        AtomicU64,
        Ordering,
    },
};
use tracing::debug;


/// One page of an account's game log, entries in the log's own order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    pub index: u64,
    pub page_size: u64,
    /// Length of the whole log at the time this page was read.
    pub total: u64,
    pub entries: Vec<HistoryEntry>,
}

impl HistoryPage {
    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index
            .saturating_add(1)
            .saturating_mul(self.page_size)
            < self.total
    }

    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.page_size)
    }
}

/// Page navigation over one account's append-only history.
///
/// Requests may overlap. Every call takes a ticket when it starts and only
/// the holder of the newest ticket may replace the current page; anything
/// older resolves to [`SyncError::StaleResponse`].
pub struct HistoryPaginator<A> {
    adapter: Arc<A>,
    account: Address,
    page_size: u64,
    issued: AtomicU64,
    current: Mutex<Option<HistoryPage>>,
}

impl<A: LedgerAdapter> HistoryPaginator<A> {
    pub fn new(adapter: Arc<A>, account: Address, page_size: u64) -> Self {
        Self {
            adapter,
            account,
            page_size: page_size.max(1),
            issued: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    /// The page currently shown.
    pub fn current(&self) -> Option<HistoryPage> {
        lock(&self.current).clone()
    }

    pub async fn fetch_page(&self, index: u64) -> Result<HistoryPage> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        // the log keeps growing, so the total is never cached
        let total = absent_as_empty(self.adapter.history_count(self.account).await)?
            .into_option()
            .unwrap_or_default();
        let start = index.saturating_mul(self.page_size);
        let entries = if start < total {
            self.adapter
                .read_history(self.account, start, self.page_size)
                .await?
        } else {
            Vec::new()
        };

        let page = HistoryPage {
            index,
            page_size: self.page_size,
            total,
            entries,
        };
        let mut current = lock(&self.current);
        if self.issued.load(Ordering::SeqCst) != ticket {
            debug!(index, ticket, "discarding superseded history page");
            return Err(SyncError::StaleResponse);
        }
        *current = Some(page.clone());
        Ok(page)
    }

    /// Re-reads the page currently shown, or the first one.
    pub async fn reload(&self) -> Result<HistoryPage> {
        let index = self.current().map(|page| page.index).unwrap_or_default();
        self.fetch_page(index).await
    }
}
