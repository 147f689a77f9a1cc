//! Periodic, cancellable polling tasks and the single-flight guard they
//! share with manual refreshes.

use std::{
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
    time::Duration,
};
use futures::FutureExt;
use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::{
        self,
        Instant,
        MissedTickBehavior,
    },
};

/// At most one holder at a time; contenders are turned away instead of
/// waiting.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

/// Releases the flight when dropped, whichever way the holder exits.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| FlightGuard { busy: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Locks without propagating poison; no critical section here can leave
/// the data half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared "is the owning view still alive" flag. Checked immediately before
/// any result is applied, not only when a tick starts.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running subscription. Dropping it cancels the task.
#[must_use = "dropping a Subscription cancels it"]
#[derive(Debug)]
pub struct Subscription {
    liveness: Liveness,
    refresh: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Requests one immediate tick, e.g. after a local action whose effect
    /// should show up without waiting a full period. Dropped if a tick is
    /// already running.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn is_active(&self) -> bool {
        self.liveness.is_live()
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.liveness.kill();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Runs `job` every `period`, first tick immediately.
///
/// Ticks are never queued: one that falls due while `job` is still running
/// is dropped, and so is a [`Subscription::refresh`] made in that time. The job receives the subscription's [`Liveness`] and must
/// check it before delivering anything.
pub fn spawn_periodic<F, Fut>(label: &'static str, period: Duration, mut job: F) -> Subscription
where
    F: FnMut(Liveness) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let liveness = Liveness::new();
    let refresh = Arc::new(Notify::new());
    let task_liveness = liveness.clone();
    let task_refresh = refresh.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = task_refresh.notified() => {
                    tracing::debug!(label, "manual refresh");
                }
            }
            if !task_liveness.is_live() {
                break;
            }
            let started = Instant::now();
            job(task_liveness.clone()).await;
            if task_refresh.notified().now_or_never().is_some() {
                tracing::trace!(label, "refresh arrived mid-flight, dropping it");
            }
            if started.elapsed() >= period {
                tracing::trace!(label, "tick overran its period, dropping missed ticks");
                ticker.reset();
            }
        }
        tracing::debug!(label, "periodic task stopped");
    });

    Subscription {
        liveness,
        refresh,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn single_flight__second_acquire_is_refused() {
        // given
        let flight = SingleFlight::new();

        // when
        let guard = flight.try_acquire();

        // then
        assert!(guard.is_some());
        assert!(flight.try_acquire().is_none());
        drop(guard);
        assert!(flight.try_acquire().is_some());
    }

    #[test]
    fn single_flight__released_on_early_return() {
        fn bail_out(flight: &SingleFlight) -> Result<(), &'static str> {
            let _guard = flight.try_acquire().ok_or("busy")?;
            Err("adapter failed")
        }

        let flight = SingleFlight::new();
        assert_eq!(bail_out(&flight), Err("adapter failed"));
        assert!(!flight.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_periodic__ticks_on_the_period() {
        // given
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        // when
        let sub = spawn_periodic("test", Duration::from_millis(200), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        time::sleep(Duration::from_millis(450)).await;

        // then
        // immediate tick, then 200ms and 400ms
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(sub.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_periodic__cancel_stops_ticking() {
        // given
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let sub = spawn_periodic("test", Duration::from_millis(100), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        time::sleep(Duration::from_millis(150)).await;
        let before = ticks.load(Ordering::SeqCst);

        // when
        sub.cancel();
        time::sleep(Duration::from_secs(1)).await;

        // then
        assert_eq!(ticks.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_periodic__ticks_during_a_slow_job_are_dropped() {
        // given
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();

        // when
        // each job takes 350ms against a 100ms period
        let _sub = spawn_periodic("slow", Duration::from_millis(100), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_millis(350)).await;
            }
        });
        time::sleep(Duration::from_millis(1_000)).await;

        // then
        // starts at 0, 450, 900: the missed ticks were not replayed
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_periodic__refresh_runs_an_extra_tick() {
        // given
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let sub = spawn_periodic("test", Duration::from_secs(10), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        // when
        sub.refresh();
        time::sleep(Duration::from_millis(10)).await;

        // then
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_periodic__refresh_during_a_job_is_dropped() {
        // given
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let sub = spawn_periodic("test", Duration::from_secs(10), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_millis(300)).await;
            }
        });
        time::sleep(Duration::from_millis(100)).await;

        // when
        sub.refresh();
        time::sleep(Duration::from_secs(1)).await;

        // then
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
