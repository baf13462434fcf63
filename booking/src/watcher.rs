use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use common::notify::{NoticeLevel, Notifier};
use common::time::MINUTE_MS;
use resources::api::ParkingApi;
use resources::error::ApiError;
use resources::types::{BookingStatus, BookingSummary};
use timesync::clock::ClockView;

use crate::cache::ResumeCache;
use crate::countdown::{CountdownEvent, CountdownScheduler, EXPIRING_SOON_MS};

/// Authoritative lifecycle phase of a watched booking.
///
/// Only fetched server state moves this; the countdown touches display
/// fields alone. `Expired` and `NotFound` are terminal for the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingPhase {
    #[default]
    Loading,
    Scheduled,
    Active,
    Expired,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Display tick cadence. The countdown recomputes on each tick; it
    /// never decrements.
    pub tick_every: Duration,
    /// Background reconciliation cadence while the booking is live. Runs
    /// independently of the countdown to catch server-side auto-completion
    /// the client clock might miss.
    pub reconcile_every: Duration,
    /// One-time "expiring soon" warning threshold.
    pub expiring_soon_ms: i64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            tick_every: Duration::from_secs(1),
            reconcile_every: Duration::from_secs(15),
            expiring_soon_ms: EXPIRING_SOON_MS,
        }
    }
}

#[derive(Debug, Default)]
struct ViewInner {
    phase: BookingPhase,
    booking: Option<BookingSummary>,
    remaining_ms: Option<i64>,
    /// Timer-owned display flag; never authoritative.
    display_expired: bool,
    /// True while the summary on screen came from the resume cache.
    from_cache: bool,
}

/// Read model of one watched booking: the watcher task writes, any number
/// of readers snapshot.
#[derive(Clone, Default)]
pub struct BookingView {
    inner: Arc<RwLock<ViewInner>>,
}

impl BookingView {
    pub fn phase(&self) -> BookingPhase {
        self.inner.read().phase
    }

    pub fn booking(&self) -> Option<BookingSummary> {
        self.inner.read().booking.clone()
    }

    pub fn remaining_ms(&self) -> Option<i64> {
        self.inner.read().remaining_ms
    }

    pub fn display_expired(&self) -> bool {
        self.inner.read().display_expired
    }

    pub fn from_cache(&self) -> bool {
        self.inner.read().from_cache
    }

    fn set_cached(&self, booking: BookingSummary) {
        let mut g = self.inner.write();
        if g.booking.is_none() {
            g.booking = Some(booking);
            g.from_cache = true;
        }
    }

    fn apply_fetch(&self, booking: BookingSummary, phase: BookingPhase) {
        let mut g = self.inner.write();
        g.booking = Some(booking);
        g.phase = phase;
        g.from_cache = false;
    }

    fn set_phase(&self, phase: BookingPhase) {
        self.inner.write().phase = phase;
    }

    fn set_remaining(&self, remaining_ms: Option<i64>) {
        self.inner.write().remaining_ms = remaining_ms;
    }

    fn set_display_expired(&self) {
        self.inner.write().display_expired = true;
    }
}

/// Lifecycle controller for a single booking id.
///
/// Owns the 1 Hz display tick, the reconciliation interval, and the resume
/// cache interaction. Every timer it starts stops on [`shutdown`], which
/// pairs with `spawn` on scope teardown rather than relying on natural
/// completion.
///
/// [`shutdown`]: BookingWatcher::shutdown
pub struct BookingWatcher {
    booking_id: i64,
    view: BookingView,
    shutdown_tx: watch::Sender<bool>,
    poke_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl BookingWatcher {
    pub fn spawn<A>(
        api: Arc<A>,
        clock: ClockView,
        notifier: Arc<dyn Notifier>,
        cache: ResumeCache,
        booking_id: i64,
        cfg: WatcherConfig,
    ) -> Self
    where
        A: ParkingApi + 'static,
    {
        let view = BookingView::default();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (poke_tx, poke_rx) = mpsc::channel(1);

        let worker = Worker {
            api,
            clock,
            notifier,
            cache,
            booking_id,
            cfg,
            view: view.clone(),
        };
        let task = tokio::spawn(worker.run(shutdown_rx, poke_rx));

        Self {
            booking_id,
            view,
            shutdown_tx,
            poke_tx,
            task,
        }
    }

    pub fn booking_id(&self) -> i64 {
        self.booking_id
    }

    pub fn view(&self) -> BookingView {
        self.view.clone()
    }

    pub fn phase(&self) -> BookingPhase {
        self.view.phase()
    }

    /// Ask for one out-of-band reconciliation fetch, regardless of phase.
    pub fn request_reconcile(&self) {
        let _ = self.poke_tx.try_send(());
    }

    /// Stop every timer and poll owned by this watcher. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

struct Worker<A> {
    api: Arc<A>,
    clock: ClockView,
    notifier: Arc<dyn Notifier>,
    cache: ResumeCache,
    booking_id: i64,
    cfg: WatcherConfig,
    view: BookingView,
}

impl<A: ParkingApi> Worker<A> {
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>, mut poke_rx: mpsc::Receiver<()>) {
        info!(booking_id = self.booking_id, "booking watcher started");

        // Advisory render-first path; the fetch below always supersedes it.
        if let Some(cached) = self.cache.get(self.booking_id) {
            debug!(booking_id = self.booking_id, "rendered from resume cache");
            self.view.set_cached(cached);
        }

        let mut countdown = CountdownScheduler::with_threshold(self.cfg.expiring_soon_ms);
        let mut notified_expired = false;

        self.reconcile(&mut countdown, &mut notified_expired).await;

        let mut ticker = interval(self.cfg.tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut reconciler = interval(self.cfg.reconcile_every);
        reconciler.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                res = shutdown_rx.changed() => {
                    // A dropped sender counts as shutdown.
                    if res.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let events = countdown.tick(self.clock.now_ms());
                    self.view.set_remaining(
                        countdown.get(self.booking_id).and_then(|e| e.remaining_ms),
                    );
                    for event in events {
                        self.on_countdown_event(event, &mut countdown, &mut notified_expired)
                            .await;
                    }
                }
                _ = reconciler.tick() => {
                    // Terminal phases stop the background poll; the timers
                    // stop with the watcher itself.
                    if matches!(self.view.phase(), BookingPhase::Expired | BookingPhase::NotFound) {
                        continue;
                    }
                    self.reconcile(&mut countdown, &mut notified_expired).await;
                }
                Some(_) = poke_rx.recv() => {
                    self.reconcile(&mut countdown, &mut notified_expired).await;
                }
            }
        }

        info!(booking_id = self.booking_id, "booking watcher stopped");
    }

    async fn on_countdown_event(
        &self,
        event: CountdownEvent,
        countdown: &mut CountdownScheduler,
        notified_expired: &mut bool,
    ) {
        match event {
            CountdownEvent::ExpiringSoon { remaining_ms, .. } => {
                let minutes = (remaining_ms + MINUTE_MS - 1) / MINUTE_MS;
                self.notifier.notify(
                    &format!("Booking expires in about {minutes} minute(s)"),
                    NoticeLevel::Info,
                );
            }
            CountdownEvent::Expired { .. } => {
                // Display truth only: the fetch below is what may flip the
                // authoritative phase.
                self.view.set_display_expired();
                self.view.set_remaining(Some(0));
                if !*notified_expired {
                    *notified_expired = true;
                    self.notifier.notify("Booking time is up", NoticeLevel::Warning);
                }
                self.reconcile(countdown, notified_expired).await;
            }
        }
    }

    async fn reconcile(&self, countdown: &mut CountdownScheduler, notified_expired: &mut bool) {
        match self.api.get_booking(self.booking_id).await {
            Ok(booking) => {
                self.cache.put(&booking);
                countdown.sync(std::slice::from_ref(&booking));

                let phase = phase_of(&booking);
                if phase == BookingPhase::Expired && !*notified_expired {
                    *notified_expired = true;
                    self.notifier.notify("Booking time is up", NoticeLevel::Warning);
                }
                self.view.apply_fetch(booking, phase);
            }
            Err(ApiError::NotFound) => {
                countdown.remove(self.booking_id);
                self.view.set_phase(BookingPhase::NotFound);
            }
            // Transient reconcile failures keep the current view; the next
            // scheduled cycle retries.
            Err(e) => {
                warn!(booking_id = self.booking_id, error = %e, "reconciliation fetch failed");
            }
        }
    }
}

fn phase_of(booking: &BookingSummary) -> BookingPhase {
    match booking.status {
        BookingStatus::Scheduled => BookingPhase::Scheduled,
        BookingStatus::Active => BookingPhase::Active,
        BookingStatus::Completed | BookingStatus::Cancelled => BookingPhase::Expired,
    }
}
