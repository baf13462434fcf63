use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use booking::cache::ResumeCache;
use booking::renewal::{RenewalConfig, RenewalCoordinator};
use booking::watcher::{BookingPhase, BookingWatcher, WatcherConfig};
use common::logger::init_logger;
use common::notify::{LogNotifier, NoticeLevel, Notifier};
use resources::board::SlotBoard;
use resources::client::ApiClient;
use resources::poller::run_slot_poller;
use resources::types::PollScope;
use timesync::channel::TimeSyncChannel;
use timesync::clock::ServerClock;

mod config;
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("parking-client");

    let cfg = AppConfig::from_env();
    tracing::info!(lot_id = cfg.lot_id, "starting parking client engine");

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    // Server clock feed; every expiry computation reads through its view.
    let clock = ServerClock::new();
    let time_channel =
        TimeSyncChannel::new(cfg.time_ws_url.clone(), clock.clone(), Arc::clone(&notifier))
            .spawn();

    let api = Arc::new(ApiClient::new(cfg.api_base_url.clone())?);

    // Slot reconciliation poller for the configured lot.
    let board = SlotBoard::new();
    let (scope_tx, scope_rx) = watch::channel(PollScope {
        lot_id: cfg.lot_id,
        vehicle_type: None,
    });
    let (poller_stop_tx, poller_stop_rx) = watch::channel(false);
    tokio::spawn(run_slot_poller(
        Arc::clone(&api),
        board.clone(),
        clock.view(),
        scope_rx,
        poller_stop_rx,
        Duration::from_millis(cfg.slot_poll_ms),
    ));

    let cache = ResumeCache::new();
    let watcher = cfg.booking_id.map(|booking_id| {
        BookingWatcher::spawn(
            Arc::clone(&api),
            clock.view(),
            Arc::clone(&notifier),
            cache.clone(),
            booking_id,
            WatcherConfig {
                reconcile_every: Duration::from_millis(cfg.reconcile_poll_ms),
                ..WatcherConfig::default()
            },
        )
    });

    // Surface the renewal offer once the watched booking expires. The renew
    // call itself stays user-initiated.
    if let Some(w) = &watcher {
        let view = w.view();
        let renewals = RenewalCoordinator::new(
            Arc::clone(&api),
            cache.clone(),
            RenewalConfig {
                discount_bps: cfg.renewal_discount_bps,
                payment_delay: Duration::from_millis(cfg.payment_delay_ms),
            },
        );
        let offer_notifier = Arc::clone(&notifier);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                if view.phase() == BookingPhase::Expired {
                    if let Some(b) = view.booking() {
                        offer_notifier.notify(
                            &format!(
                                "Booking {} expired; renew the same slot for {} cents",
                                b.id,
                                renewals.discounted_amount(b.price_cents)
                            ),
                            NoticeLevel::Info,
                        );
                    }
                    break;
                }
                if view.phase() == BookingPhase::NotFound {
                    break;
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // Teardown order: stop consumers first, then the clock feed they read.
    if let Some(w) = &watcher {
        w.shutdown();
    }
    let _ = poller_stop_tx.send(true);
    time_channel.shutdown();
    drop(scope_tx);

    Ok(())
}
