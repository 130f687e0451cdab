//! # Orchestrator
//!
//! Owns component lifetime, the packet callback, and the background
//! worker loop (spec.md §4.7). Wiring mirrors the way the teacher crate's
//! `MBusDeviceManager` owns and coordinates its device handles, but here
//! the coordinated pieces are the store, the ingress pipeline, the
//! submitter, and the notifier rather than serial devices.

use crate::commands::{Classification, CommandParser};
use crate::config::Config;
use crate::constants::{
    POSITION_MAX_AGE_SECONDS, WORKER_DRAIN_LIMIT, WORKER_INTERVAL, WORKER_JOIN_TIMEOUT,
};
use crate::error::GatewayError;
use crate::geocoder::Geocoder;
use crate::notifier::Notifier;
use crate::ntp;
use crate::position_cache::PositionCache;
use crate::rate_limiter::RateLimiter;
use crate::store::Store;
use crate::submitter::Submitter;
use crate::transport::{Packet, TransportAdapter};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

pub struct Orchestrator {
    config: Arc<Config>,
    store: Store,
    positions: Arc<PositionCache>,
    parser: Arc<CommandParser>,
    submitter: Arc<Submitter>,
    notifier: Arc<Notifier>,
    transport: Arc<dyn TransportAdapter>,
}

impl Orchestrator {
    pub async fn new(config: Config, transport: Arc<dyn TransportAdapter>) -> Result<Self, GatewayError> {
        let config = Arc::new(config);
        let store = Store::open(&config.db_path())?;

        if store.get_startup_timestamp().await?.is_none() {
            store
                .set_startup_timestamp(chrono::Utc::now().timestamp() as f64)
                .await?;
        }

        let positions = PositionCache::new(store.clone());
        positions.rehydrate().await?;

        let http = reqwest::Client::builder()
            .user_agent("osmnotes-gateway/1.0")
            .build()
            .map_err(GatewayError::Http)?;

        let rate_limiter = Arc::new(RateLimiter::default());
        let parser = Arc::new(CommandParser::new(
            store.clone(),
            positions.clone(),
            rate_limiter,
            config.clone(),
            http.clone(),
        ));
        let submitter = Arc::new(Submitter::new(http.clone(), store.clone(), config.clone()));
        let geocoder = Arc::new(Geocoder::new(http));
        let notifier = Arc::new(Notifier::new(store.clone(), transport.clone(), geocoder));

        Ok(Orchestrator {
            config,
            store,
            positions,
            parser,
            submitter,
            notifier,
            transport,
        })
    }

    /// Runs until a termination signal arrives, then shuts down cleanly.
    pub async fn run(self) -> Result<(), GatewayError> {
        self.transport.start().await?;

        let running = Arc::new(AtomicBool::new(true));
        let worker = tokio::spawn(worker_loop(
            self.store.clone(),
            self.submitter.clone(),
            self.notifier.clone(),
            self.config.clone(),
            running.clone(),
        ));

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| GatewayError::Other(format!("cannot install SIGTERM handler: {e}")))?;

        loop {
            tokio::select! {
                packet = self.transport.recv() => {
                    match packet {
                        Some((node_id, packet)) => {
                            if let Err(e) = self.handle_packet(&node_id, packet).await {
                                crate::logging::log_warn(&format!("packet handling failed for {node_id}: {e}"));
                            }
                        }
                        None => {
                            crate::logging::log_warn("transport closed its packet stream, shutting down");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    crate::logging::log_info("received SIGINT, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    crate::logging::log_info("received SIGTERM, shutting down");
                    break;
                }
            }
        }

        running.store(false, Ordering::SeqCst);
        self.transport.stop().await?;
        if tokio::time::timeout(WORKER_JOIN_TIMEOUT, worker).await.is_err() {
            crate::logging::log_warn("worker task did not join within the shutdown bound");
        }
        Ok(())
    }

    async fn handle_packet(&self, node_id: &str, packet: Packet) -> Result<(), GatewayError> {
        match packet {
            Packet::Position(p) => {
                self.positions.update(node_id, p.lat, p.lon).await?;
            }
            Packet::Text(t) => {
                if let Some((lat, lon)) = t.position {
                    self.positions.update(node_id, lat, lon).await?;
                }
                let outcome = self.parser.process(node_id, &t.text, t.device_uptime).await?;
                if let Classification::NoteQueued { queue_id } = &outcome.classification {
                    if let Some(note) = self.store.get_note_by_queue_id(queue_id).await? {
                        // Fire-and-forget: the immediate attempt (including its rate-gate
                        // wait and any no-cooldown failure bookkeeping) must not block this
                        // select! loop, so it runs off-task. The worker's drain pass will
                        // pick the note up regardless if this attempt fails (spec.md §5).
                        let submitter = Arc::clone(&self.submitter);
                        tokio::spawn(async move {
                            let _ = submitter.submit_immediate(&note).await;
                        });
                    }
                }
                if let Some(reply) = outcome.reply {
                    self.notifier.send_reply(node_id, &reply).await;
                }
            }
            Packet::Telemetry(_) | Packet::Other => {}
        }
        Ok(())
    }
}

async fn worker_loop(
    store: Store,
    submitter: Arc<Submitter>,
    notifier: Arc<Notifier>,
    config: Arc<Config>,
    running: Arc<AtomicBool>,
) {
    let mut cycles = 0u64;
    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(WORKER_INTERVAL).await;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        cycles += 1;

        if let Err(e) = submitter.process_pending(WORKER_DRAIN_LIMIT).await {
            crate::logging::log_warn(&format!("queue drain cycle failed: {e}"));
        }
        if let Err(e) = notifier.process_sent_notifications().await {
            crate::logging::log_warn(&format!("sent-notification cycle failed: {e}"));
        }
        if let Err(e) = notifier.process_failed_notifications().await {
            crate::logging::log_warn(&format!("failed-notification cycle failed: {e}"));
        }
        match store.get_time_correction_applied().await {
            Ok(false) => {
                if let Err(e) = ntp::maybe_correct_time(&store).await {
                    crate::logging::log_warn(&format!("time correction attempt failed: {e}"));
                }
            }
            Ok(true) => {}
            Err(e) => crate::logging::log_warn(&format!("could not read time-correction flag: {e}")),
        }
        match store.purge_positions_older_than(POSITION_MAX_AGE_SECONDS).await {
            Ok(0) => {}
            Ok(purged) => crate::logging::log_debug(&format!("purged {purged} stale position(s)")),
            Err(e) => crate::logging::log_warn(&format!("position purge failed: {e}")),
        }

        if cycles >= 1 && config.daily_broadcast_enabled {
            if let Err(e) = maybe_send_daily_broadcast(&store, &notifier, &config).await {
                crate::logging::log_warn(&format!("daily broadcast attempt failed: {e}"));
            }
        }
    }
}

async fn maybe_send_daily_broadcast(
    store: &Store,
    notifier: &Notifier,
    config: &Config,
) -> Result<(), GatewayError> {
    let tz = chrono_tz::Tz::from_str(&config.tz).unwrap_or(chrono_tz::Tz::UTC);
    let today = chrono::Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();

    if store.get_last_broadcast_date().await? == Some(today.clone()) {
        return Ok(());
    }

    let count = store.total_sent_today(tz).await?;
    let text = crate::i18n::translate(&config.language, "broadcast.daily", &[("count", &count.to_string())]);
    let _ = notifier.send_broadcast(&text).await;
    store.set_last_broadcast_date(&today).await?;
    Ok(())
}
