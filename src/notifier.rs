//! # Notifier
//!
//! Delivers DM replies and drain-pass notifications through a
//! [`TransportAdapter`], applying a per-node anti-spam ring independent of
//! the ingress [`crate::rate_limiter::RateLimiter`] (spec.md §4.6).

use crate::constants::{NOTIFICATION_ANTI_SPAM_MAX, NOTIFICATION_ANTI_SPAM_WINDOW};
use crate::error::GatewayError;
use crate::geocoder::Geocoder;
use crate::i18n::{disclaimer, translate};
use crate::store::Store;
use crate::transport::TransportAdapter;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub struct Notifier {
    store: Store,
    transport: Arc<dyn TransportAdapter>,
    geocoder: Arc<Geocoder>,
    anti_spam: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl Notifier {
    pub fn new(store: Store, transport: Arc<dyn TransportAdapter>, geocoder: Arc<Geocoder>) -> Self {
        Notifier {
            store,
            transport,
            geocoder,
            anti_spam: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if another DM may be sent to `node_id` right now.
    fn admit(&self, node_id: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.anti_spam.lock().unwrap();
        let ring = guard.entry(node_id.to_string()).or_default();
        while let Some(&front) = ring.front() {
            if now.duration_since(front) > NOTIFICATION_ANTI_SPAM_WINDOW {
                ring.pop_front();
            } else {
                break;
            }
        }
        let admitted = ring.len() < NOTIFICATION_ANTI_SPAM_MAX;
        if admitted {
            ring.push_back(now);
        }
        admitted
    }

    /// Sends a command-response DM, dropping it silently if the anti-spam
    /// ring for this node is saturated (spec.md §4.6).
    pub async fn send_reply(&self, node_id: &str, text: &str) {
        if !self.admit(node_id) {
            crate::logging::log_debug(&format!("anti-spam dropped a reply DM for {node_id}"));
            return;
        }
        if !self.transport.send_dm(node_id, text).await {
            crate::logging::log_warn(&format!("failed to deliver reply DM to {node_id}"));
        }
    }

    /// Sends a broadcast (daily summary), bypassing the per-node anti-spam
    /// ring — it goes to everyone at most once a day by construction.
    pub async fn send_broadcast(&self, text: &str) -> bool {
        self.transport.send_broadcast(text).await
    }

    /// Reads `status=sent AND notified_sent=0` rows, DMs each sender, and
    /// marks delivered ones notified. Saturated nodes get one coalesced
    /// summary DM instead of one per note.
    pub async fn process_sent_notifications(&self) -> Result<u32, GatewayError> {
        let notes = self.store.get_pending_sent_notifications().await?;
        let mut by_node: HashMap<String, Vec<_>> = HashMap::new();
        for note in notes {
            by_node.entry(note.node_id.clone()).or_default().push(note);
        }

        let mut delivered = 0;
        for (node_id, notes) in by_node {
            let locale = self.store.get_user_lang(&node_id).await?;
            if self.admit_count(&node_id, notes.len()) {
                for note in &notes {
                    let place = self
                        .geocoder
                        .reverse(note.lat, note.lon)
                        .await
                        .map(|p| translate(&locale, "note.sent.place", &[("place", &p)]))
                        .unwrap_or_default();
                    let text = format!(
                        "{}{}",
                        translate(
                            &locale,
                            "note.sent",
                            &[
                                ("queue_id", &note.queue_id),
                                ("osm_url", note.osm_note_url.as_deref().unwrap_or("")),
                                ("place", &place),
                            ],
                        ),
                        disclaimer(&locale)
                    );
                    if self.transport.send_dm(&node_id, &text).await {
                        self.store.mark_notified(&note.queue_id).await?;
                        delivered += 1;
                    }
                }
            } else {
                let summary = format!(
                    "{}{}",
                    translate(&locale, "notify.summary", &[("count", &notes.len().to_string())]),
                    disclaimer(&locale)
                );
                if self.transport.send_dm(&node_id, &summary).await {
                    for note in &notes {
                        self.store.mark_notified(&note.queue_id).await?;
                    }
                    delivered += notes.len() as u32;
                    self.force_admit(&node_id);
                }
            }
        }
        Ok(delivered)
    }

    /// Symmetric to [`Self::process_sent_notifications`] for notes that
    /// exhausted their retry budget.
    pub async fn process_failed_notifications(&self) -> Result<u32, GatewayError> {
        let notes = self.store.get_pending_failed_notifications().await?;
        let mut delivered = 0;
        for note in notes {
            let locale = self.store.get_user_lang(&note.node_id).await?;
            if !self.admit(&note.node_id) {
                continue;
            }
            let attempts = note
                .last_error
                .as_deref()
                .and_then(|e| e.split_whitespace().nth(1))
                .unwrap_or("3")
                .to_string();
            let text = format!(
                "{}{}",
                translate(
                    &locale,
                    "note.failed",
                    &[("queue_id", &note.queue_id), ("attempts", &attempts)],
                ),
                disclaimer(&locale)
            );
            if self.transport.send_dm(&note.node_id, &text).await {
                self.store.mark_notified(&note.queue_id).await?;
                delivered += 1;
            }
        }
        Ok(delivered)
    }

    /// Like [`Self::admit`] but consumes `count` admissions at once,
    /// returning `false` (and consuming nothing) if the ring cannot hold
    /// all of them — the caller then sends one coalesced summary instead.
    fn admit_count(&self, node_id: &str, count: usize) -> bool {
        let now = Instant::now();
        let mut guard = self.anti_spam.lock().unwrap();
        let ring = guard.entry(node_id.to_string()).or_default();
        while let Some(&front) = ring.front() {
            if now.duration_since(front) > NOTIFICATION_ANTI_SPAM_WINDOW {
                ring.pop_front();
            } else {
                break;
            }
        }
        if ring.len() + count > NOTIFICATION_ANTI_SPAM_MAX {
            return false;
        }
        for _ in 0..count {
            ring.push_back(now);
        }
        true
    }

    /// Registers one admission unconditionally, trimming expired entries
    /// first. The coalesced summary DM counts as a single admission against
    /// the per-node ring even though it was sent precisely because the ring
    /// was already saturated (spec.md §4.6).
    fn force_admit(&self, node_id: &str) {
        let now = Instant::now();
        let mut guard = self.anti_spam.lock().unwrap();
        let ring = guard.entry(node_id.to_string()).or_default();
        while let Some(&front) = ring.front() {
            if now.duration_since(front) > NOTIFICATION_ANTI_SPAM_WINDOW {
                ring.pop_front();
            } else {
                break;
            }
        }
        ring.push_back(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use tempfile::tempdir;

    async fn test_notifier() -> (Notifier, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("gateway.db")).unwrap();
        let transport = Arc::new(MockTransport::new());
        let geocoder = Arc::new(Geocoder::new(reqwest::Client::new()));
        (Notifier::new(store, transport, geocoder), dir)
    }

    #[tokio::test]
    async fn admits_up_to_the_cap_then_drops() {
        let (notifier, _dir) = test_notifier().await;
        assert!(notifier.admit("!a"));
        assert!(notifier.admit("!a"));
        assert!(notifier.admit("!a"));
        assert!(!notifier.admit("!a"));
    }

    #[tokio::test]
    async fn sent_notifications_mark_notified() {
        let (notifier, _dir) = test_notifier().await;
        let q = notifier
            .store
            .create_note("!a1b2c3d4", 4.6, -74.0, "hola", "hola")
            .await
            .unwrap();
        notifier
            .store
            .mark_note_sent(&q, 1, "https://www.openstreetmap.org/note/1")
            .await
            .unwrap();
        let delivered = notifier.process_sent_notifications().await.unwrap();
        assert_eq!(delivered, 1);
        let note = notifier.store.get_note_by_queue_id(&q).await.unwrap().unwrap();
        assert!(note.notified_sent);
    }

    #[tokio::test]
    async fn saturated_ring_coalesces_into_one_summary() {
        let (notifier, _dir) = test_notifier().await;
        for _ in 0..NOTIFICATION_ANTI_SPAM_MAX {
            notifier.admit("!a1b2c3d4");
        }
        for i in 0..3 {
            let q = notifier
                .store
                .create_note("!a1b2c3d4", 4.6, -74.0, &format!("note {i}"), &format!("note {i}"))
                .await
                .unwrap();
            notifier
                .store
                .mark_note_sent(&q, i, &format!("https://www.openstreetmap.org/note/{i}"))
                .await
                .unwrap();
        }
        let delivered = notifier.process_sent_notifications().await.unwrap();
        assert_eq!(delivered, 3);
    }
}
