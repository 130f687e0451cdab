//! # Submitter
//!
//! Moves notes `pending -> sent` by POSTing to the remote Notes endpoint,
//! grounded on `original_source/src/gateway/osm_worker.py`'s retry/backoff
//! shape and error classification. A single shared `reqwest::Client` is
//! reused for connection pooling, the way the teacher crate's
//! `mbus/serial.rs` reuses one open handle rather than reconnecting per call.

use crate::config::Config;
use crate::constants::{
    DRY_RUN_NOTE_ID, OSM_MAX_RETRIES, OSM_NOTE_URL_BASE, OSM_RATE_LIMIT_SECONDS,
    OSM_RETRY_DELAY_SECONDS,
};
use crate::error::GatewayError;
use crate::i18n::attribution_footer;
use crate::store::models::Note;
use crate::store::Store;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Result of attempting to submit a single note.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Sent { osm_note_id: i64, osm_note_url: String },
    Retrying { attempt: u32, reason: String },
    Exhausted { reason: String },
}

#[derive(Deserialize)]
struct NotesApiResponse {
    properties: NotesApiProperties,
}

#[derive(Deserialize)]
struct NotesApiProperties {
    id: i64,
}

pub struct Submitter {
    http: reqwest::Client,
    store: Store,
    config: Arc<Config>,
    last_send: Mutex<Option<Instant>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl Submitter {
    pub fn new(http: reqwest::Client, store: Store, config: Arc<Config>) -> Self {
        Submitter {
            http,
            store,
            config,
            last_send: Mutex::new(None),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Drains up to `limit` pending notes, oldest first. Returns how many
    /// were successfully sent.
    pub async fn process_pending(&self, limit: i64) -> Result<u32, GatewayError> {
        let notes = self.store.get_pending_notes(limit).await?;
        let mut sent = 0;
        for note in notes {
            match self.submit_one(&note).await {
                Ok(SubmitOutcome::Sent { .. }) => sent += 1,
                Ok(_) => {}
                Err(e) => {
                    crate::logging::log_warn(&format!(
                        "submission for {} failed with a local fault: {e}",
                        note.queue_id
                    ));
                }
            }
        }
        Ok(sent)
    }

    /// Submits a single note, respecting the global outbound rate gate and
    /// the per-item retry budget. Never holds a lock across I/O. Used by
    /// the worker loop's drain pass, where a post-failure cooldown sleep is
    /// appropriate (spec.md §4.5).
    pub async fn submit_one(&self, note: &Note) -> Result<SubmitOutcome, GatewayError> {
        self.submit_one_inner(note, true).await
    }

    /// Like [`Self::submit_one`] but never sleeps a retry cooldown on
    /// failure. Used for the one-shot immediate attempt the orchestrator
    /// makes off the packet-callback path (spec.md §4.7): that attempt must
    /// record a failure and return promptly so the caller — itself already
    /// off the `tokio::select!` loop in a spawned task — doesn't hold the
    /// cooldown any longer than a single HTTP round trip.
    pub async fn submit_immediate(&self, note: &Note) -> Result<SubmitOutcome, GatewayError> {
        self.submit_one_inner(note, false).await
    }

    async fn submit_one_inner(&self, note: &Note, cooldown_on_failure: bool) -> Result<SubmitOutcome, GatewayError> {
        if self.config.dry_run {
            let outcome = SubmitOutcome::Sent {
                osm_note_id: DRY_RUN_NOTE_ID as i64,
                osm_note_url: format!("{OSM_NOTE_URL_BASE}{DRY_RUN_NOTE_ID}"),
            };
            self.store
                .mark_note_sent(
                    &note.queue_id,
                    DRY_RUN_NOTE_ID as i64,
                    &format!("{OSM_NOTE_URL_BASE}{DRY_RUN_NOTE_ID}"),
                )
                .await?;
            return Ok(outcome);
        }

        self.wait_for_rate_gate().await;

        let locale = self.store.get_user_lang(&note.node_id).await?;
        let body = format!("{}{}", note.text_normalized, attribution_footer(&locale));

        let result = self
            .http
            .post(&self.config.osm_api_url)
            .json(&json!({ "lat": note.lat, "lon": note.lon, "text": body }))
            .timeout(crate::constants::OSM_HTTP_TIMEOUT)
            .send()
            .await;
        self.mark_sent_now();

        let reason = match result {
            Ok(resp) if resp.status().is_success() => {
                let text = resp.text().await.unwrap_or_default();
                match serde_json::from_str::<NotesApiResponse>(&text) {
                    Ok(parsed) => {
                        let url = format!("{OSM_NOTE_URL_BASE}{}", parsed.properties.id);
                        self.store
                            .mark_note_sent(&note.queue_id, parsed.properties.id, &url)
                            .await?;
                        self.attempts.lock().unwrap().remove(&note.queue_id);
                        return Ok(SubmitOutcome::Sent {
                            osm_note_id: parsed.properties.id,
                            osm_note_url: url,
                        });
                    }
                    Err(_) => "malformed success response from Notes API".to_string(),
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                classify_http_error(status, &body)
            }
            Err(e) if e.is_timeout() => "connection timed out".to_string(),
            Err(e) => format!("connection error: {e}"),
        };

        self.record_failure(&note.queue_id, reason, cooldown_on_failure).await
    }

    /// Records a failed attempt and, if retries remain, sleeps the
    /// retry-cooldown before reporting `Retrying` — but only when
    /// `cooldown` is set. The immediate-submission path disables the sleep
    /// (spec.md §5): that cooldown belongs to the worker's drain loop, which
    /// runs well away from the packet-handling `tokio::select!`.
    async fn record_failure(
        &self,
        queue_id: &str,
        reason: String,
        cooldown: bool,
    ) -> Result<SubmitOutcome, GatewayError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry(queue_id.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };

        if attempt >= OSM_MAX_RETRIES {
            let final_reason = format!("failed after {attempt} attempts");
            self.store
                .record_note_error(queue_id, &final_reason, true)
                .await?;
            Ok(SubmitOutcome::Exhausted { reason: final_reason })
        } else {
            self.store.record_note_error(queue_id, &reason, false).await?;
            if cooldown {
                tokio::time::sleep(Duration::from_secs(OSM_RETRY_DELAY_SECONDS)).await;
            }
            Ok(SubmitOutcome::Retrying { attempt, reason })
        }
    }

    async fn wait_for_rate_gate(&self) {
        let wait = {
            let guard = self.last_send.lock().unwrap();
            guard.and_then(|last| {
                let min = Duration::from_secs(OSM_RATE_LIMIT_SECONDS);
                let elapsed = last.elapsed();
                (elapsed < min).then(|| min - elapsed)
            })
        };
        if let Some(d) = wait {
            tokio::time::sleep(d).await;
        }
    }

    fn mark_sent_now(&self) {
        *self.last_send.lock().unwrap() = Some(Instant::now());
    }
}

fn classify_http_error(status: reqwest::StatusCode, body: &str) -> String {
    match status.as_u16() {
        400 => "invalid request".to_string(),
        403 => "denied by remote (forbidden)".to_string(),
        429 => "too many requests".to_string(),
        500 => "remote server error".to_string(),
        503 => "remote service unavailable".to_string(),
        _ => extract_error_message(body),
    }
}

fn extract_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(m) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return m.to_string();
        }
        if let Some(m) = v.get("message").and_then(|m| m.as_str()) {
            return m.to_string();
        }
    }
    body.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_status_codes() {
        assert_eq!(
            classify_http_error(reqwest::StatusCode::BAD_REQUEST, ""),
            "invalid request"
        );
        assert_eq!(
            classify_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            "too many requests"
        );
        assert_eq!(
            classify_http_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, ""),
            "remote service unavailable"
        );
    }

    #[test]
    fn extracts_nested_error_message() {
        let body = r#"{"error": {"message": "note too close to another"}}"#;
        assert_eq!(extract_error_message(body), "note too close to another");
    }

    #[test]
    fn extracts_flat_message() {
        let body = r#"{"message": "bad geometry"}"#;
        assert_eq!(extract_error_message(body), "bad geometry");
    }

    #[test]
    fn falls_back_to_truncated_raw_body() {
        let body = "x".repeat(300);
        assert_eq!(extract_error_message(&body).len(), 100);
    }
}
