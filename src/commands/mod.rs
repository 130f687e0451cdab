//! # Command Parser
//!
//! Classifies inbound mesh text into the ingress result sum from spec.md
//! §9 (`Queued | Reject | Duplicate | Ignore | Reply`) instead of raising
//! exceptions for rejections, grounded on
//! `original_source/src/gateway/commands.py`'s dispatch table.

mod normalize;

use crate::config::Config;
use crate::constants::{
    DEDUP_TIME_BUCKET_SECONDS, INTERNET_PROBE_URL, LIST_LIMIT_BOUNDS, MAX_NODES_LISTED,
    MAX_NOTE_BODY_LEN, POS_GOOD_SECONDS, POS_MAX_SECONDS,
};
use crate::error::GatewayError;
use crate::i18n::translate;
use crate::position_cache::PositionCache;
use crate::rate_limiter::RateLimiter;
use crate::store::models::is_valid_coordinate;
use crate::store::Store;
use chrono::Utc;
use regex::Regex;
use std::str::FromStr;
use std::sync::Arc;

pub use normalize::normalize_text;

/// Outcome of [`CommandParser::process`].
#[derive(Debug, Clone)]
pub enum Classification {
    Ignore,
    Help,
    MoreHelp,
    Status,
    Count,
    List,
    Queue,
    Nodes,
    Lang,
    NoteQueued { queue_id: String },
    NoteReject,
    NoteDuplicate,
    NoteError,
}

/// A classification paired with the localized text to send back to the
/// originating node, if any (`Ignore` carries none).
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub classification: Classification,
    pub reply: Option<String>,
}

static NOTE_RE: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"(?i)#osm[-_]?notes?\b").unwrap());

pub struct CommandParser {
    store: Store,
    positions: Arc<PositionCache>,
    rate_limiter: Arc<RateLimiter>,
    config: Arc<Config>,
    http: reqwest::Client,
}

impl CommandParser {
    pub fn new(
        store: Store,
        positions: Arc<PositionCache>,
        rate_limiter: Arc<RateLimiter>,
        config: Arc<Config>,
        http: reqwest::Client,
    ) -> Self {
        CommandParser {
            store,
            positions,
            rate_limiter,
            config,
            http,
        }
    }

    /// Classifies one inbound text packet. `device_uptime` is the seconds
    /// the sending device has been powered, when the transport supplies it.
    pub async fn process(
        &self,
        node_id: &str,
        text: &str,
        device_uptime: Option<f64>,
    ) -> Result<CommandOutcome, GatewayError> {
        let locale = self.store.get_user_lang(node_id).await?;
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();

        if lower == "#osmhelp" {
            return Ok(reply(Classification::Help, &locale, "command.help", &[]));
        }
        if lower == "#osmmorehelp" {
            return Ok(reply(Classification::MoreHelp, &locale, "command.morehelp", &[]));
        }
        if lower == "#osmstatus" {
            return Ok(self.handle_status(node_id, &locale).await?);
        }
        if lower == "#osmqueue" {
            let count = self.store.total_queue_size().await?;
            return Ok(reply(
                Classification::Queue,
                &locale,
                "command.queue",
                &[("count", &count.to_string())],
            ));
        }
        if lower == "#osmnodes" {
            return Ok(self.handle_nodes(&locale).await?);
        }
        if lower.starts_with("#osmcount") {
            return Ok(self.handle_count(node_id, &locale).await?);
        }
        if lower.starts_with("#osmlist") {
            let arg = lower.trim_start_matches("#osmlist").trim();
            let limit = parse_list_limit(arg);
            return Ok(self.handle_list(node_id, &locale, limit).await?);
        }
        if lower.starts_with("#osmlang") {
            let arg = lower.trim_start_matches("#osmlang").trim();
            return Ok(self.handle_lang(node_id, &locale, arg).await?);
        }
        if let Some(m) = NOTE_RE.find(trimmed) {
            let body = trimmed[m.end()..].trim();
            return Ok(self.handle_note(node_id, body, &locale, device_uptime).await?);
        }

        Ok(CommandOutcome {
            classification: Classification::Ignore,
            reply: None,
        })
    }

    async fn handle_status(&self, node_id: &str, locale: &str) -> Result<CommandOutcome, GatewayError> {
        let queue = self.store.total_queue_size().await?;
        let internet_ok = self.probe_internet().await;
        let header = translate(locale, "command.status.header", &[]);
        let internet_line = translate(
            locale,
            if internet_ok {
                "command.status.internet_ok"
            } else {
                "command.status.internet_down"
            },
            &[],
        );
        let queue_line = translate(locale, "command.status.queue", &[("count", &queue.to_string())]);
        let text = format!("{header}\n{internet_line}\n{queue_line}{}", crate::i18n::disclaimer(locale));
        let _ = node_id;
        Ok(CommandOutcome {
            classification: Classification::Status,
            reply: Some(text),
        })
    }

    async fn probe_internet(&self) -> bool {
        self.http
            .get(INTERNET_PROBE_URL)
            .timeout(crate::constants::INTERNET_PROBE_TIMEOUT)
            .send()
            .await
            .map(|r| r.status().is_success() || r.status().is_redirection())
            .unwrap_or(false)
    }

    async fn handle_count(&self, node_id: &str, locale: &str) -> Result<CommandOutcome, GatewayError> {
        let tz = chrono_tz::Tz::from_str(&self.config.tz).unwrap_or(chrono_tz::Tz::UTC);
        let stats = self.store.node_stats(node_id, tz).await?;
        Ok(reply(
            Classification::Count,
            locale,
            "command.count",
            &[
                ("total", &stats.total.to_string()),
                ("today", &stats.today.to_string()),
                ("queue", &stats.queue.to_string()),
            ],
        ))
    }

    async fn handle_list(
        &self,
        node_id: &str,
        locale: &str,
        limit: i64,
    ) -> Result<CommandOutcome, GatewayError> {
        let notes = self.store.list_node_notes(node_id, limit).await?;
        if notes.is_empty() {
            return Ok(reply(Classification::List, locale, "command.list.empty", &[]));
        }
        let mut lines = vec![translate(locale, "command.list.header", &[])];
        for note in notes {
            lines.push(translate(
                locale,
                "command.list.item",
                &[
                    ("queue_id", &note.queue_id),
                    ("status", note.status.as_str()),
                    ("text", &note.text_normalized),
                ],
            ));
        }
        let text = format!("{}{}", lines.join("\n"), crate::i18n::disclaimer(locale));
        Ok(CommandOutcome {
            classification: Classification::List,
            reply: Some(text),
        })
    }

    async fn handle_nodes(&self, locale: &str) -> Result<CommandOutcome, GatewayError> {
        let nodes = self.store.list_recent_positions(MAX_NODES_LISTED).await?;
        if nodes.is_empty() {
            return Ok(reply(Classification::Nodes, locale, "command.nodes.empty", &[]));
        }
        let now = Utc::now().timestamp() as f64;
        let mut lines = vec![translate(locale, "command.nodes.header", &[])];
        for (node, row) in nodes {
            let age = (now - row.received_at_unix).max(0.0) as i64;
            lines.push(translate(
                locale,
                "command.nodes.item",
                &[
                    ("node", &node),
                    ("lat", &format!("{:.5}", row.lat)),
                    ("lon", &format!("{:.5}", row.lon)),
                    ("age", &age.to_string()),
                    ("seen", &row.seen_count.to_string()),
                ],
            ));
        }
        let text = format!("{}{}", lines.join("\n"), crate::i18n::disclaimer(locale));
        Ok(CommandOutcome {
            classification: Classification::Nodes,
            reply: Some(text),
        })
    }

    async fn handle_lang(
        &self,
        node_id: &str,
        locale: &str,
        arg: &str,
    ) -> Result<CommandOutcome, GatewayError> {
        if self.store.set_user_lang(node_id, arg).await? {
            return Ok(reply(Classification::Lang, arg, "command.lang.set", &[]));
        }
        Ok(reply(Classification::Lang, locale, "command.lang.invalid", &[]))
    }

    async fn handle_note(
        &self,
        node_id: &str,
        body: &str,
        locale: &str,
        device_uptime: Option<f64>,
    ) -> Result<CommandOutcome, GatewayError> {
        if !self.rate_limiter.allow(node_id) {
            return Ok(reply(Classification::NoteReject, locale, "note.reject.rate_limit", &[]));
        }
        if body.is_empty() {
            return Ok(reply(Classification::NoteReject, locale, "note.reject.empty_body", &[]));
        }
        if body.chars().count() > MAX_NOTE_BODY_LEN {
            return Ok(reply(Classification::NoteReject, locale, "note.reject.oversized_body", &[]));
        }

        let mut text_norm = normalize_text(body);

        let (lat, lon) = if self.config.gps_validation_disabled {
            self.config.gps_fallback
        } else {
            match self.positions.get(node_id).await {
                None => {
                    return Ok(reply_owned(
                        Classification::NoteReject,
                        locale,
                        no_gps_reply(locale, device_uptime),
                    ));
                }
                Some(pos) => {
                    if !is_valid_coordinate(pos.lat, pos.lon) {
                        return Ok(reply(
                            Classification::NoteReject,
                            locale,
                            "note.reject.invalid_coords",
                            &[],
                        ));
                    }
                    let age = (Utc::now().timestamp() as f64) - pos.received_at_unix;
                    if age > POS_MAX_SECONDS {
                        return Ok(reply(
                            Classification::NoteReject,
                            locale,
                            "note.reject.stale_gps",
                            &[],
                        ));
                    }
                    if age > POS_GOOD_SECONDS {
                        text_norm = format!("{}{}", crate::constants::APPROX_POSITION_MARKER, text_norm);
                    }
                    (pos.lat, pos.lon)
                }
            }
        };

        let bucket = Utc::now().timestamp() / DEDUP_TIME_BUCKET_SECONDS;
        if self
            .store
            .check_duplicate(node_id, &text_norm, lat, lon, bucket)
            .await?
        {
            return Ok(reply(Classification::NoteDuplicate, locale, "note.duplicate", &[]));
        }

        let queue_id = self
            .store
            .create_note(node_id, lat, lon, body, &text_norm)
            .await?;
        Ok(reply_owned(
            Classification::NoteQueued {
                queue_id: queue_id.clone(),
            },
            locale,
            translate(locale, "note.queued", &[("queue_id", &queue_id)]),
        ))
    }
}

fn no_gps_reply(locale: &str, device_uptime: Option<f64>) -> String {
    if let Some(uptime) = device_uptime {
        if uptime < 120.0 {
            let seconds = 60.0 - uptime;
            if seconds > 0.0 {
                return translate(
                    locale,
                    "note.reject.no_gps_wait",
                    &[("seconds", &format!("{:.0}", seconds))],
                );
            }
        }
    }
    translate(locale, "note.reject.no_gps", &[])
}

fn parse_list_limit(arg: &str) -> i64 {
    let (min, max) = LIST_LIMIT_BOUNDS;
    arg.parse::<i64>()
        .map(|n| n.clamp(min, max))
        .unwrap_or(crate::constants::DEFAULT_LIST_LIMIT)
}

fn reply(classification: Classification, locale: &str, key: &str, params: &[(&str, &str)]) -> CommandOutcome {
    let text = format!("{}{}", translate(locale, key, params), crate::i18n::disclaimer(locale));
    CommandOutcome {
        classification,
        reply: Some(text),
    }
}

fn reply_owned(classification: Classification, locale: &str, body: String) -> CommandOutcome {
    let text = format!("{body}{}", crate::i18n::disclaimer(locale));
    CommandOutcome {
        classification,
        reply: Some(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_regex_respects_word_boundary() {
        assert!(!NOTE_RE.is_match("#osmnotetest"));
        assert!(NOTE_RE.is_match("#osmnote hello"));
        assert!(NOTE_RE.is_match("#osmnotes hello"));
        assert!(NOTE_RE.is_match("#osm-note hello"));
        assert!(NOTE_RE.is_match("#osm_notes hello"));
        assert!(NOTE_RE.is_match("#OSMNOTE hello"));
    }

    #[test]
    fn list_limit_clamps_to_bounds() {
        assert_eq!(parse_list_limit(""), 5);
        assert_eq!(parse_list_limit("0"), 1);
        assert_eq!(parse_list_limit("999"), 20);
        assert_eq!(parse_list_limit("7"), 7);
        assert_eq!(parse_list_limit("garbage"), 5);
    }

    #[test]
    fn no_gps_reply_uses_wait_message_when_booting() {
        let msg = no_gps_reply("en", Some(30.0));
        assert!(msg.contains("30"));
        let msg = no_gps_reply("en", Some(200.0));
        assert!(msg.contains("recent GPS"));
        let msg = no_gps_reply("en", None);
        assert!(msg.contains("recent GPS"));
    }
}
