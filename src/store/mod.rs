//! # Store
//!
//! Durable relational persistence for notes, positions, user preferences,
//! and singleton system state (spec.md §4.1). Backed by SQLite through
//! `rusqlite`, configured for durability across power loss
//! (`journal_mode=WAL`, `synchronous=FULL`) the way
//! `original_source/src/gateway/database.py` configures its connection.
//!
//! A single physical connection is guarded by a `tokio::sync::Mutex` so
//! every logical operation below is its own transaction and concurrent
//! callers (the packet callback, the worker loop) serialize cleanly
//! without a connection pool — see SPEC_FULL.md §4.1 for why a pool was
//! considered and rejected.

pub mod models;

use crate::error::GatewayError;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use models::{is_valid_coordinate, NodeStats, Note, NoteStatus, PositionRow};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if absent) the database at `path` and applies the schema.
    pub fn open(path: &Path) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.pragma_update(None, "wal_autocheckpoint", 1000)?;
        Self::init_schema(&conn)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), GatewayError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                node_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                text_original TEXT NOT NULL,
                text_normalized TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                osm_note_id INTEGER,
                osm_note_url TEXT,
                sent_at TEXT,
                last_error TEXT,
                notified_sent INTEGER NOT NULL DEFAULT 0,
                retries_exhausted INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_notes_node_id ON notes(node_id);
            CREATE INDEX IF NOT EXISTS idx_notes_status ON notes(status);
            CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at);
            CREATE INDEX IF NOT EXISTS idx_notes_node_created ON notes(node_id, created_at);

            CREATE TABLE IF NOT EXISTS position_cache (
                node_id TEXT PRIMARY KEY,
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                received_at REAL NOT NULL,
                seen_count INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS user_preferences (
                node_id TEXT PRIMARY KEY,
                language TEXT NOT NULL DEFAULT 'es'
            );

            CREATE TABLE IF NOT EXISTS system_state (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn queue_id_of(id: i64) -> String {
        format!("Q-{id:04}")
    }

    fn parse_queue_id(queue_id: &str) -> Option<i64> {
        queue_id.strip_prefix("Q-")?.parse::<i64>().ok()
    }

    /// Creates a pending note and returns its display queue id (e.g. `Q-0001`).
    ///
    /// The numeric suffix is the row's `AUTOINCREMENT` id, so concurrent
    /// inserts can never collide (spec.md §9 REDESIGN FLAG).
    pub async fn create_note(
        &self,
        node_id: &str,
        lat: f64,
        lon: f64,
        text_original: &str,
        text_normalized: &str,
    ) -> Result<String, GatewayError> {
        debug_assert!(is_valid_coordinate(lat, lon));
        let conn = self.conn.lock().await;
        let now = Utc::now().format(TIMESTAMP_FMT).to_string();
        conn.execute(
            "INSERT INTO notes (node_id, created_at, lat, lon, text_original, text_normalized, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending')",
            params![node_id, now, lat, lon, text_original, text_normalized],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Self::queue_id_of(id))
    }

    /// Pending notes eligible for submission, oldest first. Notes that
    /// already exhausted their retry budget are excluded — they wait for
    /// operator intervention, not the next drain (spec.md §4.5).
    pub async fn get_pending_notes(&self, limit: i64) -> Result<Vec<Note>, GatewayError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, node_id, created_at, lat, lon, text_original, text_normalized, status,
                    osm_note_id, osm_note_url, sent_at, last_error, notified_sent
             FROM notes WHERE status = 'pending' AND retries_exhausted = 0
             ORDER BY created_at ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn get_note_by_queue_id(&self, queue_id: &str) -> Result<Option<Note>, GatewayError> {
        let Some(id) = Self::parse_queue_id(queue_id) else {
            return Ok(None);
        };
        let conn = self.conn.lock().await;
        let note = conn
            .query_row(
                "SELECT id, node_id, created_at, lat, lon, text_original, text_normalized, status,
                        osm_note_id, osm_note_url, sent_at, last_error, notified_sent
                 FROM notes WHERE id = ?1",
                params![id],
                row_to_note,
            )
            .optional()?;
        Ok(note)
    }

    /// Transitions a note `pending -> sent` (invariant I2: at most once).
    pub async fn mark_note_sent(
        &self,
        queue_id: &str,
        osm_note_id: i64,
        osm_note_url: &str,
    ) -> Result<(), GatewayError> {
        let Some(id) = Self::parse_queue_id(queue_id) else {
            return Ok(());
        };
        let conn = self.conn.lock().await;
        let now = Utc::now().format(TIMESTAMP_FMT).to_string();
        conn.execute(
            "UPDATE notes SET status = 'sent', osm_note_id = ?1, osm_note_url = ?2, sent_at = ?3
             WHERE id = ?4 AND status = 'pending'",
            params![osm_note_id, osm_note_url, now, id],
        )?;
        Ok(())
    }

    pub async fn record_note_error(
        &self,
        queue_id: &str,
        error: &str,
        retries_exhausted: bool,
    ) -> Result<(), GatewayError> {
        let Some(id) = Self::parse_queue_id(queue_id) else {
            return Ok(());
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE notes SET last_error = ?1, retries_exhausted = ?2 WHERE id = ?3",
            params![error, retries_exhausted as i64, id],
        )?;
        Ok(())
    }

    /// Marks a note notified (invariant I3: at most once, set by caller's discretion).
    pub async fn mark_notified(&self, queue_id: &str) -> Result<(), GatewayError> {
        let Some(id) = Self::parse_queue_id(queue_id) else {
            return Ok(());
        };
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE notes SET notified_sent = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Duplicate check per spec.md §4.1: same node, same normalized text,
    /// coordinates within `DEDUP_COORD_EPSILON`, and same time bucket.
    pub async fn check_duplicate(
        &self,
        node_id: &str,
        text_normalized: &str,
        lat: f64,
        lon: f64,
        bucket: i64,
    ) -> Result<bool, GatewayError> {
        use crate::constants::{DEDUP_COORD_EPSILON, DEDUP_TIME_BUCKET_SECONDS};
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes
             WHERE node_id = ?1
               AND text_normalized = ?2
               AND ABS(lat - ?3) < ?4
               AND ABS(lon - ?5) < ?4
               AND CAST(strftime('%s', created_at) AS INTEGER) / ?6 = ?7",
            params![
                node_id,
                text_normalized,
                lat,
                DEDUP_COORD_EPSILON,
                lon,
                DEDUP_TIME_BUCKET_SECONDS,
                bucket
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Computes total/today/queue counters for a node, converting the
    /// naively-UTC `created_at` column into `tz` for the "today" bucket.
    pub async fn node_stats(&self, node_id: &str, tz: Tz) -> Result<NodeStats, GatewayError> {
        let conn = self.conn.lock().await;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE node_id = ?1",
            params![node_id],
            |row| row.get(0),
        )?;
        let queue: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE node_id = ?1 AND status = 'pending'",
            params![node_id],
            |row| row.get(0),
        )?;

        let today_local = Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();
        let mut stmt = conn.prepare("SELECT created_at FROM notes WHERE node_id = ?1")?;
        let timestamps: Vec<String> = stmt
            .query_map(params![node_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let today = timestamps
            .iter()
            .filter(|ts| {
                NaiveDateTime::parse_from_str(ts, TIMESTAMP_FMT)
                    .ok()
                    .map(|naive| {
                        let utc = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
                        utc.with_timezone(&tz).format("%Y-%m-%d").to_string() == today_local
                    })
                    .unwrap_or(false)
            })
            .count() as i64;

        Ok(NodeStats { total, today, queue })
    }

    /// Count of notes that transitioned to `sent` "today" in `tz`, for the
    /// daily broadcast (spec.md §4.7).
    pub async fn total_sent_today(&self, tz: Tz) -> Result<i64, GatewayError> {
        let conn = self.conn.lock().await;
        let today_local = Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();
        let mut stmt = conn.prepare("SELECT sent_at FROM notes WHERE status = 'sent' AND sent_at IS NOT NULL")?;
        let timestamps: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let count = timestamps
            .iter()
            .filter(|ts| {
                NaiveDateTime::parse_from_str(ts, TIMESTAMP_FMT)
                    .ok()
                    .map(|naive| {
                        let utc = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
                        utc.with_timezone(&tz).format("%Y-%m-%d").to_string() == today_local
                    })
                    .unwrap_or(false)
            })
            .count() as i64;
        Ok(count)
    }

    pub async fn list_node_notes(
        &self,
        node_id: &str,
        limit: i64,
    ) -> Result<Vec<Note>, GatewayError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, node_id, created_at, lat, lon, text_original, text_normalized, status,
                    osm_note_id, osm_note_url, sent_at, last_error, notified_sent
             FROM notes WHERE node_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![node_id, limit], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn total_queue_size(&self) -> Result<i64, GatewayError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Notes sent but not yet notified (spec.md §4.6 `processSentNotifications`).
    pub async fn get_pending_sent_notifications(&self) -> Result<Vec<Note>, GatewayError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, node_id, created_at, lat, lon, text_original, text_normalized, status,
                    osm_note_id, osm_note_url, sent_at, last_error, notified_sent
             FROM notes WHERE status = 'sent' AND notified_sent = 0 ORDER BY sent_at ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Notes that exhausted their retry budget and still need a failure DM.
    pub async fn get_pending_failed_notifications(&self) -> Result<Vec<Note>, GatewayError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, node_id, created_at, lat, lon, text_original, text_normalized, status,
                    osm_note_id, osm_note_url, sent_at, last_error, notified_sent
             FROM notes WHERE retries_exhausted = 1 AND notified_sent = 0 ORDER BY created_at ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub async fn upsert_position(
        &self,
        node_id: &str,
        lat: f64,
        lon: f64,
        received_at_unix: f64,
    ) -> Result<(), GatewayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO position_cache (node_id, lat, lon, received_at, seen_count)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(node_id) DO UPDATE SET
                lat = excluded.lat,
                lon = excluded.lon,
                received_at = excluded.received_at,
                seen_count = seen_count + 1",
            params![node_id, lat, lon, received_at_unix],
        )?;
        Ok(())
    }

    pub async fn get_position(&self, node_id: &str) -> Result<Option<PositionRow>, GatewayError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT lat, lon, received_at, seen_count FROM position_cache WHERE node_id = ?1",
                params![node_id],
                |row| {
                    Ok(PositionRow {
                        lat: row.get(0)?,
                        lon: row.get(1)?,
                        received_at_unix: row.get(2)?,
                        seen_count: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub async fn list_all_positions(&self) -> Result<Vec<(String, PositionRow)>, GatewayError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT node_id, lat, lon, received_at, seen_count FROM position_cache")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    PositionRow {
                        lat: row.get(1)?,
                        lon: row.get(2)?,
                        received_at_unix: row.get(3)?,
                        seen_count: row.get(4)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Lists positions ordered most-recent-first, for `#osmnodes`.
    pub async fn list_recent_positions(
        &self,
        limit: usize,
    ) -> Result<Vec<(String, PositionRow)>, GatewayError> {
        let mut all = self.list_all_positions().await?;
        all.sort_by(|a, b| b.1.received_at_unix.partial_cmp(&a.1.received_at_unix).unwrap());
        all.truncate(limit);
        Ok(all)
    }

    pub async fn purge_positions_older_than(&self, max_age_seconds: f64) -> Result<u64, GatewayError> {
        let conn = self.conn.lock().await;
        let cutoff = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64()
            - max_age_seconds;
        let changed = conn.execute(
            "DELETE FROM position_cache WHERE received_at < ?1",
            params![cutoff],
        )?;
        Ok(changed as u64)
    }

    pub async fn get_user_lang(&self, node_id: &str) -> Result<String, GatewayError> {
        let conn = self.conn.lock().await;
        let lang = conn
            .query_row(
                "SELECT language FROM user_preferences WHERE node_id = ?1",
                params![node_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(lang.unwrap_or_else(|| "es".to_string()))
    }

    pub async fn set_user_lang(&self, node_id: &str, language: &str) -> Result<bool, GatewayError> {
        if language != "es" && language != "en" {
            return Ok(false);
        }
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO user_preferences (node_id, language) VALUES (?1, ?2)
             ON CONFLICT(node_id) DO UPDATE SET language = excluded.language",
            params![node_id, language],
        )?;
        Ok(true)
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, GatewayError> {
        let conn = self.conn.lock().await;
        let value = conn
            .query_row(
                "SELECT value FROM system_state WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<(), GatewayError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO system_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub async fn get_last_broadcast_date(&self) -> Result<Option<String>, GatewayError> {
        self.get_state("last_broadcast_date").await
    }

    pub async fn set_last_broadcast_date(&self, date: &str) -> Result<(), GatewayError> {
        self.set_state("last_broadcast_date", date).await
    }

    pub async fn get_startup_timestamp(&self) -> Result<Option<f64>, GatewayError> {
        Ok(self
            .get_state("startup_timestamp")
            .await?
            .and_then(|v| v.parse::<f64>().ok()))
    }

    pub async fn set_startup_timestamp(&self, timestamp: f64) -> Result<(), GatewayError> {
        self.set_state("startup_timestamp", &timestamp.to_string())
            .await
    }

    pub async fn get_time_correction_applied(&self) -> Result<bool, GatewayError> {
        Ok(self.get_state("time_correction_applied").await? == Some("true".to_string()))
    }

    pub async fn set_time_correction_applied(&self, applied: bool) -> Result<(), GatewayError> {
        self.set_state(
            "time_correction_applied",
            if applied { "true" } else { "false" },
        )
        .await
    }

    /// Shifts `created_at` for pending notes only; sent notes keep the
    /// timestamp the remote API observed (spec.md §4.7a).
    pub async fn adjust_pending_created_at_by(&self, offset_seconds: f64) -> Result<u64, GatewayError> {
        if offset_seconds.abs() < 1.0 {
            return Ok(0);
        }
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE notes SET created_at = datetime(created_at, ?1 || ' seconds') WHERE status = 'pending'",
            params![offset_seconds],
        )?;
        Ok(changed as u64)
    }
}

fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    let id: i64 = row.get(0)?;
    let created_at_str: String = row.get(2)?;
    let sent_at_str: Option<String> = row.get(10)?;
    let status_str: String = row.get(7)?;
    Ok(Note {
        queue_id: Store::queue_id_of(id),
        node_id: row.get(1)?,
        created_at: parse_timestamp(&created_at_str),
        lat: row.get(3)?,
        lon: row.get(4)?,
        text_original: row.get(5)?,
        text_normalized: row.get(6)?,
        status: NoteStatus::parse(&status_str).unwrap_or(NoteStatus::Pending),
        osm_note_id: row.get(8)?,
        osm_note_url: row.get(9)?,
        sent_at: sent_at_str.as_deref().map(parse_timestamp),
        last_error: row.get(11)?,
        notified_sent: row.get::<_, i64>(12)? != 0,
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FMT)
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_store() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("gateway.db")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_note_assigns_sequential_queue_ids() {
        let (store, _dir) = test_store().await;
        let q1 = store
            .create_note("!a1b2c3d4", 4.6, -74.0, "hola", "hola")
            .await
            .unwrap();
        let q2 = store
            .create_note("!a1b2c3d4", 4.6, -74.0, "adios", "adios")
            .await
            .unwrap();
        assert_eq!(q1, "Q-0001");
        assert_eq!(q2, "Q-0002");
    }

    #[tokio::test]
    async fn mark_note_sent_is_one_shot() {
        let (store, _dir) = test_store().await;
        let q = store
            .create_note("!a1b2c3d4", 4.6, -74.0, "hola", "hola")
            .await
            .unwrap();
        store.mark_note_sent(&q, 42, "https://example/42").await.unwrap();
        let note = store.get_note_by_queue_id(&q).await.unwrap().unwrap();
        assert!(matches!(note.status, NoteStatus::Sent));

        // Re-marking sent on an already-sent note must not resurrect it or change its id.
        store.mark_note_sent(&q, 99, "https://example/99").await.unwrap();
        let note = store.get_note_by_queue_id(&q).await.unwrap().unwrap();
        assert_eq!(note.osm_note_id, Some(42));
    }

    #[tokio::test]
    async fn check_duplicate_matches_same_bucket_only() {
        let (store, _dir) = test_store().await;
        store
            .create_note("!a1b2c3d4", 4.6, -74.0, "hola", "hola")
            .await
            .unwrap();
        let bucket = chrono::Utc::now().timestamp() / 120;
        let dup = store
            .check_duplicate("!a1b2c3d4", "hola", 4.6, -74.0, bucket)
            .await
            .unwrap();
        assert!(dup);
        let not_dup = store
            .check_duplicate("!a1b2c3d4", "hola", 4.6, -74.0, bucket + 5)
            .await
            .unwrap();
        assert!(!not_dup);
    }

    #[tokio::test]
    async fn adjust_pending_skips_sent_rows() {
        let (store, _dir) = test_store().await;
        let q1 = store
            .create_note("!a1b2c3d4", 4.6, -74.0, "a", "a")
            .await
            .unwrap();
        let q2 = store
            .create_note("!a1b2c3d4", 4.6, -74.0, "b", "b")
            .await
            .unwrap();
        store.mark_note_sent(&q2, 1, "https://example/1").await.unwrap();

        let before_sent = store.get_note_by_queue_id(&q2).await.unwrap().unwrap();
        let adjusted = store.adjust_pending_created_at_by(7200.0).await.unwrap();
        assert_eq!(adjusted, 1);

        let after_sent = store.get_note_by_queue_id(&q2).await.unwrap().unwrap();
        assert_eq!(before_sent.created_at, after_sent.created_at);

        let pending = store.get_note_by_queue_id(&q1).await.unwrap().unwrap();
        assert!(pending.created_at > before_sent.created_at - chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn small_offsets_are_a_no_op() {
        let (store, _dir) = test_store().await;
        let adjusted = store.adjust_pending_created_at_by(0.5).await.unwrap();
        assert_eq!(adjusted, 0);
    }

    #[tokio::test]
    async fn user_language_round_trips() {
        let (store, _dir) = test_store().await;
        assert_eq!(store.get_user_lang("!a1b2c3d4").await.unwrap(), "es");
        assert!(store.set_user_lang("!a1b2c3d4", "en").await.unwrap());
        assert_eq!(store.get_user_lang("!a1b2c3d4").await.unwrap(), "en");
        assert!(!store.set_user_lang("!a1b2c3d4", "fr").await.unwrap());
    }

    #[tokio::test]
    async fn time_correction_flag_round_trips() {
        let (store, _dir) = test_store().await;
        assert!(!store.get_time_correction_applied().await.unwrap());
        store.set_time_correction_applied(true).await.unwrap();
        assert!(store.get_time_correction_applied().await.unwrap());
    }
}
