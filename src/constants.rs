//! # Protocol Constants
//!
//! Named thresholds for GPS freshness, deduplication, retry, and worker
//! cadence, collected in one module the way the teacher crate collects
//! its EN 13757 constants in `constants.rs`.

use std::time::Duration;

/// A GPS fix at or below this age is considered fresh.
pub const POS_GOOD_SECONDS: f64 = 15.0;

/// A GPS fix older than this is stale and cannot back a note.
pub const POS_MAX_SECONDS: f64 = 120.0;

/// Size of a deduplication time bucket, in seconds.
pub const DEDUP_TIME_BUCKET_SECONDS: i64 = 120;

/// Coordinate tolerance for duplicate detection, in degrees.
pub const DEDUP_COORD_EPSILON: f64 = 1e-4;

/// Maximum accepted `#osmnote` body length, in UTF-8 characters.
pub const MAX_NOTE_BODY_LEN: usize = 200;

/// Sliding window for the ingress rate limiter.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Maximum admitted `#osmnote` commands per [`RATE_LIMIT_WINDOW`].
pub const RATE_LIMIT_MAX_COMMANDS: usize = 5;

/// Minimum spacing between outbound submissions to the Notes API.
pub const OSM_RATE_LIMIT_SECONDS: u64 = 3;

/// Attempts allowed before a note's retry is exhausted.
pub const OSM_MAX_RETRIES: u32 = 3;

/// Cooldown between retry attempts for the same note within a drain.
pub const OSM_RETRY_DELAY_SECONDS: u64 = 60;

/// Period of the background worker cycle.
pub const WORKER_INTERVAL: Duration = Duration::from_secs(30);

/// Anti-spam window for outbound DM notifications.
pub const NOTIFICATION_ANTI_SPAM_WINDOW: Duration = Duration::from_secs(60);

/// Maximum DMs admitted per [`NOTIFICATION_ANTI_SPAM_WINDOW`] per node.
pub const NOTIFICATION_ANTI_SPAM_MAX: usize = 3;

/// Read timeout for the Notes API POST.
pub const OSM_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Read timeout for the reverse geocoder.
pub const GEOCODER_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum spacing between reverse-geocoder requests.
pub const GEOCODER_RATE_LIMIT: Duration = Duration::from_secs(1);

/// Timeout for the `#osmstatus` Internet reachability probe.
pub const INTERNET_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for the `timedatectl status` NTP probe.
pub const NTP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Offsets smaller than this are jitter, not a clock jump (§4.7a).
pub const TIME_CORRECTION_JITTER_SECONDS: f64 = 60.0;

/// Bound on joining the worker task during shutdown.
pub const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum notes pulled per worker drain pass.
pub const WORKER_DRAIN_LIMIT: i64 = 10;

/// Maximum nodes listed by `#osmnodes`.
pub const MAX_NODES_LISTED: usize = 20;

/// Position cache rows older than this are purged by the worker loop.
pub const POSITION_MAX_AGE_SECONDS: f64 = 24.0 * 60.0 * 60.0;

/// Default number of notes listed by `#osmlist` with no argument.
pub const DEFAULT_LIST_LIMIT: i64 = 5;

/// Clamp bounds for the optional `#osmlist <n>` argument.
pub const LIST_LIMIT_BOUNDS: (i64, i64) = (1, 20);

/// Marker prepended to note text when the backing GPS fix is approximate.
pub const APPROX_POSITION_MARKER: &str = "[posición aproximada] ";

/// Dry-run mock note id returned by the Submitter instead of calling out.
pub const DRY_RUN_NOTE_ID: u64 = 999_999;

/// Base URL for constructing a note's public page from its id.
pub const OSM_NOTE_URL_BASE: &str = "https://www.openstreetmap.org/note/";

/// Well-known endpoint probed by `#osmstatus` to detect Internet reachability.
pub const INTERNET_PROBE_URL: &str = "https://www.openstreetmap.org";
