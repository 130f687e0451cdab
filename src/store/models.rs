//! Row types persisted by the [`super::Store`].

use chrono::{DateTime, Utc};

/// Lifecycle state of a [`Note`] (spec.md §3, invariant I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    Pending,
    Sent,
}

impl NoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStatus::Pending => "pending",
            NoteStatus::Sent => "sent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NoteStatus::Pending),
            "sent" => Some(NoteStatus::Sent),
            _ => None,
        }
    }
}

/// A queued (or already-submitted) mapping note.
#[derive(Debug, Clone)]
pub struct Note {
    pub queue_id: String,
    pub node_id: String,
    pub created_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub text_original: String,
    pub text_normalized: String,
    pub status: NoteStatus,
    pub osm_note_id: Option<i64>,
    pub osm_note_url: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub notified_sent: bool,
}

/// A node's latest GPS fix, as persisted in the write-through position cache.
#[derive(Debug, Clone, Copy)]
pub struct PositionRow {
    pub lat: f64,
    pub lon: f64,
    pub received_at_unix: f64,
    pub seen_count: i64,
}

/// Aggregate counters returned by `#osmcount`/`#osmqueue`/`#osmstatus`.
#[derive(Debug, Clone, Copy)]
pub struct NodeStats {
    pub total: i64,
    pub today: i64,
    pub queue: i64,
}

/// Validates lat/lon per spec.md §3 invariant I4: in-range and not the origin.
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) && !(lat == 0.0 && lon == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_origin() {
        assert!(!is_valid_coordinate(0.0, 0.0));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, 181.0));
        assert!(!is_valid_coordinate(-91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, -181.0));
    }

    #[test]
    fn accepts_valid_coordinate() {
        assert!(is_valid_coordinate(4.6097, -74.0817));
    }

    #[test]
    fn status_round_trips_through_string() {
        assert_eq!(NoteStatus::parse("pending").unwrap().as_str(), "pending");
        assert_eq!(NoteStatus::parse("sent").unwrap().as_str(), "sent");
        assert!(NoteStatus::parse("bogus").is_none());
    }
}
