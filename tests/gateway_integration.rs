//! Integration tests wiring Store, PositionCache, RateLimiter, CommandParser,
//! Submitter, and Notifier together, exercising the boundary scenarios from
//! spec.md §8.

use osmnotes_gateway::commands::{Classification, CommandParser};
use osmnotes_gateway::config::Config;
use osmnotes_gateway::constants::DRY_RUN_NOTE_ID;
use osmnotes_gateway::position_cache::PositionCache;
use osmnotes_gateway::rate_limiter::RateLimiter;
use osmnotes_gateway::store::Store;
use osmnotes_gateway::submitter::{SubmitOutcome, Submitter};
use std::sync::Arc;
use tempfile::tempdir;

fn dry_run_config() -> Arc<Config> {
    Arc::new(Config {
        data_dir: std::env::temp_dir(),
        serial_port: "/dev/null".to_string(),
        dry_run: true,
        gps_validation_disabled: false,
        gps_fallback: (4.6097, -74.0817),
        log_level: "INFO".to_string(),
        tz: "America/Bogota".to_string(),
        daily_broadcast_enabled: false,
        language: "es".to_string(),
        osm_api_url: "https://api.openstreetmap.org/api/0.6/notes.json".to_string(),
    })
}

async fn harness() -> (Store, Arc<PositionCache>, CommandParser, Submitter, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("gateway.db")).unwrap();
    let positions = PositionCache::new(store.clone());
    let rate_limiter = Arc::new(RateLimiter::default());
    let config = dry_run_config();
    let http = reqwest::Client::new();
    let parser = CommandParser::new(store.clone(), positions.clone(), rate_limiter, config.clone(), http.clone());
    let submitter = Submitter::new(http, store.clone(), config);
    (store, positions, parser, submitter, dir)
}

#[tokio::test]
async fn word_boundary_rejects_lookalike_command() {
    let (_store, _positions, parser, _submitter, _dir) = harness().await;
    let outcome = parser.process("!a1b2c3d4", "#osmnotetest", None).await.unwrap();
    assert!(matches!(outcome.classification, Classification::Ignore));
}

#[tokio::test]
async fn fresh_gps_note_is_queued_as_q0001() {
    let (_store, positions, parser, _submitter, _dir) = harness().await;
    positions.update("!a1b2c3d4", 4.6097, -74.0817).await.unwrap();
    let outcome = parser.process("!a1b2c3d4", "#osmnote test", None).await.unwrap();
    match outcome.classification {
        Classification::NoteQueued { queue_id } => assert_eq!(queue_id, "Q-0001"),
        other => panic!("expected NoteQueued, got {other:?}"),
    }
}

#[tokio::test]
async fn stale_position_rejects_with_too_old_message() {
    let (store, positions, parser, _submitter, _dir) = harness().await;
    positions.update("!a1b2c3d4", 4.6097, -74.0817).await.unwrap();
    // Force the cached fix to look 130s old without waiting in real time.
    store
        .upsert_position("!a1b2c3d4", 4.6097, -74.0817, (chrono::Utc::now().timestamp() - 130) as f64)
        .await
        .unwrap();
    positions.rehydrate().await.unwrap();

    let outcome = parser.process("!a1b2c3d4", "#osmnote hola", None).await.unwrap();
    assert!(matches!(outcome.classification, Classification::NoteReject));
    assert!(outcome.reply.unwrap().contains("antigua"));
}

#[tokio::test]
async fn approximate_fix_prefixes_normalized_text() {
    let (store, positions, parser, _submitter, _dir) = harness().await;
    store
        .upsert_position("!a1b2c3d4", 4.6097, -74.0817, (chrono::Utc::now().timestamp() - 30) as f64)
        .await
        .unwrap();
    positions.rehydrate().await.unwrap();

    let outcome = parser.process("!a1b2c3d4", "#osmnote hello", None).await.unwrap();
    let queue_id = match outcome.classification {
        Classification::NoteQueued { queue_id } => queue_id,
        other => panic!("expected NoteQueued, got {other:?}"),
    };
    let note = store.get_note_by_queue_id(&queue_id).await.unwrap().unwrap();
    assert!(note.text_normalized.starts_with("[posición aproximada] "));
}

#[tokio::test]
async fn duplicate_body_in_same_bucket_is_rejected_once() {
    let (store, positions, parser, _submitter, _dir) = harness().await;
    positions.update("!a1b2c3d4", 4.6097, -74.0817).await.unwrap();

    let first = parser.process("!a1b2c3d4", "#osmnote tree down", None).await.unwrap();
    assert!(matches!(first.classification, Classification::NoteQueued { .. }));

    let second = parser.process("!a1b2c3d4", "#osmnote tree down", None).await.unwrap();
    assert!(matches!(second.classification, Classification::NoteDuplicate));

    assert_eq!(store.total_queue_size().await.unwrap(), 1);
}

#[tokio::test]
async fn rate_limit_admits_five_then_rejects_sixth_but_help_still_works() {
    let (_store, positions, parser, _submitter, _dir) = harness().await;
    positions.update("!a1b2c3d4", 4.6097, -74.0817).await.unwrap();

    for i in 0..5 {
        let outcome = parser
            .process("!a1b2c3d4", &format!("#osmnote note {i}"), None)
            .await
            .unwrap();
        assert!(matches!(outcome.classification, Classification::NoteQueued { .. }));
    }
    let sixth = parser.process("!a1b2c3d4", "#osmnote note 5", None).await.unwrap();
    assert!(matches!(sixth.classification, Classification::NoteReject));

    let help = parser.process("!a1b2c3d4", "#osmhelp", None).await.unwrap();
    assert!(matches!(help.classification, Classification::Help));
}

#[tokio::test]
async fn dry_run_submission_yields_deterministic_mock_url() {
    let (store, positions, parser, submitter, _dir) = harness().await;
    positions.update("!a1b2c3d4", 4.6097, -74.0817).await.unwrap();

    let outcome = parser.process("!a1b2c3d4", "#osmnote tree down", None).await.unwrap();
    let queue_id = match outcome.classification {
        Classification::NoteQueued { queue_id } => queue_id,
        other => panic!("expected NoteQueued, got {other:?}"),
    };
    assert_eq!(queue_id, "Q-0001");

    let note = store.get_note_by_queue_id(&queue_id).await.unwrap().unwrap();
    let result = submitter.submit_one(&note).await.unwrap();
    match result {
        SubmitOutcome::Sent { osm_note_id, osm_note_url } => {
            assert_eq!(osm_note_id, DRY_RUN_NOTE_ID as i64);
            assert!(osm_note_url.ends_with("/999999"));
        }
        other => panic!("expected Sent, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_gps_without_uptime_rejects_with_no_gps_message() {
    let (_store, _positions, parser, _submitter, _dir) = harness().await;
    let outcome = parser.process("!deadbeef", "#osmnote hola", None).await.unwrap();
    assert!(matches!(outcome.classification, Classification::NoteReject));
}
