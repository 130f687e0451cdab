//! # Position Cache
//!
//! In-memory mirror of each node's latest GPS fix, write-through to the
//! [`Store`] so a restart rehydrates instead of starting blind. Grounded
//! on `original_source/src/gateway/position_cache.py`'s freshness grading
//! (fresh / approximate / stale) and on the teacher crate's
//! `wmbus/compact_cache.rs` for the `Arc<RwLock<HashMap<..>>>` shape.

use crate::constants::{POS_GOOD_SECONDS, POS_MAX_SECONDS};
use crate::error::GatewayError;
use crate::store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub received_at_unix: f64,
}

/// How a [`Position`] grades against [`POS_GOOD_SECONDS`]/[`POS_MAX_SECONDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Approximate,
    Stale,
    Missing,
}

pub struct PositionCache {
    store: Store,
    positions: RwLock<HashMap<String, Position>>,
}

impl PositionCache {
    pub fn new(store: Store) -> Arc<Self> {
        Arc::new(PositionCache {
            store,
            positions: RwLock::new(HashMap::new()),
        })
    }

    /// Loads every persisted position into memory. Called once at startup.
    pub async fn rehydrate(&self) -> Result<(), GatewayError> {
        let rows = self.store.list_all_positions().await?;
        let mut guard = self.positions.write().await;
        for (node_id, row) in rows {
            guard.insert(
                node_id,
                Position {
                    lat: row.lat,
                    lon: row.lon,
                    received_at_unix: row.received_at_unix,
                },
            );
        }
        Ok(())
    }

    /// Records a new fix. Persists first, then updates the in-memory view,
    /// so the write-through never happens while the lock is held.
    pub async fn update(&self, node_id: &str, lat: f64, lon: f64) -> Result<(), GatewayError> {
        let received_at_unix = now_unix();
        self.store
            .upsert_position(node_id, lat, lon, received_at_unix)
            .await?;
        let mut guard = self.positions.write().await;
        guard.insert(
            node_id.to_string(),
            Position {
                lat,
                lon,
                received_at_unix,
            },
        );
        Ok(())
    }

    pub async fn get(&self, node_id: &str) -> Option<Position> {
        self.positions.read().await.get(node_id).copied()
    }

    pub async fn get_age_seconds(&self, node_id: &str) -> Option<f64> {
        self.get(node_id)
            .await
            .map(|p| (now_unix() - p.received_at_unix).max(0.0))
    }

    pub async fn freshness(&self, node_id: &str) -> Freshness {
        match self.get_age_seconds(node_id).await {
            None => Freshness::Missing,
            Some(age) if age <= POS_GOOD_SECONDS => Freshness::Fresh,
            Some(age) if age <= POS_MAX_SECONDS => Freshness::Approximate,
            Some(_) => Freshness::Stale,
        }
    }

    pub async fn len(&self) -> usize {
        self.positions.read().await.len()
    }
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_cache() -> (Arc<PositionCache>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("gateway.db")).unwrap();
        (PositionCache::new(store), dir)
    }

    #[tokio::test]
    async fn missing_node_grades_missing() {
        let (cache, _dir) = test_cache().await;
        assert_eq!(cache.freshness("!deadbeef").await, Freshness::Missing);
    }

    #[tokio::test]
    async fn fresh_fix_grades_fresh() {
        let (cache, _dir) = test_cache().await;
        cache.update("!deadbeef", 4.6, -74.0).await.unwrap();
        assert_eq!(cache.freshness("!deadbeef").await, Freshness::Fresh);
    }

    #[tokio::test]
    async fn rehydrate_restores_from_store() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("gateway.db")).unwrap();
        store.upsert_position("!deadbeef", 4.6, -74.0, now_unix()).await.unwrap();

        let cache = PositionCache::new(store);
        assert_eq!(cache.len().await, 0);
        cache.rehydrate().await.unwrap();
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("!deadbeef").await.is_some());
    }

    #[tokio::test]
    async fn stale_fix_grades_stale() {
        let (cache, _dir) = test_cache().await;
        {
            let mut guard = cache.positions.write().await;
            guard.insert(
                "!deadbeef".to_string(),
                Position {
                    lat: 4.6,
                    lon: -74.0,
                    received_at_unix: now_unix() - 300.0,
                },
            );
        }
        assert_eq!(cache.freshness("!deadbeef").await, Freshness::Stale);
    }
}
