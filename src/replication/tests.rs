#[cfg(test)]
mod tests {
    use crate::engine::engine::Engine;
    use crate::engine::handle::EngineHandle;
    use crate::engine::types::{Action, Transaction};
    use crate::feature::types::{assign_feature_id, feature_id};
    use crate::replication::service::{apply_frame, ReplicaRegistry};
    use crate::spatial::index::Rect;
    use geojson::{Feature, Geometry, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn point(x: f64, y: f64) -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![x, y]))),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    fn record(origin: &str, lsn: u64, x: f64, y: f64) -> Transaction {
        let mut feature = point(x, y);
        assign_feature_id(&mut feature, lsn);
        Transaction {
            action: Action::Insert,
            name: origin.to_string(),
            lsn,
            feature,
        }
    }

    fn start(dir: &TempDir, name: &str) -> (EngineHandle, Arc<ReplicaRegistry>) {
        let registry = Arc::new(ReplicaRegistry::new());
        let engine = Engine::start(name, dir.path(), registry.clone()).unwrap();
        (engine, registry)
    }

    /// Pipes everything broadcast by `from` into `to`'s replicate command,
    /// standing in for a live stream.
    fn bridge(from: &ReplicaRegistry, key: &str, to: EngineHandle) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Transaction>();
        from.register(key.to_string(), tx);
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let _ = to.replicate(record).await;
            }
        });
    }

    async fn wait_for_features(engine: &EngineHandle, expected: usize) {
        for _ in 0..100 {
            if engine.stats().await.unwrap().features == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("replica never reached {} features", expected);
    }

    // ============================================================
    // REGISTRY TESTS
    // ============================================================

    #[tokio::test]
    async fn test_register_and_deregister() {
        let registry = ReplicaRegistry::new();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();

        registry.register("peer-a".to_string(), tx);
        assert_eq!(registry.len(), 1);

        registry.deregister("peer-a");
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_stream() {
        let registry = ReplicaRegistry::new();
        let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel();
        let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel();
        registry.register("peer-a".to_string(), tx1);
        registry.register("peer-b".to_string(), tx2);

        registry.broadcast(&record("node1", 1, 1.0, 2.0));

        assert_eq!(rx1.try_recv().unwrap().lsn, 1);
        assert_eq!(rx2.try_recv().unwrap().lsn, 1);
    }

    #[tokio::test]
    async fn test_broadcast_survives_a_dead_stream() {
        let registry = ReplicaRegistry::new();
        let (tx_dead, rx_dead) = tokio::sync::mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = tokio::sync::mpsc::unbounded_channel();
        registry.register("peer-dead".to_string(), tx_dead);
        registry.register("peer-live".to_string(), tx_live);
        drop(rx_dead);

        registry.broadcast(&record("node1", 1, 1.0, 2.0));

        // The dead stream is logged, the live one still gets the record.
        assert_eq!(rx_live.try_recv().unwrap().lsn, 1);
    }

    // ============================================================
    // FRAME DECODING
    // ============================================================

    #[tokio::test]
    async fn test_apply_frame_feeds_the_engine() {
        let dir = TempDir::new().unwrap();
        let (engine, _registry) = start(&dir, "node-b");

        let frame = serde_json::to_string(&record("node-a", 1, 1.0, 2.0)).unwrap();
        apply_frame(&frame, &engine).await;

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.features, 1);
        assert_eq!(stats.vclock.get("node-a"), Some(&1));
    }

    #[tokio::test]
    async fn test_apply_frame_ignores_garbage() {
        let dir = TempDir::new().unwrap();
        let (engine, _registry) = start(&dir, "node-b");

        apply_frame("not json at all", &engine).await;
        apply_frame("{\"action\":\"noop\"}", &engine).await;

        assert_eq!(engine.stats().await.unwrap().features, 0);
    }

    // ============================================================
    // LEADER -> FOLLOWER CONVERGENCE
    // ============================================================

    #[tokio::test]
    async fn test_follower_converges_on_leader_insert() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let (engine_a, registry_a) = start(&dir_a, "node-a");
        let (engine_b, _registry_b) = start(&dir_b, "node-b");

        bridge(&registry_a, "node-b", engine_b.clone());

        let id = engine_a.insert(point(1.0, 2.0)).await.unwrap();
        wait_for_features(&engine_b, 1).await;

        let features = engine_b
            .select(Rect::new([0.0, 0.0], [2.0, 3.0]))
            .await
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(feature_id(&features[0]), Some(id));

        let stats = engine_b.stats().await.unwrap();
        assert_eq!(stats.vclock.get("node-a"), Some(&1));
    }

    #[tokio::test]
    async fn test_follower_sees_replace_and_delete_in_order() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let (engine_a, registry_a) = start(&dir_a, "node-a");
        let (engine_b, _registry_b) = start(&dir_b, "node-b");

        bridge(&registry_a, "node-b", engine_b.clone());

        let keep = engine_a.insert(point(1.0, 1.0)).await.unwrap();
        let victim = engine_a.insert(point(2.0, 2.0)).await.unwrap();
        let mut moved = point(9.0, 9.0);
        assign_feature_id(&mut moved, keep);
        engine_a.replace(moved).await.unwrap();
        engine_a.delete(victim).await.unwrap();

        wait_for_features(&engine_b, 1).await;

        let features = engine_b
            .select(Rect::new([8.0, 8.0], [10.0, 10.0]))
            .await
            .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(feature_id(&features[0]), Some(keep));

        let stats = engine_b.stats().await.unwrap();
        assert_eq!(stats.vclock.get("node-a"), Some(&4));
        assert_eq!(stats.features, stats.indexed);
    }

    #[tokio::test]
    async fn test_two_way_bridge_does_not_cycle() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let (engine_a, registry_a) = start(&dir_a, "node-a");
        let (engine_b, registry_b) = start(&dir_b, "node-b");

        bridge(&registry_a, "node-b", engine_b.clone());
        bridge(&registry_b, "node-a", engine_a.clone());

        engine_a.insert(point(1.0, 1.0)).await.unwrap();
        wait_for_features(&engine_b, 1).await;

        // Give a would-be echo time to come back around.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let stats_a = engine_a.stats().await.unwrap();
        let stats_b = engine_b.stats().await.unwrap();
        assert_eq!(stats_a.features, 1);
        assert_eq!(stats_b.features, 1);
        // One local append on A, one replicated append on B, nothing more.
        assert_eq!(stats_a.wal_records, 1);
        assert_eq!(stats_b.wal_records, 1);
    }
}
