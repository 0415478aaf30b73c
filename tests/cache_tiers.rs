//! Integration tests for the tiered cache against live mock KV endpoints.

use resilience_core::cache::{KeyParts, TieredCache};
use resilience_core::config::CacheSettings;
use serde_json::json;
use std::time::Duration;

mod common;

fn settings(fast: Option<String>, durable: Option<String>) -> CacheSettings {
    CacheSettings {
        fast_tier_endpoint: fast,
        durable_tier_endpoint: durable,
        ttl_secs: 60,
        max_memory_items: 100,
        key_prefix: "bot".to_string(),
        remote_timeout_secs: 2,
    }
}

#[tokio::test]
async fn remote_tier_survives_process_boundaries() {
    let (base, kv) = common::start_kv_server().await;
    let parts = KeyParts::new().arg("pr-42").kw("repo", "infra");

    let writer = TieredCache::new(&settings(None, Some(base.clone())));
    assert!(
        writer
            .set("pr_context", json!({"files": 3}), None, &parts)
            .await
    );
    assert_eq!(kv.len(), 1);

    // A fresh instance has an empty memory tier; the hit must come from the
    // remote tier.
    let reader = TieredCache::new(&settings(None, Some(base)));
    assert_eq!(
        reader.get("pr_context", &parts).await,
        Some(json!({"files": 3}))
    );
}

#[tokio::test]
async fn dead_tier_is_a_per_tier_miss() {
    // Nothing listens on port 9; the connection is refused, not hung.
    let cache = TieredCache::new(&settings(Some("http://127.0.0.1:9".to_string()), None));
    let parts = KeyParts::new().arg(7);

    // The memory tier still accepts the write and serves the read.
    assert!(cache.set("cost", json!(12.5), None, &parts).await);
    assert_eq!(cache.get("cost", &parts).await, Some(json!(12.5)));
}

#[tokio::test]
async fn expired_remote_entry_is_a_miss() {
    let (base, _kv) = common::start_kv_server().await;
    let parts = KeyParts::new().arg("scan-1");

    let writer = TieredCache::new(&settings(None, Some(base.clone())));
    writer
        .set(
            "scan",
            json!("findings"),
            Some(Duration::from_millis(50)),
            &parts,
        )
        .await;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let reader = TieredCache::new(&settings(None, Some(base)));
    assert_eq!(reader.get("scan", &parts).await, None);
}

#[tokio::test]
async fn delete_reaches_every_tier() {
    let (base, kv) = common::start_kv_server().await;
    let parts = KeyParts::new();

    let cache = TieredCache::new(&settings(None, Some(base.clone())));
    cache.set("kb", json!("entry"), None, &parts).await;
    assert_eq!(kv.len(), 1);

    assert!(cache.delete("kb", &parts).await);
    assert_eq!(kv.len(), 0);
    assert_eq!(cache.get("kb", &parts).await, None);
}

#[tokio::test]
async fn both_remote_tiers_receive_writes() {
    let (fast, fast_kv) = common::start_kv_server().await;
    let (durable, durable_kv) = common::start_kv_server().await;

    let cache = TieredCache::new(&settings(Some(fast), Some(durable)));
    assert_eq!(cache.stats().tiers, vec!["fast-kv", "durable-kv", "memory"]);

    cache.set("ns", json!(1), None, &KeyParts::new()).await;
    assert_eq!(fast_kv.len(), 1);
    assert_eq!(durable_kv.len(), 1);
}
