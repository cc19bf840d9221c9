use crate::common::{ScriptedTransport, fast_config, store_with};
use rategate::{DomainKey, DomainRateLimitConfig, DomainRegistry};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_cooldown_in_one_domain_does_not_delay_another() {
    let config = DomainRateLimitConfig {
        rate_limit_cooldown_ms: 10_000,
        ..fast_config()
    };
    let registry = DomainRegistry::new(store_with(&["listings-api", "geo-api"], &config));
    let limited = registry.client("listings-api", ScriptedTransport::new(&[429, 200]));
    let healthy = registry.client("geo-api", ScriptedTransport::ok());

    let cooling = tokio::spawn(limited.get("/v1/items", [("q", "x")]));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(registry.gate("listings-api").stats().cooldown_remaining.is_some());

    let start = Instant::now();
    for _ in 0..5 {
        healthy.get("/v1/geocode", [("q", "x")]).await.unwrap();
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(registry.gate("geo-api").stats().cooldown_remaining, None);

    cooling.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_saturated_domain_does_not_block_another() {
    let config = DomainRateLimitConfig {
        max_concurrent_requests: 1,
        ..fast_config()
    };
    let registry = DomainRegistry::new(store_with(&["listings-api", "geo-api"], &config));
    let slow = registry.client(
        "listings-api",
        ScriptedTransport::ok().with_latency(Duration::from_secs(30)),
    );
    let other = registry.client("geo-api", ScriptedTransport::ok());

    let handles: Vec<_> = (0..3)
        .map(|_| tokio::spawn(slow.get("/v1/items", [("q", "x")])))
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(registry.gate("listings-api").stats().queued_for_slot, 2);

    let start = Instant::now();
    other.get("/v1/geocode", [("q", "x")]).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_penalty_touches_only_its_domain() {
    let store = store_with(&["listings-api", "geo-api"], &fast_config());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let registry = DomainRegistry::builder(store.clone())
        .on_cooldown(move |domain: &DomainKey, _| sink.lock().unwrap().push(domain.to_string()))
        .build();

    registry
        .client("listings-api", ScriptedTransport::new(&[429, 200]))
        .get("/v1/items", [("q", "x")])
        .await
        .unwrap();
    registry
        .client("geo-api", ScriptedTransport::ok())
        .get("/v1/geocode", [("q", "x")])
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec!["listings-api".to_string()]);
    let stats = registry.stats();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].domain.as_str(), "geo-api");
    assert_eq!(stats[1].domain.as_str(), "listings-api");
}
