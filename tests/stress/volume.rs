//! High-volume stress tests for a single domain

use rategate::{DomainRegistry, MemoryConfigStore, DomainRateLimitConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ConcurrencyTracker, TrackedTransport, unpaced_store};

/// Test: Thousands of requests queued behind a small ceiling
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_large_slot_queue() {
    let tracker = ConcurrencyTracker::new();
    let registry = DomainRegistry::new(unpaced_store(10));
    let client = registry.client(
        "listings-api",
        TrackedTransport::new(Arc::clone(&tracker), Duration::from_millis(5)),
    );

    let start = Instant::now();
    let handles: Vec<_> = (0..2_000)
        .map(|i| tokio::spawn(client.get(format!("/v1/items/{}", i), [("q", "x")])))
        .collect();

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }

    println!("2000 requests with ceiling 10");
    println!("Completed in: {:?}", start.elapsed());
    println!("Peak concurrency: {}", tracker.peak());

    assert_eq!(ok, 2_000);
    assert!(tracker.peak() <= 10, "Should not exceed ceiling");
    assert_eq!(tracker.current(), 0);
    let stats = registry.gate("listings-api").stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.queued_for_slot, 0);
    assert_eq!(stats.queued_for_start, 0);
}

/// Test: Start spacing holds under a burst of callers
#[tokio::test(start_paused = true)]
#[ignore]
async fn stress_spaced_burst() {
    let config = DomainRateLimitConfig {
        request_delay_ms: 10,
        max_concurrent_requests: 50,
        adaptive_enabled: false,
        ..DomainRateLimitConfig::default()
    };
    let store = Arc::new(MemoryConfigStore::default().with_config("listings-api", &config));
    let registry = DomainRegistry::new(store);
    let tracker = ConcurrencyTracker::new();
    let client = registry.client(
        "listings-api",
        TrackedTransport::new(Arc::clone(&tracker), Duration::from_millis(100)),
    );

    let start = tokio::time::Instant::now();
    let handles: Vec<_> = (0..1_000)
        .map(|_| tokio::spawn(client.get("/v1/items", [("q", "x")])))
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // 999 gaps of at least 10ms each
    assert!(start.elapsed() >= Duration::from_millis(9_990));
    assert!(tracker.peak() <= 50);
}
