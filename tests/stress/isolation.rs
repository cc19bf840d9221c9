//! Many-domain stress tests

use rategate::DomainRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{ConcurrencyTracker, TrackedTransport, unpaced_store};

/// Test: Hundreds of domains driven at once, each with its own ceiling
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_many_domains() {
    let registry = DomainRegistry::new(unpaced_store(3));
    let trackers: Vec<_> = (0..200).map(|_| ConcurrencyTracker::new()).collect();

    let start = Instant::now();
    let mut handles = Vec::new();
    for (d, tracker) in trackers.iter().enumerate() {
        let client = registry.client(
            format!("domain-{:03}", d),
            TrackedTransport::new(Arc::clone(tracker), Duration::from_millis(2)),
        );
        for _ in 0..20 {
            handles.push(tokio::spawn(client.get("/v1/items", [("q", "x")])));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    println!("200 domains x 20 requests in {:?}", start.elapsed());

    assert_eq!(registry.domains().len(), 200);
    for (d, tracker) in trackers.iter().enumerate() {
        assert!(tracker.peak() <= 3, "domain-{:03} peaked at {}", d, tracker.peak());
    }
    assert!(registry.stats().iter().all(|s| s.active == 0 && s.queued_for_slot == 0));
}
