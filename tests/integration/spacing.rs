use crate::common::{ScriptedTransport, fast_config, store_with};
use rategate::{DomainRateLimitConfig, DomainRegistry};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_starts_are_spaced_by_request_delay() {
    let config = DomainRateLimitConfig {
        request_delay_ms: 250,
        ..fast_config()
    };
    let registry = DomainRegistry::new(store_with(&["listings-api"], &config));
    let transport = ScriptedTransport::ok();
    let client = registry.client("listings-api", transport.clone());

    let handles: Vec<_> = (0..6)
        .map(|_| tokio::spawn(client.get("/v1/items", [("q", "x")])))
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let starts = transport.starts();
    assert_eq!(starts.len(), 6);
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(250));
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_calls_still_spaced_at_start() {
    // starts are spaced, completions may overlap
    let config = DomainRateLimitConfig {
        request_delay_ms: 100,
        max_concurrent_requests: 5,
        ..fast_config()
    };
    let registry = DomainRegistry::new(store_with(&["listings-api"], &config));
    let transport = ScriptedTransport::ok().with_latency(Duration::from_millis(1_000));
    let client = registry.client("listings-api", transport.clone());

    let handles: Vec<_> = (0..3)
        .map(|_| tokio::spawn(client.get("/v1/items", [("q", "x")])))
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(transport.peak(), 3);
    let starts = transport.starts();
    assert!(starts[1] - starts[0] >= Duration::from_millis(100));
    assert!(starts[2] - starts[1] >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_callers_served_in_arrival_order() {
    let config = DomainRateLimitConfig {
        request_delay_ms: 50,
        max_concurrent_requests: 1,
        ..fast_config()
    };
    let registry = DomainRegistry::new(store_with(&["listings-api"], &config));
    let client = registry.client("listings-api", ScriptedTransport::ok().with_latency(Duration::from_millis(10)));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..6 {
        let request = client.get(format!("/v1/items/{}", i), [("q", "x")]);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let body = request.await.unwrap();
            order.lock().unwrap().push(body);
        }));
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let expected: Vec<String> = (0..6).map(|i| format!("/v1/items/{}", i)).collect();
    assert_eq!(*order.lock().unwrap(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_no_start_during_cooldown() {
    let config = DomainRateLimitConfig {
        rate_limit_cooldown_ms: 1_000,
        ..fast_config()
    };
    let registry = DomainRegistry::new(store_with(&["listings-api"], &config));
    let transport = ScriptedTransport::new(&[429, 200]);
    let client = registry.client("listings-api", transport.clone());

    let rejected = tokio::spawn(client.get("/v1/items/a", [("q", "x")]));
    tokio::time::sleep(Duration::from_millis(10)).await;
    let later = tokio::spawn(client.get("/v1/items/b", [("q", "x")]));

    rejected.await.unwrap().unwrap();
    later.await.unwrap().unwrap();

    let starts = transport.starts();
    assert_eq!(starts.len(), 3);
    for start in &starts[1..] {
        assert!(*start - starts[0] >= Duration::from_millis(1_000));
    }
}
