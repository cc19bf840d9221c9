//! Request throttler metrics regression tests

use super::helpers::*;
use rategate::{
    AdaptiveConfig, DomainRateLimitConfig, MemoryConfigStore, RequestThrottler,
};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test(start_paused = true)]
#[serial]
async fn throttler_metrics_exist() {
    init_recorder();

    let config = DomainRateLimitConfig {
        request_delay_ms: 200,
        learned_min_delay_ms: 100,
        rate_limit_cooldown_ms: 50,
        ..DomainRateLimitConfig::default()
    };
    let store = Arc::new(MemoryConfigStore::default().with_config("metrics-throttler", &config));
    let throttler = RequestThrottler::new("metrics-throttler", store);
    let adaptive = AdaptiveConfig::new().with_success_threshold(1);

    throttler.wait_to_start(&config).await;
    throttler.record_success(&config, &adaptive).await;
    throttler.record_rate_limit(&config, &adaptive).await;
    throttler.apply_rate_limit_cooldown(&config).await;

    assert_counter_exists("rategate_throttle_starts_total");
    assert_metric_has_label("rategate_throttle_starts_total", "domain", "metrics-throttler");

    assert_gauge_exists("rategate_start_queue_length");
    assert_metric_has_label("rategate_start_queue_length", "domain", "metrics-throttler");

    assert_counter_exists("rategate_cooldowns_total");
    assert_metric_has_label("rategate_cooldowns_total", "domain", "metrics-throttler");

    assert_counter_exists("rategate_adaptive_adjustments_total");
    assert_metric_has_label("rategate_adaptive_adjustments_total", "direction", "decrease");
    assert_metric_has_label("rategate_adaptive_adjustments_total", "direction", "increase");

    assert_gauge_exists("rategate_request_delay_ms");
    assert_metric_has_label("rategate_request_delay_ms", "domain", "metrics-throttler");
}
