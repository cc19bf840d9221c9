//! Domain client metrics regression tests

use super::helpers::*;
use crate::common::{ScriptedTransport, fast_config, store_with};
use rategate::DomainRegistry;
use serial_test::serial;

#[tokio::test(start_paused = true)]
#[serial]
async fn client_metrics_exist() {
    init_recorder();

    let registry = DomainRegistry::new(store_with(&["metrics-client"], &fast_config()));
    let client = registry.client("metrics-client", ScriptedTransport::new(&[429, 503, 200]));
    client.get("/v1/items", [("q", "x")]).await.unwrap();

    assert_counter_exists("rategate_attempts_total");
    assert_metric_has_label("rategate_attempts_total", "domain", "metrics-client");

    assert_counter_exists("rategate_rate_limited_total");
    assert_metric_has_label("rategate_rate_limited_total", "domain", "metrics-client");

    assert_counter_exists("rategate_retries_total");
    assert_metric_has_label("rategate_retries_total", "domain", "metrics-client");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn client_exhausted_metrics() {
    init_recorder();

    let registry = DomainRegistry::new(store_with(&["metrics-exhausted"], &fast_config()));
    let client = registry.client("metrics-exhausted", ScriptedTransport::new(&[503]));
    let _ = client.get("/v1/items", [("q", "x")]).await;

    assert_counter_exists("rategate_retries_exhausted_total");
    assert_metric_has_label("rategate_retries_exhausted_total", "domain", "metrics-exhausted");
}
