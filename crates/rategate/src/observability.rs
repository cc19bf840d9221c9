//! Logs, metrics and events emitted by rategate.

/// Structured logging.
pub mod tracing {
    //! # Tracing
    //!
    //! With the `tracing` feature (on by default) every component logs through
    //! the [`tracing`](https://docs.rs/tracing) crate. All events carry a
    //! `domain` field.
    //!
    //! | Level | Event |
    //! |---|---|
    //! | `debug` | attempt sent, start granted, cooldown wait, non-retryable status, cancellation |
    //! | `info` | delay relaxed or raised by the adaptive loop |
    //! | `warn` | cooldown entered, retry scheduled, retries exhausted, deadline exceeded, adjustment not persisted |
    //! | `trace` | caller queued for a concurrency slot |
    //!
    //! ```rust,ignore
    //! tracing_subscriber::fmt()
    //!     .with_env_filter("rategate=debug,rategate_client=debug")
    //!     .init();
    //! ```
}

/// Metric names.
pub mod metrics {
    //! # Metrics
    //!
    //! With the `metrics` feature every component records through the
    //! [`metrics`](https://docs.rs/metrics) facade. Install any recorder, for
    //! example `metrics-exporter-prometheus`. Every metric is labelled with
    //! `domain`.
    //!
    //! ## Counters
    //!
    //! - `rategate_attempts_total`: attempts sent to the transport
    //! - `rategate_retries_total`: retries scheduled, after a cooldown or a backoff
    //! - `rategate_rate_limited_total`: 403 and 429 responses
    //! - `rategate_retries_exhausted_total`: requests that ran out of attempts
    //! - `rategate_throttle_starts_total`: starts granted by the throttler
    //! - `rategate_cooldowns_total`: cooldowns entered
    //! - `rategate_adaptive_adjustments_total`: delay changes, with a
    //!   `direction` label of `increase` or `decrease`
    //!
    //! ## Gauges
    //!
    //! - `rategate_active_requests`: requests holding a concurrency slot
    //! - `rategate_queued_requests`: requests waiting for a concurrency slot
    //! - `rategate_start_queue_length`: requests waiting for their start
    //! - `rategate_request_delay_ms`: the delay after the latest adjustment
}

/// Event listeners.
pub mod events {
    //! # Events
    //!
    //! Every component accepts callbacks on its builder, so a program can react
    //! to what happens without a logging or metrics backend:
    //!
    //! - `LimiterConfig::builder().on_slot_acquired(..)` and friends
    //! - `ThrottlerConfig::builder().on_cooldown(..)`, `.on_delay_adjusted(..)`,
    //!   `.on_persist_failed(..)`
    //! - `DomainClient::builder(gate).on_retry(..)`, `.on_rate_limited(..)`,
    //!   `.on_retries_exhausted(..)`
    //! - `DomainRegistry::builder(store).on_delay_adjusted(..)`, `.on_cooldown(..)`
    //!   for every domain at once
    //!
    //! A panicking listener is contained; the remaining listeners still run.
}
