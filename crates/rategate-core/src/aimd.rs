//! Adaptive request-delay rules.
//!
//! The delay between request starts for a domain is tuned by a small feedback
//! loop in the AIMD family, applied to a *delay* rather than a window:
//! - **Linear decrease**: after a run of successes, the delay shrinks by a fixed
//!   amount, never below the learned floor.
//! - **Additive floor increase, multiplicative delay increase**: on a rate-limit
//!   rejection the learned floor steps up by a fixed amount and the working delay
//!   becomes a multiple of the new floor.
//!
//! The floor only ever rises, so a cadence that was once rejected is never
//! retried at full speed. Raising the floor before multiplying means a domain
//! starting from a zero delay still backs off (`(0 + 100) * 2 = 200`).
//!
//! # Example
//!
//! ```rust
//! use rategate_core::aimd::{AdaptiveConfig, DelayState};
//!
//! let config = AdaptiveConfig::new()
//!     .with_floor_step_ms(100)
//!     .with_increase_multiplier(2.0);
//!
//! let state = DelayState {
//!     request_delay_ms: 0,
//!     learned_min_delay_ms: 0,
//!     min_request_delay_ms: 0,
//!     max_request_delay_ms: 30_000,
//! };
//!
//! let adjusted = config.penalize(&state);
//! assert_eq!(adjusted.learned_min_delay_ms, 100);
//! assert_eq!(adjusted.request_delay_ms, 200);
//! ```

use serde::{Deserialize, Serialize};

/// Global tuning constants for the adaptive loop, shared by all domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdaptiveConfig {
    /// Factor applied to the raised floor on a rate-limit event.
    pub increase_multiplier: f64,
    /// Amount the learned floor rises on a rate-limit event.
    pub floor_step_ms: u64,
    /// Amount the delay shrinks after `success_threshold` consecutive successes.
    pub decrease_amount_ms: u64,
    /// Consecutive successes required before the delay is relaxed.
    pub success_threshold: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            increase_multiplier: 2.0,
            floor_step_ms: 100,
            decrease_amount_ms: 100,
            success_threshold: 10,
        }
    }
}

impl AdaptiveConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the multiplicative increase factor.
    pub fn with_increase_multiplier(mut self, multiplier: f64) -> Self {
        self.increase_multiplier = multiplier;
        self
    }

    /// Set the floor step applied on each rate-limit event.
    pub fn with_floor_step_ms(mut self, step: u64) -> Self {
        self.floor_step_ms = step;
        self
    }

    /// Set the linear decrease applied after a success run.
    pub fn with_decrease_amount_ms(mut self, amount: u64) -> Self {
        self.decrease_amount_ms = amount;
        self
    }

    /// Set the length of the success run that triggers a decrease.
    ///
    /// A threshold of zero is treated as one.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Effective success threshold (at least one).
    pub fn effective_success_threshold(&self) -> u32 {
        self.success_threshold.max(1)
    }

    /// Computes the relaxed delay after a full success run.
    ///
    /// Returns `None` when the delay cannot go any lower.
    pub fn relax(&self, state: &DelayState) -> Option<DelayAdjustment> {
        let floor = state.learned_min_delay_ms.max(state.min_request_delay_ms);
        let candidate = state
            .request_delay_ms
            .saturating_sub(self.decrease_amount_ms)
            .max(floor);

        (candidate < state.request_delay_ms).then_some(DelayAdjustment {
            request_delay_ms: candidate,
            learned_min_delay_ms: state.learned_min_delay_ms,
        })
    }

    /// Computes the raised floor and delay after a rate-limit rejection.
    pub fn penalize(&self, state: &DelayState) -> DelayAdjustment {
        let max = state.max_request_delay_ms;
        let stepped = state
            .request_delay_ms
            .saturating_add(self.floor_step_ms)
            .min(max);
        // the floor never moves down, even if the ceiling was lowered below it
        let floor = stepped.max(state.learned_min_delay_ms);

        let multiplied = (floor as f64 * self.increase_multiplier.max(1.0)).round() as u64;
        let delay = multiplied.max(floor).min(max.max(floor));

        DelayAdjustment {
            request_delay_ms: delay,
            learned_min_delay_ms: floor,
        }
    }
}

/// The delay-related fields of a domain's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayState {
    /// Current minimum spacing between request starts.
    pub request_delay_ms: u64,
    /// Learned floor; only ever rises.
    pub learned_min_delay_ms: u64,
    /// Lower hard bound for tuning.
    pub min_request_delay_ms: u64,
    /// Upper hard bound for tuning.
    pub max_request_delay_ms: u64,
}

/// New delay values produced by the adaptive rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayAdjustment {
    /// New working delay.
    pub request_delay_ms: u64,
    /// New (or unchanged) learned floor.
    pub learned_min_delay_ms: u64,
}
