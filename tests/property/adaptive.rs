//! Property tests for the adaptive delay rules.
//!
//! Invariants tested:
//! - The learned floor never decreases
//! - The delay stays within its bounds and never drops below the floor
//! - A relaxation lowers the delay by at most the decrease amount

use proptest::prelude::*;
use rategate::core::aimd::DelayState;
use rategate::{AdaptiveConfig, DomainRateLimitConfig, RateLimitConfigUpdate};

#[derive(Debug, Clone, Copy)]
enum Step {
    Relax,
    Penalize,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![3 => Just(Step::Relax), 1 => Just(Step::Penalize)]
}

fn adaptive() -> impl Strategy<Value = AdaptiveConfig> {
    (1.0f64..=4.0, 1u64..=500, 1u64..=500).prop_map(|(multiplier, step, decrease)| {
        AdaptiveConfig::new()
            .with_increase_multiplier(multiplier)
            .with_floor_step_ms(step)
            .with_decrease_amount_ms(decrease)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the learned floor only ever moves up
    #[test]
    fn learned_floor_is_monotonic(
        config in adaptive(),
        start_delay in 0u64..=5_000,
        max_delay in 1_000u64..=60_000,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let mut state = DelayState {
            request_delay_ms: start_delay.min(max_delay),
            learned_min_delay_ms: 0,
            min_request_delay_ms: 0,
            max_request_delay_ms: max_delay,
        };

        for step in steps {
            let before = state.learned_min_delay_ms;
            let adjustment = match step {
                Step::Relax => config.relax(&state),
                Step::Penalize => Some(config.penalize(&state)),
            };
            if let Some(adjustment) = adjustment {
                state.request_delay_ms = adjustment.request_delay_ms;
                state.learned_min_delay_ms = adjustment.learned_min_delay_ms;
            }
            prop_assert!(
                state.learned_min_delay_ms >= before,
                "floor fell from {} to {}",
                before,
                state.learned_min_delay_ms
            );
        }
    }

    /// Property: the delay stays between the floor and the ceiling
    #[test]
    fn delay_stays_in_bounds(
        config in adaptive(),
        min_delay in 0u64..=1_000,
        max_delay in 1_000u64..=30_000,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let mut state = DelayState {
            request_delay_ms: min_delay,
            learned_min_delay_ms: 0,
            min_request_delay_ms: min_delay,
            max_request_delay_ms: max_delay,
        };

        for step in steps {
            let adjustment = match step {
                Step::Relax => config.relax(&state),
                Step::Penalize => Some(config.penalize(&state)),
            };
            if let Some(adjustment) = adjustment {
                state.request_delay_ms = adjustment.request_delay_ms;
                state.learned_min_delay_ms = adjustment.learned_min_delay_ms;
            }
            prop_assert!(state.request_delay_ms >= state.min_request_delay_ms);
            prop_assert!(state.request_delay_ms <= state.max_request_delay_ms);
            prop_assert!(state.request_delay_ms >= state.learned_min_delay_ms);
        }
    }

    /// Property: a relaxation is a bounded, strict decrease
    #[test]
    fn relax_decreases_by_at_most_decrease_amount(
        config in adaptive(),
        delay in 0u64..=30_000,
        floor in 0u64..=30_000,
    ) {
        let state = DelayState {
            request_delay_ms: delay,
            learned_min_delay_ms: floor,
            min_request_delay_ms: 0,
            max_request_delay_ms: 30_000,
        };
        if let Some(adjustment) = config.relax(&state) {
            prop_assert!(adjustment.request_delay_ms < delay);
            prop_assert!(delay - adjustment.request_delay_ms <= config.decrease_amount_ms);
            prop_assert!(adjustment.request_delay_ms >= floor);
            prop_assert_eq!(adjustment.learned_min_delay_ms, floor);
        }
    }

    /// Property: stored floors never move down, whatever updates arrive
    #[test]
    fn stored_floor_ignores_lower_writes(
        floors in prop::collection::vec(0u64..=10_000, 1..30),
    ) {
        let mut config = DomainRateLimitConfig::default();
        let mut highest = 0;
        for floor in floors {
            config.apply(&RateLimitConfigUpdate {
                learned_min_delay_ms: Some(floor),
                ..RateLimitConfigUpdate::default()
            });
            highest = highest.max(floor);
            prop_assert_eq!(config.learned_min_delay_ms, highest);
            prop_assert!(config.request_delay_ms >= config.learned_min_delay_ms);
        }
    }
}
