//! Property tests for status classification.
//!
//! Invariants tested:
//! - Every status lands in exactly one outcome
//! - Only rate-limit and transient outcomes are retried

use proptest::prelude::*;
use rategate::{Outcome, classify_status};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn statuses_partition(status in 100u16..=599) {
        let outcome = classify_status(status);
        let expected = if (200..300).contains(&status) {
            Outcome::Success
        } else if status == 403 || status == 429 {
            Outcome::RateLimited
        } else if (502..=504).contains(&status) {
            Outcome::Transient
        } else {
            Outcome::Fatal
        };
        prop_assert_eq!(outcome, expected);
        prop_assert_eq!(
            outcome.is_retryable(),
            matches!(outcome, Outcome::RateLimited | Outcome::Transient)
        );
    }
}
