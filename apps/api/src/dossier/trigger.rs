//! Trigger Policy: decides when enough new decisions justify a new profile.

use crate::config::PolicyConfig;

/// Returns true when a new profile version should be generated.
///
/// 1. No profile yet (`last_generation_count == 0`): once `current_count`
///    reaches the initial threshold.
/// 2. A profile exists: once `refinement_interval` more events have accrued.
///
/// A `last_generation_count` between 0 and the initial threshold should not
/// occur; the rule 2 guard keeps it from triggering.
pub fn should_generate_profile(
    current_count: i64,
    last_generation_count: i64,
    policy: &PolicyConfig,
) -> bool {
    if last_generation_count == 0 {
        return current_count >= policy.initial_threshold;
    }
    last_generation_count >= policy.initial_threshold
        && current_count >= last_generation_count.saturating_add(policy.refinement_interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PolicyConfig {
        PolicyConfig::default()
    }

    #[test]
    fn test_initial_threshold_boundary() {
        let p = policy();
        assert!(!should_generate_profile(0, 0, &p));
        assert!(!should_generate_profile(499, 0, &p));
        assert!(should_generate_profile(500, 0, &p));
        assert!(should_generate_profile(10_000, 0, &p));
    }

    #[test]
    fn test_refinement_interval_boundary() {
        let p = policy();
        assert!(!should_generate_profile(500, 500, &p));
        assert!(!should_generate_profile(749, 500, &p));
        assert!(should_generate_profile(750, 500, &p));
        assert!(!should_generate_profile(999, 750, &p));
        assert!(should_generate_profile(1000, 750, &p));
    }

    #[test]
    fn test_inconsistent_last_count_never_triggers() {
        let p = policy();
        for last in [1, 100, 499] {
            assert!(!should_generate_profile(last + 250, last, &p));
            assert!(!should_generate_profile(5_000, last, &p));
        }
    }

    #[test]
    fn test_total_at_extremes() {
        let p = policy();
        assert!(!should_generate_profile(i64::MAX - 1, i64::MAX, &p));
        assert!(should_generate_profile(i64::MAX, 0, &p));
    }

    #[test]
    fn test_custom_thresholds() {
        let p = PolicyConfig {
            initial_threshold: 10,
            refinement_interval: 5,
            ..PolicyConfig::default()
        };
        assert!(should_generate_profile(10, 0, &p));
        assert!(!should_generate_profile(14, 10, &p));
        assert!(should_generate_profile(15, 10, &p));
    }
}
