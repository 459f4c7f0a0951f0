// src/crawl/health.rs
// =============================================================================
// The 0-10 health score of a crawl.
//
// Starts at 10 and loses points:
//   -1 per 5 pages without a title      (at most -3)
//   -1 per 5 pages without a meta description (at most -3)
//   -1 per 10 broken links               (at most -3)
//   -2 when more than 3 titles are duplicated
//   -1 when more than 5 pages do not have exactly one <h1>
// and never drops below 0.
// =============================================================================

use serde::{Deserialize, Serialize};

pub const MAX_HEALTH: u8 = 10;

// The crawl counters the score is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInputs {
    pub missing_titles: usize,
    pub missing_metas: usize,
    pub broken_links: usize,
    pub duplicate_titles: usize,
    pub many_h1_issues: usize,
}

pub fn health_score(inputs: &HealthInputs) -> u8 {
    let mut penalty = 0usize;
    penalty += (inputs.missing_titles / 5).min(3);
    penalty += (inputs.missing_metas / 5).min(3);
    penalty += (inputs.broken_links / 10).min(3);
    if inputs.duplicate_titles > 3 {
        penalty += 2;
    }
    if inputs.many_h1_issues > 5 {
        penalty += 1;
    }

    MAX_HEALTH.saturating_sub(penalty.min(MAX_HEALTH as usize) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_crawl_is_perfect() {
        assert_eq!(health_score(&HealthInputs::default()), 10);
    }

    #[test]
    fn test_penalties_are_per_full_group() {
        let four_missing = HealthInputs { missing_titles: 4, ..Default::default() };
        assert_eq!(health_score(&four_missing), 10);

        let five_missing = HealthInputs { missing_titles: 5, ..Default::default() };
        assert_eq!(health_score(&five_missing), 9);

        let nineteen_broken = HealthInputs { broken_links: 19, ..Default::default() };
        assert_eq!(health_score(&nineteen_broken), 9);
    }

    #[test]
    fn test_group_penalties_are_capped() {
        let inputs = HealthInputs { missing_metas: 500, ..Default::default() };
        assert_eq!(health_score(&inputs), 7);
    }

    #[test]
    fn test_floor_at_zero() {
        let inputs = HealthInputs {
            missing_titles: 100,
            missing_metas: 100,
            broken_links: 100,
            duplicate_titles: 10,
            many_h1_issues: 10,
        };
        // 10 - 3 - 3 - 3 - 2 - 1 would be -2
        assert_eq!(health_score(&inputs), 0);
    }

    #[test]
    fn test_duplicate_and_h1_thresholds_are_strict() {
        let at_limit = HealthInputs { duplicate_titles: 3, many_h1_issues: 5, ..Default::default() };
        assert_eq!(health_score(&at_limit), 10);

        let over_limit = HealthInputs { duplicate_titles: 4, many_h1_issues: 6, ..Default::default() };
        assert_eq!(health_score(&over_limit), 7);
    }

    #[test]
    fn test_monotonic_in_each_counter() {
        let mut previous = MAX_HEALTH;
        for n in 0..60 {
            let score = health_score(&HealthInputs {
                missing_titles: n,
                missing_metas: n,
                broken_links: n,
                ..Default::default()
            });
            assert!(score <= previous, "score went up at {n}");
            assert!(score <= MAX_HEALTH);
            previous = score;
        }
    }
}
