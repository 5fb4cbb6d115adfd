// concordance.rs - Pairwise concordance over the marker panel

use serde::Serialize;

use crate::core::decision::{decide_marker, MarkerDecision};
use crate::core::policy::ComparisonPolicy;
use crate::data::{MarkerPanel, SampleLikelihoodTable};

/// Marker counts for one tumor/normal comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PairResult {
    pub concordant: usize,
    pub discordant: usize,
    pub markers_used: usize,
    pub total_markers: usize,
}

impl PairResult {
    /// Fraction of used markers with matching calls.
    /// `None` when no marker passed the policy; never coerced to 0 or 1.
    pub fn concordance(&self) -> Option<f64> {
        if self.markers_used == 0 {
            None
        } else {
            Some(self.concordant as f64 / self.markers_used as f64)
        }
    }

    pub fn has_usable_markers(&self) -> bool {
        self.markers_used > 0
    }
}

/// Apply the marker decision to every panel marker, in panel order
pub fn compare_pair(
    tumor: &SampleLikelihoodTable,
    normal: &SampleLikelihoodTable,
    panel: &MarkerPanel,
    policy: &ComparisonPolicy,
) -> PairResult {
    let mut concordant = 0;
    let mut discordant = 0;

    for marker in panel.iter() {
        match decide_marker(normal.get(&marker.id), tumor.get(&marker.id), policy) {
            MarkerDecision::Concordant => concordant += 1,
            MarkerDecision::Discordant => discordant += 1,
            MarkerDecision::Skipped(_) => {}
        }
    }

    PairResult {
        concordant,
        discordant,
        markers_used: concordant + discordant,
        total_markers: panel.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GenotypeLikelihoodRecord, Marker, MarkerId};
    use approx::assert_relative_eq;

    const HOM_REF: [f64; 3] = [-0.1, -5.0, -20.0];
    const HET: [f64; 3] = [-8.0, -0.3, -8.0];
    const HOM_ALT: [f64; 3] = [-20.0, -5.0, -0.1];

    fn panel(n: u64) -> MarkerPanel {
        MarkerPanel::new(
            (1..=n)
                .map(|pos| Marker::new(MarkerId::new("1", pos * 100), b'A', b'G'))
                .collect(),
        )
        .unwrap()
    }

    fn table(entries: &[(u64, u32, [f64; 3])]) -> SampleLikelihoodTable {
        entries
            .iter()
            .map(|&(pos, coverage, likelihoods)| {
                (
                    MarkerId::new("1", pos * 100),
                    GenotypeLikelihoodRecord::new(coverage, likelihoods),
                )
            })
            .collect()
    }

    #[test]
    fn test_missing_marker_is_not_counted() {
        let panel = panel(3);
        let a = table(&[(1, 20, HOM_REF), (2, 20, HOM_REF)]);
        let b = table(&[(1, 20, HOM_REF), (2, 20, HOM_REF), (3, 20, HET)]);

        let result = compare_pair(&a, &b, &panel, &ComparisonPolicy::default());
        assert_eq!(result.markers_used, 2);
        assert_eq!(result.concordant, 2);
        assert_eq!(result.discordant, 0);
        assert_eq!(result.total_markers, 3);
        assert_relative_eq!(result.concordance().unwrap(), 1.0);
    }

    #[test]
    fn test_single_discordant_marker() {
        let panel = panel(3);
        let a = table(&[(1, 15, HOM_REF)]);
        let b = table(&[(1, 15, HOM_ALT)]);

        let result = compare_pair(&a, &b, &panel, &ComparisonPolicy::default());
        assert_eq!(result.markers_used, 1);
        assert_eq!(result.discordant, 1);
        assert_relative_eq!(result.concordance().unwrap(), 0.0);
    }

    #[test]
    fn test_all_markers_below_coverage_is_undefined() {
        let panel = panel(3);
        let a = table(&[(1, 5, HOM_REF), (2, 9, HOM_REF), (3, 1, HET)]);
        let b = table(&[(1, 5, HOM_REF), (2, 9, HOM_ALT), (3, 3, HET)]);

        let result = compare_pair(&a, &b, &panel, &ComparisonPolicy::default());
        assert_eq!(result.markers_used, 0);
        assert_eq!(result.total_markers, 3);
        assert!(result.concordance().is_none());
        assert!(!result.has_usable_markers());
    }

    #[test]
    fn test_counts_are_consistent() {
        let panel = panel(6);
        let a = table(&[
            (1, 30, HOM_REF),
            (2, 30, HET),
            (3, 30, HOM_ALT),
            (4, 2, HOM_REF),
            (6, 30, HET),
        ]);
        let b = table(&[
            (1, 30, HOM_REF),
            (2, 30, HOM_REF),
            (3, 30, HOM_ALT),
            (4, 30, HOM_REF),
            (5, 30, HOM_REF),
            (6, 30, HET),
        ]);

        let result = compare_pair(&a, &b, &panel, &ComparisonPolicy::default());
        assert_eq!(result.concordant + result.discordant, result.markers_used);
        assert!(result.markers_used <= result.total_markers);
        assert_eq!(result.total_markers, panel.len());
        assert_eq!(result.concordant, 3);
        assert_eq!(result.discordant, 1);
    }

    #[test]
    fn test_self_comparison_beats_unrelated_sample() {
        let panel = panel(4);
        let a = table(&[(1, 30, HOM_REF), (2, 30, HET), (3, 30, HOM_ALT), (4, 30, HET)]);
        let unrelated = table(&[(1, 30, HOM_ALT), (2, 30, HET), (3, 30, HOM_REF), (4, 30, HOM_REF)]);
        let policy = ComparisonPolicy::default();

        let own = compare_pair(&a, &a, &panel, &policy).concordance().unwrap();
        let other = compare_pair(&unrelated, &a, &panel, &policy)
            .concordance()
            .unwrap();
        assert_relative_eq!(own, 1.0);
        assert!(own > other);
    }

    #[test]
    fn test_homozygous_filter_and_coverage_monotonicity() {
        let panel = panel(5);
        let normal = table(&[(1, 12, HET), (2, 30, HOM_REF), (3, 18, HET), (4, 25, HOM_ALT), (5, 11, HOM_REF)]);
        let tumor = table(&[(1, 14, HET), (2, 30, HOM_REF), (3, 30, HOM_REF), (4, 8, HOM_ALT), (5, 30, HOM_ALT)]);

        let base = ComparisonPolicy::default();
        let homozygous = ComparisonPolicy {
            normal_homozygous_only: true,
            ..base
        };
        let relaxed = ComparisonPolicy {
            min_coverage: 5,
            ..base
        };

        let used = compare_pair(&tumor, &normal, &panel, &base).markers_used;
        let used_hom = compare_pair(&tumor, &normal, &panel, &homozygous).markers_used;
        let used_relaxed = compare_pair(&tumor, &normal, &panel, &relaxed).markers_used;

        assert!(used_hom <= used);
        assert!(used_relaxed >= used);
        assert_eq!(used, 4);
        assert_eq!(used_hom, 2);
        assert_eq!(used_relaxed, 5);
    }
}
