// decision.rs - Per-marker concordance decision

use crate::core::policy::ComparisonPolicy;
use crate::data::{Genotype, GenotypeLikelihoodRecord};

/// Why a marker did not count towards a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingRecord,
    LowCoverage,
    HeterozygousNormal,
}

/// Verdict for one marker of one tumor/normal pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerDecision {
    Concordant,
    Discordant,
    Skipped(SkipReason),
}

/// Compare the most likely genotypes of both samples at one marker.
///
/// This runs once per marker per pair, so it stays allocation free.
#[inline]
pub fn decide_marker(
    normal: Option<&GenotypeLikelihoodRecord>,
    tumor: Option<&GenotypeLikelihoodRecord>,
    policy: &ComparisonPolicy,
) -> MarkerDecision {
    let (normal, tumor) = match (normal, tumor) {
        (Some(n), Some(t)) => (n, t),
        _ => return MarkerDecision::Skipped(SkipReason::MissingRecord),
    };

    if normal.coverage < policy.min_coverage || tumor.coverage < policy.min_coverage {
        return MarkerDecision::Skipped(SkipReason::LowCoverage);
    }

    let normal_call = normal.most_likely();
    if policy.normal_homozygous_only && normal_call == Genotype::Het {
        return MarkerDecision::Skipped(SkipReason::HeterozygousNormal);
    }

    if normal_call == tumor.most_likely() {
        MarkerDecision::Concordant
    } else {
        MarkerDecision::Discordant
    }
}
