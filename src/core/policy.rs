// policy.rs - Comparison thresholds

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Read filters applied when deriving likelihoods from raw pileup data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikelihoodParams {
    pub min_mapping_quality: u8,
    pub min_base_quality: u8,
}

impl Default for LikelihoodParams {
    fn default() -> Self {
        Self {
            min_mapping_quality: 10,
            min_base_quality: 20,
        }
    }
}

/// Thresholds that decide whether a marker takes part in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonPolicy {
    /// Minimum informative reads required in both samples
    pub min_coverage: u32,
    /// Ignore markers where the normal sample calls heterozygous
    /// (keeps concordance stable under tumor copy-number changes)
    pub normal_homozygous_only: bool,
    pub likelihood: LikelihoodParams,
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        Self {
            min_coverage: 10,
            normal_homozygous_only: false,
            likelihood: LikelihoodParams::default(),
        }
    }
}

impl ComparisonPolicy {
    pub fn new(
        min_coverage: u32,
        normal_homozygous_only: bool,
        likelihood: LikelihoodParams,
    ) -> Result<Self> {
        let policy = Self {
            min_coverage,
            normal_homozygous_only,
            likelihood,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_coverage == 0 {
            return Err(Error::InvalidPolicy {
                msg: "min_coverage must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn description(&self) -> String {
        format!(
            "min coverage {}, MAPQ >= {}, BQ >= {}{}",
            self.min_coverage,
            self.likelihood.min_mapping_quality,
            self.likelihood.min_base_quality,
            if self.normal_homozygous_only {
                ", homozygous normal markers only"
            } else {
                ""
            }
        )
    }
}
