// traits.rs - Pluggable genotype likelihood derivation

use std::fmt::Debug;
use std::path::Path;

use crate::core::policy::LikelihoodParams;
use crate::data::{MarkerPanel, SampleLikelihoodTable};
use crate::errors::Result;

/// Strategy for turning one sample's raw sequencing data into per-marker
/// genotype likelihoods.
///
/// Implementations are shared across worker threads and must not keep
/// per-sample state between calls.
pub trait LikelihoodSource: Send + Sync + Debug {
    /// Derive the likelihood table for the markers of `panel` from the raw
    /// data at `sample`. Markers without informative reads are left out.
    fn derive(
        &self,
        panel: &MarkerPanel,
        sample: &Path,
        params: &LikelihoodParams,
    ) -> Result<SampleLikelihoodTable>;

    /// Get a human-readable name for this source
    fn name(&self) -> &'static str;

    /// Get a description of this source
    fn description(&self) -> &'static str {
        ""
    }
}
