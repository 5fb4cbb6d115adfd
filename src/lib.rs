// lib.rs - conpair library root

//! # conpair - Tumor/normal sample concordance over a fixed SNP marker panel
//!
//! This library decides whether a tumor and a normal sequencing readout come
//! from the same individual by comparing the most likely genotype at every
//! marker of a panel. It is meant to catch sample swaps in sequencing
//! pipelines, across whole batches of tumor x normal combinations.
//!
//! ## Features
//!
//! - **Per-marker decision**: coverage threshold and optional homozygous-normal filter
//! - **Batch orchestration**: every tumor against every normal on a bounded worker pool
//! - **Per-sample memoization**: likelihoods derived once per sample, never once per pair
//! - **Likelihood caches**: LZ4-compressed tables that skip pileup parsing on reruns
//! - **Explicit degeneracy**: pairs without usable markers report an undefined concordance
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use conpair::prelude::*;
//! use std::path::Path;
//!
//! let panel = MarkerPanel::from_file(Path::new("markers.txt"))?;
//! let policy = ComparisonPolicy::default();
//! let source = PileupLikelihoodSource;
//! let mut cache = LikelihoodCache::new(&panel, &source, policy.likelihood);
//!
//! let tumors = vec![SampleRef::new("T1", "T1.pileup")];
//! let normals = vec![SampleRef::new("N1", "N1.pileup"), SampleRef::new("N2", "N2.pileup")];
//!
//! let report = BatchOrchestrator::new(policy, 4)?.run(&tumors, &normals, &mut cache)?;
//! for record in &report.results {
//!     println!("{} {} {:?}", record.tumor_id, record.normal_id, record.concordance());
//! }
//! # Ok::<(), conpair::errors::Error>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod errors;
pub mod output;
pub mod sources;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{compare_pair, decide_marker, MarkerDecision, PairResult};
    pub use crate::core::{BatchOrchestrator, BatchReport, PairOutcome, PairRecord, RunContext};
    pub use crate::core::{ComparisonPolicy, LikelihoodCache, LikelihoodParams};
    pub use crate::data::{Genotype, GenotypeLikelihoodRecord, SampleLikelihoodTable};
    pub use crate::data::{Marker, MarkerId, MarkerPanel, SampleRef};
    pub use crate::errors::{Error, Result};
    pub use crate::output::{write_results, OutputFormat};
    pub use crate::sources::{LikelihoodSource, PileupLikelihoodSource};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use core::{BatchOrchestrator, ComparisonPolicy, LikelihoodCache, PairResult};
pub use data::{MarkerPanel, SampleLikelihoodTable, SampleRef};
pub use errors::{Error, Result};
pub use sources::{LikelihoodSource, PileupLikelihoodSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "conpair v{} - Tumor/normal concordance over a SNP marker panel",
        VERSION
    )
}
