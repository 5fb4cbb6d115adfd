// mod.rs - Core logic module

pub mod batch;
pub mod cache;
pub mod concordance;
pub mod decision;
pub mod policy;

use indicatif::{ProgressBar, ProgressStyle};

// Re-export main types for convenience
pub use batch::{
    build_pairs, BatchOrchestrator, BatchReport, BatchState, PairOutcome, PairRecord, PairTask,
    RunContext, SamplePair, DEFAULT_THREADS,
};
pub use cache::{CacheStats, LikelihoodCache};
pub use concordance::{compare_pair, PairResult};
pub use decision::{decide_marker, MarkerDecision, SkipReason};
pub use policy::{ComparisonPolicy, LikelihoodParams};

/// Stderr progress bar in the house style, or a hidden one
pub(crate) fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} ETA: {eta}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
