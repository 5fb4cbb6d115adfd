// mod.rs - Data structures module

pub mod likelihood;
pub mod loaders;
pub mod marker;
pub mod samples;

// Re-export main types for convenience
pub use likelihood::{Genotype, GenotypeLikelihoodRecord, SampleLikelihoodTable};
pub use marker::{Marker, MarkerId, MarkerPanel};
pub use samples::{collect_samples, sample_name, NamingOptions, SampleRef, SampleSelection};
