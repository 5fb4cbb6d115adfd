// sources/mod.rs - Genotype likelihood sources

pub mod pileup;
pub mod serialized;
pub mod traits;

pub use pileup::PileupLikelihoodSource;
pub use serialized::{
    cache_path_for, is_serialized_table, load_table, read_cache_file, write_cache_file, CacheMetadata,
    LikelihoodCacheFile, LIKELIHOOD_CACHE_EXTENSION,
};
pub use traits::LikelihoodSource;
