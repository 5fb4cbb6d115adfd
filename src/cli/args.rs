// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// conpair - Fast tumor/normal concordance over a SNP marker panel
pub struct Args {
    /// tumor pileup, .lz4 likelihood cache or glob pattern (repeatable)
    #[argh(option)]
    pub tumor: Vec<String>,

    /// normal pileup, .lz4 likelihood cache or glob pattern (repeatable)
    #[argh(option)]
    pub normal: Vec<String>,

    /// file listing tumor paths, one per line
    #[argh(option)]
    pub tumors_list: Option<String>,

    /// file listing normal paths, one per line
    #[argh(option)]
    pub normals_list: Option<String>,

    /// use only the first N tumors
    #[argh(option)]
    pub num_tumors: Option<usize>,

    /// use only the first N normals
    #[argh(option)]
    pub num_normals: Option<usize>,

    /// marker panel file (chrom pos ref alt)
    #[argh(option)]
    pub markers: Option<String>,

    /// output file, - for stdout (default: concordance.tsv)
    #[argh(option)]
    pub output: Option<String>,

    /// output format: tsv, json (default: tsv)
    #[argh(option)]
    pub format: Option<String>,

    /// number of worker threads (default: 4)
    #[argh(option)]
    pub threads: Option<usize>,

    /// minimum mapping quality of a read (default: 10)
    #[argh(option)]
    pub min_mapping_quality: Option<u8>,

    /// minimum base quality of a read (default: 20)
    #[argh(option)]
    pub min_base_quality: Option<u8>,

    /// minimum coverage in both samples for a marker to count (default: 10)
    #[argh(option)]
    pub min_cov: Option<u32>,

    /// only count markers where the normal is homozygous
    #[argh(switch)]
    pub normal_homozygous_markers_only: bool,

    /// take sample names from <file name>.json manifests
    #[argh(switch)]
    pub use_manifests: bool,

    /// directory holding the manifests (default: next to each sample)
    #[argh(option)]
    pub manifest_dir: Option<String>,

    /// include only samples matching regex pattern
    #[argh(option)]
    pub include_samples: Option<String>,

    /// exclude samples matching regex pattern
    #[argh(option)]
    pub exclude_samples: Option<String>,

    /// append run timing to the benchmarks file
    #[argh(switch)]
    pub save_benchmarks: bool,

    /// benchmarks file (default: benchmarks.tsv)
    #[argh(option)]
    pub benchmarks_file: Option<String>,

    /// derive likelihoods for every input sample, write .lz4 caches and exit
    #[argh(switch)]
    pub cache_only: bool,

    /// directory for .lz4 likelihood caches written by --cache-only
    #[argh(option)]
    pub cache_dir: Option<String>,

    /// user note to save with the caches for future reference
    #[argh(option)]
    pub cache_note: Option<String>,

    /// validate inputs without computation (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// hide progress bars
    #[argh(switch)]
    pub no_progress: bool,

    /// debug logging
    #[argh(switch, short = 'v')]
    pub verbose: bool,

    /// warnings and errors only
    #[argh(switch, short = 'q')]
    pub quiet: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}
