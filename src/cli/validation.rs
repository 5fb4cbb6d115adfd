// validation.rs - Input validation utilities

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::cli::args::Args;
use crate::core::{ComparisonPolicy, LikelihoodParams, DEFAULT_THREADS};
use crate::errors::{Error, Result};
use crate::output::OutputFormat;

pub const DEFAULT_OUTPUT: &str = "concordance.tsv";
pub const DEFAULT_BENCHMARKS_FILE: &str = "benchmarks.tsv";

#[derive(Debug)]
pub struct ValidationResult {
    pub policy: ComparisonPolicy,
    pub threads: usize,
    pub format: OutputFormat,
    pub output: String,
    pub markers: PathBuf,
    pub cache_dir: Option<PathBuf>,
    pub benchmarks_file: PathBuf,
    pub sample_include_regex: Option<Regex>,
    pub sample_exclude_regex: Option<Regex>,
}

fn compile_regex(pattern: &Option<String>, option: &str) -> Result<Option<Regex>> {
    pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|e| Error::config(format!("invalid {} regex: {}", option, e)))
        })
        .transpose()
}

fn require_file(path: &str, option: &str) -> Result<()> {
    if !Path::new(path).is_file() {
        return Err(Error::config(format!("{} file not found: {}", option, path)));
    }
    Ok(())
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult> {
    if args.verbose && args.quiet {
        return Err(Error::config("--verbose and --quiet are mutually exclusive"));
    }

    let markers = args
        .markers
        .as_deref()
        .ok_or_else(|| Error::config("--markers is required"))?;
    require_file(markers, "--markers")?;

    let has_tumors = !args.tumor.is_empty() || args.tumors_list.is_some();
    let has_normals = !args.normal.is_empty() || args.normals_list.is_some();
    if args.cache_only {
        if !has_tumors && !has_normals {
            return Err(Error::config(
                "--cache-only needs at least one sample (--tumor, --normal or a list file)",
            ));
        }
        if args.cache_dir.is_none() {
            return Err(Error::config(
                "--cache-only requires --cache-dir to specify where to save the caches",
            ));
        }
    } else {
        if !has_tumors {
            return Err(Error::config("no tumors given: use --tumor or --tumors-list"));
        }
        if !has_normals {
            return Err(Error::config("no normals given: use --normal or --normals-list"));
        }
    }
    for (list, option) in [
        (&args.tumors_list, "--tumors-list"),
        (&args.normals_list, "--normals-list"),
    ] {
        if let Some(path) = list {
            require_file(path, option)?;
        }
    }

    if args.num_tumors == Some(0) || args.num_normals == Some(0) {
        return Err(Error::config("--num-tumors and --num-normals must be at least 1"));
    }

    let threads = args.threads.unwrap_or(DEFAULT_THREADS);
    if threads == 0 {
        return Err(Error::config("--threads must be at least 1"));
    }

    let defaults = LikelihoodParams::default();
    let policy = ComparisonPolicy::new(
        args.min_cov.unwrap_or(ComparisonPolicy::default().min_coverage),
        args.normal_homozygous_markers_only,
        LikelihoodParams {
            min_mapping_quality: args
                .min_mapping_quality
                .unwrap_or(defaults.min_mapping_quality),
            min_base_quality: args.min_base_quality.unwrap_or(defaults.min_base_quality),
        },
    )?;

    let format: OutputFormat = match args.format.as_deref() {
        Some(format) => format.parse()?,
        None => OutputFormat::Tsv,
    };

    Ok(ValidationResult {
        policy,
        threads,
        format,
        output: args
            .output
            .clone()
            .unwrap_or_else(|| DEFAULT_OUTPUT.to_string()),
        markers: PathBuf::from(markers),
        cache_dir: args.cache_dir.as_ref().map(PathBuf::from),
        benchmarks_file: PathBuf::from(
            args.benchmarks_file
                .as_deref()
                .unwrap_or(DEFAULT_BENCHMARKS_FILE),
        ),
        sample_include_regex: compile_regex(&args.include_samples, "--include-samples")?,
        sample_exclude_regex: compile_regex(&args.exclude_samples, "--exclude-samples")?,
    })
}
