// samples.rs - Sample path lists, naming and manifest lookup

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::Regex;
use serde::Serialize;

use crate::errors::{Error, Result};

/// A sample taking part in a batch: display id plus the path it is loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRef {
    pub id: String,
    pub path: PathBuf,
}

impl SampleRef {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(id: S, path: P) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// How sample ids are derived from sample paths
#[derive(Debug, Clone, Default)]
pub struct NamingOptions {
    pub use_manifests: bool,
    pub manifest_dir: Option<PathBuf>,
}

/// Default sample id: file name up to the first '.'
pub fn default_sample_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name.split('.').next().unwrap_or_default().to_string()
}

/// Look for `<dir>/<file name>.json` and return its top-level `id` field.
fn manifest_sample_name(path: &Path, manifest_dir: Option<&Path>) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let dir = match manifest_dir {
        Some(dir) => dir.to_path_buf(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let manifest_path = dir.join(format!("{}.json", file_name));

    let content = std::fs::read_to_string(&manifest_path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    let id = match value.get("id")? {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => return None,
        other @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_)) => other.to_string(),
        _ => return None,
    };

    debug!(
        "Sample id '{}' for {} taken from {}",
        id,
        path.display(),
        manifest_path.display()
    );
    Some(id)
}

/// Resolve the sample id for a path, falling back to the file name whenever
/// no usable manifest exists.
pub fn sample_name(path: &Path, options: &NamingOptions) -> String {
    if options.use_manifests {
        if let Some(id) = manifest_sample_name(path, options.manifest_dir.as_deref()) {
            return id;
        }
    }
    default_sample_name(path)
}

/// Load sample paths from a file (one path per line, blank lines ignored)
pub fn load_path_list(file_path: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(file_path).map_err(|e| Error::io(file_path, e))?;
    let reader = BufReader::new(file);

    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| Error::io(file_path, e))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            paths.push(PathBuf::from(trimmed));
        }
    }
    Ok(paths)
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Expand glob patterns among the given inputs; plain paths pass through.
///
/// Matches of one pattern are sorted. A pattern that matches nothing leaves
/// the role without samples.
pub fn expand_patterns(inputs: &[String], role: &'static str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(inputs.len());
    for input in inputs {
        if !is_glob_pattern(input) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let entries = glob::glob(input)
            .map_err(|e| Error::config(format!("invalid {} pattern '{}': {}", role, input, e)))?;
        let mut matches = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::io(&path, e.into_error())
            })?;
            matches.push(path);
        }
        if matches.is_empty() {
            warn!("⚠️  No {} files match '{}'", role, input);
            return Err(Error::NoSamples { role });
        }
        matches.sort();

        debug!("{} pattern '{}' matched {} files", role, input, matches.len());
        paths.extend(matches);
    }
    Ok(paths)
}

/// Drop repeated paths, keeping the first occurrence
pub fn dedup_paths(paths: Vec<PathBuf>, role: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let before = paths.len();
    let unique: Vec<PathBuf> = paths
        .into_iter()
        .filter(|path| seen.insert(path.clone()))
        .collect();

    if unique.len() != before {
        warn!(
            "⚠️  Dropped {} duplicate {} path(s)",
            before - unique.len(),
            role
        );
    }
    unique
}

/// Everything needed to turn raw path inputs into labelled samples
#[derive(Debug, Default)]
pub struct SampleSelection<'a> {
    pub limit: Option<usize>,
    pub naming: NamingOptions,
    pub include: Option<&'a Regex>,
    pub exclude: Option<&'a Regex>,
}

/// Assemble the labelled sample list for one role ("tumor" or "normal").
///
/// Explicit paths or glob patterns win over a list file. Duplicates are
/// dropped, the list is cut to `limit`, and id filters run last.
pub fn collect_samples(
    explicit: &[String],
    list_file: Option<&Path>,
    role: &'static str,
    selection: &SampleSelection<'_>,
) -> Result<Vec<SampleRef>> {
    let paths = if !explicit.is_empty() {
        expand_patterns(explicit, role)?
    } else if let Some(list) = list_file {
        load_path_list(list)?
    } else {
        return Err(Error::NoSamples { role });
    };

    let mut paths = dedup_paths(paths, role);
    if let Some(limit) = selection.limit {
        paths.truncate(limit);
    }

    let samples: Vec<SampleRef> = paths
        .into_iter()
        .map(|path| SampleRef::new(sample_name(&path, &selection.naming), path))
        .filter(|sample| {
            if let Some(regex) = selection.include {
                if !regex.is_match(&sample.id) {
                    return false;
                }
            }
            if let Some(regex) = selection.exclude {
                if regex.is_match(&sample.id) {
                    return false;
                }
            }
            true
        })
        .collect();

    if samples.is_empty() {
        return Err(Error::NoSamples { role });
    }
    Ok(samples)
}
