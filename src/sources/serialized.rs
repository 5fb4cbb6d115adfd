// serialized.rs - LZ4-compressed likelihood table cache files

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::policy::LikelihoodParams;
use crate::data::{MarkerPanel, SampleLikelihoodTable};
use crate::errors::{Error, Result};

/// Extension that marks a sample path as a serialized likelihood table
pub const LIKELIHOOD_CACHE_EXTENSION: &str = "lz4";

/// Bumped whenever the on-disk layout changes
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheMetadata {
    pub version: String,
    pub format_version: u32,
    pub created: String,
    pub user_note: Option<String>,
    pub source_path: PathBuf,
    pub params: LikelihoodParams,
    pub total_markers: usize,
    pub panel_fingerprint: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikelihoodCacheFile {
    pub metadata: CacheMetadata,
    pub table: SampleLikelihoodTable,
}

pub fn is_serialized_table(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(LIKELIHOOD_CACHE_EXTENSION))
        .unwrap_or(false)
}

/// Cache file name for a raw sample: `<file name>.<crc32 of the full path>.lz4`
/// inside `cache_dir`. Equal file names from different directories get
/// different cache files.
pub fn cache_path_for(sample: &Path, cache_dir: &Path) -> PathBuf {
    let file_name = sample
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string());
    let path_tag = crc32fast::hash(sample.to_string_lossy().as_bytes());
    cache_dir.join(format!(
        "{}.{:08x}.{}",
        file_name, path_tag, LIKELIHOOD_CACHE_EXTENSION
    ))
}

/// Write `table` with its provenance to `path`.
/// Returns the compressed size in bytes.
pub fn write_cache_file(
    path: &Path,
    table: &SampleLikelihoodTable,
    panel: &MarkerPanel,
    params: &LikelihoodParams,
    source_path: &Path,
    user_note: Option<&str>,
) -> Result<usize> {
    let metadata = CacheMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        format_version: CACHE_FORMAT_VERSION,
        created: chrono::Utc::now()
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        user_note: user_note.map(str::to_string),
        source_path: source_path.to_path_buf(),
        params: *params,
        total_markers: panel.len(),
        panel_fingerprint: panel.fingerprint(),
    };

    // Borrowing twin of LikelihoodCacheFile, same field order on the wire
    #[derive(Serialize)]
    struct CacheFileRef<'a> {
        metadata: &'a CacheMetadata,
        table: &'a SampleLikelihoodTable,
    }

    let encoded = bincode::serialize(&CacheFileRef {
        metadata: &metadata,
        table,
    })
    .map_err(|e| Error::CacheSerialize { msg: e.to_string() })?;

    let compressed = lz4_flex::compress_prepend_size(&encoded);
    std::fs::write(path, &compressed).map_err(|e| Error::io(path, e))?;

    debug!(
        "💾 {}: {} records, {} KB",
        path.display(),
        table.len(),
        compressed.len() / 1024
    );
    Ok(compressed.len())
}

/// Decode a cache file without checking it against a panel
pub fn read_cache_file(path: &Path) -> Result<LikelihoodCacheFile> {
    let compressed = std::fs::read(path).map_err(|e| Error::io(path, e))?;

    let decompressed =
        lz4_flex::decompress_size_prepended(&compressed).map_err(|e| Error::CorruptCache {
            path: path.to_path_buf(),
            msg: format!("LZ4 decompression failed: {}", e),
        })?;

    let file: LikelihoodCacheFile =
        bincode::deserialize(&decompressed).map_err(|e| Error::CorruptCache {
            path: path.to_path_buf(),
            msg: format!("decoding failed: {}", e),
        })?;

    if file.metadata.format_version != CACHE_FORMAT_VERSION {
        return Err(Error::CacheVersion {
            path: path.to_path_buf(),
            found: file.metadata.format_version,
            expected: CACHE_FORMAT_VERSION,
        });
    }

    Ok(file)
}

/// Load the table stored at `path`, rejecting files built for another panel
pub fn load_table(
    path: &Path,
    panel: &MarkerPanel,
    params: &LikelihoodParams,
) -> Result<SampleLikelihoodTable> {
    let start = Instant::now();
    let file = read_cache_file(path)?;

    let expected = panel.fingerprint();
    if file.metadata.panel_fingerprint != expected {
        return Err(Error::CachePanelMismatch {
            path: path.to_path_buf(),
            found: file.metadata.panel_fingerprint,
            expected,
        });
    }

    if file.metadata.params != *params {
        warn!(
            "⚠️  {} was built with MAPQ >= {}, BQ >= {} (current: MAPQ >= {}, BQ >= {})",
            path.display(),
            file.metadata.params.min_mapping_quality,
            file.metadata.params.min_base_quality,
            params.min_mapping_quality,
            params.min_base_quality
        );
    }

    debug!(
        "📂 Loaded {} ({} records) in {:.3}s",
        path.display(),
        file.table.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(file.table)
}
