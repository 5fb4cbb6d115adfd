// cache.rs - Per-sample likelihood table memoization

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::core::policy::LikelihoodParams;
use crate::core::progress_bar;
use crate::data::{MarkerPanel, SampleLikelihoodTable};
use crate::errors::{Error, Result};
use crate::sources::serialized::{self, cache_path_for, is_serialized_table};
use crate::sources::LikelihoodSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Tables derived from raw data
    pub derived: usize,
    /// Tables read from serialized cache files
    pub loaded: usize,
    /// Requests answered from memory
    pub hits: usize,
}

/// Holds at most one likelihood table per distinct sample path.
///
/// Tables are handed out as `Arc`s and never mutated after insertion, so
/// any number of concurrent comparisons can read the same table.
pub struct LikelihoodCache<'a> {
    panel: &'a MarkerPanel,
    source: &'a dyn LikelihoodSource,
    params: LikelihoodParams,
    tables: HashMap<PathBuf, Arc<SampleLikelihoodTable>>,
    stats: CacheStats,
    show_progress: bool,
}

fn produce_table(
    path: &Path,
    panel: &MarkerPanel,
    source: &dyn LikelihoodSource,
    params: &LikelihoodParams,
) -> Result<SampleLikelihoodTable> {
    if is_serialized_table(path) {
        serialized::load_table(path, panel, params)
    } else {
        source.derive(panel, path, params)
    }
}

impl<'a> LikelihoodCache<'a> {
    pub fn new(
        panel: &'a MarkerPanel,
        source: &'a dyn LikelihoodSource,
        params: LikelihoodParams,
    ) -> Self {
        Self {
            panel,
            source,
            params,
            tables: HashMap::new(),
            stats: CacheStats::default(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn panel(&self) -> &MarkerPanel {
        self.panel
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.tables.contains_key(path)
    }

    fn record(&mut self, path: PathBuf, table: SampleLikelihoodTable) -> Arc<SampleLikelihoodTable> {
        if is_serialized_table(&path) {
            self.stats.loaded += 1;
        } else {
            self.stats.derived += 1;
        }
        let table = Arc::new(table);
        self.tables.insert(path, Arc::clone(&table));
        table
    }

    /// Table for `path`, producing it on first request
    pub fn get(&mut self, path: &Path) -> Result<Arc<SampleLikelihoodTable>> {
        if let Some(table) = self.tables.get(path) {
            self.stats.hits += 1;
            return Ok(Arc::clone(table));
        }
        let table = produce_table(path, self.panel, self.source, &self.params)?;
        Ok(self.record(path.to_path_buf(), table))
    }

    /// Produce every table not yet held, in parallel.
    ///
    /// Fails on the first sample that cannot be read; nothing is inserted
    /// in that case.
    pub fn resolve_all(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut seen = HashSet::new();
        let missing: Vec<&PathBuf> = paths
            .iter()
            .filter(|path| !self.contains(path) && seen.insert(*path))
            .collect();

        if missing.is_empty() {
            info!("🎯 All {} sample tables already resolved", paths.len());
            return Ok(());
        }

        info!(
            "🧬 Resolving {} sample tables ({} requested)",
            missing.len(),
            paths.len()
        );
        let start = Instant::now();
        let pb = progress_bar(missing.len() as u64, self.show_progress);

        let (panel, source, params) = (self.panel, self.source, self.params);
        let produced: Result<Vec<(PathBuf, SampleLikelihoodTable)>> = missing
            .par_iter()
            .map(|path| -> Result<(PathBuf, SampleLikelihoodTable)> {
                let table = produce_table(path, panel, source, &params)?;
                pb.inc(1);
                Ok(((*path).clone(), table))
            })
            .collect();

        let produced = match produced {
            Ok(produced) => produced,
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };
        pb.finish_and_clear();

        let count = produced.len();
        for (path, table) in produced {
            self.record(path, table);
        }

        info!(
            "✅ Resolved {} tables in {:.2}s ({} derived, {} loaded from cache files)",
            count,
            start.elapsed().as_secs_f64(),
            self.stats.derived,
            self.stats.loaded
        );
        Ok(())
    }

    /// Write every table derived from raw data into `cache_dir`, one file per
    /// sample path (see `cache_path_for`). Tables that came from cache files
    /// are not written again.
    pub fn export(&self, cache_dir: &Path, note: Option<&str>) -> Result<Vec<PathBuf>> {
        let mut sources: Vec<(&PathBuf, &Arc<SampleLikelihoodTable>)> = self
            .tables
            .iter()
            .filter(|(path, _)| !is_serialized_table(path))
            .collect();
        sources.sort_by(|a, b| a.0.cmp(b.0));

        // Two samples must never share a cache file
        let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::with_capacity(sources.len());
        let mut targets = Vec::with_capacity(sources.len());
        for (path, _) in &sources {
            let target = cache_path_for(path, cache_dir);
            if let Some(other) = claimed.insert(target.clone(), *path) {
                return Err(Error::config(format!(
                    "cache file {} would hold both {} and {}",
                    target.display(),
                    other.display(),
                    path.display()
                )));
            }
            targets.push(target);
        }

        std::fs::create_dir_all(cache_dir).map_err(|e| Error::io(cache_dir, e))?;

        let (panel, params) = (self.panel, self.params);
        sources
            .par_iter()
            .zip(targets.par_iter())
            .map(|((path, table), target)| -> Result<PathBuf> {
                serialized::write_cache_file(target, table, panel, &params, path, note)?;
                Ok(target.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GenotypeLikelihoodRecord, Marker, MarkerId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl LikelihoodSource for CountingSource {
        fn derive(
            &self,
            panel: &MarkerPanel,
            sample: &Path,
            _params: &LikelihoodParams,
        ) -> Result<SampleLikelihoodTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if sample.to_string_lossy().contains("missing") {
                return Err(Error::io(
                    sample,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                ));
            }
            Ok(panel
                .iter()
                .map(|m| {
                    (
                        m.id.clone(),
                        GenotypeLikelihoodRecord::new(20, [-0.1, -3.0, -9.0]),
                    )
                })
                .collect())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    /// Calls hom-ref for samples under `a/`, hom-alt for everything else
    #[derive(Debug)]
    struct NamedCallSource;

    impl LikelihoodSource for NamedCallSource {
        fn derive(
            &self,
            panel: &MarkerPanel,
            sample: &Path,
            _params: &LikelihoodParams,
        ) -> Result<SampleLikelihoodTable> {
            let likelihoods = if sample.starts_with("a") {
                [-0.1, -3.0, -9.0]
            } else {
                [-9.0, -3.0, -0.1]
            };
            Ok(panel
                .iter()
                .map(|m| (m.id.clone(), GenotypeLikelihoodRecord::new(20, likelihoods)))
                .collect())
        }

        fn name(&self) -> &'static str {
            "named"
        }
    }

    fn panel() -> MarkerPanel {
        MarkerPanel::new(vec![
            Marker::new(MarkerId::new("1", 100), b'A', b'G'),
            Marker::new(MarkerId::new("2", 200), b'C', b'T'),
        ])
        .unwrap()
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_get_derives_once_per_path() {
        let panel = panel();
        let source = CountingSource::default();
        let mut cache = LikelihoodCache::new(&panel, &source, LikelihoodParams::default());

        let a = cache.get(Path::new("T1.pileup")).unwrap();
        let b = cache.get(Path::new("T1.pileup")).unwrap();
        cache.get(Path::new("N1.pileup")).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.stats(),
            CacheStats {
                derived: 2,
                loaded: 0,
                hits: 1
            }
        );
    }

    #[test]
    fn test_resolve_all_is_linear_in_samples() {
        let panel = panel();
        let source = CountingSource::default();
        let mut cache = LikelihoodCache::new(&panel, &source, LikelihoodParams::default());

        let tumors = paths(&["T1", "T2", "T3"]);
        let normals = paths(&["N1", "N2", "N3", "N4"]);
        let mut all = tumors.clone();
        all.extend(normals.iter().cloned());
        cache.resolve_all(&all).unwrap();

        for t in &tumors {
            for n in &normals {
                cache.get(t).unwrap();
                cache.get(n).unwrap();
            }
        }

        assert_eq!(source.calls.load(Ordering::SeqCst), tumors.len() + normals.len());
        assert_eq!(cache.len(), 7);
        assert_eq!(cache.stats().hits, 2 * tumors.len() * normals.len());
    }

    #[test]
    fn test_resolve_all_skips_duplicates_and_known_paths() {
        let panel = panel();
        let source = CountingSource::default();
        let mut cache = LikelihoodCache::new(&panel, &source, LikelihoodParams::default());

        cache.get(Path::new("S1")).unwrap();
        cache.resolve_all(&paths(&["S1", "S2", "S2", "S3"])).unwrap();
        cache.resolve_all(&paths(&["S3", "S1"])).unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_resolve_all_fails_fast_without_inserting() {
        let panel = panel();
        let source = CountingSource::default();
        let mut cache = LikelihoodCache::new(&panel, &source, LikelihoodParams::default());

        let result = cache.resolve_all(&paths(&["T1", "missing.pileup", "N1"]));
        assert!(matches!(result, Err(Error::Io { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_exported_tables_load_without_derivation() {
        let dir = TempDir::new().unwrap();
        let panel = panel();
        let params = LikelihoodParams::default();

        let source = CountingSource::default();
        let mut cache = LikelihoodCache::new(&panel, &source, params);
        cache.resolve_all(&paths(&["runs/T1.pileup", "runs/N1.pileup"])).unwrap();
        let written = cache.export(dir.path(), Some("unit test")).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(
            written[0],
            cache_path_for(Path::new("runs/N1.pileup"), dir.path())
        );

        let fresh_source = CountingSource::default();
        let mut fresh = LikelihoodCache::new(&panel, &fresh_source, params);
        fresh.resolve_all(&written).unwrap();

        assert_eq!(fresh_source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(fresh.stats().loaded, 2);
        let original = cache.get(Path::new("runs/T1.pileup")).unwrap();
        let reloaded = fresh
            .get(&cache_path_for(Path::new("runs/T1.pileup"), dir.path()))
            .unwrap();
        assert_eq!(*original, *reloaded);
    }

    #[test]
    fn test_export_keeps_same_named_samples_apart() {
        let dir = TempDir::new().unwrap();
        let panel = panel();
        let params = LikelihoodParams::default();

        let source = NamedCallSource;
        let mut cache = LikelihoodCache::new(&panel, &source, params);
        cache.resolve_all(&paths(&["a/S1.pileup", "b/S1.pileup"])).unwrap();
        let written = cache.export(dir.path(), None).unwrap();

        assert_eq!(written.len(), 2);
        assert_ne!(written[0], written[1]);
        let on_disk = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(on_disk, 2);

        // Each file still holds the table of its own sample
        for sample in ["a/S1.pileup", "b/S1.pileup"] {
            let file = serialized::read_cache_file(&cache_path_for(Path::new(sample), dir.path()))
                .unwrap();
            assert_eq!(file.metadata.source_path, PathBuf::from(sample));
            assert_eq!(file.table, *cache.get(Path::new(sample)).unwrap());
        }
    }
}
