// inspector.rs - Likelihood cache inspector
// Features: metadata summary, call distribution, per-chromosome coverage, panel compatibility

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use argh::FromArgs;

use conpair::data::{Genotype, MarkerPanel};
use conpair::errors::{Error, Result};
use conpair::sources::{read_cache_file, LikelihoodCacheFile};

// ============================================================================
// CLI ARGUMENTS
// ============================================================================

#[derive(FromArgs)]
/// Inspect conpair likelihood cache files (.lz4)
struct Args {
    /// path to the cache file (.lz4)
    #[argh(option)]
    cache: String,

    /// show per-chromosome details for every chromosome
    #[argh(switch)]
    detailed: bool,

    /// show the records of one chromosome
    #[argh(option)]
    show_chrom: Option<String>,

    /// check that the cache was built for this marker panel
    #[argh(option)]
    check_panel: Option<String>,

    /// validate cache integrity
    #[argh(switch)]
    validate: bool,

    /// export per-chromosome summary to TSV file
    #[argh(option)]
    export_summary: Option<String>,

    /// show top N chromosomes by record count (default: 10)
    #[argh(option, default = "10")]
    top_chroms: usize,

    /// quiet mode - minimal output
    #[argh(switch)]
    quiet: bool,
}

// ============================================================================
// ANALYSIS FUNCTIONS
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
struct ChromSummary {
    records: usize,
    calls: [usize; 3],
    total_coverage: u64,
}

impl ChromSummary {
    fn add(&mut self, coverage: u32, call: Genotype) {
        self.records += 1;
        self.calls[call as usize] += 1;
        self.total_coverage += coverage as u64;
    }

    fn mean_coverage(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.total_coverage as f64 / self.records as f64
        }
    }
}

fn summarize_by_chrom(cache: &LikelihoodCacheFile) -> BTreeMap<&str, ChromSummary> {
    let mut by_chrom: BTreeMap<&str, ChromSummary> = BTreeMap::new();
    for (id, record) in cache.table.iter() {
        by_chrom
            .entry(id.chrom.as_str())
            .or_default()
            .add(record.coverage, record.most_likely());
    }
    by_chrom
}

fn analyze_cache_overview(cache: &LikelihoodCacheFile, compressed_size: u64) {
    let meta = &cache.metadata;
    println!("\n=== CACHE SUMMARY ===");
    println!("Version: {} (format v{})", meta.version, meta.format_version);
    println!("Created: {}", meta.created);
    println!("Source: {}", meta.source_path.display());
    if let Some(note) = &meta.user_note {
        println!("📝 Note: {}", note);
    }
    println!(
        "Read filters: MAPQ >= {}, BQ >= {}",
        meta.params.min_mapping_quality, meta.params.min_base_quality
    );
    println!(
        "Panel: {} markers (fingerprint {:08x})",
        meta.total_markers, meta.panel_fingerprint
    );
    println!(
        "Records: {} ({:.1}% of panel observed)",
        cache.table.len(),
        if meta.total_markers > 0 {
            cache.table.len() as f64 / meta.total_markers as f64 * 100.0
        } else {
            0.0
        }
    );
    println!("File size: {} KB", compressed_size / 1024);
}

fn analyze_calls(cache: &LikelihoodCacheFile) {
    let mut coverages: Vec<u32> = cache.table.iter().map(|(_, r)| r.coverage).collect();
    if coverages.is_empty() {
        println!("\n⚠️  Cache holds no records");
        return;
    }
    coverages.sort_unstable();

    let mut calls = [0usize; 3];
    for (_, record) in cache.table.iter() {
        calls[record.most_likely() as usize] += 1;
    }

    println!("\n=== GENOTYPE CALLS ===");
    for (index, count) in calls.iter().enumerate() {
        if let Some(genotype) = Genotype::from_index(index) {
            println!(
                "{}: {:>8} ({:.1}%)",
                genotype,
                count,
                *count as f64 / coverages.len() as f64 * 100.0
            );
        }
    }

    let total: u64 = coverages.iter().map(|&c| c as u64).sum();
    println!("\n=== COVERAGE ===");
    println!("Min: {}", coverages[0]);
    println!("Median: {}", coverages[coverages.len() / 2]);
    println!("Mean: {:.1}", total as f64 / coverages.len() as f64);
    println!("Max: {}", coverages[coverages.len() - 1]);
}

fn analyze_chrom_overview(cache: &LikelihoodCacheFile, args: &Args) {
    let by_chrom = summarize_by_chrom(cache);
    let mut chroms: Vec<_> = by_chrom.iter().collect();
    chroms.sort_by(|a, b| b.1.records.cmp(&a.1.records).then(a.0.cmp(b.0)));

    println!("\n=== CHROMOSOME OVERVIEW ===");
    println!(
        "{:<12} {:>8} {:>8} {:>8} {:>8} {:>10}",
        "Chrom", "Records", "AA", "AB", "BB", "Mean cov"
    );
    println!("{}", "=".repeat(60));

    let show_count = if args.detailed {
        chroms.len()
    } else {
        args.top_chroms.min(chroms.len())
    };
    for (chrom, summary) in chroms.iter().take(show_count) {
        println!(
            "{:<12} {:>8} {:>8} {:>8} {:>8} {:>10.1}",
            chrom,
            summary.records,
            summary.calls[0],
            summary.calls[1],
            summary.calls[2],
            summary.mean_coverage()
        );
    }
    if !args.detailed && chroms.len() > args.top_chroms {
        println!(
            "... and {} more chromosomes (use --detailed to show all)",
            chroms.len() - args.top_chroms
        );
    }
}

fn analyze_specific_chrom(cache: &LikelihoodCacheFile, chrom: &str) {
    println!("\n=== CHROMOSOME DETAILS: {} ===", chrom);

    let mut records: Vec<_> = cache
        .table
        .iter()
        .filter(|(id, _)| id.chrom == chrom)
        .collect();
    if records.is_empty() {
        println!("❌ Chromosome '{}' not found in cache", chrom);
        return;
    }
    records.sort_by_key(|(id, _)| id.pos);

    println!(
        "{:<14} {:>8} {:>6} {:>10} {:>10} {:>10}",
        "Position", "Coverage", "Call", "L(AA)", "L(AB)", "L(BB)"
    );
    println!("{}", "-".repeat(64));
    for (id, record) in records {
        println!(
            "{:<14} {:>8} {:>6} {:>10.2} {:>10.2} {:>10.2}",
            id.pos,
            record.coverage,
            record.most_likely().to_string(),
            record.likelihoods[0],
            record.likelihoods[1],
            record.likelihoods[2]
        );
    }
}

fn check_panel(cache: &LikelihoodCacheFile, panel_path: &str) -> Result<bool> {
    let panel = MarkerPanel::from_file(Path::new(panel_path))?;

    println!("\n=== PANEL COMPATIBILITY ===");
    let expected = panel.fingerprint();
    let found = cache.metadata.panel_fingerprint;
    if found == expected {
        println!("✅ Cache matches panel {} ({} markers)", panel_path, panel.len());
        return Ok(true);
    }

    let outside = cache
        .table
        .iter()
        .filter(|(id, _)| !panel.contains(id))
        .count();
    println!(
        "❌ Fingerprint mismatch: cache {:08x}, panel {:08x}",
        found, expected
    );
    println!(
        "   Cache panel: {} markers, given panel: {} markers, {} cached records outside the given panel",
        cache.metadata.total_markers,
        panel.len(),
        outside
    );
    Ok(false)
}

fn validate_cache_integrity(cache: &LikelihoodCacheFile) -> bool {
    println!("\n=== INTEGRITY CHECK ===");
    let mut issues = 0usize;

    if cache.table.len() > cache.metadata.total_markers {
        println!(
            "❌ {} records for a panel of {} markers",
            cache.table.len(),
            cache.metadata.total_markers
        );
        issues += 1;
    }

    for (id, record) in cache.table.iter() {
        if record.coverage == 0 {
            println!("❌ {}: zero coverage record", id);
            issues += 1;
        }
        if record.likelihoods.iter().any(|l| !l.is_finite() || *l > 0.0) {
            println!("❌ {}: likelihoods out of range {:?}", id, record.likelihoods);
            issues += 1;
        }
    }

    if issues == 0 {
        println!("✅ Cache is consistent ({} records checked)", cache.table.len());
        true
    } else {
        println!("❌ {} issues found", issues);
        false
    }
}

fn export_summary_to_tsv(cache: &LikelihoodCacheFile, output_path: &str) -> Result<()> {
    let path = Path::new(output_path);
    let file = File::create(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    let io_error = |e: std::io::Error| Error::Io {
        path: path.to_path_buf(),
        source: e,
    };

    writeln!(writer, "chrom\trecords\thom_ref\thet\thom_alt\tmean_coverage").map_err(io_error)?;
    for (chrom, summary) in summarize_by_chrom(cache) {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{:.2}",
            chrom,
            summary.records,
            summary.calls[0],
            summary.calls[1],
            summary.calls[2],
            summary.mean_coverage()
        )
        .map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;

    println!("✅ Summary exported to: {}", output_path);
    Ok(())
}

fn run(args: &Args) -> Result<bool> {
    let cache_path = Path::new(&args.cache);
    let cache = read_cache_file(cache_path)?;
    let compressed_size = std::fs::metadata(cache_path)
        .map(|m| m.len())
        .unwrap_or_default();

    if !args.quiet {
        analyze_cache_overview(&cache, compressed_size);
        analyze_calls(&cache);
        analyze_chrom_overview(&cache, args);
    }

    if let Some(chrom) = &args.show_chrom {
        analyze_specific_chrom(&cache, chrom);
    }

    let mut ok = true;
    if let Some(panel_path) = &args.check_panel {
        ok &= check_panel(&cache, panel_path)?;
    }
    if args.validate {
        ok &= validate_cache_integrity(&cache);
    }
    if let Some(export_path) = &args.export_summary {
        export_summary_to_tsv(&cache, export_path)?;
    }
    Ok(ok)
}

fn main() {
    let args: Args = argh::from_env();

    if !args.quiet {
        println!("🔍 conpair Likelihood Cache Inspector");
        println!("=====================================");
    }

    match run(&args) {
        Ok(true) => {
            if !args.quiet {
                println!("\n✅ Cache inspection completed successfully");
                println!("\nUsage examples:");
                println!("  --detailed                           Show all chromosomes");
                println!("  --show-chrom 7                       Show records of one chromosome");
                println!("  --check-panel markers.txt            Check the cache matches a panel");
                println!("  --validate                           Validate cache integrity");
                println!("  --export-summary out.tsv             Export summary to TSV");
                println!("  --quiet                              Minimal output mode");
            }
        }
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ ERROR: {}", e);
            std::process::exit(1);
        }
    }
}
