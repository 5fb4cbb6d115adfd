// main.rs - CLI entry point

use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn, LevelFilter};

use conpair::cli::Config;
use conpair::core::BatchState;
use conpair::data::{collect_samples, NamingOptions, SampleSelection};
use conpair::output::save_benchmarks;
use conpair::prelude::*;

const ACTION: &str = "concordance";

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn log_level(args: &Args) -> LevelFilter {
    if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    }
}

fn setup_logging(args: &Args) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(log_level(args))
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| Error::Config {
            msg: format!("failed to initialize logging: {}", e),
        })
}

fn run_main() -> Result<()> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        println!("{}", Config::generate_sample());
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Verbosity only comes from the command line, so logging starts first
    setup_logging(&args)?;
    info!("🚀 {}", conpair::get_info());

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let validation = validate_args(&args)?;
    let show_progress = !args.no_progress && !args.quiet;
    let total_start = Instant::now();

    let panel = MarkerPanel::from_file(&validation.markers)?;

    let naming = NamingOptions {
        use_manifests: args.use_manifests,
        manifest_dir: args.manifest_dir.as_ref().map(PathBuf::from),
    };
    let include = validation.sample_include_regex.as_ref();
    let exclude = validation.sample_exclude_regex.as_ref();
    let selection = |limit: Option<usize>| SampleSelection {
        limit,
        naming: naming.clone(),
        include,
        exclude,
    };

    let tumors = if args.tumor.is_empty() && args.tumors_list.is_none() {
        Vec::new()
    } else {
        collect_samples(
            &args.tumor,
            args.tumors_list.as_deref().map(std::path::Path::new),
            "tumor",
            &selection(args.num_tumors),
        )?
    };
    let normals = if args.normal.is_empty() && args.normals_list.is_none() {
        Vec::new()
    } else {
        collect_samples(
            &args.normal,
            args.normals_list.as_deref().map(std::path::Path::new),
            "normal",
            &selection(args.num_normals),
        )?
    };
    info!("🧪 Samples: {} tumors, {} normals", tumors.len(), normals.len());
    info!("🎯 Policy: {}", validation.policy.description());

    if args.dry_run {
        info!("✅ Dry run completed successfully");
        info!(
            "📊 {} markers, {} pairs would be compared on {} threads",
            panel.len(),
            tumors.len() * normals.len(),
            validation.threads
        );
        return Ok(());
    }

    let source = PileupLikelihoodSource;
    let mut cache = LikelihoodCache::new(&panel, &source, validation.policy.likelihood)
        .with_progress(show_progress);

    // Cache-only mode: derive every sample once and persist the tables
    if args.cache_only {
        let cache_dir = validation
            .cache_dir
            .as_ref()
            .ok_or_else(|| Error::Config {
                msg: "--cache-only requires --cache-dir".to_string(),
            })?;
        let paths: Vec<PathBuf> = tumors
            .iter()
            .chain(normals.iter())
            .map(|sample| sample.path.clone())
            .collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(validation.threads)
            .build()
            .map_err(|e| Error::ThreadPool { msg: e.to_string() })?;
        pool.install(|| cache.resolve_all(&paths))?;
        let written = pool.install(|| cache.export(cache_dir, args.cache_note.as_deref()))?;

        info!(
            "💾 Wrote {} likelihood caches to {} in {:.2}s",
            written.len(),
            cache_dir.display(),
            total_start.elapsed().as_secs_f64()
        );
        if let Some(note) = &args.cache_note {
            info!("📝 Cache note: {}", note);
        }
        return Ok(());
    }

    let orchestrator = BatchOrchestrator::new(validation.policy, validation.threads)?
        .with_progress(show_progress);
    let report = orchestrator.run(&tumors, &normals, &mut cache)?;

    let actions = vec![ACTION.to_string()];
    write_results(&validation.output, validation.format, &report, &actions)?;

    if args.save_benchmarks {
        save_benchmarks(&validation.benchmarks_file, &report.context, ACTION)?;
    }

    if report.failed() > 0 {
        warn!("⚠️  {} pairs failed, see the status column", report.failed());
    }

    let stats = cache.stats();
    info!("🎉 === CONPAIR COMPLETED SUCCESSFULLY ===");
    info!(
        "⏱️  Total execution time: {:.2}s (resolving {:.2}s, comparing {:.2}s)",
        total_start.elapsed().as_secs_f64(),
        report.context.time_in(BatchState::Resolving).unwrap_or_default(),
        report.context.time_in(BatchState::Dispatching).unwrap_or_default()
    );
    info!(
        "🧬 Likelihood tables: {} derived, {} loaded from caches",
        stats.derived, stats.loaded
    );
    info!("🔧 Command: {}", command_line);

    Ok(())
}
