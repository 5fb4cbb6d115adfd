// mod.rs - Result sink: TSV, JSON and benchmark log

use std::fmt;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use log::info;
use serde::Serialize;

use crate::core::{BatchReport, PairOutcome, PairRecord, RunContext};
use crate::errors::{Error, Result};

/// Output path meaning standard output
pub const STDOUT: &str = "-";

pub const TSV_HEADER: [&str; 8] = [
    "concordance",
    "num_markers_used",
    "num_total_markers",
    "tumor",
    "normal",
    "tumor_pileup",
    "normal_pileup",
    "status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Tsv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(Error::config(format!(
                "unsupported output format: {}. Use: tsv, json",
                s
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tsv => write!(f, "tsv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn write_error<E: fmt::Display>(e: E) -> Error {
    Error::Output { msg: e.to_string() }
}

/// Ensure parent directory exists before creating file
fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    Ok(())
}

fn open_output(file_path: &str) -> Result<Box<dyn Write>> {
    if file_path == STDOUT {
        return Ok(Box::new(io::stdout().lock()));
    }
    let path = Path::new(file_path);
    ensure_parent_dir(path)?;
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn status(record: &PairRecord) -> String {
    match &record.outcome {
        PairOutcome::Compared(result) if result.has_usable_markers() => "ok".to_string(),
        PairOutcome::Compared(_) => "no_usable_markers".to_string(),
        PairOutcome::Failed { reason } => format!("failed: {}", reason),
    }
}

fn format_concordance(value: Option<f64>) -> String {
    value.map_or_else(|| "NA".to_string(), |c| format!("{:.6}", c))
}

/// One row per pair, `NA` where a value is undefined
pub fn write_tsv<W: Write>(writer: W, results: &[PairRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    wtr.write_record(TSV_HEADER).map_err(write_error)?;
    for record in results {
        let (used, total) = match record.result() {
            Some(result) => (
                result.markers_used.to_string(),
                result.total_markers.to_string(),
            ),
            None => ("NA".to_string(), "NA".to_string()),
        };
        wtr.write_record([
            format_concordance(record.concordance()),
            used,
            total,
            record.tumor_id.clone(),
            record.normal_id.clone(),
            record.tumor_path.display().to_string(),
            record.normal_path.display().to_string(),
            status(record),
        ])
        .map_err(write_error)?;
    }

    wtr.flush().map_err(write_error)?;
    Ok(())
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    tumor: &'a str,
    normal: &'a str,
    tumor_pileup: String,
    normal_pileup: String,
    concordance: Option<f64>,
    num_markers_used: Option<usize>,
    num_total_markers: Option<usize>,
    status: String,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    output: Vec<JsonRecord<'a>>,
    time: f64,
    started: String,
    num_pairs: usize,
    num_tumors: usize,
    num_normals: usize,
    threads: usize,
    actions: &'a [String],
}

pub fn write_json<W: Write>(mut writer: W, report: &BatchReport, actions: &[String]) -> Result<()> {
    let context = &report.context;
    let output = report
        .results
        .iter()
        .map(|record| JsonRecord {
            tumor: &record.tumor_id,
            normal: &record.normal_id,
            tumor_pileup: record.tumor_path.display().to_string(),
            normal_pileup: record.normal_path.display().to_string(),
            concordance: record.concordance(),
            num_markers_used: record.result().map(|r| r.markers_used),
            num_total_markers: record.result().map(|r| r.total_markers),
            status: status(record),
        })
        .collect();

    let json = JsonReport {
        output,
        time: context.elapsed().as_secs_f64(),
        started: context.started_at().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        num_pairs: context.num_pairs,
        num_tumors: context.num_tumors,
        num_normals: context.num_normals,
        threads: context.threads,
        actions,
    };

    serde_json::to_writer_pretty(&mut writer, &json).map_err(write_error)?;
    writeln!(writer).map_err(write_error)?;
    writer.flush().map_err(write_error)?;
    Ok(())
}

/// Write the batch results to `file_path` (`-` for stdout)
pub fn write_results(
    file_path: &str,
    format: OutputFormat,
    report: &BatchReport,
    actions: &[String],
) -> Result<()> {
    let writer = open_output(file_path)?;
    match format {
        OutputFormat::Tsv => write_tsv(writer, &report.results)?,
        OutputFormat::Json => write_json(writer, report, actions)?,
    }
    if file_path != STDOUT {
        info!("✅ Results written to: {} ({})", file_path, format);
    }
    Ok(())
}

/// Append `threads seconds num_pairs num_tumors num_normals action`
pub fn save_benchmarks(file_path: &Path, context: &RunContext, action: &str) -> Result<()> {
    ensure_parent_dir(file_path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|e| Error::io(file_path, e))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "{}\t{:.3}\t{}\t{}\t{}\t{}",
        context.threads,
        context.elapsed().as_secs_f64(),
        context.num_pairs,
        context.num_tumors,
        context.num_normals,
        action
    )
    .map_err(|e| Error::io(file_path, e))?;
    writer.flush().map_err(|e| Error::io(file_path, e))?;

    info!("⏱️  Benchmark appended to: {}", file_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PairResult;
    use std::path::PathBuf;

    fn record(tumor: &str, normal: &str, outcome: PairOutcome) -> PairRecord {
        PairRecord {
            tumor_id: tumor.to_string(),
            normal_id: normal.to_string(),
            tumor_path: PathBuf::from(format!("/data/{}.pileup", tumor)),
            normal_path: PathBuf::from(format!("/data/{}.pileup", normal)),
            outcome,
        }
    }

    fn report() -> BatchReport {
        let mut context = RunContext::new(4);
        context.num_tumors = 1;
        context.num_normals = 3;
        context.num_pairs = 3;
        BatchReport {
            results: vec![
                record(
                    "T1",
                    "N1",
                    PairOutcome::Compared(PairResult {
                        concordant: 3,
                        discordant: 1,
                        markers_used: 4,
                        total_markers: 10,
                    }),
                ),
                record(
                    "T1",
                    "N2",
                    PairOutcome::Compared(PairResult {
                        concordant: 0,
                        discordant: 0,
                        markers_used: 0,
                        total_markers: 10,
                    }),
                ),
                record(
                    "T1",
                    "N3",
                    PairOutcome::Failed {
                        reason: "boom".to_string(),
                    },
                ),
            ],
            context,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("TSV".parse::<OutputFormat>().unwrap(), OutputFormat::Tsv);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("phylip".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_tsv_rows_use_na_for_undefined_values() {
        let mut buf = Vec::new();
        write_tsv(&mut buf, &report().results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], TSV_HEADER.join("\t"));
        assert_eq!(
            lines[1],
            "0.750000\t4\t10\tT1\tN1\t/data/T1.pileup\t/data/N1.pileup\tok"
        );
        assert!(lines[2].starts_with("NA\t0\t10\tT1\tN2\t"));
        assert!(lines[2].ends_with("\tno_usable_markers"));
        assert!(lines[3].starts_with("NA\tNA\tNA\tT1\tN3\t"));
        assert!(lines[3].ends_with("\tfailed: boom"));
    }

    #[test]
    fn test_json_report_shape() {
        let mut buf = Vec::new();
        let actions = vec!["concordance".to_string()];
        write_json(&mut buf, &report(), &actions).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["num_pairs"], 3);
        assert_eq!(value["threads"], 4);
        assert_eq!(value["actions"][0], "concordance");
        let output = value["output"].as_array().unwrap();
        assert_eq!(output.len(), 3);
        assert_eq!(output[0]["concordance"], 0.75);
        assert!(output[1]["concordance"].is_null());
        assert_eq!(output[1]["num_markers_used"], 0);
        assert!(output[2]["num_markers_used"].is_null());
    }

    #[test]
    fn test_benchmarks_are_appended() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("benchmarks.tsv");
        let context = report().context;

        save_benchmarks(&path, &context, "concordance").unwrap();
        save_benchmarks(&path, &context, "concordance").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields[0], "4");
        assert_eq!(&fields[2..], &["3", "1", "3", "concordance"]);
    }

    #[test]
    fn test_results_written_to_nested_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("concordance.tsv");
        write_results(
            path.to_str().unwrap(),
            OutputFormat::Tsv,
            &report(),
            &[],
        )
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 4);
    }
}
