// markers.rs - Marker panel file loader

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::data::marker::{Marker, MarkerId, MarkerPanel};
use crate::errors::{Error, Result};

fn parse_allele(s: &str) -> std::result::Result<u8, String> {
    match s.as_bytes() {
        [b] if b"ACGTacgt".contains(b) => Ok(b.to_ascii_uppercase()),
        _ => Err(format!("allele '{}' is not a single A/C/G/T base", s)),
    }
}

/// Parse one `chrom pos ref alt [extra...]` line
fn parse_marker_line(line: &str) -> std::result::Result<Marker, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(format!(
            "expected at least 4 columns (chrom, pos, ref, alt), found {}",
            fields.len()
        ));
    }

    let pos = fields[1]
        .parse::<u64>()
        .map_err(|_| format!("position '{}' is not a positive integer", fields[1]))?;
    if pos == 0 {
        return Err("positions are 1-based, found 0".to_string());
    }

    let ref_allele = parse_allele(fields[2])?;
    let alt_allele = parse_allele(fields[3])?;
    if ref_allele == alt_allele {
        return Err(format!(
            "ref and alt alleles are identical ({})",
            ref_allele as char
        ));
    }

    Ok(Marker::new(
        MarkerId::new(fields[0], pos),
        ref_allele,
        alt_allele,
    ))
}

impl MarkerPanel {
    /// Load a marker panel from a whitespace-separated text file
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let file = File::open(file_path).map_err(|e| Error::io(file_path, e))?;
        let reader = BufReader::new(file);

        let mut markers = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io(file_path, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let marker = parse_marker_line(trimmed).map_err(|msg| Error::InvalidMarkerLine {
                path: file_path.to_path_buf(),
                line: line_num + 1,
                msg,
            })?;
            markers.push(marker);
        }

        let panel = Self::new(markers)?;
        info!(
            "🧬 Marker panel loaded: {} markers from {}",
            panel.len(),
            file_path.display()
        );
        Ok(panel)
    }
}
