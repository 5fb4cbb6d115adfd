// pileup.rs - Genotype likelihoods from samtools-style text pileups

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use super::traits::LikelihoodSource;
use crate::core::policy::LikelihoodParams;
use crate::data::{GenotypeLikelihoodRecord, Marker, MarkerId, MarkerPanel, SampleLikelihoodTable};
use crate::errors::{Error, Result};

/// Phred+33 offset of quality characters
const QUALITY_OFFSET: u8 = 33;

/// Error probabilities above this carry no information about the base
const MAX_BASE_ERROR: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PileupRead {
    /// Uppercase read base, or None for deletions and reference skips
    base: Option<u8>,
    base_quality: u8,
    mapping_quality: Option<u8>,
}

#[derive(Debug)]
struct PileupSite<'a> {
    chrom: &'a str,
    pos: u64,
    reads: Vec<PileupRead>,
}

/// Decode the read-base column into one entry per read
fn parse_read_bases(bases: &str, ref_base: u8) -> std::result::Result<Vec<Option<u8>>, String> {
    let bytes = bases.as_bytes();
    let mut reads = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            // read start, followed by its mapping quality character
            b'^' => {
                i += 2;
                continue;
            }
            b'$' => {}
            b'+' | b'-' => {
                let digits_start = i + 1;
                let mut j = digits_start;
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                let len: usize = bases[digits_start..j]
                    .parse()
                    .map_err(|_| format!("indel without valid length at offset {}", i))?;
                i = match j.checked_add(len) {
                    Some(end) if end <= bytes.len() => end,
                    _ => {
                        return Err(format!(
                            "indel length {} at offset {} exceeds read bases",
                            len, i
                        ))
                    }
                };
                continue;
            }
            b'.' | b',' => reads.push(Some(ref_base)),
            b'*' | b'#' | b'>' | b'<' => reads.push(None),
            c if c.is_ascii_alphabetic() => reads.push(Some(c.to_ascii_uppercase())),
            c => return Err(format!("unexpected character '{}' in read bases", c as char)),
        }
        i += 1;
    }

    Ok(reads)
}

/// Chromosome and position of a pileup line, without decoding the reads
fn site_position(line: &str) -> Option<(&str, u64)> {
    let mut fields = line.split('\t');
    let chrom = fields.next()?;
    let pos = fields.next()?.parse().ok()?;
    Some((chrom, pos))
}

fn parse_pileup_line(line: &str) -> std::result::Result<PileupSite<'_>, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 4 {
        return Err(format!("expected at least 4 columns, found {}", fields.len()));
    }

    let chrom = fields[0];
    let pos = fields[1]
        .parse::<u64>()
        .map_err(|_| format!("invalid position '{}'", fields[1]))?;
    let ref_base = fields[2]
        .bytes()
        .next()
        .ok_or("empty reference base")?
        .to_ascii_uppercase();
    let depth = fields[3]
        .parse::<u64>()
        .map_err(|_| format!("invalid depth '{}'", fields[3]))?;

    if depth == 0 {
        return Ok(PileupSite {
            chrom,
            pos,
            reads: Vec::new(),
        });
    }
    if fields.len() < 6 {
        return Err(format!(
            "expected read bases and qualities for depth {}, found {} columns",
            depth,
            fields.len()
        ));
    }

    let bases = parse_read_bases(fields[4], ref_base)?;
    let base_quals = fields[5].as_bytes();
    if base_quals.len() != bases.len() {
        return Err(format!(
            "{} read bases but {} base qualities",
            bases.len(),
            base_quals.len()
        ));
    }

    let map_quals = match fields.get(6) {
        Some(column) if !column.is_empty() => {
            if column.len() != bases.len() {
                return Err(format!(
                    "{} read bases but {} mapping qualities",
                    bases.len(),
                    column.len()
                ));
            }
            Some(column.as_bytes())
        }
        _ => None,
    };

    let reads = bases
        .into_iter()
        .enumerate()
        .map(|(i, base)| PileupRead {
            base,
            base_quality: base_quals[i].saturating_sub(QUALITY_OFFSET),
            mapping_quality: map_quals.map(|q| q[i].saturating_sub(QUALITY_OFFSET)),
        })
        .collect();

    Ok(PileupSite { chrom, pos, reads })
}

fn base_error(quality: u8) -> f64 {
    10f64.powf(-(quality as f64) / 10.0).min(MAX_BASE_ERROR)
}

/// Log10 genotype likelihoods over the reads that pass the filters and
/// carry either marker allele. None when no read qualifies.
fn genotype_likelihoods(
    marker: &Marker,
    reads: &[PileupRead],
    params: &LikelihoodParams,
) -> Option<GenotypeLikelihoodRecord> {
    let mut likelihoods = [0.0f64; 3];
    let mut coverage = 0u32;

    for read in reads {
        if read.base_quality < params.min_base_quality {
            continue;
        }
        if let Some(mapq) = read.mapping_quality {
            if mapq < params.min_mapping_quality {
                continue;
            }
        }
        let base = match read.base {
            Some(b) if b == marker.ref_allele || b == marker.alt_allele => b,
            _ => continue,
        };

        let e = base_error(read.base_quality);
        let p_ref = if base == marker.ref_allele { 1.0 - e } else { e / 3.0 };
        let p_alt = if base == marker.alt_allele { 1.0 - e } else { e / 3.0 };

        likelihoods[0] += p_ref.log10();
        likelihoods[1] += (0.5 * (p_ref + p_alt)).log10();
        likelihoods[2] += p_alt.log10();
        coverage += 1;
    }

    if coverage == 0 {
        None
    } else {
        Some(GenotypeLikelihoodRecord::new(coverage, likelihoods))
    }
}

/// Derives likelihoods from `chrom pos ref depth bases quals [mapquals]` pileups
#[derive(Debug, Clone, Default)]
pub struct PileupLikelihoodSource;

impl LikelihoodSource for PileupLikelihoodSource {
    fn derive(
        &self,
        panel: &MarkerPanel,
        sample: &Path,
        params: &LikelihoodParams,
    ) -> Result<SampleLikelihoodTable> {
        let file = File::open(sample).map_err(|e| Error::io(sample, e))?;
        let reader = BufReader::new(file);

        let mut records = HashMap::new();
        let mut duplicates = 0usize;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::io(sample, e))?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let marker = match site_position(&line)
                .and_then(|(chrom, pos)| panel.get(&MarkerId::new(chrom, pos)))
            {
                Some(marker) => marker,
                None => continue,
            };

            let site = parse_pileup_line(&line).map_err(|msg| Error::InvalidPileupLine {
                path: sample.to_path_buf(),
                line: line_num + 1,
                msg,
            })?;
            debug_assert_eq!((site.chrom, site.pos), (marker.id.chrom.as_str(), marker.id.pos));

            if records.contains_key(&marker.id) {
                duplicates += 1;
                continue;
            }
            if let Some(record) = genotype_likelihoods(marker, &site.reads, params) {
                records.insert(marker.id.clone(), record);
            }
        }

        if duplicates > 0 {
            debug!(
                "{}: ignored {} repeated pileup lines",
                sample.display(),
                duplicates
            );
        }
        debug!(
            "{}: {}/{} markers with informative reads",
            sample.display(),
            records.len(),
            panel.len()
        );

        Ok(SampleLikelihoodTable::from_records(records))
    }

    fn name(&self) -> &'static str {
        "pileup"
    }

    fn description(&self) -> &'static str {
        "samtools-style text pileup (chrom, pos, ref, depth, bases, quals, [mapquals])"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Genotype;
    use std::io::Write;

    fn marker() -> Marker {
        Marker::new(MarkerId::new("1", 1000), b'A', b'G')
    }

    fn read(base: u8, quality: u8) -> PileupRead {
        PileupRead {
            base: Some(base),
            base_quality: quality,
            mapping_quality: Some(60),
        }
    }

    #[test]
    fn test_parse_read_bases_handles_markup() {
        let bases = parse_read_bases("^].,$G+2ACa-1T*c", b'A').unwrap();
        assert_eq!(
            bases,
            vec![Some(b'A'), Some(b'A'), Some(b'G'), Some(b'A'), None, Some(b'C')]
        );
    }

    #[test]
    fn test_parse_read_bases_rejects_garbage() {
        assert!(parse_read_bases("..!", b'A').is_err());
        assert!(parse_read_bases(".+A", b'A').is_err());
    }

    #[test]
    fn test_parse_read_bases_rejects_oversized_indel() {
        let err = parse_read_bases(".+18446744073709551615A", b'A').unwrap_err();
        assert!(err.contains("exceeds read bases"), "{}", err);
        assert!(parse_read_bases(".+99999999999999999999A", b'A').is_err());
        assert!(parse_read_bases(".-3AC", b'A').is_err());
        assert_eq!(parse_read_bases(".-2AC,", b'A').unwrap().len(), 2);
    }

    #[test]
    fn test_parse_pileup_line_with_mapping_qualities() {
        let site = parse_pileup_line("1\t1000\ta\t3\t.,G\tII5\t<<+").unwrap();
        assert_eq!(site.chrom, "1");
        assert_eq!(site.pos, 1000);
        assert_eq!(site.reads.len(), 3);
        assert_eq!(site.reads[0].base, Some(b'A'));
        assert_eq!(site.reads[2].base, Some(b'G'));
        assert_eq!(site.reads[2].base_quality, 20);
        assert_eq!(site.reads[2].mapping_quality, Some(10));
    }

    #[test]
    fn test_parse_pileup_line_errors() {
        assert!(parse_pileup_line("1\t1000\tA").is_err());
        assert!(parse_pileup_line("1\tx\tA\t1\t.\tI").is_err());
        assert!(parse_pileup_line("1\t1000\tA\t2\t..\tI").is_err());
        assert!(parse_pileup_line("1\t1000\tA\t2\t..\tII\tI").is_err());
        assert!(parse_pileup_line("1\t1000\tA\t0\t*\t*").unwrap().reads.is_empty());
    }

    #[test]
    fn test_likelihoods_follow_read_evidence() {
        let params = LikelihoodParams::default();
        let m = marker();

        let ref_reads: Vec<_> = (0..12).map(|_| read(b'A', 30)).collect();
        let rec = genotype_likelihoods(&m, &ref_reads, &params).unwrap();
        assert_eq!(rec.coverage, 12);
        assert_eq!(rec.most_likely(), Genotype::HomRef);

        let mixed: Vec<_> = (0..12)
            .map(|i| read(if i % 2 == 0 { b'A' } else { b'G' }, 30))
            .collect();
        let rec = genotype_likelihoods(&m, &mixed, &params).unwrap();
        assert_eq!(rec.most_likely(), Genotype::Het);

        let alt_reads: Vec<_> = (0..12).map(|_| read(b'G', 30)).collect();
        let rec = genotype_likelihoods(&m, &alt_reads, &params).unwrap();
        assert_eq!(rec.most_likely(), Genotype::HomAlt);
    }

    #[test]
    fn test_likelihoods_apply_read_filters() {
        let params = LikelihoodParams::default();
        let m = marker();
        let reads = vec![
            read(b'A', 10),   // low base quality
            read(b'T', 40),   // neither allele
            PileupRead {
                base: Some(b'A'),
                base_quality: 40,
                mapping_quality: Some(3), // low mapping quality
            },
            PileupRead {
                base: None,
                base_quality: 40,
                mapping_quality: None,
            },
        ];
        assert!(genotype_likelihoods(&m, &reads, &params).is_none());

        let mut reads = reads;
        reads.push(read(b'G', 20));
        let rec = genotype_likelihoods(&m, &reads, &params).unwrap();
        assert_eq!(rec.coverage, 1);
    }

    #[test]
    fn test_derive_table_from_file() {
        let panel = MarkerPanel::new(vec![
            Marker::new(MarkerId::new("1", 1000), b'A', b'G'),
            Marker::new(MarkerId::new("1", 2000), b'C', b'T'),
            Marker::new(MarkerId::new("2", 500), b'G', b'A'),
        ])
        .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\t999\tA\t2\t..\tII").unwrap();
        writeln!(file, "1\t1000\tA\t4\t..,,\tIIII").unwrap();
        writeln!(file, "1\t2000\tC\t3\tTtT\tIII").unwrap();
        writeln!(file, "2\t500\tG\t0\t*\t*").unwrap();

        let table = PileupLikelihoodSource
            .derive(&panel, file.path(), &LikelihoodParams::default())
            .unwrap();

        assert_eq!(table.len(), 2);
        let first = table.get(&MarkerId::new("1", 1000)).unwrap();
        assert_eq!(first.coverage, 4);
        assert_eq!(first.most_likely(), Genotype::HomRef);
        let second = table.get(&MarkerId::new("1", 2000)).unwrap();
        assert_eq!(second.most_likely(), Genotype::HomAlt);
        assert!(table.get(&MarkerId::new("2", 500)).is_none());
    }

    #[test]
    fn test_derive_reports_malformed_marker_line() {
        let panel =
            MarkerPanel::new(vec![Marker::new(MarkerId::new("1", 1000), b'A', b'G')]).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\t5\tA\tbroken").unwrap();
        writeln!(file, "1\t1000\tA\t2\t..\tI").unwrap();

        match PileupLikelihoodSource.derive(&panel, file.path(), &LikelihoodParams::default()) {
            Err(Error::InvalidPileupLine { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected pileup error, got {:?}", other),
        }
    }

    #[test]
    fn test_derive_reports_oversized_indel_as_line_error() {
        let panel =
            MarkerPanel::new(vec![Marker::new(MarkerId::new("1", 1000), b'A', b'G')]).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\t1000\tA\t2\t.+18446744073709551615A.\tII").unwrap();

        match PileupLikelihoodSource.derive(&panel, file.path(), &LikelihoodParams::default()) {
            Err(Error::InvalidPileupLine { line, msg, .. }) => {
                assert_eq!(line, 1);
                assert!(msg.contains("exceeds read bases"));
            }
            other => panic!("expected pileup error, got {:?}", other),
        }
    }
}
