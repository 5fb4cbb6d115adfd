// likelihood.rs - Per-marker genotype likelihoods and per-sample tables

use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::data::marker::MarkerId;

/// Diploid biallelic genotype, indexed like the likelihood triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genotype {
    HomRef = 0,
    Het = 1,
    HomAlt = 2,
}

impl Genotype {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Genotype::HomRef),
            1 => Some(Genotype::Het),
            2 => Some(Genotype::HomAlt),
            _ => None,
        }
    }

    pub fn is_homozygous(&self) -> bool {
        !matches!(self, Genotype::Het)
    }
}

impl Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Genotype::HomRef => write!(f, "AA"),
            Genotype::Het => write!(f, "AB"),
            Genotype::HomAlt => write!(f, "BB"),
        }
    }
}

/// Coverage and genotype likelihoods observed for one sample at one marker.
/// A marker without informative reads has no record at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenotypeLikelihoodRecord {
    pub coverage: u32,
    /// Scores for [hom-ref, het, hom-alt]; higher is more likely
    pub likelihoods: [f64; 3],
}

impl GenotypeLikelihoodRecord {
    pub fn new(coverage: u32, likelihoods: [f64; 3]) -> Self {
        Self {
            coverage,
            likelihoods,
        }
    }

    /// Most likely genotype. Ties resolve to the lowest index, so equal
    /// hom-ref and het scores call hom-ref.
    pub fn most_likely(&self) -> Genotype {
        let mut best = 0;
        for i in 1..3 {
            if self.likelihoods[i] > self.likelihoods[best] {
                best = i;
            }
        }
        Genotype::from_index(best).unwrap_or(Genotype::HomRef)
    }
}

/// Likelihood records for one sample, keyed by marker.
///
/// Built once per sample and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleLikelihoodTable {
    records: HashMap<MarkerId, GenotypeLikelihoodRecord>,
}

impl SampleLikelihoodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: HashMap<MarkerId, GenotypeLikelihoodRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, id: &MarkerId) -> Option<&GenotypeLikelihoodRecord> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MarkerId, &GenotypeLikelihoodRecord)> {
        self.records.iter()
    }
}

impl FromIterator<(MarkerId, GenotypeLikelihoodRecord)> for SampleLikelihoodTable {
    fn from_iter<I: IntoIterator<Item = (MarkerId, GenotypeLikelihoodRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_likely_picks_maximum() {
        let record = GenotypeLikelihoodRecord::new(20, [-12.0, -3.5, -0.1]);
        assert_eq!(record.most_likely(), Genotype::HomAlt);

        let record = GenotypeLikelihoodRecord::new(20, [-4.0, -0.2, -9.0]);
        assert_eq!(record.most_likely(), Genotype::Het);
    }

    #[test]
    fn test_most_likely_breaks_ties_towards_lowest_index() {
        let all_equal = GenotypeLikelihoodRecord::new(12, [-1.0, -1.0, -1.0]);
        assert_eq!(all_equal.most_likely(), Genotype::HomRef);

        let het_alt_tie = GenotypeLikelihoodRecord::new(12, [-5.0, -1.0, -1.0]);
        assert_eq!(het_alt_tie.most_likely(), Genotype::Het);
    }

    #[test]
    fn test_genotype_helpers() {
        assert_eq!(Genotype::from_index(1), Some(Genotype::Het));
        assert_eq!(Genotype::from_index(3), None);
        assert!(Genotype::HomRef.is_homozygous());
        assert!(!Genotype::Het.is_homozygous());
        assert_eq!(Genotype::HomAlt.to_string(), "BB");
    }

    #[test]
    fn test_table_lookup_distinguishes_missing() {
        let table: SampleLikelihoodTable = vec![(
            MarkerId::new("1", 10),
            GenotypeLikelihoodRecord::new(0, [0.0, 0.0, 0.0]),
        )]
        .into_iter()
        .collect();

        // A zero-coverage record is still a record, distinct from an absent marker
        assert!(table.get(&MarkerId::new("1", 10)).is_some());
        assert!(table.get(&MarkerId::new("1", 11)).is_none());
        assert_eq!(table.len(), 1);
    }
}
