// marker.rs - Marker identifiers and the shared marker panel

use std::collections::HashMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Genomic position of a panel marker (1-based coordinate)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId {
    pub chrom: String,
    pub pos: u64,
}

impl MarkerId {
    pub fn new<S: Into<String>>(chrom: S, pos: u64) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
        }
    }
}

impl Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chrom, self.pos)
    }
}

/// A biallelic SNP marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub ref_allele: u8,
    pub alt_allele: u8,
}

impl Marker {
    pub fn new(id: MarkerId, ref_allele: u8, alt_allele: u8) -> Self {
        Self {
            id,
            ref_allele: ref_allele.to_ascii_uppercase(),
            alt_allele: alt_allele.to_ascii_uppercase(),
        }
    }
}

/// Ordered, non-empty set of unique markers.
///
/// Loaded once per run and only ever handed out by reference, so every pair
/// comparison iterates the same markers in the same order.
#[derive(Debug, Clone)]
pub struct MarkerPanel {
    markers: Vec<Marker>,
    index: HashMap<MarkerId, usize>,
}

impl MarkerPanel {
    pub fn new(markers: Vec<Marker>) -> Result<Self> {
        if markers.is_empty() {
            return Err(Error::EmptyPanel);
        }

        let mut index = HashMap::with_capacity(markers.len());
        for (i, marker) in markers.iter().enumerate() {
            if index.insert(marker.id.clone(), i).is_some() {
                return Err(Error::DuplicateMarker {
                    marker: marker.id.to_string(),
                });
            }
        }

        Ok(Self { markers, index })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Always false for a constructed panel; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn get(&self, id: &MarkerId) -> Option<&Marker> {
        self.index.get(id).map(|&i| &self.markers[i])
    }

    pub fn contains(&self, id: &MarkerId) -> bool {
        self.index.contains_key(id)
    }

    /// CRC32 over the marker ids in panel order; stored in likelihood cache
    /// files so a cache built against another panel is rejected on load.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for marker in &self.markers {
            hasher.update(marker.id.chrom.as_bytes());
            hasher.update(b":");
            hasher.update(&marker.id.pos.to_le_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize()
    }
}
