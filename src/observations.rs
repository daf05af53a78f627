//! Validated per-mutation read counts.

use crate::error::{Error, Result};

/// Mutant read counts and depths of all mutations, with their derived VAFs.
///
/// Construction rejects zero mutant reads, zero depth and mismatched lengths,
/// so every instance is safe to hand to the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    mutant_reads: Vec<u32>,
    depths: Vec<u32>,
    vafs: Vec<f64>,
}

impl Observations {
    pub fn new(mutant_reads: &[u32], depths: &[u32]) -> Result<Self> {
        if mutant_reads.len() != depths.len() {
            return Err(Error::LengthMismatch {
                reads: mutant_reads.len(),
                depths: depths.len(),
            });
        }
        if mutant_reads.is_empty() {
            return Err(Error::NoObservations);
        }
        for (index, (&reads, &depth)) in mutant_reads.iter().zip(depths).enumerate() {
            if depth == 0 {
                return Err(Error::ZeroDepth { index });
            }
            if reads == 0 {
                return Err(Error::ZeroMutantReads { index });
            }
            if reads > depth {
                return Err(Error::ReadsExceedDepth {
                    index,
                    reads,
                    depth,
                });
            }
        }
        let vafs = mutant_reads
            .iter()
            .zip(depths)
            .map(|(&y, &n)| f64::from(y) / f64::from(n))
            .collect();
        log::debug!("accepted {} observations", mutant_reads.len());
        Ok(Self {
            mutant_reads: mutant_reads.to_vec(),
            depths: depths.to_vec(),
            vafs,
        })
    }

    pub fn len(&self) -> usize {
        self.mutant_reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutant_reads.is_empty()
    }

    pub fn mutant_reads(&self) -> &[u32] {
        &self.mutant_reads
    }

    pub fn depths(&self) -> &[u32] {
        &self.depths
    }

    pub fn vafs(&self) -> &[f64] {
        &self.vafs
    }

    /// Largest observed VAF; the upper end of the initial cluster parameter range.
    pub fn max_vaf(&self) -> f64 {
        self.vafs.iter().copied().fold(0.0, f64::max)
    }

    /// Iterates `(mutant_reads, depth)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.mutant_reads
            .iter()
            .copied()
            .zip(self.depths.iter().copied())
    }
}
