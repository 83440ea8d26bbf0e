use std::{collections::HashMap, path::Path, sync::Arc};

use crate::fasta::{FastaIndex, Header};

/// AssemblyStats
///
/// Summary statistics for the sequences in one FASTA file.  Always built in
/// one go from a file, never updated
///
/// contig_count - number of distinct sequence headers
/// n50 - see [ascending_n50]
/// sorted_sizes - all sequence lengths in ascending order
/// size_by_header - sequence length for each header
///
#[derive(Debug, Default)]
pub struct AssemblyStats {
    contig_count: usize,
    n50: usize,
    sorted_sizes: Vec<usize>,
    size_by_header: HashMap<Header, usize>,
}

impl AssemblyStats {
    pub fn from_fasta<P: AsRef<Path>>(fname: P) -> anyhow::Result<Self> {
        let ix = FastaIndex::open(fname)?;
        Ok(Self::from_index(&ix))
    }

    pub fn from_index(ix: &FastaIndex) -> Self {
        let size_by_header: HashMap<_, _> = ix.iter().map(|(h, l)| (Arc::clone(h), l)).collect();
        let mut sorted_sizes: Vec<_> = size_by_header.values().copied().collect();
        sorted_sizes.sort_unstable();
        let n50 = ascending_n50(&sorted_sizes);
        trace!(
            "Stats: {} contigs, n50 {}, total length {}",
            size_by_header.len(),
            n50,
            sorted_sizes.iter().sum::<usize>()
        );
        Self {
            contig_count: size_by_header.len(),
            n50,
            sorted_sizes,
            size_by_header,
        }
    }

    pub fn contig_count(&self) -> usize {
        self.contig_count
    }

    pub fn n50(&self) -> usize {
        self.n50
    }

    pub fn sorted_sizes(&self) -> &[usize] {
        &self.sorted_sizes
    }

    pub fn size_by_header(&self) -> &HashMap<Header, usize> {
        &self.size_by_header
    }

    pub fn total_length(&self) -> usize {
        self.sorted_sizes().iter().sum()
    }

    pub fn largest(&self) -> usize {
        self.sorted_sizes().last().copied().unwrap_or(0)
    }

    /// (header, size) pairs sorted on size, then header
    pub fn size_table(&self) -> Vec<(&Header, usize)> {
        let mut v: Vec<_> = self
            .size_by_header()
            .iter()
            .map(|(h, l)| (h, *l))
            .collect();
        v.sort_unstable_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        v
    }
}

/// N50 as reported by this tool.  Sizes are accumulated from the smallest
/// upwards and the first size at which the running total exceeds half of the
/// total assembly length is returned.  The scan runs from the smallest size,
/// not from the largest as in the usual definition, and must stay that way
/// for results to match earlier runs.
///
/// `sorted_sizes` must be in ascending order.  Returns 0 for an empty slice
pub fn ascending_n50(sorted_sizes: &[usize]) -> usize {
    let half = sorted_sizes.iter().sum::<usize>() >> 1;
    let mut tot = 0usize;
    sorted_sizes
        .iter()
        .copied()
        .find(|x| {
            tot += *x;
            tot > half
        })
        .unwrap_or(0)
}
