use std::{
    collections::{hash_map::Entry, HashMap},
    io::BufRead,
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::next_line;

/// Sequence header.  Shared between the index and the statistics built from it
pub type Header = Arc<str>;

/// FastaIndex
///
/// Header and sequence length for every record of a FASTA file
///
/// headers - headers in the order they were first seen
/// lengths - sequence length (in residues) for each header
///
/// Headers are unique; where a header occurs more than once the length of
/// the last record with that header is kept
pub struct FastaIndex {
    headers: Vec<Header>,
    lengths: HashMap<Header, usize>,
}

impl FastaIndex {
    /// Read through a (possibly compressed) FASTA file collecting headers and sequence lengths
    pub fn open<P: AsRef<Path>>(fname: P) -> anyhow::Result<Self> {
        let fname = fname.as_ref();
        debug!("Reading sequence lengths from {}", fname.display());
        if !fname.is_file() {
            return Err(anyhow!("FASTA file {} not found", fname.display()));
        }

        trace!("Opening FASTA file for reading");
        let mut rdr = CompressIo::new()
            .path(fname)
            .bufreader()
            .with_context(|| format!("Error opening FASTA file {}", fname.display()))?;

        let ix = Self::from_reader(&mut rdr)
            .with_context(|| format!("Error reading FASTA file {}", fname.display()))?;
        debug!(
            "Finished reading {}; found {} sequences",
            fname.display(),
            ix.len()
        );
        if ix.is_empty() {
            warn!("No sequences found in {}", fname.display())
        }
        Ok(ix)
    }

    pub fn from_reader<R: BufRead>(rdr: &mut R) -> anyhow::Result<Self> {
        let mut ix = Self {
            headers: Vec::new(),
            lengths: HashMap::new(),
        };
        let mut buf = String::new();
        let mut line = 0;
        let mut current: Option<(Header, usize)> = None;

        while let Some(s) = next_line(rdr, &mut buf)
            .with_context(|| format!("Error after reading {} lines", line))?
        {
            line += 1;
            if let Some(h) = s.strip_prefix('>') {
                // New record
                if let Some((h, l)) = current.take() {
                    ix.store(h, l)
                }
                trace!("Reading sequence {}", h.trim());
                current = Some((Arc::from(h.trim()), 0));
            } else if let Some((_, l)) = current.as_mut() {
                *l += s.trim().len()
            } else if !s.trim().is_empty() {
                return Err(anyhow!("Sequence data before first header at line {}", line));
            }
        }
        if let Some((h, l)) = current.take() {
            ix.store(h, l)
        }
        Ok(ix)
    }

    fn store(&mut self, header: Header, len: usize) {
        match self.lengths.entry(header) {
            Entry::Occupied(mut e) => {
                warn!(
                    "Sequence {} occurs more than once; keeping the last entry",
                    e.key()
                );
                e.insert(len);
            }
            Entry::Vacant(e) => {
                self.headers.push(Arc::clone(e.key()));
                e.insert(len);
            }
        }
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn seq_len(&self, header: &str) -> Option<usize> {
        self.lengths.get(header).copied()
    }

    /// Iterate over (header, length) pairs in header order
    pub fn iter(&self) -> impl Iterator<Item = (&Header, usize)> + '_ {
        self.headers()
            .iter()
            .filter_map(|h| self.seq_len(h).map(|l| (h, l)))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
