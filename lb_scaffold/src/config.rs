use std::path::{Path, PathBuf};

use crate::backend::Backend;

/// Config
///
/// Configuration info for the program
/// This is generated from the command line arguments
/// Once set it is read only
///
/// contigs - contig FASTA file to be scaffolded
/// reads - long read file (used by SSPACE)
/// backend - scaffolder to use
/// output_prefix - prefix for all per pass output files
/// output_file - summary output file (stdout if not set)
/// read_counts - read count for each pass; one pass is run per entry
/// write_sizes - write a table of sequence sizes for each pass
///
pub struct Config {
    contigs: PathBuf,
    reads: PathBuf,
    backend: Backend,
    output_prefix: String,
    output_file: Option<PathBuf>,
    read_counts: Vec<u64>,
    write_sizes: bool,
}

impl Config {
    pub fn new(contigs: PathBuf, reads: PathBuf, backend: Backend, output_prefix: String) -> Self {
        Self {
            contigs,
            reads,
            backend,
            output_prefix,
            output_file: None,
            read_counts: Vec::new(),
            write_sizes: false,
        }
    }

    pub fn set_output_file(&mut self, p: PathBuf) {
        self.output_file = Some(p)
    }

    pub fn set_read_counts(&mut self, v: Vec<u64>) {
        self.read_counts = v
    }

    pub fn set_write_sizes(&mut self) {
        self.write_sizes = true
    }

    pub fn contigs(&self) -> &Path {
        &self.contigs
    }

    pub fn reads(&self) -> &Path {
        &self.reads
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    pub fn read_counts(&self) -> &[u64] {
        &self.read_counts
    }

    pub fn write_sizes(&self) -> bool {
        self.write_sizes
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}
