mod backend;
mod cli;
mod config;
mod fasta;
mod process;
mod report;
mod session;
mod stats;

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let cfg = cli::handle_cli().with_context(|| "Error processing command line arguments")?;
    process::run_passes(&cfg)
}
