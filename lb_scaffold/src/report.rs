use std::{io::Write, path::PathBuf};

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::session::PassSnapshot;

pub const SUMMARY_HEADER: &str = "pass\treads\tfasta\tcontigs\tn50\ttotal_length\tlargest";

/// Report
///
/// Writes one summary line per pass to wrt.  If size_prefix is set, the
/// sequence sizes from each pass are also written to <size_prefix>_<pass>.sizes.txt
pub struct Report<W: Write> {
    wrt: W,
    size_prefix: Option<String>,
}

impl<W: Write> Report<W> {
    pub fn new(mut wrt: W, size_prefix: Option<String>) -> anyhow::Result<Self> {
        writeln!(wrt, "{}", SUMMARY_HEADER).with_context(|| "Error writing summary header")?;
        Ok(Self { wrt, size_prefix })
    }

    pub fn add_pass(&mut self, snap: &PassSnapshot) -> anyhow::Result<()> {
        writeln!(self.wrt, "{}", snap)
            .and_then(|_| self.wrt.flush())
            .with_context(|| format!("Error writing summary for pass {}", snap.pass()))?;
        if let Some(prefix) = self.size_prefix.as_deref() {
            write_sizes(prefix, snap)?
        }
        Ok(())
    }
}

fn size_file(prefix: &str, pass: usize) -> PathBuf {
    PathBuf::from(format!("{}_{}.sizes.txt", prefix, pass))
}

/// Write header and size for each sequence, sorted on size
fn write_sizes(prefix: &str, snap: &PassSnapshot) -> anyhow::Result<()> {
    let opath = size_file(prefix, snap.pass());
    debug!("Writing sequence sizes for pass {} to {}", snap.pass(), opath.display());
    let mut wrt = CompressIo::new()
        .path(&opath)
        .bufwriter()
        .with_context(|| format!("problem creating output file {}", opath.display()))?;
    for (h, l) in snap.stats().size_table() {
        writeln!(wrt, "{}\t{}", h, l)
            .with_context(|| format!("Error writing to {}", opath.display()))?
    }
    wrt.flush()
        .with_context(|| format!("Error writing to {}", opath.display()))
}
