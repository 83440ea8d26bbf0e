use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::{config::Config, report::Report, session::ScaffoldSession};

/// Strategy
///
/// Set up the session (checking the inputs and getting statistics for the
/// input contigs), then run one scaffolding pass per read count in the
/// order given.  A summary line is written after every pass, so the
/// results so far are kept if a later pass fails
pub fn run_passes(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing");
    let mut session = ScaffoldSession::new(
        cfg.contigs(),
        cfg.reads(),
        cfg.backend().clone(),
        cfg.output_prefix().to_owned(),
    )?;
    debug!(
        "Scaffolding {} with {}; output prefix {}",
        session.contigs().display(),
        session.backend().kind(),
        session.output_prefix()
    );

    let wrt = CompressIo::new()
        .opt_path(cfg.output_file())
        .bufwriter()
        .with_context(|| "Failed to open output file")?;
    let size_prefix = cfg.write_sizes().then(|| cfg.output_prefix().to_owned());
    let mut report = Report::new(wrt, size_prefix)?;
    report.add_pass(session.latest())?;

    for (ix, n) in cfg.read_counts().iter().enumerate() {
        let snap = session
            .run_pass(*n)
            .with_context(|| format!("Scaffolding failed at pass {}", ix + 1))?;
        report.add_pass(snap)?;
    }

    let st = session.statistics();
    info!(
        "Finished after {} passes: {} sequences, N50 {}, {} reads",
        session.pass_counter() - 1,
        st.contig_count(),
        st.n50(),
        session.total_reads_consumed()
    );
    if let Some(best) = session.history().iter().max_by_key(|s| s.stats().n50()) {
        info!(
            "Highest N50 ({}) from pass {} ({})",
            best.stats().n50(),
            best.pass(),
            best.fasta().display()
        )
    }
    Ok(())
}
