use std::{
    fmt,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    sync::Arc,
};

use anyhow::Context;

use crate::{
    backend::{check_readable_file, first_bloom_filter, Backend, PassJob},
    stats::AssemblyStats,
};

/// PassSnapshot
///
/// Result of one pass, never modified once made.  Pass 0 is the input contig file
///
/// pass - pass number
/// fasta - FASTA file the statistics were calculated from
/// reads - read count recorded for the pass
/// stats - statistics for fasta
///
pub struct PassSnapshot {
    pass: usize,
    fasta: PathBuf,
    reads: u64,
    stats: Arc<AssemblyStats>,
}

impl PassSnapshot {
    pub fn pass(&self) -> usize {
        self.pass
    }

    pub fn fasta(&self) -> &Path {
        &self.fasta
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn stats(&self) -> &Arc<AssemblyStats> {
        &self.stats
    }
}

/// Tab separated summary line (see report::SUMMARY_HEADER)
impl fmt::Display for PassSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.pass(),
            self.reads(),
            self.fasta().display(),
            self.stats().contig_count(),
            self.stats().n50(),
            self.stats().total_length(),
            self.stats().largest()
        )
    }
}

/// ScaffoldSession
///
/// Repeated scaffolding of a contig file with one backend.
/// Every pass scaffolds the original contigs; only the statistics follow
/// the output of the latest pass
///
/// contigs - contig FASTA file
/// reads - long read file
/// backend - scaffolder used for all passes
/// output_prefix - prefix for all output files and directories
/// pass_counter - number of the next pass (starts at 1)
/// total_reads - read count recorded by the last pass
/// history - snapshots indexed by pass number
///
pub struct ScaffoldSession {
    contigs: PathBuf,
    reads: PathBuf,
    backend: Backend,
    output_prefix: String,
    pass_counter: usize,
    total_reads: u64,
    history: Vec<PassSnapshot>,
}

impl ScaffoldSession {
    /// Check inputs and the backend and calculate statistics for the input contigs
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        contigs: P,
        reads: Q,
        backend: Backend,
        output_prefix: String,
    ) -> anyhow::Result<Self> {
        let contigs = contigs.as_ref().to_owned();
        debug!("Setting up scaffold session for {}", contigs.display());

        check_readable_file(&contigs)?;

        let sc = backend.scaffolder();
        sc.check_available()
            .with_context(|| format!("{} is not available", sc.name()))?;

        let stats = AssemblyStats::from_fasta(&contigs)
            .with_context(|| "Error getting statistics for input contigs")?;
        info!(
            "Input contigs: {} sequences, N50 {}",
            stats.contig_count(),
            stats.n50()
        );

        let initial = PassSnapshot {
            pass: 0,
            fasta: contigs.clone(),
            reads: 0,
            stats: Arc::new(stats),
        };

        Ok(Self {
            contigs,
            reads: reads.as_ref().to_owned(),
            backend,
            output_prefix,
            pass_counter: 1,
            total_reads: 0,
            history: vec![initial],
        })
    }

    /// Run one scaffolding pass and calculate statistics on its output.
    ///
    /// The exit status of the scaffolder is not checked; a failed run shows up
    /// as missing output.  On error the session is left as it was before the call
    pub fn run_pass(&mut self, read_count: u64) -> anyhow::Result<&PassSnapshot> {
        let pass = self.pass_counter;
        let sc = self.backend.scaffolder();
        let job = PassJob {
            pass,
            contigs: &self.contigs,
            reads: &self.reads,
            output_prefix: &self.output_prefix,
            // LINKS reuses the bloom filter made on the first pass
            bloom_filter: (pass > 1).then(|| first_bloom_filter(&self.output_prefix)),
        };
        info!("Starting {} pass {}", sc.name(), pass);

        sc.prepare(&job)
            .with_context(|| format!("Error preparing {} pass {}", sc.name(), pass))?;
        run_command(sc.command(&job), sc.name())?;

        let fasta = sc.output_fasta(&job);
        let stats = AssemblyStats::from_fasta(&fasta).with_context(|| {
            format!("Could not get scaffolds from {} pass {}", sc.name(), pass)
        })?;
        info!(
            "Pass {}: {} sequences, N50 {}",
            pass,
            stats.contig_count(),
            stats.n50()
        );

        self.pass_counter += 1;
        self.total_reads = read_count;
        self.history.push(PassSnapshot {
            pass,
            fasta,
            reads: read_count,
            stats: Arc::new(stats),
        });
        Ok(&self.history[pass])
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn contigs(&self) -> &Path {
        &self.contigs
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn pass_counter(&self) -> usize {
        self.pass_counter
    }

    pub fn total_reads_consumed(&self) -> u64 {
        self.total_reads
    }

    /// Statistics from the most recent pass (or the input contigs before the first pass)
    pub fn statistics(&self) -> &AssemblyStats {
        &self.latest().stats
    }

    pub fn latest(&self) -> &PassSnapshot {
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[PassSnapshot] {
        &self.history
    }
}

/// Run external command to completion.  Stdout is captured, stderr goes
/// straight to our stderr so the scaffolder's diagnostics are always seen.
/// Only a failure to launch the command is treated as an error
fn run_command(mut cmd: Command, name: &str) -> anyhow::Result<Output> {
    debug!("Running {:?}", cmd);
    let out = cmd
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .with_context(|| format!("Could not run {}", name))?;

    trace!("{} stdout: {}", name, String::from_utf8_lossy(&out.stdout));
    if out.status.success() {
        debug!("{} finished", name)
    } else {
        warn!("{} exited with {}", name, out.status)
    }
    Ok(out)
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use crate::backend::{Links, Sspace};
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn write_fasta(p: &Path, v: &[(&str, usize)]) {
        let s: String = v
            .iter()
            .map(|(h, l)| format!(">{}\n{}\n", h, "A".repeat(*l)))
            .collect();
        fs::write(p, s).unwrap()
    }

    // Stand-in for SSPACE: logs its arguments and writes two scaffolds (X:120, Y:80)
    // to the directory given with -b
    pub(crate) const FAKE_SSPACE: &str = r#"
log="$(dirname "$0")/sspace.log"
echo "$@" >> "$log"
prev=""
for a in "$@"; do
    if [ "$prev" = "-b" ]; then out="$a"; fi
    prev="$a"
done
printf '>X\n%0120d\n>Y\n%080d\n' 0 0 > "$out/scaffolds.fasta"
"#;

    // Stand-in for LINKS: logs its arguments, writes <base>.scaffolds.fa and,
    // if no bloom filter was given, <base>.bloom
    const FAKE_LINKS: &str = r#"#!/bin/sh
if [ "$1" = "-v" ]; then echo "LINKS v0.0"; exit 0; fi
log="$(dirname "$0")/links.log"
echo "$@" >> "$log"
prev=""
reuse=""
for a in "$@"; do
    if [ "$prev" = "-b" ]; then base="$a"; fi
    if [ "$prev" = "-r" ]; then reuse="$a"; fi
    prev="$a"
done
printf '>s1\nACGTACGTAC\n>s2\nACGTA\n>s3\nACG\n' > "$base.scaffolds.fa"
if [ -z "$reuse" ]; then touch "$base.bloom"; fi
"#;

    struct Setup {
        dir: TempDir,
        contigs: PathBuf,
        reads: PathBuf,
        prefix: String,
    }

    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let contigs = dir.path().join("contigs.fa");
        write_fasta(&contigs, &[("A", 100), ("B", 150), ("C", 50)]);
        let reads = dir.path().join("reads.fa");
        write_fasta(&reads, &[("r1", 1000)]);
        let prefix = dir.path().join("scaf").display().to_string();
        Setup {
            dir,
            contigs,
            reads,
            prefix,
        }
    }

    fn sspace_backend(s: &Setup) -> Backend {
        let script = s.dir.path().join("SSPACE-LongRead.pl");
        fs::write(&script, FAKE_SSPACE).unwrap();
        Backend::Sspace(Sspace::new(script, PathBuf::from("sh")))
    }

    fn links_backend(s: &Setup) -> Backend {
        let bin_dir = s.dir.path().join("bin");
        fs::create_dir(&bin_dir).unwrap();
        let program = bin_dir.join("LINKS");
        fs::write(&program, FAKE_LINKS).unwrap();
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

        let reads_dir = s.dir.path().join("reads_fasta");
        fs::create_dir(&reads_dir).unwrap();
        fs::write(reads_dir.join("r1.fa"), ">r1\nACGT\n").unwrap();
        fs::write(reads_dir.join("r2.fa"), ">r2\nACGT\n").unwrap();
        Backend::Links(Links::new(program, reads_dir))
    }

    #[test]
    fn initial_statistics() {
        let s = setup();
        let backend = sspace_backend(&s);
        let session = ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).unwrap();
        assert_eq!(session.pass_counter(), 1);
        assert_eq!(session.total_reads_consumed(), 0);
        assert_eq!(session.history().len(), 1);
        let st = session.statistics();
        assert_eq!(st.contig_count(), 3);
        assert_eq!(st.sorted_sizes(), [50, 100, 150]);
        assert_eq!(st.size_by_header().get("B"), Some(&150));
        // sum 300, half 150: running sums 50, 150, 300
        assert_eq!(st.n50(), 150);
        assert_eq!(session.latest().fasta(), s.contigs.as_path());
    }

    #[test]
    fn missing_contigs() {
        let s = setup();
        let backend = sspace_backend(&s);
        let missing = s.dir.path().join("missing.fa");
        let e = ScaffoldSession::new(&missing, &s.reads, backend, s.prefix.clone())
            .err()
            .unwrap();
        assert!(format!("{}", e).contains("does not appear to exist"));
    }

    #[test]
    fn contig_path_is_directory() {
        let s = setup();
        let backend = sspace_backend(&s);
        let e = ScaffoldSession::new(s.dir.path(), &s.reads, backend, s.prefix.clone())
            .err()
            .unwrap();
        assert!(format!("{}", e).contains("does not appear to exist"));
    }

    #[test]
    fn missing_sspace_script() {
        let s = setup();
        let backend = Backend::Sspace(Sspace::new(
            s.dir.path().join("SSPACE-LongRead.pl"),
            PathBuf::from("sh"),
        ));
        assert!(ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).is_err());
    }

    #[test]
    fn sspace_passes() {
        let s = setup();
        let backend = sspace_backend(&s);
        let mut session =
            ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).unwrap();

        let snap = session.run_pass(42).unwrap();
        assert_eq!(snap.pass(), 1);
        assert_eq!(snap.reads(), 42);
        assert!(snap.to_string().starts_with("1\t42\t"));
        assert!(snap.to_string().ends_with("\t2\t120\t200\t120"));
        assert_eq!(
            snap.fasta(),
            s.dir.path().join("scaf_1").join("scaffolds.fasta")
        );
        assert_eq!(session.statistics().contig_count(), 2);
        assert_eq!(session.statistics().sorted_sizes(), [80, 120]);
        assert_eq!(session.statistics().size_by_header().get("X"), Some(&120));
        assert_eq!(session.total_reads_consumed(), 42);
        assert_eq!(session.pass_counter(), 2);

        session.run_pass(100).unwrap();
        assert_eq!(session.pass_counter(), 3);
        assert_eq!(session.total_reads_consumed(), 100);
        assert!(s.dir.path().join("scaf_2").join("scaffolds.fasta").is_file());

        // Earlier snapshots are unchanged
        assert_eq!(session.history()[0].stats().contig_count(), 3);
        assert_eq!(session.history()[1].reads(), 42);
        assert_eq!(session.history().len(), 3);

        // Each pass scaffolds the original contigs
        let log = fs::read_to_string(s.dir.path().join("sspace.log")).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        let contigs = s.contigs.display().to_string();
        for (i, l) in lines.iter().enumerate() {
            let a: Vec<_> = l.split(' ').collect();
            assert_eq!(a[0..2], ["-c", contigs.as_str()]);
            assert_eq!(a[4..9], ["-i", "70", "-a", "1500", "-g-5000"]);
            assert_eq!(a[10], format!("{}_{}", s.prefix, i + 1));
        }
    }

    #[test]
    fn existing_output_dir() {
        let s = setup();
        let backend = sspace_backend(&s);
        let mut session =
            ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).unwrap();
        fs::create_dir(s.dir.path().join("scaf_1")).unwrap();
        assert!(session.run_pass(10).is_err());
        assert_eq!(session.pass_counter(), 1);
        assert_eq!(session.total_reads_consumed(), 0);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn scaffolder_without_output() {
        let s = setup();
        let script = s.dir.path().join("SSPACE-LongRead.pl");
        fs::write(&script, "echo failed >&2\nexit 1\n").unwrap();
        let backend = Backend::Sspace(Sspace::new(script, PathBuf::from("sh")));
        let mut session =
            ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).unwrap();
        assert!(session.run_pass(10).is_err());
        assert_eq!(session.pass_counter(), 1);
        assert_eq!(session.statistics().contig_count(), 3);
    }

    #[test]
    fn links_passes() {
        let s = setup();
        let backend = links_backend(&s);
        let mut session =
            ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).unwrap();

        for (i, n) in [5, 10, 15].into_iter().enumerate() {
            let snap = session.run_pass(n).unwrap();
            assert_eq!(snap.pass(), i + 1);
            assert_eq!(
                snap.fasta(),
                Path::new(&format!("{}_{}.scaffolds.fa", s.prefix, i + 1))
            );
        }
        assert_eq!(session.pass_counter(), 4);
        assert_eq!(session.total_reads_consumed(), 15);
        assert_eq!(session.statistics().sorted_sizes(), [3, 5, 10]);
        // sum 18, half 9: running sums 3, 8, 18
        assert_eq!(session.statistics().n50(), 10);

        let fof = fs::read_to_string(format!("{}.fof", s.prefix)).unwrap();
        assert_eq!(fof.lines().count(), 2);

        // Only the first pass makes a bloom filter; later passes reuse it
        let bloom = format!("{}_1.bloom", s.prefix);
        assert!(Path::new(&bloom).is_file());
        assert!(!Path::new(&format!("{}_2.bloom", s.prefix)).exists());
        let log = fs::read_to_string(s.dir.path().join("bin").join("links.log")).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(!lines[0].contains("-r"));
        for l in &lines[1..] {
            assert!(l.ends_with(&format!("-r {}", bloom)));
        }
    }

    #[test]
    fn scaffolder_stderr_not_captured() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo scaffolds; echo 'gap warning' >&2; exit 3"]);
        let out = run_command(cmd, "test").unwrap();
        assert!(!out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "scaffolds");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn links_not_installed() {
        let s = setup();
        let reads_dir = s.dir.path().join("reads_fasta");
        fs::create_dir(&reads_dir).unwrap();
        let backend = Backend::Links(Links::new(s.dir.path().join("no_such_links"), reads_dir));
        let mut session =
            ScaffoldSession::new(&s.contigs, &s.reads, backend, s.prefix.clone()).unwrap();
        assert!(session.run_pass(1).is_err());
        assert_eq!(session.pass_counter(), 1);
    }
}
