use std::{
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
};

use anyhow::Context;

// Fixed SSPACE-LongRead parameters
const SSPACE_INSERT_SIZE: &str = "70";
const SSPACE_GAP_ESTIMATE: &str = "1500";
// "-g" and "-5000" end up as a single argument.  This is what existing
// runs were made with, so leave it as is
const SSPACE_GAP_FLAG: &str = "-g-5000";
const SSPACE_OUTPUT: &str = "scaffolds.fasta";

// Fixed LINKS parameters
const LINKS_DISTANCE: &str = "1000";
const LINKS_KMER: &str = "10";
const LINKS_OUTPUT_SUFFIX: &str = "scaffolds.fa";

/// PassJob
///
/// Inputs for one scaffolding pass
///
/// pass - pass number (starting at 1)
/// contigs - contig FASTA to be scaffolded
/// reads - long read file
/// output_prefix - prefix for all output files
/// bloom_filter - bloom filter from an earlier pass that should be reused
///
pub struct PassJob<'a> {
    pub pass: usize,
    pub contigs: &'a Path,
    pub reads: &'a Path,
    pub output_prefix: &'a str,
    pub bloom_filter: Option<PathBuf>,
}

impl<'a> PassJob<'a> {
    /// <output_prefix>_<pass>
    pub fn base_name(&self) -> PathBuf {
        PathBuf::from(format!("{}_{}", self.output_prefix, self.pass))
    }
}

/// Bloom filter written by LINKS on the first pass
pub fn first_bloom_filter(output_prefix: &str) -> PathBuf {
    PathBuf::from(format!("{}_1.bloom", output_prefix))
}

/// Fails unless p is a regular file that can be opened for reading
pub fn check_readable_file(p: &Path) -> anyhow::Result<()> {
    if !p.is_file() {
        return Err(anyhow!("{} does not appear to exist", p.display()));
    }
    File::open(p).with_context(|| format!("{} does not appear to exist", p.display()))?;
    Ok(())
}

/// Scaffolder
///
/// An external scaffolding tool that can be run once per pass.
/// Running a pass consists of `prepare`, running the command returned by
/// `command` to completion and then reading the FASTA file at `output_fasta`
pub trait Scaffolder {
    fn name(&self) -> &'static str;

    /// Check that the tool can be used.  An error here should stop the run
    fn check_available(&self) -> anyhow::Result<()>;

    /// Set up files or directories needed for the pass
    fn prepare(&self, job: &PassJob) -> anyhow::Result<()>;

    fn command(&self, job: &PassJob) -> Command;

    /// Where the scaffolds from this pass will be written
    fn output_fasta(&self, job: &PassJob) -> PathBuf;
}

/// SSPACE-LongRead, run through a perl interpreter
///
/// Each pass writes to its own output directory, <output_prefix>_<pass>
#[derive(Clone)]
pub struct Sspace {
    script: PathBuf,
    perl: PathBuf,
}

impl Sspace {
    pub fn new(script: PathBuf, perl: PathBuf) -> Self {
        Self { script, perl }
    }
}

impl Scaffolder for Sspace {
    fn name(&self) -> &'static str {
        "SSPACE-LongRead"
    }

    fn check_available(&self) -> anyhow::Result<()> {
        trace!("Checking for SSPACE script {}", self.script.display());
        check_readable_file(&self.script)
    }

    fn prepare(&self, job: &PassJob) -> anyhow::Result<()> {
        let dir = job.base_name();
        debug!("Creating output directory {}", dir.display());
        fs::create_dir(&dir)
            .with_context(|| format!("Error creating output directory {}", dir.display()))
    }

    fn command(&self, job: &PassJob) -> Command {
        let mut cmd = Command::new(&self.perl);
        cmd.arg(&self.script)
            .arg("-c")
            .arg(job.contigs)
            .arg("-p")
            .arg(job.reads)
            .args(["-i", SSPACE_INSERT_SIZE, "-a", SSPACE_GAP_ESTIMATE, SSPACE_GAP_FLAG])
            .arg("-b")
            .arg(job.base_name());
        cmd
    }

    fn output_fasta(&self, job: &PassJob) -> PathBuf {
        job.base_name().join(SSPACE_OUTPUT)
    }
}

/// LINKS
///
/// The reads are passed to LINKS through a file of files (<output_prefix>.fof)
/// listing the contents of reads_dir.  Output files from each pass start with
/// <output_prefix>_<pass>
#[derive(Clone)]
pub struct Links {
    program: PathBuf,
    reads_dir: PathBuf,
}

impl Links {
    pub fn new(program: PathBuf, reads_dir: PathBuf) -> Self {
        Self { program, reads_dir }
    }

    pub fn fof_path(output_prefix: &str) -> PathBuf {
        PathBuf::from(format!("{}.fof", output_prefix))
    }

    /// Write all regular files in reads_dir to the file of files, one per line.
    /// Files are listed in directory order.  Returns the number of files listed
    pub fn write_fof(&self, fof: &Path) -> anyhow::Result<usize> {
        debug!(
            "Writing list of files in {} to {}",
            self.reads_dir.display(),
            fof.display()
        );
        let mut wrt = BufWriter::new(
            File::create(fof)
                .with_context(|| format!("Error creating file of files {}", fof.display()))?,
        );
        let mut n = 0;
        for f in self
            .reads_dir
            .read_dir()
            .with_context(|| format!("Error reading directory {}", self.reads_dir.display()))?
        {
            let entry = f.with_context(|| {
                format!(
                    "Could not get directory entry from {}",
                    self.reads_dir.display()
                )
            })?;
            let path = entry.path();
            if path.is_file() {
                trace!("Adding {} to file of files", path.display());
                writeln!(wrt, "{}", path.display())
                    .with_context(|| format!("Error writing to {}", fof.display()))?;
                n += 1;
            }
        }
        wrt.flush()
            .with_context(|| format!("Error writing to {}", fof.display()))?;
        if n == 0 {
            warn!("No read files found in {}", self.reads_dir.display())
        }
        Ok(n)
    }
}

impl Scaffolder for Links {
    fn name(&self) -> &'static str {
        "LINKS"
    }

    /// Run `LINKS -v`.  LINKS not being found is reported but does not stop the run
    fn check_available(&self) -> anyhow::Result<()> {
        trace!("Checking for {}", self.program.display());
        match Command::new(&self.program)
            .arg("-v")
            .stdin(Stdio::null())
            .output()
        {
            Ok(out) => debug!(
                "{} -v exited with {}: {}",
                self.program.display(),
                out.status,
                String::from_utf8_lossy(&out.stdout).trim()
            ),
            Err(e) => warn!("Could not run {}: {}", self.program.display(), e),
        }
        Ok(())
    }

    fn prepare(&self, job: &PassJob) -> anyhow::Result<()> {
        self.write_fof(&Self::fof_path(job.output_prefix))?;
        Ok(())
    }

    fn command(&self, job: &PassJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-f")
            .arg(job.contigs)
            .arg("-s")
            .arg(Self::fof_path(job.output_prefix))
            .arg("-b")
            .arg(job.base_name())
            .args(["-d", LINKS_DISTANCE, "-k", LINKS_KMER]);
        if let Some(bf) = job.bloom_filter.as_deref() {
            cmd.arg("-r").arg(bf);
        }
        cmd
    }

    fn output_fasta(&self, job: &PassJob) -> PathBuf {
        PathBuf::from(format!(
            "{}.{}",
            job.base_name().display(),
            LINKS_OUTPUT_SUFFIX
        ))
    }
}

/// Scaffolder selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffolderKind {
    Sspace,
    Links,
}

impl FromStr for ScaffolderKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sspace" => Ok(Self::Sspace),
            "links" => Ok(Self::Links),
            _ => Err("no match (expected sspace or links)"),
        }
    }
}

impl fmt::Display for ScaffolderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sspace => write!(f, "sspace"),
            Self::Links => write!(f, "links"),
        }
    }
}

/// Backend
///
/// The scaffolder used by a session.  Fixed once the session is created
#[derive(Clone)]
pub enum Backend {
    Sspace(Sspace),
    Links(Links),
}

impl Backend {
    pub fn kind(&self) -> ScaffolderKind {
        match self {
            Self::Sspace(_) => ScaffolderKind::Sspace,
            Self::Links(_) => ScaffolderKind::Links,
        }
    }

    pub fn scaffolder(&self) -> &dyn Scaffolder {
        match self {
            Self::Sspace(s) => s,
            Self::Links(l) => l,
        }
    }
}
