use std::path::PathBuf;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    ArgMatches, Command,
};

use utils::{init_log, LogLevel};

use crate::{
    backend::{Backend, Links, ScaffolderKind, Sspace},
    config::Config,
};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("scaffolder")
                .short('s')
                .long("scaffolder")
                .value_parser(value_parser!(ScaffolderKind))
                .value_name("NAME")
                .required(true)
                .help("Scaffolder to use (sspace or links)"),
        )
        .arg(
            Arg::new("sspace")
                .short('S')
                .long("sspace")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Path to SSPACE-LongRead.pl (required for sspace)"),
        )
        .arg(
            Arg::new("perl")
                .long("perl")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value("perl")
                .help("Perl interpreter used to run SSPACE-LongRead"),
        )
        .arg(
            Arg::new("links")
                .long("links")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value("LINKS")
                .help("LINKS executable"),
        )
        .arg(
            Arg::new("reads_dir")
                .short('r')
                .long("reads-dir")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .default_value("reads_fasta")
                .help("Directory with read files for LINKS"),
        )
        .arg(
            Arg::new("output_prefix")
                .short('p')
                .long("output-prefix")
                .value_parser(value_parser!(String))
                .value_name("STRING")
                .default_value("scaffold")
                .help("Set prefix for output file and directory names"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output-file")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Set summary output file [default: <stdout>]"),
        )
        .arg(
            Arg::new("sizes")
                .action(ArgAction::SetTrue)
                .long("sizes")
                .help("Write sequence sizes for each pass to <output_prefix>_<pass>.sizes.txt"),
        )
        .arg(
            Arg::new("contig_file")
                .value_parser(value_parser!(PathBuf))
                .value_name("CONTIG_FILE")
                .required(true)
                .help("Input FASTA file with contigs"),
        )
        .arg(
            Arg::new("reads_file")
                .value_parser(value_parser!(PathBuf))
                .value_name("READS_FILE")
                .required(true)
                .help("Input file with long reads"),
        )
        .arg(
            Arg::new("read_counts")
                .value_parser(value_parser!(u64))
                .value_name("READ_COUNT")
                .num_args(1..)
                .help("Number of reads used so far; one scaffolding pass is run per value"),
        )
}

/// Build backend from command line options
fn get_backend(m: &ArgMatches) -> anyhow::Result<Backend> {
    let kind = *m
        .get_one::<ScaffolderKind>("scaffolder")
        .expect("Missing scaffolder");
    debug!("Scaffolder: {}", kind);

    Ok(match kind {
        ScaffolderKind::Sspace => {
            let script = m
                .get_one::<PathBuf>("sspace")
                .ok_or_else(|| anyhow!("Path to SSPACE-LongRead (--sspace) is required with sspace"))?
                .to_owned();
            let perl = m
                .get_one::<PathBuf>("perl")
                .expect("Missing default perl")
                .to_owned();
            Backend::Sspace(Sspace::new(script, perl))
        }
        ScaffolderKind::Links => {
            let program = m
                .get_one::<PathBuf>("links")
                .expect("Missing default LINKS")
                .to_owned();
            let reads_dir = m
                .get_one::<PathBuf>("reads_dir")
                .expect("Missing default reads dir")
                .to_owned();
            Backend::Links(Links::new(program, reads_dir))
        }
    })
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m)?;

    debug!("Processing command line options");

    let backend = get_backend(&m)?;

    let output_prefix = m
        .get_one::<String>("output_prefix")
        .expect("Missing default output prefix")
        .clone();

    let contigs = m
        .get_one::<PathBuf>("contig_file")
        .expect("Missing contig file")
        .to_owned();

    let reads = m
        .get_one::<PathBuf>("reads_file")
        .expect("Missing reads file")
        .to_owned();

    let mut cfg = Config::new(contigs, reads, backend, output_prefix);

    if let Some(v) = m.get_many::<u64>("read_counts") {
        cfg.set_read_counts(v.copied().collect())
    }
    debug!("Number of passes requested: {}", cfg.read_counts().len());

    if let Some(p) = m.get_one::<PathBuf>("output") {
        cfg.set_output_file(p.to_owned())
    }

    if m.get_flag("sizes") {
        cfg.set_write_sizes()
    }

    Ok(cfg)
}
