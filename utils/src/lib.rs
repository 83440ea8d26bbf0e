#[macro_use]
extern crate anyhow;

use std::{fmt, io::BufRead, str::FromStr};

use clap::ArgMatches;

/// LogLevel
///
/// Minimum level of messages that will be logged.  `None` silences logging
/// completely
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    None,
}

const LEVEL_STR: [&str; 6] = ["error", "warn", "info", "debug", "trace", "none"];

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "none" => Ok(Self::None),
            _ => Err("no match"),
        }
    }
}

impl LogLevel {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Verbosity as understood by stderrlog (0 = errors only)
    pub fn verbosity(&self) -> usize {
        match self {
            Self::None => 0,
            l => *l as usize,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", LEVEL_STR[*self as usize])
    }
}

/// Initialize logging from command line arguments
///
/// Expects the `loglevel`, `quiet` and `timestamp` arguments to have been
/// declared in the clap model
pub fn init_log(m: &ArgMatches) -> anyhow::Result<()> {
    let level = m
        .get_one::<LogLevel>("loglevel")
        .copied()
        .unwrap_or(LogLevel::Info);
    let quiet = level.is_none() || m.get_flag("quiet");
    let ts = m
        .get_one::<stderrlog::Timestamp>("timestamp")
        .copied()
        .unwrap_or(stderrlog::Timestamp::Off);

    stderrlog::new()
        .quiet(quiet)
        .verbosity(level.verbosity())
        .timestamp(ts)
        .init()
        .map_err(|e| anyhow!("Could not initialize logging: {}", e))
}

/// Read in next line, returning it with trailing white space removed.
/// Returns None at EOF
pub fn next_line<'a, R: BufRead>(
    rdr: &mut R,
    buf: &'a mut String,
) -> anyhow::Result<Option<&'a str>> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(None)
    } else {
        Ok(Some(buf.trim_end()))
    }
}
