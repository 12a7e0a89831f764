//! These structs provide the CLI interface for the meterbill CLI.

use crate::config::InitOptions;
use crate::model::DEFAULT_PER_UNIT_RATE;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// meterbill: A small server that records monthly electricity meter readings and computes bills.
///
/// Each month you submit the current meter reading, along with any advance and the water charge,
/// from the web client. The server computes the bill from the previous reading and keeps a record
/// of every month so that past bills can be looked up by month and year.
///
/// Run `meterbill init` once to create the data directory, then `meterbill serve`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and the store files.
    ///
    /// This is the first command you should run. You need to know the meter reading that your
    /// first bill will be measured from and pass it as --last-reading.
    ///
    /// - Decide what directory you want to store data in and pass this as --home. By default, it
    ///   will be $HOME/meterbill.
    ///
    /// - Copy the web client files (index.html and friends) into the static directory that this
    ///   command creates.
    Init(InitArgs),
    /// Serve the web client and the billing API until Ctrl-C is pressed.
    Serve(ServeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where meterbill data and configuration is held. Defaults to ~/meterbill
    #[arg(long, env = "METERBILL_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `meterbill init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The meter reading that the first bill will be measured from.
    #[arg(long)]
    last_reading: f64,

    /// The cost of one unit of electricity.
    #[arg(long, default_value_t = DEFAULT_PER_UNIT_RATE)]
    rate: f64,

    /// The port that `meterbill serve` will listen on.
    #[arg(long, default_value_t = InitOptions::default().port)]
    port: u16,
}

impl InitArgs {
    pub fn new(last_reading: f64, rate: f64, port: u16) -> Self {
        Self {
            last_reading,
            rate,
            port,
        }
    }

    pub fn last_reading(&self) -> f64 {
        self.last_reading
    }

    pub fn options(&self) -> InitOptions {
        InitOptions {
            per_unit_rate: self.rate,
            port: self.port,
        }
    }
}

/// (Not shown): Args for the `meterbill serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// Listen on this port instead of the one in config.json.
    #[arg(long)]
    port: Option<u16>,
}

impl ServeArgs {
    pub fn new(port: Option<u16>) -> Self {
        Self { port }
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("meterbill"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or METERBILL_HOME instead of relying on the default \
                meterbill home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("meterbill")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
