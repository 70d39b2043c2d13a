pub mod args;
pub mod collect;
pub mod datetime;
mod error;
pub mod insert;
pub mod ratelimit;
pub mod registry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

use log::LevelFilter;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flag(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    pub fn level(self) -> LevelFilter {
        match self {
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// installs the global logger, `RUST_LOG` takes precedence over the flag
pub fn init_logging(verbosity: Verbosity) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(verbosity.level())
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .parse_env("RUST_LOG");
    builder
        .try_init()
        .map_err(|e| Error::Config(format!("logger already initialized: {}", e)))
}
