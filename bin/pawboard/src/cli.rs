//! Command-line parsing for the `pawboard` binary.

use pb_core::{FilterCriteria, RawFilter};
use thiserror::Error;

pub const USAGE: &str = "usage: pawboard browse [region=..] [collar=..] [date=..] [search=..]\n       pawboard stats";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the reports matching the filter, one JSON object per line.
    Browse(FilterCriteria),
    /// Print report counts by status and region.
    Stats,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("{USAGE}")]
    Usage,

    #[error("expected key=value, got {0:?}\n{USAGE}")]
    NotAPair(String),
}

impl Command {
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        match args.next().as_deref() {
            Some("browse") => {
                let pairs: Vec<String> = args.collect();
                let split = pairs
                    .iter()
                    .map(|arg| arg.split_once('=').ok_or_else(|| UsageError::NotAPair(arg.clone())))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Command::Browse(RawFilter::from_pairs(split).into()))
            }
            Some("stats") if args.next().is_none() => Ok(Command::Stats),
            _ => Err(UsageError::Usage),
        }
    }
}
