//! Command line arguments.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

/// Binary name shown in the usage message.
pub const BIN_NAME: &str = "fhir-submission-consumer";

#[derive(Debug, Parser)]
#[command(name = BIN_NAME)]
#[command(about = "Consumes FHIR submissions from Kafka", long_about = None)]
pub struct Cli {
    /// Configuration file to read (YAML)
    pub conf_file: PathBuf,
}

/// Outcome of argument parsing.
#[derive(Debug)]
pub enum Parsed {
    Run(Cli),
    /// `--help` or `--version`; clap already knows how to print it.
    Informational(clap::Error),
    /// Missing or invalid arguments.
    Usage,
}

pub fn parse_from<I, T>(args: I) -> Parsed
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Parsed::Run(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Parsed::Informational(e)
        }
        Err(_) => Parsed::Usage,
    }
}

pub fn usage() -> String {
    format!("Usage: {BIN_NAME} <conf-file>\n\n  conf-file     Configuration file to read (YAML)\n")
}

pub fn print_usage() {
    eprintln!("{}", usage());
}
