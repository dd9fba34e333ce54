//! Command-line interface for nabud.

use std::path::PathBuf;

use clap::Parser;

/// nabud - NABU Network Adapter emulator
#[derive(Parser, Debug)]
#[command(
    name = "nabud",
    author,
    version,
    about = "NABU Network Adapter emulator serving cycle content over a serial link",
    long_about = r#"
nabud answers the NABU Personal Computer's boot-time command protocol on a
serial port and serves packets from local cycle containers, downloading
missing segments from an HTTP origin.

QUICK START:
  nabud /dev/ttyUSB0
  nabud /dev/ttyUSB0 ./cycle nabu.retrotechchris.com/cycle2
"#
)]
pub struct Cli {
    /// Serial device connected to the NABU (e.g. /dev/ttyUSB0)
    pub device: Option<String>,

    /// Directory holding cycle containers (created if absent)
    pub cycle_dir: Option<PathBuf>,

    /// HTTP origin for missing segments, as host[:port][/path]
    pub origin: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Serve local containers only; never contact the origin
    #[arg(long)]
    pub offline: bool,
}
