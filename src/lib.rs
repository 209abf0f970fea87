// src/lib.rs

pub mod builtins;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod jobs;
pub mod logging;
pub mod parse;
pub mod shell;
pub mod signals;
pub mod types;

use tokio::io::BufReader;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::load_optional;
use crate::errors::Result;
use crate::shell::Shell;
use crate::signals::{OsSignaller, Terminal, TerminalControl};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, takes the controlling terminal when there is one and
/// runs the prompt loop on stdin. Returns the shell's exit status.
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut config = load_optional(args.config.as_deref())?;
    if args.no_banner {
        config.shell.banner = false;
    }

    let terminal = Terminal::acquire()?;
    info!(interactive = terminal.is_interactive(), "starting shell");

    let mut shell = Shell::new(
        config,
        Box::new(terminal),
        Box::new(OsSignaller),
        Box::new(std::io::stdout()),
    )?;

    shell.run(BufReader::new(tokio::io::stdin())).await
}

