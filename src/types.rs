// src/types.rs

use std::fmt;
use std::path::PathBuf;

/// User-facing job identity (`%N`). Equal to the job's index in the table.
pub type Slot = usize;

/// Where a job currently stands with respect to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Owns the controlling terminal; the prompt loop is waiting on it.
    Foreground,
    /// Running without the terminal.
    Background,
    /// Suspended by a stop signal.
    Stopped,
}

impl JobStatus {
    /// Word used by the `jobs` listing.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Foreground | JobStatus::Background => "running",
            JobStatus::Stopped => "stopped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One command of a pipeline: the program name and its full argument
/// vector (`argv[0]` included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub argv: Vec<String>,
}

impl Stage {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    /// The command name (`argv[0]`).
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or("")
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

/// A parsed command line, ready for the executor.
///
/// Redirections apply to the whole pipeline: `input` feeds the first stage,
/// `output` receives the last stage's standard output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub background: bool,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
