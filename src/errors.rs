// src/errors.rs

//! Crate-wide error type.
//!
//! Every variant renders the diagnostic shown to the user; the prompt loop
//! prints it as `pssh: <error>` and keeps going. Nothing here terminates the
//! shell.

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::jobs::MAX_JOBS;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("job table full (max {MAX_JOBS} jobs)")]
    JobTableFull,

    #[error("failed to create pipe: {0}")]
    Pipe(#[source] Errno),

    #[error("failed to fork: {0}")]
    Fork(#[source] Errno),

    #[error("could not open {path}: {source}")]
    Redirect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("argument contains a NUL byte: {0:?}")]
    NulInArgument(String),

    #[error("invalid syntax")]
    InvalidSyntax,

    #[error("builtin cannot be used in a pipeline: {0}")]
    BuiltinInPipeline(String),

    #[error("{builtin}: invalid job number: {arg}")]
    InvalidJobSpec { builtin: &'static str, arg: String },

    #[error("{builtin}: %{slot}: no such job")]
    NoSuchJob { builtin: &'static str, slot: usize },

    #[error("{builtin}: usage: {usage}")]
    Usage {
        builtin: &'static str,
        usage: &'static str,
    },

    #[error("bg: job {0} already in background")]
    AlreadyInBackground(usize),

    #[error("{builtin}: %{slot}: {cause}")]
    Resume {
        builtin: &'static str,
        slot: usize,
        #[source]
        cause: Errno,
    },

    #[error("kill: invalid signal: {0}")]
    BadSignal(String),

    #[error("kill: invalid process id: {0}")]
    BadPid(String),

    #[error("kill: ({0}) - No such process")]
    NoSuchProcess(String),

    #[error("kill: ({0}) - Operation not permitted")]
    PermissionDenied(String),

    #[error("kill: ({target}) - {cause}")]
    Delivery {
        target: String,
        #[source]
        cause: Errno,
    },

    #[error("terminal control failed: {0}")]
    Terminal(#[source] Errno),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShellError {
    /// Classify a failed signal delivery to `target` by its errno.
    pub fn from_delivery(target: impl Into<String>, errno: Errno) -> Self {
        let target = target.into();
        match errno {
            Errno::ESRCH => ShellError::NoSuchProcess(target),
            Errno::EPERM => ShellError::PermissionDenied(target),
            cause => ShellError::Delivery { target, cause },
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ShellError>;
