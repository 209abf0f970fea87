// src/signals/mod.rs

//! Signal handling, child reaping and terminal ownership.
//!
//! - [`reaper`] turns child state changes (exit, stop, continue) into job
//!   table transitions and user-visible notices.
//! - [`terminal`] decides which process group owns the controlling terminal.
//! - [`names`] is the signal table used by `kill`.
//!
//! The only code that runs in real signal context is tokio's SIGCHLD
//! handler, which just records the delivery. Everything in this module runs
//! on the shell task once that notification has been observed.

pub mod names;
pub mod reaper;
pub mod terminal;

use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::Pid;

use crate::errors::{Result, ShellError};

pub use reaper::{
    apply_event, reap, reconcile_terminal, ChildEvent, ChildEventKind, ChildEventSource,
    ChildNotifications, JobNotice, NoticeKind, WaitPid,
};
pub use terminal::{Terminal, TerminalControl};

/// Signals an interactive shell must not be stopped or killed by while it
/// owns the terminal.
const JOB_CONTROL_SIGNALS: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// Sends signals to processes and process groups.
pub trait Signaller {
    fn signal_process(&mut self, pid: Pid, signal: Signal) -> nix::Result<()>;

    fn signal_group(&mut self, pgid: Pid, signal: Signal) -> nix::Result<()>;
}

/// [`Signaller`] backed by `kill(2)` / `killpg(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignaller;

impl Signaller for OsSignaller {
    fn signal_process(&mut self, pid: Pid, sig: Signal) -> nix::Result<()> {
        signal::kill(pid, sig)
    }

    fn signal_group(&mut self, pgid: Pid, sig: Signal) -> nix::Result<()> {
        signal::killpg(pgid, sig)
    }
}

/// Make the shell immune to keyboard and background-tty signals.
pub fn ignore_job_control_signals() -> Result<()> {
    for sig in JOB_CONTROL_SIGNALS {
        // SAFETY: installing SIG_IGN runs no Rust code in signal context.
        unsafe { signal::signal(sig, SigHandler::SigIgn) }.map_err(ShellError::Terminal)?;
    }
    Ok(())
}

/// Undo the shell's dispositions in a freshly forked child.
///
/// Called between `fork` and `exec`: uses `sigaction` only and ignores
/// failures, as there is nobody to report them to.
pub(crate) fn restore_default_signals() {
    for sig in JOB_CONTROL_SIGNALS
        .into_iter()
        .chain([Signal::SIGCHLD, Signal::SIGPIPE])
    {
        // SAFETY: SIG_DFL installs no handler.
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    }
}
