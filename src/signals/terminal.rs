// src/signals/terminal.rs

//! Controlling-terminal ownership.
//!
//! Exactly one process group is the terminal's foreground group at a time:
//! the shell's own, or the group of the job running in the foreground.

use std::io::IsTerminal;
use std::os::fd::BorrowedFd;

use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{getpgrp, getpid, setpgid, tcgetpgrp, tcsetpgrp, Pid};
use tracing::{debug, info};

use crate::errors::{Result, ShellError};

/// Who owns the terminal, and how to hand it over.
pub trait TerminalControl {
    /// False when there is no controlling terminal to arbitrate (stdin is a
    /// pipe or file); handoffs are then no-ops.
    fn is_interactive(&self) -> bool;

    /// The shell's own process group.
    fn shell_group(&self) -> Pid;

    /// Current foreground group of the terminal.
    fn owner(&self) -> Option<Pid>;

    /// Make `pgid` the terminal's foreground group.
    fn hand_to(&mut self, pgid: Pid) -> Result<()>;

    /// Give the terminal back to the shell.
    fn reclaim(&mut self) -> Result<()> {
        let shell = self.shell_group();
        self.hand_to(shell)
    }
}

/// Standard input, which the shell treats as its controlling terminal.
pub(crate) fn terminal_fd() -> BorrowedFd<'static> {
    // SAFETY: fd 0 stays open for the life of the process.
    unsafe { BorrowedFd::borrow_raw(libc::STDIN_FILENO) }
}

/// The real controlling terminal on stdin.
#[derive(Debug, Clone)]
pub struct Terminal {
    shell_pgid: Pid,
    interactive: bool,
}

impl Terminal {
    /// Set the shell up for job control.
    ///
    /// When stdin is a terminal: wait until the shell is in the foreground,
    /// ignore the job-control signals, move the shell into its own process
    /// group and take the terminal. Otherwise returns a detached terminal.
    pub fn acquire() -> Result<Self> {
        if !std::io::stdin().is_terminal() {
            info!("stdin is not a terminal; job control handoff disabled");
            return Ok(Self::detached());
        }

        let fd = terminal_fd();
        loop {
            let pgrp = getpgrp();
            let foreground = tcgetpgrp(fd).map_err(ShellError::Terminal)?;
            if foreground == pgrp {
                break;
            }
            debug!(%pgrp, %foreground, "shell started in background; waiting for terminal");
            killpg(pgrp, Signal::SIGTTIN).map_err(ShellError::Terminal)?;
        }

        super::ignore_job_control_signals()?;

        let pid = getpid();
        if getpgrp() != pid {
            match setpgid(pid, pid) {
                // Session leaders cannot change group; they already lead one.
                Ok(()) | Err(Errno::EPERM) => {}
                Err(e) => return Err(ShellError::Terminal(e)),
            }
        }

        let shell_pgid = getpgrp();
        tcsetpgrp(fd, shell_pgid).map_err(ShellError::Terminal)?;
        info!(%shell_pgid, "shell owns the terminal");

        Ok(Self {
            shell_pgid,
            interactive: true,
        })
    }

    /// A terminal that never changes hands.
    pub fn detached() -> Self {
        Self {
            shell_pgid: getpgrp(),
            interactive: false,
        }
    }
}

impl TerminalControl for Terminal {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn shell_group(&self) -> Pid {
        self.shell_pgid
    }

    fn owner(&self) -> Option<Pid> {
        if !self.interactive {
            return None;
        }
        tcgetpgrp(terminal_fd()).ok()
    }

    fn hand_to(&mut self, pgid: Pid) -> Result<()> {
        if !self.interactive {
            return Ok(());
        }
        debug!(%pgid, "handing terminal over");
        tcsetpgrp(terminal_fd(), pgid).map_err(ShellError::Terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_terminal_never_changes_hands() {
        let mut term = Terminal::detached();
        assert!(!term.is_interactive());
        assert_eq!(term.owner(), None);
        assert!(term.hand_to(Pid::from_raw(1)).is_ok());
        assert!(term.reclaim().is_ok());
        assert_eq!(term.shell_group(), getpgrp());
    }
}
