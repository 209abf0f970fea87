// src/exec/child.rs

//! The child side of a stage, between `fork` and `exec`.
//!
//! Everything the child needs is prepared by the parent beforehand: the
//! resolved path and argv as C strings, the NUL-terminated pointer array and
//! the raw descriptors to wire up. After the fork the child only makes
//! direct system calls; it never allocates, locks or writes through a
//! buffered stream.

use std::ffi::{c_char, CString};
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;

use nix::unistd::{getpgrp, setpgid, tcsetpgrp, Pid};

use crate::errors::{Result, ShellError};
use crate::signals;
use crate::signals::terminal::terminal_fd;
use crate::types::Stage;

/// A ready-to-exec program image.
pub(crate) struct ExecImage {
    path: CString,
    // Owns the strings `argv_ptrs` points into.
    _argv: Vec<CString>,
    argv_ptrs: Vec<*const c_char>,
}

impl ExecImage {
    pub(crate) fn build(path: &Path, stage: &Stage) -> Result<Self> {
        let path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| ShellError::NulInArgument(path.display().to_string()))?;
        let argv = stage
            .argv
            .iter()
            .map(|arg| {
                CString::new(arg.as_str()).map_err(|_| ShellError::NulInArgument(arg.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut argv_ptrs: Vec<*const c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
        argv_ptrs.push(ptr::null());

        Ok(Self {
            path,
            _argv: argv,
            argv_ptrs,
        })
    }
}

/// Descriptors a stage gets on stdin/stdout. File redirections are applied
/// first, so pipe ends win when both are present.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StageIo {
    pub input: Option<RawFd>,
    pub output: Option<RawFd>,
    pub pipe_in: Option<RawFd>,
    pub pipe_out: Option<RawFd>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ChildSetup {
    /// Group to join; `None` makes this stage the group leader.
    pub pgid: Option<Pid>,
    /// Take the terminal before exec (foreground job, interactive shell).
    pub take_terminal: bool,
}

/// Turn the freshly forked child into the stage's program. Never returns.
pub(crate) fn exec_stage(image: &ExecImage, io: &StageIo, setup: &ChildSetup) -> ! {
    // Join the job's group before anything else so the parent never races us.
    let _ = setpgid(Pid::from_raw(0), setup.pgid.unwrap_or(Pid::from_raw(0)));
    if setup.take_terminal {
        let _ = tcsetpgrp(terminal_fd(), getpgrp());
    }

    signals::restore_default_signals();

    let wiring = [
        (io.input, libc::STDIN_FILENO),
        (io.output, libc::STDOUT_FILENO),
        (io.pipe_in, libc::STDIN_FILENO),
        (io.pipe_out, libc::STDOUT_FILENO),
    ];
    for (fd, target) in wiring {
        if let Some(fd) = fd {
            // SAFETY: plain dup2 on descriptors the parent left open for us.
            if unsafe { libc::dup2(fd, target) } == -1 {
                die(b"pssh: child -- dup2() failed\n");
            }
        }
    }

    // SAFETY: `path` and the NULL-terminated `argv_ptrs` outlive the call.
    unsafe {
        libc::execv(image.path.as_ptr(), image.argv_ptrs.as_ptr());
    }
    die(b"pssh: child -- failed to exec!\n")
}

fn die(msg: &[u8]) -> ! {
    // SAFETY: write(2) and _exit(2) are async-signal-safe.
    unsafe {
        libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::_exit(127)
    }
}
