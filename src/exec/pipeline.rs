// src/exec/pipeline.rs

//! Launching a pipeline as one job.

use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::signal::Signal;
use nix::sys::wait::waitpid;
use nix::unistd::{fork, pipe2, setpgid, ForkResult, Pid};
use tracing::{debug, info, warn};

use crate::errors::{Result, ShellError};
use crate::exec::child::{self, ChildSetup, ExecImage, StageIo};
use crate::exec::resolve::CommandResolver;
use crate::jobs::JobTable;
use crate::signals::{Signaller, TerminalControl};
use crate::types::{Pipeline, Slot};

/// Everything a launch touches besides the pipeline itself.
pub struct Launcher<'a> {
    pub table: &'a mut JobTable,
    pub terminal: &'a mut dyn TerminalControl,
    pub signaller: &'a mut dyn Signaller,
    pub resolver: &'a CommandResolver,
}

impl Launcher<'_> {
    /// Start every stage of `pipeline` as one job and return its slot.
    ///
    /// The caller decides what to do next: announce a background job, or
    /// wait for a foreground one. On error nothing of the pipeline is left
    /// running and no slot stays allocated.
    pub fn launch(&mut self, pipeline: &Pipeline, command_text: &str) -> Result<Slot> {
        if pipeline.is_empty() {
            return Err(ShellError::InvalidSyntax);
        }

        let redirects = Redirects::open(pipeline)?;
        let slot = self.table.allocate(command_text)?;

        match self.launch_stages(pipeline, slot, &redirects) {
            Ok(()) => {
                info!(
                    slot,
                    stages = pipeline.len(),
                    background = pipeline.background,
                    "pipeline launched"
                );
                Ok(slot)
            }
            Err(e) => {
                self.abort(slot);
                Err(e)
            }
        }
    }

    fn launch_stages(&mut self, pipeline: &Pipeline, slot: Slot, redirects: &Redirects) -> Result<()> {
        let last = pipeline.len() - 1;
        let foreground = !pipeline.background;
        let take_terminal = foreground && self.terminal.is_interactive();

        let mut pgid: Option<Pid> = None;
        let mut prev_read: Option<OwnedFd> = None;

        for (i, stage) in pipeline.stages.iter().enumerate() {
            let path = self
                .resolver
                .resolve(stage.program())
                .ok_or_else(|| ShellError::CommandNotFound(stage.program().to_string()))?;
            let image = ExecImage::build(&path, stage)?;

            let next = if i < last {
                Some(pipe2(OFlag::O_CLOEXEC).map_err(ShellError::Pipe)?)
            } else {
                None
            };

            let io = StageIo {
                input: if i == 0 { redirects.input_fd() } else { None },
                output: if i == last { redirects.output_fd() } else { None },
                pipe_in: prev_read.as_ref().map(AsRawFd::as_raw_fd),
                pipe_out: next.as_ref().map(|(_, write)| write.as_raw_fd()),
            };
            let setup = ChildSetup {
                pgid,
                take_terminal,
            };

            // SAFETY: the child branch only runs `exec_stage`, which restricts
            // itself to async-signal-safe system calls.
            match unsafe { fork() }.map_err(ShellError::Fork)? {
                ForkResult::Child => child::exec_stage(&image, &io, &setup),
                ForkResult::Parent { child } => {
                    let group = pgid.unwrap_or(child);
                    // Also done by the child; whichever runs second gets
                    // EACCES (already exec'd) or ESRCH (already gone).
                    if let Err(e) = setpgid(child, group) {
                        debug!(%child, %group, error = %e, "parent-side setpgid skipped");
                    }
                    self.table.add_stage(slot, child, pipeline.background);
                    debug!(slot, stage = i, pid = %child, path = %path.display(), "forked stage");

                    if pgid.is_none() {
                        pgid = Some(child);
                        if foreground {
                            if let Err(e) = self.terminal.hand_to(child) {
                                warn!(slot, error = %e, "could not give terminal to job");
                            }
                        }
                    }
                }
            }

            // The child has its copies now. Keep only the read end that
            // feeds the next stage; the old one closes on reassignment.
            prev_read = next.map(|(read, _write)| read);
        }

        Ok(())
    }

    /// Tear down a partially launched job: kill and reap every stage that
    /// was started, free the slot and take the terminal back.
    fn abort(&mut self, slot: Slot) {
        let pids: Vec<Pid> = self
            .table
            .get(slot)
            .map(|job| job.pids().to_vec())
            .unwrap_or_default();

        for &pid in &pids {
            if let Err(e) = self.signaller.signal_process(pid, Signal::SIGKILL) {
                debug!(%pid, error = %e, "stage already gone");
            }
        }
        for &pid in &pids {
            loop {
                match waitpid(pid, None) {
                    Err(Errno::EINTR) => continue,
                    Ok(status) => {
                        debug!(%pid, ?status, "reaped aborted stage");
                        break;
                    }
                    Err(e) => {
                        debug!(%pid, error = %e, "aborted stage not reapable");
                        break;
                    }
                }
            }
        }

        self.table.release(slot);
        if let Err(e) = self.terminal.reclaim() {
            warn!(error = %e, "failed to reclaim terminal after aborted launch");
        }
        if !pids.is_empty() {
            info!(slot, stages = pids.len(), "aborted partially launched pipeline");
        }
    }
}

/// Files named by `<` and `>`, opened before anything is forked.
#[derive(Debug, Default)]
struct Redirects {
    input: Option<File>,
    output: Option<File>,
}

impl Redirects {
    fn open(pipeline: &Pipeline) -> Result<Self> {
        let input = pipeline
            .input
            .as_deref()
            .map(|path| File::open(path).map_err(|source| redirect_error(path, source)))
            .transpose()?;

        let output = pipeline
            .output
            .as_deref()
            .map(|path| {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(0o644)
                    .open(path)
                    .map_err(|source| redirect_error(path, source))
            })
            .transpose()?;

        Ok(Self { input, output })
    }

    fn input_fd(&self) -> Option<i32> {
        self.input.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn output_fd(&self) -> Option<i32> {
        self.output.as_ref().map(AsRawFd::as_raw_fd)
    }
}

fn redirect_error(path: &Path, source: std::io::Error) -> ShellError {
    ShellError::Redirect {
        path: path.to_path_buf(),
        source,
    }
}
