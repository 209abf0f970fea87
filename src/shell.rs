// src/shell.rs

//! The prompt loop.
//!
//! [`Shell`] owns the job table and is the only thing that touches it. Child
//! state changes are picked up by draining `waitpid` whenever a SIGCHLD
//! notification is pending: while the prompt waits for a line and while a
//! foreground job is being waited for.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::builtins::{self, Builtin, BuiltinContext, BuiltinOutcome};
use crate::config::ConfigFile;
use crate::errors::{Result, ShellError};
use crate::exec::{CommandResolver, Launcher};
use crate::jobs::JobTable;
use crate::parse::parse_line;
use crate::signals::{
    self, ChildEventSource, ChildNotifications, Signaller, TerminalControl, WaitPid,
};
use crate::types::{JobStatus, Pipeline, Slot};

const BANNER: &str = concat!(
    "                    ________   \n",
    "_________________________  /_  \n",
    "___  __ \\_  ___/_  ___/_  __ \\ \n",
    "__  /_/ /(__  )_(__  )_  / / / \n",
    "_  .___//____/ /____/ /_/ /_/  \n",
    "/_/ Type 'exit' to quit\n",
);

pub struct Shell {
    config: ConfigFile,
    table: JobTable,
    terminal: Box<dyn TerminalControl>,
    signaller: Box<dyn Signaller>,
    events: Box<dyn ChildEventSource>,
    resolver: CommandResolver,
    notifications: ChildNotifications,
    out: Box<dyn Write>,
}

impl Shell {
    /// Build a shell that reaps with `waitpid`. Must run inside a tokio
    /// runtime, before any child is started.
    pub fn new(
        config: ConfigFile,
        terminal: Box<dyn TerminalControl>,
        signaller: Box<dyn Signaller>,
        out: Box<dyn Write>,
    ) -> Result<Self> {
        let resolver = match config.exec.search_path.as_deref() {
            Some(path) => CommandResolver::new(Some(path)),
            None => CommandResolver::from_env(),
        };

        Ok(Self {
            config,
            table: JobTable::new(),
            terminal,
            signaller,
            events: Box::new(WaitPid),
            resolver,
            notifications: ChildNotifications::register()?,
            out,
        })
    }

    pub fn jobs(&self) -> &JobTable {
        &self.table
    }

    /// Read and execute lines until EOF or `exit`. Returns the exit status.
    pub async fn run<R>(&mut self, mut input: R) -> Result<i32>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.config.shell.banner {
            writeln!(self.out, "{BANNER}")?;
        }

        let mut buf = Vec::new();
        loop {
            self.reap()?;
            self.print_prompt()?;

            buf.clear();
            let read = {
                let next = input.read_until(b'\n', &mut buf);
                tokio::pin!(next);
                loop {
                    tokio::select! {
                        read = &mut next => break read?,
                        notified = self.notifications.notified() => {
                            notified?;
                            self.reap()?;
                        }
                    }
                }
            };

            if read == 0 {
                writeln!(self.out)?;
                info!("end of input; leaving");
                return Ok(0);
            }

            // Undecodable bytes become U+FFFD rather than ending the loop.
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);

            match self.execute_line(line).await {
                Ok(Some(code)) => {
                    info!(code, "exit requested");
                    return Ok(code);
                }
                Ok(None) => {}
                Err(e) => self.report(&e)?,
            }
        }
    }

    /// Parse and run one command line. `Some(code)` means the user asked to
    /// leave.
    pub async fn execute_line(&mut self, line: &str) -> Result<Option<i32>> {
        let Some(pipeline) = parse_line(line)? else {
            return Ok(None);
        };
        let command_text = line.trim();

        let builtin = pipeline
            .stages
            .iter()
            .find_map(|stage| Builtin::from_name(stage.program()));

        match builtin {
            Some(builtin) if pipeline.len() > 1 => {
                Err(ShellError::BuiltinInPipeline(builtin.name().to_string()))
            }
            Some(builtin) => {
                let args = pipeline.stages[0].args().to_vec();
                let outcome = self
                    .run_builtin(builtin, &args, pipeline.output.as_deref())
                    .await?;
                match outcome {
                    BuiltinOutcome::Exit(code) => Ok(Some(code)),
                    _ => Ok(None),
                }
            }
            None => {
                self.run_pipeline(&pipeline, command_text).await?;
                Ok(None)
            }
        }
    }

    /// Launch `pipeline` as a job. A background job is announced and left
    /// running; a foreground job is waited for until it stops or finishes.
    pub async fn run_pipeline(&mut self, pipeline: &Pipeline, command_text: &str) -> Result<Slot> {
        let slot = Launcher {
            table: &mut self.table,
            terminal: self.terminal.as_mut(),
            signaller: self.signaller.as_mut(),
            resolver: &self.resolver,
        }
        .launch(pipeline, command_text)?;

        if pipeline.background {
            self.announce(slot)?;
        } else {
            self.wait_for_foreground(slot).await?;
        }
        Ok(slot)
    }

    /// Run a builtin with its output going to the shell's writer.
    pub async fn dispatch_builtin(&mut self, name: &str, args: &[String]) -> Result<BuiltinOutcome> {
        let builtin = Builtin::from_name(name)
            .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))?;
        self.run_builtin(builtin, args, None).await
    }

    async fn run_builtin(
        &mut self,
        builtin: Builtin,
        args: &[String],
        output: Option<&Path>,
    ) -> Result<BuiltinOutcome> {
        let mut file;
        let out: &mut dyn Write = match output {
            Some(path) => {
                file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(0o644)
                    .open(path)
                    .map_err(|source| ShellError::Redirect {
                        path: path.to_path_buf(),
                        source,
                    })?;
                &mut file
            }
            None => self.out.as_mut(),
        };

        let mut ctx = BuiltinContext {
            table: &mut self.table,
            terminal: self.terminal.as_mut(),
            signaller: self.signaller.as_mut(),
            resolver: &self.resolver,
            out,
        };
        let outcome = builtins::dispatch_builtin(builtin, args, &mut ctx)?;
        ctx.out.flush()?;
        debug!(builtin = builtin.name(), ?outcome, "builtin finished");

        if let BuiltinOutcome::Foreground(slot) = outcome {
            self.wait_for_foreground(slot).await?;
        }
        Ok(outcome)
    }

    /// Sleep until job `slot` is no longer in the foreground, then make sure
    /// the shell has the terminal back.
    async fn wait_for_foreground(&mut self, slot: Slot) -> Result<()> {
        loop {
            self.reap()?;
            match self.table.get(slot) {
                Some(job) if job.status() == JobStatus::Foreground => {}
                _ => break,
            }
            self.notifications.notified().await?;
        }

        if let Err(e) = self.terminal.reclaim() {
            warn!(slot, error = %e, "failed to reclaim terminal after foreground job");
        }
        debug!(slot, "foreground wait over");
        Ok(())
    }

    /// Drain pending child state changes and print what the user should see.
    pub fn reap(&mut self) -> Result<()> {
        let notices = signals::reap(
            &mut self.table,
            self.terminal.as_mut(),
            self.events.as_mut(),
        );
        for notice in &notices {
            writeln!(self.out, "{notice}")?;
        }
        if !notices.is_empty() {
            self.out.flush()?;
        }
        Ok(())
    }

    /// Wait for the next SIGCHLD and reap. For callers driving the shell
    /// without the prompt loop.
    pub async fn next_notification(&mut self) -> Result<()> {
        self.notifications.notified().await?;
        self.reap()
    }

    fn announce(&mut self, slot: Slot) -> Result<()> {
        let Some(job) = self.table.get(slot) else {
            return Ok(());
        };
        write!(self.out, "[{slot}]")?;
        for pid in job.pids() {
            write!(self.out, " {pid}")?;
        }
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    fn print_prompt(&mut self) -> Result<()> {
        let shell = &self.config.shell;
        if shell.show_cwd {
            match std::env::current_dir() {
                Ok(cwd) => write!(self.out, "{}", cwd.display())?,
                Err(e) => debug!(error = %e, "no current directory for prompt"),
            }
        }
        write!(self.out, "{}", shell.prompt)?;
        self.out.flush()?;
        Ok(())
    }

    fn report(&mut self, error: &ShellError) -> Result<()> {
        debug!(error = ?error, "command failed");
        writeln!(self.out, "pssh: {error}")?;
        self.out.flush()?;
        Ok(())
    }
}
