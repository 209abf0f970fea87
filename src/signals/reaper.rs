// src/signals/reaper.rs

//! Child reaping.
//!
//! [`apply_event`] is the per-job state machine: it consumes one child state
//! change, updates the job table through its narrow per-slot interface and
//! says what (if anything) the user should be told. [`reap`] drains every
//! pending state change from a [`ChildEventSource`] without blocking and then
//! makes sure the right process group holds the terminal.
//!
//! Neither function performs IO besides the terminal handoff, so both can be
//! driven from tests with scripted events and a fake terminal.

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, trace, warn};

use crate::errors::{Result, ShellError};
use crate::jobs::{JobTable, StageExit};
use crate::signals::terminal::TerminalControl;
use crate::types::{JobStatus, Slot};

/// What happened to a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEventKind {
    Exited(i32),
    Signaled(Signal),
    Stopped(Signal),
    Continued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEvent {
    pub pid: Pid,
    pub kind: ChildEventKind,
}

impl ChildEvent {
    pub fn new(pid: Pid, kind: ChildEventKind) -> Self {
        Self { pid, kind }
    }

    fn from_wait_status(status: WaitStatus) -> Option<Self> {
        let event = match status {
            WaitStatus::Exited(pid, code) => Self::new(pid, ChildEventKind::Exited(code)),
            WaitStatus::Signaled(pid, sig, _core) => Self::new(pid, ChildEventKind::Signaled(sig)),
            WaitStatus::Stopped(pid, sig) => Self::new(pid, ChildEventKind::Stopped(sig)),
            WaitStatus::Continued(pid) => Self::new(pid, ChildEventKind::Continued),
            _ => return None,
        };
        Some(event)
    }
}

/// Non-blocking source of child state changes.
pub trait ChildEventSource {
    /// Next pending state change, or `None` when nothing is pending.
    fn next_event(&mut self) -> Option<ChildEvent>;
}

/// [`ChildEventSource`] backed by `waitpid(-1, WNOHANG | WUNTRACED | WCONTINUED)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitPid;

impl ChildEventSource for WaitPid {
    fn next_event(&mut self) -> Option<ChildEvent> {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        loop {
            match waitpid(Pid::from_raw(-1), Some(flags)) {
                Ok(WaitStatus::StillAlive) => return None,
                Ok(status) => match ChildEvent::from_wait_status(status) {
                    Some(event) => return Some(event),
                    None => {
                        trace!(?status, "ignoring ptrace wait status");
                        continue;
                    }
                },
                Err(Errno::EINTR) => continue,
                Err(Errno::ECHILD) => return None,
                Err(e) => {
                    warn!(error = %e, "waitpid failed");
                    return None;
                }
            }
        }
    }
}

/// Pending-SIGCHLD notifications.
///
/// Wraps tokio's signal stream: the real handler only records the delivery,
/// and [`ChildNotifications::notified`] wakes the shell task afterwards.
/// Deliveries coalesce, so every wake-up must drain with [`reap`].
#[derive(Debug)]
pub struct ChildNotifications {
    inner: tokio::signal::unix::Signal,
}

impl ChildNotifications {
    /// Start listening for SIGCHLD. Must run inside a tokio runtime.
    pub fn register() -> Result<Self> {
        let inner = signal(SignalKind::child())?;
        Ok(Self { inner })
    }

    /// Sleep until at least one SIGCHLD has arrived since the last call.
    pub async fn notified(&mut self) -> Result<()> {
        match self.inner.recv().await {
            Some(()) => Ok(()),
            None => Err(ShellError::Other(anyhow::anyhow!(
                "SIGCHLD notification stream closed"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Done,
    Terminated,
    Suspended,
    Continued,
}

impl NoticeKind {
    fn word(self) -> &'static str {
        match self {
            NoticeKind::Done => "done",
            NoticeKind::Terminated => "terminated",
            NoticeKind::Suspended => "suspended",
            NoticeKind::Continued => "continued",
        }
    }
}

/// A status line for the user, e.g. `[2] + done\tsleep 5 &`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNotice {
    pub slot: Slot,
    pub kind: NoticeKind,
    pub command_text: String,
}

impl fmt::Display for JobNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] + {}\t{}",
            self.slot,
            self.kind.word(),
            self.command_text
        )
    }
}

/// Apply one child state change to the job table.
pub fn apply_event(
    table: &mut JobTable,
    terminal: &mut dyn TerminalControl,
    event: ChildEvent,
) -> Option<JobNotice> {
    let Some(slot) = table.find_by_pid(event.pid) else {
        debug!(pid = %event.pid, kind = ?event.kind, "state change for unknown child");
        return None;
    };

    match event.kind {
        ChildEventKind::Exited(_) | ChildEventKind::Signaled(_) => {
            let killed_by = match event.kind {
                ChildEventKind::Signaled(sig) => Some(sig),
                _ => None,
            };
            match table.record_stage_exit(slot, killed_by)? {
                StageExit::Remaining(remaining) => {
                    debug!(slot, pid = %event.pid, remaining, "stage finished");
                    None
                }
                StageExit::AllFinished => finish_job(table, terminal, slot),
            }
        }
        ChildEventKind::Stopped(sig) => {
            let had_terminal = table.get(slot)?.status() == JobStatus::Foreground;
            let first = table.mark_stopped(slot);
            debug!(slot, pid = %event.pid, signal = %sig, first, "stage stopped");
            if had_terminal {
                reclaim(terminal);
            }
            first.then(|| notice(table, slot, NoticeKind::Suspended))?
        }
        ChildEventKind::Continued => {
            let first = table.mark_continued(slot);
            debug!(slot, pid = %event.pid, first, "stage continued");
            first.then(|| notice(table, slot, NoticeKind::Continued))?
        }
    }
}

/// Drain every pending child state change, then reconcile terminal
/// ownership. Returns the notices in the order the OS reported the events.
pub fn reap(
    table: &mut JobTable,
    terminal: &mut dyn TerminalControl,
    source: &mut dyn ChildEventSource,
) -> Vec<JobNotice> {
    let mut notices = Vec::new();
    while let Some(event) = source.next_event() {
        trace!(?event, "reaped child");
        if let Some(notice) = apply_event(table, terminal, event) {
            notices.push(notice);
        }
    }
    reconcile_terminal(table, terminal);
    notices
}

/// Make sure the terminal belongs to the foreground job, or to the shell
/// when there is none.
pub fn reconcile_terminal(table: &JobTable, terminal: &mut dyn TerminalControl) {
    if !terminal.is_interactive() {
        return;
    }
    let desired = table
        .foreground_job()
        .and_then(|job| job.process_group())
        .unwrap_or_else(|| terminal.shell_group());

    if terminal.owner() != Some(desired) {
        debug!(%desired, owner = ?terminal.owner(), "terminal owner out of sync; correcting");
        if let Err(e) = terminal.hand_to(desired) {
            warn!(error = %e, %desired, "failed to hand over terminal");
        }
    }
}

fn finish_job(
    table: &mut JobTable,
    terminal: &mut dyn TerminalControl,
    slot: Slot,
) -> Option<JobNotice> {
    let job = table.release(slot)?;
    debug!(slot, status = ?job.status(), killed_by = ?job.killed_by(), "job finished");

    if job.status() == JobStatus::Foreground {
        reclaim(terminal);
        return None;
    }

    let kind = if job.killed_by().is_some() {
        NoticeKind::Terminated
    } else {
        NoticeKind::Done
    };
    Some(JobNotice {
        slot,
        kind,
        command_text: job.command_text().to_string(),
    })
}

fn notice(table: &JobTable, slot: Slot, kind: NoticeKind) -> Option<JobNotice> {
    let job = table.get(slot)?;
    Some(JobNotice {
        slot,
        kind,
        command_text: job.command_text().to_string(),
    })
}

fn reclaim(terminal: &mut dyn TerminalControl) {
    if let Err(e) = terminal.reclaim() {
        warn!(error = %e, "failed to reclaim terminal for the shell");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct Scripted(VecDeque<ChildEvent>);

    impl ChildEventSource for Scripted {
        fn next_event(&mut self) -> Option<ChildEvent> {
            self.0.pop_front()
        }
    }

    struct Tty {
        shell: Pid,
        owner: Pid,
    }

    impl TerminalControl for Tty {
        fn is_interactive(&self) -> bool {
            true
        }
        fn shell_group(&self) -> Pid {
            self.shell
        }
        fn owner(&self) -> Option<Pid> {
            Some(self.owner)
        }
        fn hand_to(&mut self, pgid: Pid) -> Result<()> {
            self.owner = pgid;
            Ok(())
        }
    }

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    fn exited(n: i32) -> ChildEvent {
        ChildEvent::new(pid(n), ChildEventKind::Exited(0))
    }

    #[test]
    fn background_pipeline_prints_one_done_line() {
        let mut table = JobTable::new();
        let slot = table.allocate("a | b | c &").unwrap();
        for p in [100, 101, 102] {
            table.add_stage(slot, pid(p), true);
        }
        let mut tty = Tty { shell: pid(1), owner: pid(1) };
        let mut events = Scripted(VecDeque::from([exited(101), exited(100), exited(102)]));

        let notices = reap(&mut table, &mut tty, &mut events);

        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].to_string(), "[0] + done\ta | b | c &");
        assert!(table.get(slot).is_none());
        assert_eq!(tty.owner, pid(1));
    }

    #[test]
    fn stopped_foreground_job_returns_terminal_to_shell() {
        let mut table = JobTable::new();
        let slot = table.allocate("sleep 100").unwrap();
        table.add_stage(slot, pid(200), false);
        let mut tty = Tty { shell: pid(1), owner: pid(200) };

        let notice = apply_event(
            &mut table,
            &mut tty,
            ChildEvent::new(pid(200), ChildEventKind::Stopped(Signal::SIGTSTP)),
        );

        assert_eq!(notice.unwrap().to_string(), "[0] + suspended\tsleep 100");
        assert_eq!(table.get(slot).unwrap().status(), JobStatus::Stopped);
        assert_eq!(tty.owner, pid(1));
    }

    #[test]
    fn signaled_job_is_reported_as_terminated() {
        let mut table = JobTable::new();
        let slot = table.allocate("sleep 5 &").unwrap();
        table.add_stage(slot, pid(300), true);
        let mut tty = Tty { shell: pid(1), owner: pid(1) };

        let notice = apply_event(
            &mut table,
            &mut tty,
            ChildEvent::new(pid(300), ChildEventKind::Signaled(Signal::SIGKILL)),
        );

        assert_eq!(notice.unwrap().kind, NoticeKind::Terminated);
        assert!(table.is_empty());
    }

    #[test]
    fn reconcile_repairs_a_stale_owner() {
        let mut table = JobTable::new();
        let mut tty = Tty { shell: pid(1), owner: pid(777) };
        reconcile_terminal(&table, &mut tty);
        assert_eq!(tty.owner, pid(1));

        let slot = table.allocate("vi").unwrap();
        table.add_stage(slot, pid(400), false);
        reconcile_terminal(&table, &mut tty);
        assert_eq!(tty.owner, pid(400));
    }
}
