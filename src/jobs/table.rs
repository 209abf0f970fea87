// src/jobs/table.rs

use std::fmt;

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::errors::{Result, ShellError};
use crate::types::{JobStatus, Slot};

/// Number of jobs the shell can track at once.
pub const MAX_JOBS: usize = 100;

/// One submitted pipeline.
#[derive(Debug, Clone)]
pub struct Job {
    slot: Slot,
    command_text: String,
    pids: Vec<Pid>,
    process_group: Option<Pid>,
    finished_count: usize,
    status: JobStatus,
    killed_by: Option<Signal>,
    stop_reported: bool,
}

impl Job {
    fn new(slot: Slot, command_text: &str) -> Self {
        Self {
            slot,
            command_text: command_text.to_string(),
            pids: Vec::new(),
            process_group: None,
            finished_count: 0,
            status: JobStatus::Foreground,
            killed_by: None,
            stop_reported: false,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn command_text(&self) -> &str {
        &self.command_text
    }

    /// Stage pids in left-to-right pipeline order.
    pub fn pids(&self) -> &[Pid] {
        &self.pids
    }

    /// Group shared by every stage; `None` until the first stage exists.
    pub fn process_group(&self) -> Option<Pid> {
        self.process_group
    }

    pub fn finished_count(&self) -> usize {
        self.finished_count
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// First signal that killed one of the stages, if any did.
    pub fn killed_by(&self) -> Option<Signal> {
        self.killed_by
    }

    pub fn is_finished(&self) -> bool {
        !self.pids.is_empty() && self.finished_count == self.pids.len()
    }
}

/// What the reaper learns from recording one stage termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageExit {
    /// Other stages are still alive.
    Remaining(usize),
    /// That was the last one; the job must be released now.
    AllFinished,
}

/// Row of the `jobs` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary<'a> {
    pub slot: Slot,
    pub status: JobStatus,
    pub command_text: &'a str,
}

impl fmt::Display for JobSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] + {}\t{}", self.slot, self.status, self.command_text)
    }
}

/// Fixed-capacity slot → job registry.
///
/// Slots never move and the table never grows; the lowest empty slot is
/// handed to the next job.
#[derive(Debug)]
pub struct JobTable {
    slots: Vec<Option<Job>>,
    active: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_JOBS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            active: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    pub fn get(&self, slot: Slot) -> Option<&Job> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Claim the lowest free slot for a new pipeline.
    pub fn allocate(&mut self, command_text: &str) -> Result<Slot> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(ShellError::JobTableFull)?;

        self.slots[slot] = Some(Job::new(slot, command_text));
        self.active += 1;
        debug!(slot, command = %command_text, "allocated job slot");
        Ok(slot)
    }

    /// Append a freshly forked stage. The first stage fixes the job's
    /// process group and initial status.
    ///
    /// Returns the process group the stage belongs to.
    pub fn add_stage(&mut self, slot: Slot, pid: Pid, background: bool) -> Option<Pid> {
        let job = self.job_mut(slot)?;
        if job.pids.is_empty() {
            job.process_group = Some(pid);
            job.status = if background {
                JobStatus::Background
            } else {
                JobStatus::Foreground
            };
        }
        job.pids.push(pid);
        debug!(slot, %pid, stage = job.pids.len() - 1, "registered stage");
        job.process_group
    }

    /// Free a slot and everything it owns.
    pub fn release(&mut self, slot: Slot) -> Option<Job> {
        let job = self.slots.get_mut(slot)?.take()?;
        self.active -= 1;
        debug!(slot, "released job slot");
        Some(job)
    }

    /// Map a child pid back to the job that owns it.
    pub fn find_by_pid(&self, pid: Pid) -> Option<Slot> {
        self.occupied()
            .find(|job| job.pids.contains(&pid))
            .map(|job| job.slot)
    }

    /// Occupied slots in slot order.
    pub fn list(&self) -> impl Iterator<Item = JobSummary<'_>> {
        self.occupied().map(|job| JobSummary {
            slot: job.slot,
            status: job.status,
            command_text: &job.command_text,
        })
    }

    /// The job currently entitled to the terminal, if any.
    pub fn foreground_job(&self) -> Option<&Job> {
        self.occupied().find(|job| job.status == JobStatus::Foreground)
    }

    pub fn set_status(&mut self, slot: Slot, status: JobStatus) -> Option<JobStatus> {
        let job = self.job_mut(slot)?;
        let previous = job.status;
        job.status = status;
        Some(previous)
    }

    /// Count one stage as terminated. `killed_by` carries the signal when the
    /// stage did not exit on its own.
    pub fn record_stage_exit(&mut self, slot: Slot, killed_by: Option<Signal>) -> Option<StageExit> {
        let job = self.job_mut(slot)?;
        if job.finished_count < job.pids.len() {
            job.finished_count += 1;
        } else {
            warn!(slot, "more stage exits than stages; ignoring");
        }
        if job.killed_by.is_none() {
            job.killed_by = killed_by;
        }

        if job.finished_count == job.pids.len() {
            Some(StageExit::AllFinished)
        } else {
            Some(StageExit::Remaining(job.pids.len() - job.finished_count))
        }
    }

    /// Move a job to `Stopped`. Returns true only for the first stage
    /// reporting a stop since the job last ran.
    pub fn mark_stopped(&mut self, slot: Slot) -> bool {
        let Some(job) = self.job_mut(slot) else {
            return false;
        };
        job.status = JobStatus::Stopped;
        !std::mem::replace(&mut job.stop_reported, true)
    }

    /// Record that a stopped job is running again. A job still marked
    /// `Stopped` (continued from outside the shell) becomes `Background`.
    /// Returns true only for the first stage reporting the resume.
    pub fn mark_continued(&mut self, slot: Slot) -> bool {
        let Some(job) = self.job_mut(slot) else {
            return false;
        };
        if job.status == JobStatus::Stopped {
            job.status = JobStatus::Background;
        }
        std::mem::replace(&mut job.stop_reported, false)
    }

    fn job_mut(&mut self, slot: Slot) -> Option<&mut Job> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn occupied(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}
