// src/jobs/mod.rs

//! Job bookkeeping.
//!
//! [`table`] holds the fixed-capacity job table: the single source of truth
//! for which pipelines exist, which pids belong to them and what state they
//! are in. Storage-owning operations (`allocate`, `add_stage`, `release`)
//! belong to the launch path; the reaper only goes through the narrow
//! per-slot updates (`record_stage_exit`, `mark_stopped`, `mark_continued`).

pub mod table;

pub use table::{Job, JobSummary, JobTable, StageExit, MAX_JOBS};
