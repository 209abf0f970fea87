// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`pipeline`] turns a [`Pipeline`](crate::types::Pipeline) into one job:
//!   one forked process per stage, wired with pipes and redirections, all in
//!   one process group.
//! - [`child`] is what a stage does between `fork` and `exec`.
//! - [`resolve`] finds the executable behind a command name.

mod child;
pub mod pipeline;
pub mod resolve;

pub use pipeline::Launcher;
pub use resolve::CommandResolver;
