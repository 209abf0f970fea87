// src/builtins/fg_bg.rs

//! `fg` and `bg`: resume a job with or without the terminal.

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::builtins::{BuiltinContext, BuiltinOutcome};
use crate::errors::{Result, ShellError};
use crate::types::{JobStatus, Slot};

/// Parse a `%N` (or bare `N`) job reference.
pub fn parse_job_spec(builtin: &'static str, arg: Option<&String>) -> Result<Slot> {
    let arg = arg.ok_or(ShellError::Usage {
        builtin,
        usage: "%N",
    })?;
    let digits = arg.strip_prefix('%').unwrap_or(arg);
    digits.parse::<Slot>().map_err(|_| ShellError::InvalidJobSpec {
        builtin,
        arg: arg.clone(),
    })
}

fn job_group(ctx: &BuiltinContext<'_>, builtin: &'static str, slot: Slot) -> Result<(Pid, JobStatus)> {
    ctx.table
        .get(slot)
        .and_then(|job| Some((job.process_group()?, job.status())))
        .ok_or(ShellError::NoSuchJob { builtin, slot })
}

/// `fg %N`: give the job the terminal, continue it and let the prompt loop
/// wait for it.
pub fn fg(args: &[String], ctx: &mut BuiltinContext<'_>) -> Result<BuiltinOutcome> {
    let slot = parse_job_spec("fg", args.first())?;
    let (pgid, previous) = job_group(ctx, "fg", slot)?;

    ctx.terminal.hand_to(pgid)?;
    ctx.table.set_status(slot, JobStatus::Foreground);

    if let Err(cause) = ctx.signaller.signal_group(pgid, Signal::SIGCONT) {
        ctx.table.set_status(slot, previous);
        if let Err(e) = ctx.terminal.reclaim() {
            warn!(error = %e, "failed to reclaim terminal after fg failure");
        }
        return Err(ShellError::Resume {
            builtin: "fg",
            slot,
            cause,
        });
    }

    debug!(slot, %pgid, ?previous, "job moved to foreground");
    Ok(BuiltinOutcome::Foreground(slot))
}

/// `bg %N`: continue a stopped job without giving it the terminal.
pub fn bg(args: &[String], ctx: &mut BuiltinContext<'_>) -> Result<BuiltinOutcome> {
    let slot = parse_job_spec("bg", args.first())?;
    let (pgid, previous) = job_group(ctx, "bg", slot)?;

    if previous != JobStatus::Stopped {
        return Err(ShellError::AlreadyInBackground(slot));
    }

    ctx.table.set_status(slot, JobStatus::Background);
    if let Err(cause) = ctx.signaller.signal_group(pgid, Signal::SIGCONT) {
        ctx.table.set_status(slot, previous);
        return Err(ShellError::Resume {
            builtin: "bg",
            slot,
            cause,
        });
    }

    debug!(slot, %pgid, "job continued in background");
    Ok(BuiltinOutcome::Done)
}
