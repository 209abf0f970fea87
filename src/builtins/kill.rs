// src/builtins/kill.rs

//! `kill [-s SIG | -SIG | -l] (pid | %job) ...`

use std::io::Write;

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::debug;

use crate::builtins::{BuiltinContext, BuiltinOutcome};
use crate::errors::{Result, ShellError};
use crate::signals::names::{self, SIGNALS};
use crate::types::{JobStatus, Slot};

const USAGE: ShellError = ShellError::Usage {
    builtin: "kill",
    usage: "kill [-s SIG | -l] (pid | %job) ...",
};

pub fn kill(args: &[String], ctx: &mut BuiltinContext<'_>) -> Result<BuiltinOutcome> {
    let (signal, operands) = match args {
        [flag, ..] if flag == "-l" => {
            for info in &SIGNALS {
                writeln!(ctx.out, "{}", names::describe(info))?;
            }
            return Ok(BuiltinOutcome::Done);
        }
        [flag, spec, rest @ ..] if flag == "-s" => (resolve_signal(spec)?, rest),
        [flag] if flag == "-s" => return Err(USAGE),
        [flag, rest @ ..] if flag.len() > 1 && flag.starts_with('-') => {
            (resolve_signal(&flag[1..])?, rest)
        }
        _ => (Signal::SIGTERM, args),
    };

    if operands.is_empty() {
        return Err(USAGE);
    }

    // One bad operand does not stop the others.
    for operand in operands {
        if let Err(e) = signal_operand(operand, signal, ctx) {
            writeln!(ctx.out, "pssh: {e}")?;
        }
    }
    Ok(BuiltinOutcome::Done)
}

fn resolve_signal(spec: &str) -> Result<Signal> {
    names::lookup(spec).ok_or_else(|| ShellError::BadSignal(spec.to_string()))
}

fn signal_operand(operand: &str, signal: Signal, ctx: &mut BuiltinContext<'_>) -> Result<()> {
    match operand.strip_prefix('%') {
        Some(digits) => {
            let slot: Slot = digits.parse().map_err(|_| ShellError::InvalidJobSpec {
                builtin: "kill",
                arg: operand.to_string(),
            })?;
            let job = ctx.table.get(slot).ok_or(ShellError::NoSuchJob {
                builtin: "kill",
                slot,
            })?;
            let pgid = job.process_group().ok_or(ShellError::NoSuchJob {
                builtin: "kill",
                slot,
            })?;
            let stopped = job.status() == JobStatus::Stopped;

            ctx.signaller
                .signal_group(pgid, signal)
                .map_err(|e| ShellError::from_delivery(operand, e))?;
            debug!(slot, %pgid, %signal, "signalled job");

            // A stopped job only acts on most signals once it runs again.
            if stopped && needs_continue(signal) {
                ctx.signaller
                    .signal_group(pgid, Signal::SIGCONT)
                    .map_err(|e| ShellError::from_delivery(operand, e))?;
            }
            Ok(())
        }
        None => {
            let pid = operand
                .parse::<i32>()
                .ok()
                .filter(|pid| *pid > 0)
                .ok_or_else(|| ShellError::BadPid(operand.to_string()))?;
            ctx.signaller
                .signal_process(Pid::from_raw(pid), signal)
                .map_err(|e| ShellError::from_delivery(operand, e))?;
            debug!(pid, %signal, "signalled process");
            Ok(())
        }
    }
}

fn needs_continue(signal: Signal) -> bool {
    !matches!(
        signal,
        Signal::SIGKILL
            | Signal::SIGCONT
            | Signal::SIGSTOP
            | Signal::SIGTSTP
            | Signal::SIGTTIN
            | Signal::SIGTTOU
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_specs() {
        assert_eq!(resolve_signal("9").unwrap(), Signal::SIGKILL);
        assert_eq!(resolve_signal("INT").unwrap(), Signal::SIGINT);
        assert!(matches!(resolve_signal("99"), Err(ShellError::BadSignal(_))));
    }

    #[test]
    fn stopped_jobs_need_a_nudge_for_most_signals() {
        assert!(needs_continue(Signal::SIGTERM));
        assert!(needs_continue(Signal::SIGHUP));
        assert!(!needs_continue(Signal::SIGKILL));
        assert!(!needs_continue(Signal::SIGSTOP));
    }
}
