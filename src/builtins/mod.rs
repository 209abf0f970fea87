// src/builtins/mod.rs

//! Builtin commands.
//!
//! Builtins run inside the shell process and never occupy a job slot. The
//! job-control ones (`jobs`, `fg`, `bg`, `kill`) read and update the job
//! table and send the same signals a user would; `exit` and `which` are
//! one-shot helpers with no state.

pub mod fg_bg;
pub mod jobs;
pub mod kill;
pub mod which;

use std::io::Write;

use crate::errors::{Result, ShellError};
use crate::exec::CommandResolver;
use crate::jobs::JobTable;
use crate::signals::{Signaller, TerminalControl};
use crate::types::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Which,
    Kill,
    Fg,
    Bg,
    Jobs,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Exit,
        Builtin::Which,
        Builtin::Kill,
        Builtin::Fg,
        Builtin::Bg,
        Builtin::Jobs,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Which => "which",
            Builtin::Kill => "kill",
            Builtin::Fg => "fg",
            Builtin::Bg => "bg",
            Builtin::Jobs => "jobs",
        }
    }
}

/// What the prompt loop should do after a builtin ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// Back to the prompt.
    Done,
    /// A job was moved to the foreground; wait for it.
    Foreground(Slot),
    /// Leave the shell with this status.
    Exit(i32),
}

/// Shell state a builtin may touch.
pub struct BuiltinContext<'a> {
    pub table: &'a mut JobTable,
    pub terminal: &'a mut dyn TerminalControl,
    pub signaller: &'a mut dyn Signaller,
    pub resolver: &'a CommandResolver,
    pub out: &'a mut dyn Write,
}

/// Run `builtin` with its arguments (`argv[0]` excluded).
pub fn dispatch_builtin(
    builtin: Builtin,
    args: &[String],
    ctx: &mut BuiltinContext<'_>,
) -> Result<BuiltinOutcome> {
    match builtin {
        Builtin::Exit => exit(args),
        Builtin::Which => which::which(args, ctx),
        Builtin::Kill => kill::kill(args, ctx),
        Builtin::Fg => fg_bg::fg(args, ctx),
        Builtin::Bg => fg_bg::bg(args, ctx),
        Builtin::Jobs => jobs::jobs(ctx),
    }
}

fn exit(args: &[String]) -> Result<BuiltinOutcome> {
    match args {
        [] => Ok(BuiltinOutcome::Exit(0)),
        [code] => code
            .parse::<i32>()
            .map(BuiltinOutcome::Exit)
            .map_err(|_| ShellError::Usage {
                builtin: "exit",
                usage: "exit [code]",
            }),
        _ => Err(ShellError::Usage {
            builtin: "exit",
            usage: "exit [code]",
        }),
    }
}
