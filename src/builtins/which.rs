// src/builtins/which.rs

use std::io::Write;

use crate::builtins::{Builtin, BuiltinContext, BuiltinOutcome};
use crate::errors::{Result, ShellError};

/// `which name...`: where each command would be run from. Names that match
/// nothing print nothing.
pub fn which(args: &[String], ctx: &mut BuiltinContext<'_>) -> Result<BuiltinOutcome> {
    if args.is_empty() {
        return Err(ShellError::Usage {
            builtin: "which",
            usage: "which name...",
        });
    }

    for name in args {
        if Builtin::from_name(name).is_some() {
            writeln!(ctx.out, "{name}: shell built-in command")?;
        } else if let Some(path) = ctx.resolver.resolve(name) {
            writeln!(ctx.out, "{}", path.display())?;
        }
    }
    Ok(BuiltinOutcome::Done)
}
