// src/builtins/jobs.rs

use std::io::Write;

use crate::builtins::{BuiltinContext, BuiltinOutcome};
use crate::errors::Result;

/// `jobs`: one line per occupied slot. Reads the table, changes nothing.
pub fn jobs(ctx: &mut BuiltinContext<'_>) -> Result<BuiltinOutcome> {
    for row in ctx.table.list() {
        writeln!(ctx.out, "{row}")?;
    }
    Ok(BuiltinOutcome::Done)
}
