//! Output helpers. Documents go to stdout as pretty JSON; logs stay on stderr.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::Value;

pub fn print_json(document: &Value) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, document)
}

pub fn write_json<W: Write>(writer: &mut W, document: &Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, document).context("failed to serialise output")?;
    writeln!(writer).context("failed to write output")?;
    Ok(())
}
