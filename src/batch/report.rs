//! Turns a [`BatchReport`] into diagnostics and an exit code.

use std::io::{self, Write};

use crate::batch::BatchReport;

/// Every item succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// At least one item (or the command) failed.
pub const EXIT_FAILURE: i32 = 1;
/// The daemon could not be reached.
pub const EXIT_TRANSPORT: i32 = 2;

/// Writes one line per failed item to `err`, in processing order, and
/// returns the exit code for the batch.
///
/// Nothing is written when every item succeeded.
///
/// # Errors
///
/// Returns an error if writing to `err` fails.
pub fn write_report<W: Write>(report: &BatchReport, err: &mut W) -> io::Result<i32> {
    for item in report.failures() {
        if let Some(line) = item.failure_message(report.operation) {
            writeln!(err, "{line}")?;
        }
    }

    if let Some(error) = &report.aborted {
        writeln!(err, "{error}")?;
        return Ok(EXIT_TRANSPORT);
    }

    Ok(if report.all_succeeded() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}
