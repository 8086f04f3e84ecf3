use crate::types::ScanResult;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Render results in arrival order until every sender is gone.
///
/// Each result becomes one line, flushed immediately so output streams while
/// the scan is still running. Writes block, so run this on a blocking thread
/// (`tokio::task::spawn_blocking`), never on a runtime worker. Returns the
/// number of lines written.
pub fn drain<W: Write>(mut results: mpsc::Receiver<ScanResult>, mut out: W) -> io::Result<u64> {
    let mut rendered = 0u64;
    while let Some(result) = results.blocking_recv() {
        writeln!(out, "{result}")?;
        out.flush()?;
        rendered += 1;
    }
    Ok(rendered)
}
