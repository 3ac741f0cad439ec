//! `contreact summarize`: fold an event log into a readable report.

use contreact_telemetry::{read_log, summarize};
use std::path::Path;

pub fn run(log_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_log(log_path)?;
    if records.is_empty() {
        println!("{} contains no records", log_path.display());
        return Ok(());
    }
    print!("{}", summarize(&records));
    Ok(())
}
