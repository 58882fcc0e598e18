use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{AuthResult, ProgressEvent, ProgressSink, RunReport};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_auth(result: &AuthResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => info!("{}", event.message),
        }
    }
}

/// Plain-text summary for interactive runs.
pub fn print_summary(report: &RunReport) -> io::Result<()> {
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "{} ({}): {} granules, {} MODIS base files",
        report.product,
        report.satellite,
        report.granules,
        report.modis.base.len()
    )?;
    writeln!(
        stdout,
        "MSG: {} scans matched, {} overpasses without a scan",
        report.msg.base.len(),
        report.msg.base_unmatched
    )?;
    match &report.manifest_path {
        Some(path) => {
            let extra = if report.cloud_mask_columns {
                " with cloud-mask columns"
            } else {
                ""
            };
            writeln!(
                stdout,
                "manifest: {path} ({} rows{extra})",
                report.manifest_rows
            )?;
        }
        None => writeln!(stdout, "manifest: not written (no MSG scans)")?,
    }
    if let Some(reason) = &report.cloud_mask_skipped {
        writeln!(stdout, "cloud mask columns omitted: {reason}")?;
    }
    Ok(())
}
