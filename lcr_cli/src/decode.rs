//! `decode`: turn a raw meter capture into one line per frame.

use std::fmt::Write as _;
use std::path::Path;

use eyre::WrapErr;
use lcr_protocol::{MeasurementRecord, scan_frames};

pub fn decode_command(path: &Path, json: bool) -> eyre::Result<()> {
    let bytes = std::fs::read(path).wrap_err_with(|| format!("reading capture {}", path.display()))?;
    let report = scan_frames(&bytes);
    for (i, rec) in report.records.iter().enumerate() {
        if json {
            println!("{}", serde_json::to_string(rec)?);
        } else {
            println!("{}", format_record(i, rec));
        }
    }
    tracing::info!(
        frames = report.records.len(),
        skipped = report.skipped,
        resyncs = report.resyncs,
        "capture decoded"
    );
    if report.records.is_empty() {
        eyre::bail!("no valid frame found in {}", path.display());
    }
    Ok(())
}

pub fn format_record(index: usize, rec: &MeasurementRecord) -> String {
    let mut line = format!("{index:>5}  ");
    match rec.frequency.hz() {
        Some(hz) => {
            let _ = write!(line, "{hz} Hz");
        }
        None => line.push('-'),
    }
    match rec.quantity1 {
        Some(q) => {
            let _ = write!(line, "  {} = {:e} {}", q.symbol(), rec.measurement1, q.unit());
        }
        None => {
            let _ = write!(line, "  ? = {:e}", rec.measurement1);
        }
    }
    if let (Some(q), Some(m)) = (rec.quantity2, rec.measurement2) {
        let _ = write!(line, "  {} = {m:e}", q.symbol());
        if !q.unit().is_empty() {
            let _ = write!(line, " {}", q.unit());
        }
    }
    line.trim_end().to_string()
}
