//! Persist a finished run as CSV series plus a JSON metadata file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use eyre::WrapErr;
use lcr_core::{Configuration, RunRecord, RunSink};
use serde::Serialize;

/// Writes each run into `<root>/characterization_<local start time>/`.
#[derive(Debug)]
pub struct CsvRunSink {
    root: PathBuf,
    saved_to: Option<PathBuf>,
}

#[derive(Serialize)]
struct ChamberRow {
    sample: usize,
    setpoint_c: f64,
    temperature_c: f64,
    power: f64,
}

#[derive(Serialize)]
struct LcrRow {
    frame: usize,
    measurement1: f64,
    measurement2: Option<f64>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    timestamp: String,
    duration_s: f64,
    outcome: &'a str,
    lcr_fault: Option<&'a str>,
    frequency_hz: Option<u32>,
    quantity1: Option<&'a str>,
    unit1: Option<&'a str>,
    quantity2: Option<&'a str>,
    unit2: Option<&'a str>,
    chamber_samples: usize,
    lcr_frames: usize,
}

impl CsvRunSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            saved_to: None,
        }
    }

    /// Directory the last run was written to, if anything was written.
    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }
}

impl RunSink for CsvRunSink {
    fn finish(&mut self, record: &RunRecord) -> lcr_core::Result<()> {
        // Without a decoded frame there is no configuration to file the data under.
        let Some(cfg) = record.configuration else {
            tracing::warn!("no LCR frame decoded; nothing saved");
            return Ok(());
        };

        let started: DateTime<Local> = record.started_at.into();
        let dir = self.root.join(format!(
            "characterization_{}",
            started.format("%Y-%m-%d_%H%M%S")
        ));
        fs::create_dir_all(&dir).wrap_err_with(|| format!("creating {}", dir.display()))?;

        write_chamber(&dir.join("chamber.csv"), record)?;
        write_lcr(&dir.join("lcr.csv"), record)?;
        write_metadata(&dir.join("metadata.json"), record, &cfg, &started)?;

        tracing::info!(dir = %dir.display(), "run data saved");
        self.saved_to = Some(dir);
        Ok(())
    }
}

fn write_chamber(path: &Path, record: &RunRecord) -> eyre::Result<()> {
    let mut w = csv::Writer::from_path(path).wrap_err_with(|| format!("creating {}", path.display()))?;
    let rows = record
        .setpoint
        .iter()
        .zip(&record.temperature)
        .zip(&record.power)
        .enumerate();
    for (sample, ((&setpoint_c, &temperature_c), &power)) in rows {
        w.serialize(ChamberRow {
            sample,
            setpoint_c,
            temperature_c,
            power,
        })?;
    }
    w.flush()?;
    Ok(())
}

fn write_lcr(path: &Path, record: &RunRecord) -> eyre::Result<()> {
    let mut w = csv::Writer::from_path(path).wrap_err_with(|| format!("creating {}", path.display()))?;
    for (frame, &measurement1) in record.measurement1.iter().enumerate() {
        w.serialize(LcrRow {
            frame,
            measurement1,
            measurement2: record.measurement2.get(frame).copied(),
        })?;
    }
    w.flush()?;
    Ok(())
}

fn write_metadata(
    path: &Path,
    record: &RunRecord,
    cfg: &Configuration,
    started: &DateTime<Local>,
) -> eyre::Result<()> {
    let meta = Metadata {
        timestamp: started.format("%Y-%m-%d %H:%M:%S").to_string(),
        duration_s: record.duration_s,
        outcome: record.outcome.map_or("interrupted", |o| o.name()),
        lcr_fault: record.lcr_fault.map(|f| f.name()),
        frequency_hz: cfg.frequency.hz(),
        quantity1: cfg.quantity1.map(|q| q.symbol()),
        unit1: cfg.quantity1.map(|q| q.unit()),
        quantity2: cfg.quantity2.map(|q| q.symbol()),
        unit2: cfg.quantity2.map(|q| q.unit()),
        chamber_samples: record.temperature.len(),
        lcr_frames: record.measurement1.len(),
    };
    let text = serde_json::to_string_pretty(&meta)?;
    fs::write(path, text).wrap_err_with(|| format!("writing {}", path.display()))?;
    Ok(())
}
