//! `run` and `self-check`: assemble devices from config and drive the loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use eyre::WrapErr;
use lcr_config::Config;
use lcr_core::{AcqError, RunPlan, RunRecord};
use lcr_hardware::{MeterParams, PlantParams, SimulatedChamber, SimulatedLcr};
use lcr_traits::{ByteLink, Clock, MonotonicClock};
use serde_json::json;

use crate::sink::CsvRunSink;

/// Options of the `run` command that override the config file.
#[derive(Debug, Default)]
pub struct RunOpts {
    pub iterations: Option<u64>,
    pub output: Option<PathBuf>,
    pub print_runtime: bool,
    pub json: bool,
}

pub fn plant_params(cfg: &lcr_config::ChamberCfg) -> PlantParams {
    PlantParams {
        ambient_c: cfg.ambient_c,
        gain_c: cfg.gain_c,
        time_constant_s: cfg.time_constant_s,
        sample_period_s: cfg.sample_period_s,
    }
}

pub fn meter_params(cfg: &lcr_config::LcrCfg) -> MeterParams {
    let sim = &cfg.simulation;
    MeterParams {
        nominal_f: sim.nominal_f,
        tempco_per_c: sim.tempco_per_c,
        reference_c: sim.reference_c,
        dissipation: sim.dissipation,
        frame_period_s: cfg.frame_period_s,
        byte_time_s: cfg.byte_time_s,
        drop_frame: sim.drop_frame,
        corrupt_frame: sim.corrupt_frame,
    }
}

/// Simulated chamber plus the meter link: serial when `lcr.port` is set,
/// otherwise a simulated meter reading the chamber's temperature.
fn open_devices(
    cfg: &Config,
    clock: &Arc<dyn Clock + Send + Sync>,
) -> eyre::Result<(Box<dyn ByteLink>, SimulatedChamber)> {
    let mut chamber = SimulatedChamber::new(plant_params(&cfg.chamber), Arc::clone(clock));
    if let Some(secs) = cfg.chamber.fault_after_s {
        chamber = chamber.with_fault_after(secs);
    }
    let link: Box<dyn ByteLink> = match cfg.lcr.port.as_deref() {
        Some(port) => open_serial(port, cfg.lcr.baud)?,
        None => Box::new(SimulatedLcr::new(
            meter_params(&cfg.lcr),
            chamber.temperature(),
            Arc::clone(clock),
        )),
    };
    Ok((link, chamber))
}

#[cfg(feature = "hardware")]
fn open_serial(port: &str, baud: u32) -> eyre::Result<Box<dyn ByteLink>> {
    let link = lcr_hardware::SerialLink::open(port, baud)
        .map_err(eyre::Report::new)
        .wrap_err("opening LCR link")?;
    Ok(Box::new(link))
}

#[cfg(not(feature = "hardware"))]
fn open_serial(port: &str, _baud: u32) -> eyre::Result<Box<dyn ByteLink>> {
    eyre::bail!("lcr.port is set to {port} but lcrchar was built without the `hardware` feature")
}

/// Flag raised by Ctrl-C; the loop polls it once per tick.
fn install_stop_flag() -> eyre::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .wrap_err("installing Ctrl-C handler")?;
    Ok(stop)
}

pub fn run_command(cfg: &Config, opts: RunOpts) -> eyre::Result<()> {
    let mut plan = RunPlan::try_from(cfg).map_err(eyre::Report::new)?;
    if let Some(n) = opts.iterations {
        plan.run.iterations = n;
    }
    let output = opts
        .output
        .unwrap_or_else(|| PathBuf::from(&cfg.output.directory));

    let stop = install_stop_flag()?;
    let stop_check: Box<dyn Fn() -> bool> = Box::new(move || stop.load(Ordering::Relaxed));

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let (link, chamber) = open_devices(cfg, &clock)?;
    let mut sink = CsvRunSink::new(output);

    tracing::info!(
        simulated = cfg.lcr.port.is_none(),
        period_s = plan.trajectory.period(),
        iterations = plan.run.iterations,
        "run start"
    );
    let t0 = Instant::now();
    let record = lcr_core::run_with_clock(link, chamber, plan, &mut sink, Some(stop_check), clock)?;
    let runtime_ms = t0.elapsed().as_millis();

    print_summary(&record, &sink, opts.json);
    if opts.print_runtime {
        if opts.json {
            println!("{}", json!({ "runtime_ms": runtime_ms }));
        } else {
            println!("Runtime: {runtime_ms} ms");
        }
    }

    match record.abort_reason() {
        Some(reason) => Err(eyre::Report::new(AcqError::Abort(reason))),
        None => Ok(()),
    }
}

fn print_summary(record: &RunRecord, sink: &CsvRunSink, json: bool) {
    let outcome = record.outcome.map_or("interrupted", |o| o.name());
    let saved = sink.saved_to().map(|p| p.display().to_string());
    if json {
        println!(
            "{}",
            json!({
                "outcome": outcome,
                "lcr_fault": record.lcr_fault.map(|f| f.name()),
                "duration_s": record.duration_s,
                "chamber_samples": record.temperature.len(),
                "lcr_frames": record.measurement1.len(),
                "saved_to": saved,
            })
        );
    } else {
        println!(
            "Run {outcome} after {:.1} s: {} chamber samples, {} LCR frames",
            record.duration_s,
            record.temperature.len(),
            record.measurement1.len()
        );
        if let Some(dir) = saved {
            println!("Saved to {dir}");
        }
    }
}

pub fn self_check(cfg: &Config, json: bool) -> eyre::Result<()> {
    let plan = RunPlan::try_from(cfg).map_err(eyre::Report::new)?;
    let link = match cfg.lcr.port.as_deref() {
        Some(port) => {
            drop(open_serial(port, cfg.lcr.baud)?);
            format!("serial {port} @ {} baud", cfg.lcr.baud)
        }
        None => "simulated meter".to_string(),
    };
    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "lcr_link": link,
                "chamber": "simulated plant",
                "profile_period_s": plan.trajectory.period(),
                "iterations": plan.run.iterations,
            })
        );
    } else {
        println!("LCR link: {link}");
        println!("Chamber: simulated plant");
        println!(
            "Profile: {:?}, period {:.1} s, {} iteration(s)",
            plan.trajectory.kind(),
            plan.trajectory.period(),
            plan.run.iterations
        );
        println!("OK");
    }
    Ok(())
}
