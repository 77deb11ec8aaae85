#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core acquisition and control logic (hardware-agnostic).
//!
//! This crate turns an LCR meter byte stream and a thermal chamber into a
//! synchronized recording while steering the chamber along a setpoint
//! trajectory. All device interaction goes through `lcr_traits::ByteLink` and
//! `lcr_traits::Chamber`.
//!
//! ## Architecture
//!
//! - **Framing**: `FrameDecoder` keeps 17-byte alignment over an unreliable
//!   stream (`frame` module); `LinkMonitor` detects lost frames from arrival
//!   timing and stale links (`link` module)
//! - **Control**: `PidController` with integral reset band and output clamp
//!   (`pid` module), fed by a cyclic `Trajectory` (`setpoint` module)
//! - **Loop**: `AcquisitionCore::step` polls both devices once per tick and
//!   latches a `RunOutcome` (`core`, `status` modules)
//! - **Persistence**: `RunRecord` is handed to a `RunSink` exactly once by the
//!   `runner::Session` guard
//!
//! ## Time
//!
//! Link and trajectory times are `f64` seconds since the core was built, taken
//! from an injectable `Clock` so tests can run the loop on simulated time.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod error;
pub mod frame;
pub mod hw_error;
pub mod link;
pub mod mocks;
pub mod pid;
pub mod record;
pub mod runner;
pub mod setpoint;
pub mod status;

pub use builder::{Acquisition, AcquisitionBuilder, Missing, Set, build_acquisition};
pub use config::{RunCfg, RunPlan, SetpointCfg};
pub use crate::core::AcquisitionCore;
pub use error::{AbortReason, AcqError, BuildError, Result};
pub use frame::FrameDecoder;
pub use lcr_protocol::{
    Configuration, FRAME_LEN, FrameFields, MeasurementRecord, decode_frame, encode_frame,
    scan_frames,
};
pub use link::{FaultKind, LinkMonitor, LinkTiming};
pub use pid::{IntegratorMode, PidCfg, PidController};
pub use record::{NullSink, RunRecord, RunSink};
pub use runner::{Session, run, run_with_clock};
pub use setpoint::{ProfileKind, SegmentDurations, Trajectory};
pub use status::{RunOutcome, RunStatus};
