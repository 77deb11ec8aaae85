//! Clock-driven simulators for the chamber and the LCR meter.
//!
//! Both share one temperature cell: the chamber integrates heater power into
//! it and the meter reports a capacitance that drifts with it.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use lcr_protocol::{
    Circuit, FRAME_LEN, FrameFields, Frequency, PrimaryQuantity, Reading, SecondaryQuantity,
    encode_frame,
};
use lcr_traits::{ByteLink, Chamber, Clock, DeviceError};

/// First-order plant parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    pub ambient_c: f64,
    /// Rise above ambient at full power once settled.
    pub gain_c: f64,
    pub time_constant_s: f64,
    pub sample_period_s: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            ambient_c: 22.0,
            gain_c: 90.0,
            time_constant_s: 180.0,
            sample_period_s: 0.7368,
        }
    }
}

/// Simulated thermal chamber: emits one temperature sample per period.
pub struct SimulatedChamber {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    plant: PlantParams,
    temperature: Rc<Cell<f64>>,
    power: f64,
    next_sample_s: f64,
    fault_after_s: Option<f64>,
}

impl SimulatedChamber {
    pub fn new(plant: PlantParams, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            plant,
            temperature: Rc::new(Cell::new(plant.ambient_c)),
            power: 0.0,
            next_sample_s: plant.sample_period_s,
            fault_after_s: None,
        }
    }

    /// Report a link error from `secs` after creation on.
    pub fn with_fault_after(mut self, secs: f64) -> Self {
        self.fault_after_s = Some(secs);
        self
    }

    /// Handle to the simulated temperature, shared with [`SimulatedLcr`].
    pub fn temperature(&self) -> Rc<Cell<f64>> {
        Rc::clone(&self.temperature)
    }

    pub fn power(&self) -> f64 {
        self.power
    }
}

impl Chamber for SimulatedChamber {
    fn read(&mut self) -> Result<Vec<f64>, DeviceError> {
        let now = self.clock.secs_since(self.epoch);
        let p = self.plant;
        let alpha = 1.0 - (-p.sample_period_s / p.time_constant_s).exp();
        let mut out = Vec::new();
        while self.next_sample_s <= now {
            let target = p.ambient_c + p.gain_c * self.power;
            let t = self.temperature.get();
            let t = t + (target - t) * alpha;
            self.temperature.set(t);
            out.push(t);
            self.next_sample_s += p.sample_period_s;
        }
        Ok(out)
    }

    fn write(&mut self, power: f64) -> Result<(), DeviceError> {
        self.power = power.clamp(0.0, 1.0);
        Ok(())
    }

    fn error(&self) -> bool {
        self.fault_after_s
            .is_some_and(|t| self.clock.secs_since(self.epoch) >= t)
    }
}

/// What the simulated meter measures and how it misbehaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterParams {
    /// Capacitance at `reference_c`, farads.
    pub nominal_f: f64,
    pub tempco_per_c: f64,
    pub reference_c: f64,
    pub dissipation: f64,
    pub frame_period_s: f64,
    pub byte_time_s: f64,
    pub drop_frame: Option<u64>,
    pub corrupt_frame: Option<u64>,
}

impl Default for MeterParams {
    fn default() -> Self {
        Self {
            nominal_f: 47e-9,
            tempco_per_c: -7.5e-4,
            reference_c: 25.0,
            dissipation: 0.0125,
            frame_period_s: 0.5024,
            byte_time_s: 0.0177,
            drop_frame: None,
            corrupt_frame: None,
        }
    }
}

/// Simulated LCR meter streaming parallel capacitance and dissipation factor
/// at 1 kHz, byte by byte on the meter's schedule.
pub struct SimulatedLcr {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    meter: MeterParams,
    temperature: Rc<Cell<f64>>,
    frame_index: u64,
    byte_index: usize,
    current: [u8; FRAME_LEN],
}

impl SimulatedLcr {
    pub fn new(
        meter: MeterParams,
        temperature: Rc<Cell<f64>>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            meter,
            temperature,
            frame_index: 0,
            byte_index: 0,
            current: [0; FRAME_LEN],
        }
    }

    /// Frames fully or partially emitted so far, dropped ones included.
    pub fn frames_started(&self) -> u64 {
        self.frame_index + u64::from(self.byte_index > 0)
    }

    fn capacitance(&self) -> f64 {
        let m = &self.meter;
        m.nominal_f * (1.0 + m.tempco_per_c * (self.temperature.get() - m.reference_c))
    }

    fn next_frame(&self) -> [u8; FRAME_LEN] {
        let c = self.capacitance().max(0.0);
        let mut frame = encode_frame(&FrameFields::new(
            Frequency::Hz1k,
            PrimaryQuantity::Capacitance(Circuit::Parallel),
            reading_for(c),
            Some(SecondaryQuantity::DissipationFactor),
            reading_for(self.meter.dissipation),
        ));
        if self.meter.corrupt_frame == Some(self.frame_index) {
            frame[FRAME_LEN - 1] = 0xFF;
        }
        frame
    }

    fn due_s(&self) -> f64 {
        self.frame_index as f64 * self.meter.frame_period_s
            + (self.byte_index + 1) as f64 * self.meter.byte_time_s
    }
}

impl ByteLink for SimulatedLcr {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize, DeviceError> {
        let now = self.clock.secs_since(self.epoch);
        let mut n = 0;
        while self.due_s() <= now {
            if self.byte_index == 0 {
                if self.meter.drop_frame == Some(self.frame_index) {
                    tracing::debug!(frame = self.frame_index, "simulated frame dropped");
                    self.frame_index += 1;
                    continue;
                }
                self.current = self.next_frame();
            }
            buf.push(self.current[self.byte_index]);
            n += 1;
            self.byte_index += 1;
            if self.byte_index == FRAME_LEN {
                self.byte_index = 0;
                self.frame_index += 1;
            }
        }
        Ok(n)
    }
}

/// Reading for a positive magnitude with as many significant digits as the
/// 16-bit mantissa allows.
pub fn reading_for(value: f64) -> Reading {
    let (scale, unit) = if value == 0.0 || value >= 1e-3 {
        (0u8, 1.0)
    } else if value >= 1e-6 {
        (11, 1e-6)
    } else if value >= 1e-9 {
        (10, 1e-9)
    } else {
        (9, 1e-12)
    };
    let scaled = value / unit;
    let mut exponent = 0u8;
    while exponent < 7 && scaled * 10f64.powi(i32::from(exponent) + 1) <= f64::from(u16::MAX) {
        exponent += 1;
    }
    let mantissa = (scaled * 10f64.powi(i32::from(exponent)))
        .round()
        .clamp(0.0, f64::from(u16::MAX)) as u16;
    Reading {
        mantissa,
        exponent,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(47e-9)]
    #[case(1.5e-6)]
    #[case(220e-12)]
    #[case(0.0125)]
    #[case(3.3)]
    fn reading_round_trips_within_resolution(#[case] value: f64) {
        let r = reading_for(value);
        assert!((r.value() - value).abs() <= value * 1e-4, "{r:?}");
    }
}
