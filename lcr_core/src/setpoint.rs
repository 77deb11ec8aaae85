//! Cyclic setpoint trajectories: piecewise-constant or piecewise-linear in time.

use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileKind {
    /// Each value is held for its segment.
    Step,
    /// Values are waypoints joined by straight lines.
    #[default]
    Linear,
}

/// Segment lengths in seconds: one for all segments, or one per segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentDurations {
    Uniform(f64),
    PerSegment(Vec<f64>),
}

/// Immutable setpoint profile, repeating with a fixed period.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    kind: ProfileKind,
    /// Step: cumulative end time of each segment. Linear: waypoint times from 0.
    times: Vec<f64>,
    values: Vec<f64>,
}

impl Trajectory {
    /// Build a profile from setpoint values and segment durations.
    ///
    /// Step profiles take one duration per value; linear profiles one per gap
    /// between consecutive values.
    pub fn new(
        kind: ProfileKind,
        values: Vec<f64>,
        durations: &SegmentDurations,
    ) -> Result<Self, BuildError> {
        if values.is_empty() {
            return Err(BuildError::InvalidConfig("setpoint values must not be empty"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BuildError::InvalidConfig("setpoint values must be finite"));
        }
        let segments = match kind {
            ProfileKind::Step => values.len(),
            ProfileKind::Linear => values.len() - 1,
        };
        if segments == 0 {
            return Err(BuildError::InvalidConfig(
                "linear setpoint needs at least two values",
            ));
        }
        let lengths = match durations {
            SegmentDurations::Uniform(d) => vec![*d; segments],
            SegmentDurations::PerSegment(ds) => {
                if ds.len() != segments {
                    return Err(BuildError::InvalidConfig(
                        "setpoint durations do not match the number of segments",
                    ));
                }
                ds.clone()
            }
        };
        if lengths.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
            return Err(BuildError::InvalidConfig(
                "setpoint durations must be finite and > 0",
            ));
        }

        let mut times = Vec::with_capacity(values.len());
        if kind == ProfileKind::Linear {
            times.push(0.0);
        }
        let mut acc = 0.0;
        for d in lengths {
            acc += d;
            times.push(acc);
        }
        Ok(Self {
            kind,
            times,
            values,
        })
    }

    pub fn step(values: Vec<f64>, durations: &SegmentDurations) -> Result<Self, BuildError> {
        Self::new(ProfileKind::Step, values, durations)
    }

    pub fn linear(values: Vec<f64>, durations: &SegmentDurations) -> Result<Self, BuildError> {
        Self::new(ProfileKind::Linear, values, durations)
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    /// Length of one cycle in seconds.
    pub fn period(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// `(time, value)` pairs defining the profile within one cycle.
    pub fn waypoints(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }

    /// Setpoint at `elapsed_s` seconds from the start of the run.
    pub fn value(&self, elapsed_s: f64) -> f64 {
        let phase = elapsed_s.rem_euclid(self.period());
        match self.kind {
            ProfileKind::Step => {
                let i = self.times.partition_point(|&end| end < phase);
                self.values[i.min(self.values.len() - 1)]
            }
            ProfileKind::Linear => self.interpolate(phase),
        }
    }

    /// Completed cycles at `elapsed_s`.
    pub fn iteration(&self, elapsed_s: f64) -> u64 {
        (elapsed_s / self.period()).floor() as u64
    }

    fn interpolate(&self, t: f64) -> f64 {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return self.values[0];
        }
        if t >= self.times[last] {
            return self.values[last];
        }
        let hi = self.times.partition_point(|&x| x <= t);
        let lo = hi - 1;
        let (t0, t1) = (self.times[lo], self.times[hi]);
        let (v0, v1) = (self.values[lo], self.values[hi]);
        v0 + (v1 - v0) * (t - t0) / (t1 - t0)
    }
}
