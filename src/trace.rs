//! Common intermediate representation of a deposition run.
//!
//! Both input paths — an interpreted instruction program and a logged
//! telemetry table — converge on the same [`MotionTrace`] shape before any
//! bead geometry or meshing happens. Sample order is load-bearing: it is the
//! toolpath order.

use serde::{Deserialize, Serialize};

use crate::geometry::Point3D;
use crate::{Error, Result};

/// One process sample along the toolpath. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub position: Point3D,
    /// Material feed velocity, already gated to zero for non-depositing moves.
    pub feed_velocity: f64,
    /// Tool travel velocity along the path, units/min.
    pub path_velocity: f64,
    /// Elapsed process time, seconds.
    pub time: f64,
}

/// Ordered, append-only sequence of motion samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionTrace {
    pub samples: Vec<MotionSample>,
}

impl MotionTrace {
    pub fn new(samples: Vec<MotionSample>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One row of a logged telemetry table.
///
/// Elapsed time comes from `time` when present, otherwise it is derived from
/// `timestamp` relative to the first row, otherwise it is zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TelemetryRow {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub feed_velocity: f64,
    pub path_velocity: f64,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl TelemetryRow {
    fn elapsed(&self, first_timestamp: Option<f64>) -> f64 {
        if let Some(t) = self.time {
            t
        } else if let (Some(ts), Some(ts0)) = (self.timestamp, first_timestamp) {
            ts - ts0
        } else {
            0.0
        }
    }
}

/// Input source for one engine invocation.
///
/// Either a raw instruction program or an already-sampled telemetry table;
/// both convert to the same [`MotionTrace`] so everything downstream of the
/// interpreter is shared.
#[derive(Debug, Clone)]
pub enum TraceSource {
    Program(String),
    Telemetry(Vec<TelemetryRow>),
}

impl TraceSource {
    pub fn into_trace(self) -> Result<MotionTrace> {
        match self {
            TraceSource::Program(text) => crate::program::parse_program(&text),
            TraceSource::Telemetry(rows) => trace_from_telemetry(&rows),
        }
    }
}

/// Convert a telemetry table into a motion trace.
///
/// Rows are taken in order; fewer than two rows cannot describe a toolpath
/// segment and fail validation, matching the interpreter's contract.
pub fn trace_from_telemetry(rows: &[TelemetryRow]) -> Result<MotionTrace> {
    if rows.len() < 2 {
        return Err(Error::Validation(format!(
            "telemetry table has {} rows, need at least 2",
            rows.len()
        )));
    }

    let first_timestamp = rows[0].timestamp;
    let samples = rows
        .iter()
        .map(|row| MotionSample {
            position: Point3D::new(row.x, row.y, row.z),
            feed_velocity: row.feed_velocity,
            path_velocity: row.path_velocity,
            time: row.elapsed(first_timestamp),
        })
        .collect();

    log::debug!("telemetry table converted: {} samples", rows.len());

    Ok(MotionTrace::new(samples))
}
