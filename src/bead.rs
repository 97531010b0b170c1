//! Conservation-of-mass bead geometry.
//!
//! Infers the deposited bead's cross-sectional area from the ratio of
//! material feed rate to tool travel rate, then derives the capsule profile's
//! thickness and effective width. Pure per-sample math; noisy telemetry is
//! clamped, never rejected.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::trace::{MotionSample, MotionTrace};
use crate::{Error, Result, EPSILON};

/// Cross-section shape of the feedstock rod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedstockShape {
    Square,
    Circular,
}

/// Feedstock rod consumed to form the bead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Feedstock {
    /// Side length (square) or diameter (circular), mm.
    pub dimension: f64,
    pub shape: FeedstockShape,
}

impl Feedstock {
    /// Cross-sectional area of the rod, mm².
    pub fn area(&self) -> f64 {
        match self.shape {
            FeedstockShape::Square => self.dimension * self.dimension,
            FeedstockShape::Circular => PI * (self.dimension / 2.0).powi(2),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dimension <= 0.0 {
            return Err(Error::Configuration(format!(
                "feedstock dimension must be positive, got {}",
                self.dimension
            )));
        }
        Ok(())
    }
}

impl Default for Feedstock {
    /// 0.5 in square rod (12.7 mm, ~161.29 mm²).
    fn default() -> Self {
        Self {
            dimension: 12.7,
            shape: FeedstockShape::Square,
        }
    }
}

/// Capsule bead profile parameters: a rectangle of `length` and per-sample
/// thickness, capped by semicircular ends of `radius`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BeadParams {
    /// Rectangular-section length, mm.
    pub length: f64,
    /// Semicircular-end radius, mm.
    pub radius: f64,
    /// Thickness clamp, mm.
    pub max_thickness: f64,
}

impl BeadParams {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bead length", self.length),
            ("bead radius", self.radius),
            ("max thickness", self.max_thickness),
        ] {
            if value <= 0.0 {
                return Err(Error::Configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for BeadParams {
    fn default() -> Self {
        Self {
            length: 12.0,
            radius: 3.0,
            max_thickness: 25.0,
        }
    }
}

/// Multiplicative/additive corrections calibrated against measured prints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Calibration {
    pub correction_factor: f64,
    pub area_offset: f64,
    pub width_multiplier: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            correction_factor: 1.0,
            area_offset: 0.0,
            width_multiplier: 1.0,
        }
    }
}

/// A motion sample plus its derived bead geometry. Never mutated after
/// calibration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibratedSample {
    pub sample: MotionSample,
    /// Bead cross-sectional area, mm². Non-negative.
    pub bead_area: f64,
    /// Clamped to `[0, max_thickness]`.
    pub bead_thickness: f64,
    pub bead_width: f64,
}

/// Calibrated trace, carrying the bead parameters it was produced with so the
/// extruder sees a single consistent view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibratedTrace {
    pub samples: Vec<CalibratedSample>,
    pub bead: BeadParams,
}

impl CalibratedTrace {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn calibrate_sample(
    sample: &MotionSample,
    feedstock_area: f64,
    bead: &BeadParams,
    cal: &Calibration,
) -> CalibratedSample {
    // Floored denominator: a stalled tool must not divide by zero.
    let path_vel_safe = sample.path_velocity.max(EPSILON);

    let raw_area =
        (sample.feed_velocity * feedstock_area / path_vel_safe) * cal.correction_factor
            + cal.area_offset;
    let bead_area = raw_area.max(0.0);

    let thickness_raw = (bead_area - PI * bead.radius * bead.radius) / bead.length;
    let bead_thickness = thickness_raw.clamp(0.0, bead.max_thickness);

    let bead_width = (bead_thickness + 2.0 * bead.radius) * cal.width_multiplier;

    CalibratedSample {
        sample: *sample,
        bead_area,
        bead_thickness,
        bead_width,
    }
}

/// Derive per-sample bead geometry for a whole trace.
///
/// Stateless map over the samples (run in parallel); physically nonsensical
/// inputs are clamped rather than rejected because upstream telemetry is
/// noisy. Only the configuration itself can fail.
pub fn calibrate_trace(
    trace: &MotionTrace,
    feedstock: &Feedstock,
    bead: &BeadParams,
    cal: &Calibration,
) -> Result<CalibratedTrace> {
    feedstock.validate()?;
    bead.validate()?;

    let feedstock_area = feedstock.area();
    let samples: Vec<CalibratedSample> = trace
        .samples
        .par_iter()
        .map(|s| calibrate_sample(s, feedstock_area, bead, cal))
        .collect();

    log::debug!(
        "calibrated {} samples (feedstock area {:.2} mm²)",
        samples.len(),
        feedstock_area
    );

    Ok(CalibratedTrace {
        samples,
        bead: *bead,
    })
}
