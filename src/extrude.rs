//! Capsule sweep mesh extrusion.
//!
//! Sweeps the capsule cross-section along a calibrated trace, stitching
//! consecutive rings into triangles and accumulating flat vertex/face/scalar
//! buffers. Each segment gets its own pair of rings — no vertex welding
//! across segments or across a ring seam. Duplicated seam vertices are the
//! price of strictly local index bookkeeping and per-segment scalar coloring.

use serde::{Deserialize, Serialize};

use crate::bead::{CalibratedSample, CalibratedTrace};
use crate::geometry::{Aabb, Point3D};
use crate::profile::capsule_ring;
use crate::{Error, Result, EPSILON};

/// Per-vertex scalar channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarField {
    ElapsedTime,
    FeedVelocity,
    PathVelocity,
    BeadArea,
    #[default]
    BeadThickness,
    BeadWidth,
}

impl ScalarField {
    fn value(&self, s: &CalibratedSample) -> f64 {
        match self {
            ScalarField::ElapsedTime => s.sample.time,
            ScalarField::FeedVelocity => s.sample.feed_velocity,
            ScalarField::PathVelocity => s.sample.path_velocity,
            ScalarField::BeadArea => s.bead_area,
            ScalarField::BeadThickness => s.bead_thickness,
            ScalarField::BeadWidth => s.bead_width,
        }
    }
}

/// Level-of-detail policy: ring resolution and trace downsampling.
///
/// Both knobs re-derive from the same calibrated trace without mutating it,
/// so several LOD variants of one print can be generated independently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LevelOfDetail {
    /// Vertices per cross-section ring. Even, at least 4.
    pub ring_vertices: usize,
    /// Keep every `stride`-th sample (first and last always kept).
    pub stride: usize,
}

impl Default for LevelOfDetail {
    fn default() -> Self {
        Self {
            ring_vertices: 16,
            stride: 1,
        }
    }
}

impl LevelOfDetail {
    /// Coarse preview quality.
    pub fn low() -> Self {
        Self {
            ring_vertices: 6,
            stride: 4,
        }
    }

    /// Full-resolution inspection quality.
    pub fn high() -> Self {
        Self {
            ring_vertices: 32,
            stride: 1,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ring_vertices < 4 || self.ring_vertices % 2 != 0 {
            return Err(Error::Configuration(format!(
                "ring vertex count must be even and >= 4, got {}",
                self.ring_vertices
            )));
        }
        if self.stride == 0 {
            return Err(Error::Configuration(
                "sample stride must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flat, renderer-ready mesh buffers.
///
/// Grows monotonically during one extrusion, immutable once returned.
/// `scalars` is parallel to `vertices`; every face index is in range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub vertices: Vec<Point3D>,
    pub faces: Vec<[u32; 3]>,
    pub scalars: Vec<f64>,
}

impl MeshBuffers {
    fn with_capacity(vertex_hint: usize, face_hint: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_hint),
            faces: Vec::with_capacity(face_hint),
            scalars: Vec::with_capacity(vertex_hint),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter())
    }

    /// Positions as a flat `[x0, y0, z0, x1, ...]` array.
    pub fn flat_positions(&self) -> Vec<f64> {
        self.vertices
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    /// Face indices as a flat `[a0, b0, c0, a1, ...]` array.
    pub fn flat_indices(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }

    /// Rebuild buffers from the flat-array representation. Lossless inverse
    /// of `flat_positions` / `flat_indices` plus the scalar slice.
    pub fn from_flat(positions: &[f64], indices: &[u32], scalars: &[f64]) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(Error::Validation(
                "flat position array length must be a multiple of 3".to_string(),
            ));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::Validation(
                "flat index array length must be a multiple of 3".to_string(),
            ));
        }
        let num_vertices = positions.len() / 3;
        if scalars.len() != num_vertices {
            return Err(Error::Validation(format!(
                "scalar array has {} entries for {} vertices",
                scalars.len(),
                num_vertices
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= num_vertices) {
            return Err(Error::Validation(format!(
                "face index {} out of range for {} vertices",
                bad, num_vertices
            )));
        }

        let vertices = positions
            .chunks_exact(3)
            .map(|c| Point3D::new(c[0], c[1], c[2]))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        Ok(Self {
            vertices,
            faces,
            scalars: scalars.to_vec(),
        })
    }
}

/// Sweep the capsule profile along a calibrated trace.
///
/// Returns `Ok(None)` — the "no mesh" signal — when fewer than two usable
/// samples remain after downsampling, or when every consecutive pair is
/// degenerate or non-depositing. A single degenerate segment is silently
/// omitted: a zero-length move carries no physical volume and must not
/// contribute degenerate triangles, and the running vertex offset stays
/// untouched so subsequent segments stitch correctly. Travel moves (zero
/// feed) are omitted the same way.
pub fn extrude_trace(
    trace: &CalibratedTrace,
    field: ScalarField,
    lod: &LevelOfDetail,
) -> Result<Option<MeshBuffers>> {
    lod.validate()?;

    let samples = downsample(&trace.samples, lod.stride);
    if samples.len() < 2 {
        log::info!("no usable samples after downsampling, emitting no mesh");
        return Ok(None);
    }

    let n = lod.ring_vertices;
    let segment_hint = samples.len() - 1;
    let mut mesh = MeshBuffers::with_capacity(segment_hint * 2 * n, segment_hint * 2 * n);

    let radius = trace.bead.radius;
    let mut offset: u32 = 0;
    let mut skipped = 0usize;

    for pair in samples.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);

        // The sample closing a move carries the feed active during it; a
        // segment with no feed deposited nothing and is not drawn.
        if b.sample.feed_velocity < EPSILON {
            skipped += 1;
            continue;
        }

        let direction = b.sample.position - a.sample.position;
        if direction.norm() < EPSILON {
            skipped += 1;
            continue;
        }

        // Both rings share the segment direction as tangent.
        let ring1 = capsule_ring(
            &a.sample.position,
            &direction,
            a.bead_thickness,
            radius,
            n,
        );
        let ring2 = capsule_ring(
            &b.sample.position,
            &direction,
            b.bead_thickness,
            radius,
            n,
        );

        mesh.vertices.extend(ring1);
        mesh.vertices.extend(ring2);

        let value1 = field.value(a);
        let value2 = field.value(b);
        mesh.scalars.extend(std::iter::repeat(value1).take(n));
        mesh.scalars.extend(std::iter::repeat(value2).take(n));

        let n32 = n as u32;
        for j in 0..n32 {
            let v1 = offset + j;
            let v2 = offset + (j + 1) % n32;
            let v3 = offset + n32 + j;
            let v4 = offset + n32 + (j + 1) % n32;

            mesh.faces.push([v1, v3, v4]);
            mesh.faces.push([v1, v4, v2]);
        }

        offset += 2 * n32;
    }

    if mesh.vertices.is_empty() {
        log::info!(
            "all {} segments degenerate or non-depositing, emitting no mesh",
            skipped
        );
        return Ok(None);
    }

    if skipped > 0 {
        log::debug!("omitted {} degenerate segments", skipped);
    }
    log::info!(
        "extruded {} vertices, {} faces (N={}, stride={})",
        mesh.num_vertices(),
        mesh.num_faces(),
        n,
        lod.stride
    );

    Ok(Some(mesh))
}

/// Stride-downsample calibrated samples, always retaining first and last.
fn downsample(samples: &[CalibratedSample], stride: usize) -> Vec<CalibratedSample> {
    if stride <= 1 || samples.len() <= 2 {
        return samples.to_vec();
    }

    let last = samples.len() - 1;
    let mut out: Vec<CalibratedSample> = samples.iter().copied().step_by(stride).collect();
    if (last % stride) != 0 {
        out.push(samples[last]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bead::{calibrate_trace, BeadParams, Calibration, Feedstock};
    use crate::trace::{MotionSample, MotionTrace};

    fn calibrated(positions: &[(f64, f64, f64)], feed: f64) -> CalibratedTrace {
        let samples = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| MotionSample {
                position: Point3D::new(x, y, z),
                feed_velocity: feed,
                path_velocity: 100.0,
                time: i as f64,
            })
            .collect();
        calibrate_trace(
            &MotionTrace::new(samples),
            &Feedstock::default(),
            &BeadParams::default(),
            &Calibration::default(),
        )
        .unwrap()
    }

    fn assert_invariants(mesh: &MeshBuffers) {
        assert_eq!(mesh.scalars.len(), mesh.vertices.len());
        let len = mesh.vertices.len() as u32;
        for face in &mesh.faces {
            for &idx in face {
                assert!(idx < len, "face index {} out of range {}", idx, len);
            }
        }
    }

    #[test]
    fn test_single_segment_counts() {
        let trace = calibrated(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)], 420.0);
        let lod = LevelOfDetail {
            ring_vertices: 8,
            stride: 1,
        };

        let mesh = extrude_trace(&trace, ScalarField::BeadThickness, &lod)
            .unwrap()
            .unwrap();
        assert_eq!(mesh.num_vertices(), 16);
        assert_eq!(mesh.num_faces(), 16);
        assert_invariants(&mesh);
    }

    #[test]
    fn test_degenerate_pair_omitted_offset_intact() {
        // Middle pair is coincident; its segment must contribute nothing and
        // the following segment must still index correctly.
        let trace = calibrated(
            &[
                (0.0, 0.0, 0.0),
                (5.0, 0.0, 0.0),
                (5.0, 0.0, 0.0),
                (10.0, 0.0, 0.0),
            ],
            420.0,
        );
        let lod = LevelOfDetail {
            ring_vertices: 8,
            stride: 1,
        };

        let mesh = extrude_trace(&trace, ScalarField::BeadThickness, &lod)
            .unwrap()
            .unwrap();
        // Two real segments out of three pairs.
        assert_eq!(mesh.num_vertices(), 32);
        assert_eq!(mesh.num_faces(), 32);
        assert_invariants(&mesh);
    }

    #[test]
    fn test_zero_feed_trace_yields_no_mesh() {
        // Motion without deposition draws nothing.
        let trace = calibrated(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0), (20.0, 0.0, 0.0)], 0.0);
        let out = extrude_trace(&trace, ScalarField::BeadThickness, &LevelOfDetail::default())
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_travel_segment_omitted_mid_trace() {
        let positions = [(0.0, 0.0, 0.0), (5.0, 0.0, 0.0), (10.0, 0.0, 0.0)];
        let samples: Vec<MotionSample> = positions
            .iter()
            .enumerate()
            .map(|(i, &(x, y, z))| MotionSample {
                position: Point3D::new(x, y, z),
                // Middle sample closes a travel move.
                feed_velocity: if i == 1 { 0.0 } else { 420.0 },
                path_velocity: 100.0,
                time: i as f64,
            })
            .collect();
        let trace = calibrate_trace(
            &MotionTrace::new(samples),
            &Feedstock::default(),
            &BeadParams::default(),
            &Calibration::default(),
        )
        .unwrap();

        let lod = LevelOfDetail {
            ring_vertices: 8,
            stride: 1,
        };
        let mesh = extrude_trace(&trace, ScalarField::BeadThickness, &lod)
            .unwrap()
            .unwrap();
        // Only the second pair deposits.
        assert_eq!(mesh.num_vertices(), 16);
        assert_eq!(mesh.num_faces(), 16);
        assert_invariants(&mesh);
    }

    #[test]
    fn test_all_degenerate_yields_no_mesh() {
        let trace = calibrated(&[(1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, 1.0)], 0.0);
        let out = extrude_trace(&trace, ScalarField::FeedVelocity, &LevelOfDetail::default())
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_too_few_samples_yields_no_mesh() {
        let trace = calibrated(&[(0.0, 0.0, 0.0)], 420.0);
        let out = extrude_trace(&trace, ScalarField::BeadThickness, &LevelOfDetail::default())
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn test_bad_lod_rejected() {
        let trace = calibrated(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)], 420.0);

        for lod in [
            LevelOfDetail {
                ring_vertices: 7,
                stride: 1,
            },
            LevelOfDetail {
                ring_vertices: 2,
                stride: 1,
            },
            LevelOfDetail {
                ring_vertices: 8,
                stride: 0,
            },
        ] {
            assert!(extrude_trace(&trace, ScalarField::BeadThickness, &lod).is_err());
        }
    }

    #[test]
    fn test_scalar_field_selection() {
        let trace = calibrated(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)], 420.0);
        let lod = LevelOfDetail {
            ring_vertices: 4,
            stride: 1,
        };

        let mesh = extrude_trace(&trace, ScalarField::ElapsedTime, &lod)
            .unwrap()
            .unwrap();
        // Ring 1 carries sample 0's time, ring 2 sample 1's.
        assert_eq!(&mesh.scalars[..4], &[0.0; 4]);
        assert_eq!(&mesh.scalars[4..8], &[1.0; 4]);
    }

    #[test]
    fn test_downsample_keeps_endpoints() {
        let trace = calibrated(
            &(0..10)
                .map(|i| (i as f64, 0.0, 0.0))
                .collect::<Vec<_>>(),
            420.0,
        );

        let xs: Vec<f64> = downsample(&trace.samples, 4)
            .iter()
            .map(|s| s.sample.position.x)
            .collect();
        assert_eq!(xs, vec![0.0, 4.0, 8.0, 9.0]);
    }

    #[test]
    fn test_downsample_no_duplicate_when_last_on_stride() {
        let trace = calibrated(
            &(0..9)
                .map(|i| (i as f64, 0.0, 0.0))
                .collect::<Vec<_>>(),
            420.0,
        );

        let xs: Vec<f64> = downsample(&trace.samples, 4)
            .iter()
            .map(|s| s.sample.position.x)
            .collect();
        assert_eq!(xs, vec![0.0, 4.0, 8.0]);
    }

    #[test]
    fn test_determinism() {
        let trace = calibrated(
            &[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0), (10.0, 5.0, 2.0)],
            420.0,
        );
        let lod = LevelOfDetail::default();

        let a = extrude_trace(&trace, ScalarField::BeadArea, &lod).unwrap().unwrap();
        let b = extrude_trace(&trace, ScalarField::BeadArea, &lod).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_flat_roundtrip_is_lossless() {
        let trace = calibrated(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0)], 420.0);
        let mesh = extrude_trace(&trace, ScalarField::BeadWidth, &LevelOfDetail::default())
            .unwrap()
            .unwrap();

        let rebuilt = MeshBuffers::from_flat(
            &mesh.flat_positions(),
            &mesh.flat_indices(),
            &mesh.scalars,
        )
        .unwrap();
        assert_eq!(mesh, rebuilt);
    }

    #[test]
    fn test_from_flat_rejects_inconsistent_buffers() {
        assert!(MeshBuffers::from_flat(&[0.0; 4], &[], &[0.0]).is_err());
        assert!(MeshBuffers::from_flat(&[0.0; 3], &[0, 1], &[0.0]).is_err());
        assert!(MeshBuffers::from_flat(&[0.0; 3], &[], &[]).is_err());
        assert!(MeshBuffers::from_flat(&[0.0; 3], &[0, 0, 1], &[0.0]).is_err());
    }
}
