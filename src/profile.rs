//! Capsule cross-section ring generation.
//!
//! A bead's cross-section is idealized as a capsule: two semicircular caps of
//! radius R whose centers sit `thickness` apart along the frame's side
//! direction. The straight rails between the caps fall out of the seam
//! between the two semicircles, so the ring is just 2 × (N/2) arc points.

use std::f64::consts::PI;

use crate::geometry::{Frame, Point3D, Vector3D};

/// Generate the `n`-point capsule ring at `center`, lying in the plane
/// orthogonal to `tangent`.
///
/// `n` must be even and at least 4; callers validate their LOD policy before
/// extruding. Degenerate tangents fall back deterministically inside
/// [`Frame::from_tangent`].
pub fn capsule_ring(
    center: &Point3D,
    tangent: &Vector3D,
    thickness: f64,
    radius: f64,
    n: usize,
) -> Vec<Point3D> {
    debug_assert!(n >= 4 && n % 2 == 0, "ring vertex count must be even, >= 4");

    let frame = Frame::from_tangent(tangent);
    let half = n / 2;
    let step = PI / half as f64;

    let cap_offset = frame.side * (thickness / 2.0);
    let mut ring = Vec::with_capacity(n);

    // First cap, sweeping from +pi/2 through the -side apex.
    let cap = center - cap_offset;
    for k in 0..half {
        let angle = PI / 2.0 + k as f64 * step;
        ring.push(arc_point(&cap, &frame, radius, angle));
    }

    // Second cap, sweeping from -pi/2 through the +side apex.
    let cap = center + cap_offset;
    for k in 0..half {
        let angle = -PI / 2.0 + k as f64 * step;
        ring.push(arc_point(&cap, &frame, radius, angle));
    }

    ring
}

fn arc_point(cap: &Point3D, frame: &Frame, radius: f64, angle: f64) -> Point3D {
    cap + radius * (angle.cos() * frame.side + angle.sin() * frame.up)
}
