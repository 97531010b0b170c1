use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::EPSILON;

/// 3D point type
pub type Point3D = Point3<f64>;

/// 3D vector type
pub type Vector3D = Vector3<f64>;

/// World up direction used to frame cross-section rings.
pub const WORLD_UP: Vector3D = Vector3D::new(0.0, 0.0, 1.0);

/// Substitute tangent for zero-length directions.
pub const DEFAULT_TANGENT: Vector3D = Vector3D::new(1.0, 0.0, 0.0);

/// Substitute side vector when the tangent is nearly parallel to `WORLD_UP`.
pub const FALLBACK_SIDE: Vector3D = Vector3D::new(1.0, 0.0, 0.0);

/// Cross-product norm below which a tangent counts as parallel to `WORLD_UP`.
const PARALLEL_TOLERANCE: f64 = 1e-6;

/// Orthonormal frame at one point of a swept path.
///
/// `tangent` points along the path, `side` lies in the horizontal plane
/// (where possible) and `up` completes the right-handed triple. Degenerate
/// inputs always produce the same substituted frame, so the sweep stays
/// deterministic.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub tangent: Vector3D,
    pub side: Vector3D,
    pub up: Vector3D,
}

impl Frame {
    /// Build a frame from a (not necessarily unit) tangent.
    ///
    /// A near-zero tangent falls back to `DEFAULT_TANGENT`; a tangent nearly
    /// parallel to `WORLD_UP` falls back to `FALLBACK_SIDE` for the side
    /// direction. Neither case is an error.
    pub fn from_tangent(tangent: &Vector3D) -> Self {
        let norm = tangent.norm();
        let t = if norm < EPSILON || !norm.is_finite() {
            DEFAULT_TANGENT
        } else {
            tangent / norm
        };

        let cross = t.cross(&WORLD_UP);
        let side = if cross.norm() < PARALLEL_TOLERANCE {
            FALLBACK_SIDE
        } else {
            cross.normalize()
        };

        let up = side.cross(&t);

        Self {
            tangent: t,
            side,
            up,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3D,
    pub max: Point3D,
}

impl Aabb {
    /// Compute the bounding box of a point set, or `None` when empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3D>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;

        let mut min = *first;
        let mut max = *first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn extents(&self) -> Vector3D {
        self.max - self.min
    }

    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e.x * e.y * e.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frame_is_orthonormal() {
        let frame = Frame::from_tangent(&Vector3D::new(3.0, -1.0, 0.5));

        assert_relative_eq!(frame.tangent.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.side.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.up.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(frame.tangent.dot(&frame.side), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.tangent.dot(&frame.up), 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.side.dot(&frame.up), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_tangent_fallback_is_deterministic() {
        let a = Frame::from_tangent(&Vector3D::zeros());
        let b = Frame::from_tangent(&Vector3D::zeros());

        assert_eq!(a.tangent, DEFAULT_TANGENT);
        assert_eq!(a.tangent, b.tangent);
        assert_eq!(a.side, b.side);
        assert_eq!(a.up, b.up);
    }

    #[test]
    fn test_vertical_tangent_uses_fallback_side() {
        let frame = Frame::from_tangent(&WORLD_UP);
        assert_eq!(frame.side, FALLBACK_SIDE);
        assert_relative_eq!(frame.tangent.dot(&frame.side), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_aabb_from_points() {
        let points = [
            Point3D::new(1.0, -2.0, 3.0),
            Point3D::new(-1.0, 5.0, 0.0),
            Point3D::new(0.0, 0.0, 7.0),
        ];

        let bb = Aabb::from_points(points.iter()).unwrap();
        assert_eq!(bb.min, Point3D::new(-1.0, -2.0, 0.0));
        assert_eq!(bb.max, Point3D::new(1.0, 5.0, 7.0));
        assert_relative_eq!(bb.volume(), 2.0 * 7.0 * 7.0);
    }

    #[test]
    fn test_aabb_empty() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }
}
