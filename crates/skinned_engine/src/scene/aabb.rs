//! Axis-aligned bounding boxes for picking and debug drawing

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Corner `i` takes `max` on axis `a` when bit `a` of `i` is set
const EDGE_INDICES: [u16; 24] = [
    0, 1, 2, 3, 4, 5, 6, 7, // along X
    0, 2, 1, 3, 4, 6, 5, 7, // along Y
    0, 4, 1, 5, 2, 6, 3, 7, // along Z
];

/// Wireframe of a box as an 8-vertex line list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugGeometry {
    /// Box corners
    pub vertices: [Vec3; 8],
    /// 12 edges, two indices each
    pub indices: [u16; 24],
}

/// Immutable axis-aligned bounding box
///
/// The wireframe is derived once at construction; a changed box is a new
/// value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
    debug: DebugGeometry,
}

impl Aabb {
    /// Create a box from its corners (components are sorted per axis)
    pub fn new(a: Vec3, b: Vec3) -> Self {
        let min = a.inf(&b);
        let max = a.sup(&b);
        Self {
            min,
            max,
            debug: DebugGeometry {
                vertices: Self::corners_of(min, max),
                indices: EDGE_INDICES,
            },
        }
    }

    /// Tightest box around a set of points, `None` when there are none
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)));
        Some(Self::new(min, max))
    }

    /// Box around skinned vertices
    ///
    /// Each vertex is moved by the weighted sum of up to four joint matrices.
    /// Zero weights are skipped and weights are not renormalized, so
    /// un-normalized input yields scaled positions. Influences naming a joint
    /// past the end of `matrices` are ignored.
    pub fn from_skinned(
        positions: &[Vec3],
        joints: &[[u16; 4]],
        weights: &[[f32; 4]],
        matrices: &[Mat4],
    ) -> Option<Self> {
        Self::from_points(positions.iter().zip(joints).zip(weights).map(|((position, joints), weights)| {
            joints
                .iter()
                .zip(weights)
                .filter(|(_, &weight)| weight != 0.0)
                .filter_map(|(&joint, &weight)| {
                    matrices.get(usize::from(joint)).map(|m| m.transform_point3(position) * weight)
                })
                .fold(Vec3::zeros(), |acc, p| acc + p)
        }))
    }

    /// Minimum corner
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Box center
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size along each axis
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        self.debug.vertices
    }

    /// Wireframe for line-list rendering
    pub fn debug_geometry(&self) -> &DebugGeometry {
        &self.debug
    }

    /// Smallest box holding both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Re-fit the box around its eight corners after `matrix`
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corners().map(|corner| matrix.transform_point3(&corner));
        let (min, max) = corners[1..]
            .iter()
            .fold((corners[0], corners[0]), |(min, max), p| (min.inf(p), max.sup(p)));
        Self::new(min, max)
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Ray entry distance using the slab method
    ///
    /// Returns 0 when the origin is inside the box.
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            if direction[axis] == 0.0 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let t1 = (self.min[axis] - origin[axis]) * inv;
            let t2 = (self.max[axis] - origin[axis]) * inv;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }

        if t_far >= t_near && t_far >= 0.0 {
            Some(t_near.max(0.0))
        } else {
            None
        }
    }

    fn corners_of(min: Vec3, max: Vec3) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_round_trip_from_corners() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 5.0));
        let rebuilt = Aabb::from_points(aabb.corners()).unwrap();
        assert_eq!(rebuilt, aabb);

        let same = aabb.transformed(&Mat4::identity());
        assert_eq!(same.corners(), aabb.corners());
    }

    #[test]
    fn test_debug_geometry_has_twelve_axis_aligned_edges() {
        let aabb = unit_box();
        let geometry = aabb.debug_geometry();
        assert_eq!(geometry.indices.len(), 24);
        for edge in geometry.indices.chunks(2) {
            let a = geometry.vertices[usize::from(edge[0])];
            let b = geometry.vertices[usize::from(edge[1])];
            let differing = (0..3).filter(|&axis| a[axis] != b[axis]).count();
            assert_eq!(differing, 1);
        }
    }

    #[test]
    fn test_transformed_refits_rotated_box() {
        let rotation = Mat4::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4);
        let rotated = unit_box().transformed(&rotation);
        let reach = std::f32::consts::SQRT_2;
        assert_relative_eq!(rotated.max(), Vec3::new(reach, reach, 1.0), epsilon = 1e-5);
        assert_relative_eq!(rotated.min(), -Vec3::new(reach, reach, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_from_points_empty_is_none() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_skinned_bounds_normalized_weights() {
        let positions = [Vec3::new(1.0, 0.0, 0.0)];
        let matrices = [Mat4::identity(), Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0))];
        let aabb = Aabb::from_skinned(&positions, &[[0, 1, 0, 0]], &[[0.5, 0.5, 0.0, 0.0]], &matrices).unwrap();
        assert_relative_eq!(aabb.min(), Vec3::new(1.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_skinned_bounds_are_not_renormalized() {
        let positions = [Vec3::new(1.0, 0.0, 0.0)];
        let matrices = [Mat4::identity()];
        let aabb = Aabb::from_skinned(&positions, &[[0, 0, 0, 0]], &[[0.5, 0.0, 0.0, 0.0]], &matrices).unwrap();
        assert_relative_eq!(aabb.max(), Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_ray_picking() {
        let aabb = unit_box();
        let hit = aabb.intersect_ray(Vec3::new(0.0, 0.0, -5.0), Vec3::z());
        assert_relative_eq!(hit.unwrap(), 4.0);
        assert!(aabb.intersect_ray(Vec3::new(5.0, 0.0, -5.0), Vec3::z()).is_none());
        assert!(aabb.intersect_ray(Vec3::new(0.0, 0.0, 5.0), Vec3::z()).is_none());
        assert_eq!(aabb.intersect_ray(Vec3::zeros(), Vec3::x()), Some(0.0));
    }
}
