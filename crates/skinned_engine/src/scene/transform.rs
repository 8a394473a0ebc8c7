//! Hierarchical transforms
//!
//! Transforms live in a [`Transforms`] arena and link to their parent by
//! handle. The parent handle is a weak back-pointer: it is used only to compose
//! matrices, and a parent that has been removed is treated as absent.
//!
//! # Change propagation
//!
//! Every mutation recomputes the local matrix synchronously and stamps the
//! transform with a fresh arena-wide revision. The revision observed through
//! [`Transforms::global_revision`] is the newest stamp along the ancestor
//! chain, so a change anywhere above a transform (including re-parenting) is
//! visible to whoever depends on that transform without any callback list.

use crate::foundation::math::{utils, Mat3, Mat4, Mat4Ext, Quat, Vec3};
use crate::scene::{SceneError, SceneResult};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a transform stored in a [`Transforms`] arena
    pub struct TransformId;
}

/// Local spatial state of one scene entity
///
/// The local model matrix is `replacement × translation × scale × rotation`,
/// with the rotation applied innermost.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vec3,
    scale: Vec3,
    yaw: f32,
    pitch: f32,
    rotation: Quat,
    replacement: Option<Mat4>,
    parent: Option<TransformId>,
    local_matrix: Mat4,
    stamp: u64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            yaw: 0.0,
            pitch: 0.0,
            rotation: Quat::identity(),
            replacement: None,
            parent: None,
            local_matrix: Mat4::identity(),
            stamp: 0,
        }
    }
}

impl Transform {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position, scale and yaw/pitch rotation in degrees
    pub fn from_parts(position: Vec3, scale: Vec3, yaw_degrees: f32, pitch_degrees: f32) -> Self {
        let mut transform = Self {
            position,
            scale,
            yaw: yaw_degrees,
            pitch: pitch_degrees,
            rotation: utils::quat_from_yaw_pitch(yaw_degrees, pitch_degrees),
            ..Self::default()
        };
        transform.recompute();
        transform
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.recompute();
        self
    }

    /// Builder pattern: Set scale (non-uniform)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self.recompute();
        self
    }

    /// Builder pattern: Set parent handle
    pub fn with_parent(mut self, parent: TransformId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Local rotation quaternion
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Euler readback `(yaw, pitch)` in degrees, as last set
    pub fn yaw_pitch(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    /// Externally injected matrix, if any
    pub fn replacement(&self) -> Option<&Mat4> {
        self.replacement.as_ref()
    }

    /// Parent handle, if any
    pub fn parent(&self) -> Option<TransformId> {
        self.parent
    }

    /// Cached local model matrix
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    /// Inverse-transpose of the local model matrix
    pub fn local_normal_matrix(&self) -> Mat3 {
        self.local_matrix.normal_matrix()
    }

    /// Revision stamped at the last local mutation or re-parent
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    fn recompute(&mut self) {
        let trs = Mat4::new_translation(&self.position)
            * Mat4::new_nonuniform_scaling(&self.scale)
            * self.rotation.to_homogeneous();
        self.local_matrix = match &self.replacement {
            Some(replacement) => replacement * trs,
            None => trs,
        };
    }
}

/// Arena owning every transform in a scene
#[derive(Debug, Default, Clone)]
pub struct Transforms {
    nodes: SlotMap<TransformId, Transform>,
    clock: u64,
}

impl Transforms {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transform, returning its handle
    ///
    /// A parent set through [`Transform::with_parent`] is kept even if it is
    /// not (or no longer) in the arena; it is then treated as absent.
    pub fn insert(&mut self, mut transform: Transform) -> TransformId {
        transform.stamp = self.next_stamp();
        transform.recompute();
        self.nodes.insert(transform)
    }

    /// Remove a transform; its children become roots
    pub fn remove(&mut self, id: TransformId) -> Option<Transform> {
        let removed = self.nodes.remove(id)?;
        let stamp = self.next_stamp();
        for (_, node) in self.nodes.iter_mut().filter(|(_, n)| n.parent == Some(id)) {
            node.parent = None;
            node.stamp = stamp;
        }
        Some(removed)
    }

    /// Whether `id` refers to a live transform
    pub fn contains(&self, id: TransformId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Borrow a transform
    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.nodes.get(id)
    }

    /// Number of transforms
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set local position and recompute the local matrix
    pub fn set_position(&mut self, id: TransformId, position: Vec3) -> SceneResult<()> {
        self.mutate(id, |t| t.position = position)
    }

    /// Set local scale and recompute the local matrix
    pub fn set_scaling(&mut self, id: TransformId, scale: Vec3) -> SceneResult<()> {
        self.mutate(id, |t| t.scale = scale)
    }

    /// Set rotation from yaw (around +Y) and pitch (around +X) in degrees
    pub fn set_rotation(&mut self, id: TransformId, yaw_degrees: f32, pitch_degrees: f32) -> SceneResult<()> {
        self.mutate(id, |t| {
            t.yaw = yaw_degrees;
            t.pitch = pitch_degrees;
            t.rotation = utils::quat_from_yaw_pitch(yaw_degrees, pitch_degrees);
        })
    }

    /// Inject (or clear) a replacement matrix applied outside the local TRS
    pub fn set_replacement(&mut self, id: TransformId, replacement: Option<Mat4>) -> SceneResult<()> {
        self.mutate(id, |t| t.replacement = replacement)
    }

    /// Re-parent a transform (or detach it with `None`)
    ///
    /// The local matrix is unaffected; the transform is restamped so that
    /// anything depending on its global matrix observes the change.
    pub fn set_parent(&mut self, id: TransformId, parent: Option<TransformId>) -> SceneResult<()> {
        if !self.nodes.contains_key(id) {
            return Err(SceneError::UnknownTransform(id));
        }
        if let Some(parent_id) = parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(SceneError::UnknownTransform(parent_id));
            }
            if parent_id == id || self.ancestors(parent_id).any(|ancestor| ancestor == id) {
                return Err(SceneError::TransformCycle { child: id, parent: parent_id });
            }
        }
        let stamp = self.next_stamp();
        let node = &mut self.nodes[id];
        node.parent = parent;
        node.stamp = stamp;
        log::debug!("Transform {:?} re-parented to {:?}", id, parent);
        Ok(())
    }

    /// Direct children of a transform
    pub fn children(&self, id: TransformId) -> Vec<TransformId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent == Some(id))
            .map(|(child, _)| child)
            .collect()
    }

    /// Local model matrix
    pub fn local_matrix(&self, id: TransformId) -> SceneResult<Mat4> {
        self.node(id).map(|node| node.local_matrix)
    }

    /// Global model matrix: `parent.global × local`, or `local` for a root
    pub fn global_matrix(&self, id: TransformId) -> SceneResult<Mat4> {
        let node = self.node(id)?;
        let mut global = node.local_matrix;
        for ancestor in self.ancestors(id) {
            global = self.nodes[ancestor].local_matrix * global;
        }
        Ok(global)
    }

    /// Inverse-transpose of the global model matrix
    pub fn global_normal_matrix(&self, id: TransformId) -> SceneResult<Mat3> {
        self.global_matrix(id).map(|m| m.normal_matrix())
    }

    /// Revision of the transform's own local state
    pub fn local_revision(&self, id: TransformId) -> SceneResult<u64> {
        self.node(id).map(Transform::stamp)
    }

    /// Newest revision along the ancestor chain, including the transform itself
    pub fn global_revision(&self, id: TransformId) -> SceneResult<u64> {
        let own = self.node(id)?.stamp;
        Ok(self
            .ancestors(id)
            .map(|ancestor| self.nodes[ancestor].stamp)
            .fold(own, u64::max))
    }

    fn node(&self, id: TransformId) -> SceneResult<&Transform> {
        self.nodes.get(id).ok_or(SceneError::UnknownTransform(id))
    }

    fn mutate(&mut self, id: TransformId, apply: impl FnOnce(&mut Transform)) -> SceneResult<()> {
        let stamp = self.next_stamp();
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownTransform(id))?;
        apply(node);
        node.recompute();
        node.stamp = stamp;
        Ok(())
    }

    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Live ancestors of `id`, nearest first
    fn ancestors(&self, id: TransformId) -> impl Iterator<Item = TransformId> + '_ {
        let limit = self.nodes.len();
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let ancestor = current.filter(|a| self.nodes.contains_key(*a))?;
            current = self.nodes[ancestor].parent;
            Some(ancestor)
        })
        .take(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_root_global_equals_local() {
        let mut transforms = Transforms::new();
        let id = transforms.insert(Transform::from_parts(Vec3::new(1.0, 2.0, 3.0), Vec3::new(2.0, 2.0, 2.0), 30.0, 10.0));

        assert_relative_eq!(
            transforms.global_matrix(id).unwrap(),
            transforms.local_matrix(id).unwrap(),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_child_global_is_parent_global_times_local() {
        let mut transforms = Transforms::new();
        let grandparent = transforms.insert(Transform::from_parts(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 45.0, 0.0));
        let parent = transforms.insert(Transform::from_parts(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.5), 0.0, 20.0));
        let child = transforms.insert(Transform::identity().with_position(Vec3::new(0.0, 0.0, 4.0)));
        transforms.set_parent(parent, Some(grandparent)).unwrap();
        transforms.set_parent(child, Some(parent)).unwrap();

        let expected = transforms.global_matrix(parent).unwrap() * transforms.local_matrix(child).unwrap();
        assert_relative_eq!(transforms.global_matrix(child).unwrap(), expected, epsilon = EPSILON);
    }

    #[test]
    fn test_composition_order_rotation_innermost() {
        let mut transforms = Transforms::new();
        let id = transforms.insert(Transform::from_parts(Vec3::new(5.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0), 90.0, 0.0));

        // Rotate +Z onto +X, then scale X by 2, then translate
        let p = transforms.local_matrix(id).unwrap().transform_point3(&Vec3::z());
        assert_relative_eq!(p, Vec3::new(7.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_replacement_is_applied_outermost() {
        let mut transforms = Transforms::new();
        let id = transforms.insert(Transform::identity().with_scale(Vec3::new(2.0, 2.0, 2.0)));
        let replacement = Mat4::new_translation(&Vec3::new(0.0, 10.0, 0.0));
        transforms.set_replacement(id, Some(replacement)).unwrap();

        let p = transforms.local_matrix(id).unwrap().transform_point3(&Vec3::x());
        assert_relative_eq!(p, Vec3::new(2.0, 10.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_parent_change_bumps_child_global_revision_only() {
        let mut transforms = Transforms::new();
        let parent = transforms.insert(Transform::identity());
        let child = transforms.insert(Transform::identity());
        transforms.set_parent(child, Some(parent)).unwrap();

        let local_before = transforms.local_revision(child).unwrap();
        let global_before = transforms.global_revision(child).unwrap();
        let local_matrix_before = transforms.local_matrix(child).unwrap();

        transforms.set_position(parent, Vec3::new(1.0, 0.0, 0.0)).unwrap();

        assert_eq!(transforms.local_revision(child).unwrap(), local_before);
        assert_eq!(transforms.local_matrix(child).unwrap(), local_matrix_before);
        assert!(transforms.global_revision(child).unwrap() > global_before);
    }

    #[test]
    fn test_reparent_unsubscribes_from_old_parent() {
        let mut transforms = Transforms::new();
        let old_parent = transforms.insert(Transform::identity());
        let new_parent = transforms.insert(Transform::identity().with_position(Vec3::new(0.0, 3.0, 0.0)));
        let child = transforms.insert(Transform::identity());
        transforms.set_parent(child, Some(old_parent)).unwrap();
        transforms.set_parent(child, Some(new_parent)).unwrap();

        let revision = transforms.global_revision(child).unwrap();
        transforms.set_position(old_parent, Vec3::new(9.0, 9.0, 9.0)).unwrap();
        assert_eq!(transforms.global_revision(child).unwrap(), revision);

        let p = transforms.global_matrix(child).unwrap().transform_point3(&Vec3::zeros());
        assert_relative_eq!(p, Vec3::new(0.0, 3.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut transforms = Transforms::new();
        let a = transforms.insert(Transform::identity());
        let b = transforms.insert(Transform::identity());
        transforms.set_parent(b, Some(a)).unwrap();

        assert_eq!(
            transforms.set_parent(a, Some(b)),
            Err(SceneError::TransformCycle { child: a, parent: b })
        );
        assert!(matches!(transforms.set_parent(a, Some(a)), Err(SceneError::TransformCycle { .. })));
    }

    #[test]
    fn test_removed_parent_is_treated_as_absent() {
        let mut transforms = Transforms::new();
        let parent = transforms.insert(Transform::identity().with_position(Vec3::new(5.0, 0.0, 0.0)));
        let child = transforms.insert(Transform::identity().with_position(Vec3::new(1.0, 0.0, 0.0)));
        transforms.set_parent(child, Some(parent)).unwrap();
        transforms.remove(parent);

        assert_eq!(transforms.get(child).unwrap().parent(), None);
        assert_relative_eq!(
            transforms.global_matrix(child).unwrap(),
            transforms.local_matrix(child).unwrap(),
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_zero_scale_is_degenerate_not_an_error() {
        let mut transforms = Transforms::new();
        let id = transforms.insert(Transform::identity());
        transforms.set_scaling(id, Vec3::zeros()).unwrap();

        assert_eq!(transforms.get(id).unwrap().local_normal_matrix(), Mat3::zeros());
    }

    #[test]
    fn test_unknown_transform_fails_fast() {
        let mut transforms = Transforms::new();
        let id = transforms.insert(Transform::identity());
        transforms.remove(id);
        assert_eq!(transforms.set_position(id, Vec3::zeros()), Err(SceneError::UnknownTransform(id)));
    }

    #[test]
    fn test_yaw_pitch_readback() {
        let mut transforms = Transforms::new();
        let id = transforms.insert(Transform::identity());
        transforms.set_rotation(id, 35.0, -12.5).unwrap();
        assert_eq!(transforms.get(id).unwrap().yaw_pitch(), (35.0, -12.5));
    }
}
