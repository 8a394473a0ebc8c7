//! Scene objects: meshes, skeleton, skins and animations under one transform

use crate::animation::BoneAnimation;
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::description::ObjectDesc;
use crate::scene::{
    Aabb, LightId, Mesh, SceneError, SceneResult, Skeleton, Skin, Transform, TransformId, Transforms,
};

/// Counters filled by the per-frame update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Objects visited
    pub objects: usize,
    /// Skeleton forward-kinematics walks
    pub fk_passes: usize,
    /// Skins whose matrices were recomputed
    pub skin_recomputes: usize,
    /// Local bounding boxes rebuilt
    pub aabb_rebuilds: usize,
    /// World bounding boxes re-fitted
    pub world_aabb_refits: usize,
}

/// Everything loaded from one [`ObjectDesc`]
///
/// Each mesh owns a transform parented to the object's transform. Skins and
/// animations index into the object's skeleton.
#[derive(Debug)]
pub struct SceneObject {
    name: String,
    name_revision: u64,
    transform: TransformId,
    meshes: Vec<Mesh>,
    skeleton: Option<Skeleton>,
    skins: Vec<Skin>,
    animations: Vec<BoneAnimation>,
    current_animation: Option<usize>,
    attached_revision: Option<u64>,
    light: Option<LightId>,
}

impl SceneObject {
    /// Validate a description and register its transforms
    ///
    /// On error no transform is left behind in `transforms`.
    pub fn new(desc: &ObjectDesc, transforms: &mut Transforms) -> SceneResult<Self> {
        let skeleton = if desc.nodes.is_empty() {
            None
        } else {
            Some(Skeleton::from_nodes(&desc.nodes)?)
        };
        let bone_count = skeleton.as_ref().map_or(0, Skeleton::len);

        let skins = desc
            .skins
            .iter()
            .map(|skin| Skin::new(skin, bone_count))
            .collect::<SceneResult<Vec<_>>>()?;
        let animations = desc
            .animations
            .iter()
            .map(|animation| BoneAnimation::new(animation, bone_count).map_err(SceneError::from))
            .collect::<SceneResult<Vec<_>>>()?;

        if let Some(skeleton) = &skeleton {
            if let Some((mesh, _)) = skeleton.mesh_attachments().find(|&(mesh, _)| mesh >= desc.meshes.len()) {
                return Err(SceneError::MeshOutOfRange { index: mesh, count: desc.meshes.len() });
            }
        }

        // Skinning matrices are relative to one mesh's local frame
        let mut skin_owners: Vec<Option<usize>> = vec![None; skins.len()];
        for (mesh_index, mesh_desc) in desc.meshes.iter().enumerate() {
            let Some(owner) = mesh_desc.skin.and_then(|index| skin_owners.get_mut(index)) else {
                continue;
            };
            if let Some(first) = *owner {
                let skin = mesh_desc.skin.and_then(|index| skins.get(index)).map_or("", Skin::name);
                return Err(SceneError::InvalidSkin {
                    skin: skin.to_string(),
                    reason: format!("bound to both mesh {first} and mesh {mesh_index}"),
                });
            }
            *owner = Some(mesh_index);
        }

        let transform = transforms.insert(Transform::from_parts(
            Vec3::from(desc.position),
            Vec3::from(desc.scale),
            desc.yaw,
            desc.pitch,
        ));

        let meshes = desc
            .meshes
            .iter()
            .map(|mesh_desc| {
                let skin_joints = match mesh_desc.skin {
                    Some(index) => Some(
                        skins
                            .get(index)
                            .map(Skin::joint_count)
                            .ok_or(SceneError::SkinOutOfRange { index, count: skins.len() })?,
                    ),
                    None => None,
                };
                let mesh_transform = transforms.insert(
                    Transform::identity()
                        .with_position(Vec3::from(mesh_desc.position))
                        .with_scale(Vec3::from(mesh_desc.scale))
                        .with_parent(transform),
                );
                Mesh::new(mesh_desc, mesh_transform, skin_joints).map_err(|error| {
                    transforms.remove(mesh_transform);
                    error
                })
            })
            .collect::<SceneResult<Vec<_>>>();

        let meshes = match meshes {
            Ok(meshes) => meshes,
            Err(error) => {
                for child in transforms.children(transform) {
                    transforms.remove(child);
                }
                transforms.remove(transform);
                return Err(error);
            }
        };

        log::debug!(
            "Object '{}' created: {} meshes, {} bones, {} skins, {} animations",
            desc.name,
            meshes.len(),
            bone_count,
            skins.len(),
            animations.len()
        );

        Ok(Self {
            name: desc.name.clone(),
            name_revision: 0,
            transform,
            meshes,
            skeleton,
            skins,
            animations,
            current_animation: None,
            attached_revision: None,
            light: None,
        })
    }

    /// Deep copy with fresh transforms
    ///
    /// The copy's skeleton, skins and animations are independent of the
    /// original. Playback state is copied. Lights are attached by the scene.
    pub fn duplicate(&self, transforms: &mut Transforms, name: String) -> SceneResult<Self> {
        let root = transforms
            .get(self.transform)
            .cloned()
            .ok_or(SceneError::UnknownTransform(self.transform))?;
        let transform = transforms.insert(root);

        let mut meshes = self.meshes.clone();
        for mesh in &mut meshes {
            let copy = transforms
                .get(mesh.transform())
                .cloned()
                .ok_or(SceneError::UnknownTransform(mesh.transform()))?;
            let id = transforms.insert(copy);
            transforms.set_parent(id, Some(transform))?;
            mesh.set_transform(id);
            mesh.invalidate_bounds();
        }

        let mut animations = self.animations.clone();
        let rearm = self.current_animation.filter(|_| self.skeleton.is_some());
        if let Some(animation) = rearm.and_then(|index| animations.get_mut(index)) {
            reset_pose_on_stop(animation);
        }

        Ok(Self {
            name,
            name_revision: 0,
            transform,
            meshes,
            skeleton: self.skeleton.clone(),
            skins: self.skins.clone(),
            animations,
            current_animation: self.current_animation,
            attached_revision: None,
            light: None,
        })
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bumped on every effective rename
    pub fn name_revision(&self) -> u64 {
        self.name_revision
    }

    /// Rename the object; returns whether the name changed
    pub fn rename(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name == self.name {
            return false;
        }
        log::debug!("Object '{}' renamed to '{}'", self.name, name);
        self.name = name;
        self.name_revision += 1;
        true
    }

    /// Root transform
    pub fn transform(&self) -> TransformId {
        self.transform
    }

    /// Meshes
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Mutable access to one mesh
    pub fn mesh_mut(&mut self, index: usize) -> SceneResult<&mut Mesh> {
        let count = self.meshes.len();
        self.meshes.get_mut(index).ok_or(SceneError::MeshOutOfRange { index, count })
    }

    /// Skeleton, if the object is rigged
    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    /// Mutable skeleton access for manual posing
    pub fn skeleton_mut(&mut self) -> Option<&mut Skeleton> {
        self.skeleton.as_mut()
    }

    /// Skins
    pub fn skins(&self) -> &[Skin] {
        &self.skins
    }

    /// Animation clips
    pub fn animations(&self) -> &[BoneAnimation] {
        &self.animations
    }

    /// Index of the clip selected for playback
    pub fn current_animation(&self) -> Option<usize> {
        self.current_animation
    }

    /// Point light carried by this object
    pub fn light(&self) -> Option<LightId> {
        self.light
    }

    pub(crate) fn set_light(&mut self, light: Option<LightId>) {
        self.light = light;
    }

    /// Select and start a clip, stopping the previous one
    ///
    /// Stopping a clip restores the skeleton's rest pose.
    pub fn play_animation(&mut self, index: usize, now: f64) -> SceneResult<()> {
        if index >= self.animations.len() {
            return Err(SceneError::AnimationOutOfRange { index, count: self.animations.len() });
        }
        self.stop_animation();

        let animation = &mut self.animations[index];
        if self.skeleton.is_some() {
            reset_pose_on_stop(animation);
        }
        animation.start(now);
        self.current_animation = Some(index);
        Ok(())
    }

    /// Select and start a clip by name
    pub fn play_animation_named(&mut self, name: &str, now: f64) -> SceneResult<()> {
        let index = self
            .animations
            .iter()
            .position(|animation| animation.name() == name)
            .ok_or(SceneError::AnimationOutOfRange { index: self.animations.len(), count: self.animations.len() })?;
        self.play_animation(index, now)
    }

    /// Stop the current clip, if any
    pub fn stop_animation(&mut self) {
        let Some(index) = self.current_animation.take() else {
            return;
        };
        let Some(animation) = self.animations.get_mut(index) else {
            return;
        };
        match self.skeleton.as_mut() {
            Some(skeleton) => animation.stop(skeleton),
            None => animation.cancel(),
        }
    }

    /// Animation, then bones, then skins, then bounds
    pub fn update(&mut self, transforms: &mut Transforms, now: f64, stats: &mut UpdateStats) -> SceneResult<()> {
        stats.objects += 1;

        if let Some(skeleton) = self.skeleton.as_mut() {
            if let Some(animation) = self.current_animation.and_then(|index| self.animations.get(index)) {
                animation.update(skeleton, now)?;
            }

            if skeleton.update() {
                stats.fk_passes += 1;
            }
            if self.attached_revision != Some(skeleton.revision()) {
                let attachments: Vec<(usize, Mat4)> = skeleton.mesh_attachments().collect();
                for (mesh, world) in attachments {
                    transforms.set_replacement(self.meshes[mesh].transform(), Some(world))?;
                }
                self.attached_revision = Some(skeleton.revision());
            }

            for mesh in &mut self.meshes {
                let Some(skin) = mesh.skin().and_then(|index| self.skins.get_mut(index)) else {
                    continue;
                };
                let local = transforms.local_matrix(mesh.transform())?;
                let revision = transforms.local_revision(mesh.transform())?;
                if skin.update(skeleton, &local, revision)? {
                    stats.skin_recomputes += 1;
                    mesh.invalidate_bounds();
                }
            }
        }

        for mesh in &mut self.meshes {
            let skin = mesh.skin().and_then(|index| self.skins.get(index));
            if mesh.rebuild_bounds(skin) {
                stats.aabb_rebuilds += 1;
            }
            let global = transforms.global_matrix(mesh.transform())?;
            let revision = transforms.global_revision(mesh.transform())?;
            if mesh.refresh_world_bounds(&global, revision) {
                stats.world_aabb_refits += 1;
            }
        }
        Ok(())
    }

    /// Union of the meshes' world bounds
    pub fn world_bounds(&self) -> Option<Aabb> {
        self.meshes
            .iter()
            .filter_map(Mesh::world_bounds)
            .copied()
            .reduce(|a, b| a.union(&b))
    }

    /// Every transform owned by the object (root first)
    pub fn transform_ids(&self) -> impl Iterator<Item = TransformId> + '_ {
        std::iter::once(self.transform).chain(self.meshes.iter().map(Mesh::transform))
    }
}

fn reset_pose_on_stop(animation: &mut BoneAnimation) {
    animation.on_stop(Box::new(|skeleton: &mut Skeleton| skeleton.reset_to_rest_pose()));
}
