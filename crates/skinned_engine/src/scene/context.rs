//! The scene context
//!
//! Owns the transform arena, every object and the lights. There is no
//! global state: the engine passes a `Scene` explicitly to update and render
//! calls.

use crate::foundation::math::{Mat4Ext, Vec3};
use crate::scene::description::{ObjectDesc, SceneDesc};
use crate::scene::{
    Aabb, LightId, Lights, PointLight, SceneError, SceneObject, SceneResult, Transforms, UpdateStats,
};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a scene object
    pub struct ObjectId;
}

/// Nearest ray hit returned by [`Scene::pick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Object hit
    pub object: ObjectId,
    /// Mesh index within the object
    pub mesh: usize,
    /// Distance along the ray (in units of the direction's length)
    pub distance: f32,
}

/// Explicit scene context
#[derive(Debug, Default)]
pub struct Scene {
    transforms: Transforms,
    objects: SlotMap<ObjectId, SceneObject>,
    order: Vec<ObjectId>,
    lights: Lights,
    selected: Option<ObjectId>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from a description
    pub fn from_desc(desc: &SceneDesc) -> SceneResult<Self> {
        let mut scene = Self::new();
        if let Some(direction) = desc.sun_direction {
            scene.lights.directional_mut().set_direction(Vec3::from(direction));
        }
        for object in &desc.objects {
            scene.add_object(object)?;
        }
        log::info!("Scene loaded with {} objects", scene.order.len());
        Ok(scene)
    }

    /// Add an object (and the point light it carries)
    pub fn add_object(&mut self, desc: &ObjectDesc) -> SceneResult<ObjectId> {
        let mut object = SceneObject::new(desc, &mut self.transforms)?;
        if let Some(light) = &desc.light {
            object.set_light(Some(self.lights.insert_point(PointLight::from_desc(light))));
        }
        let id = self.objects.insert(object);
        self.order.push(id);
        Ok(id)
    }

    /// Duplicate an object, including its light, under the name "<name> copy"
    pub fn duplicate_object(&mut self, id: ObjectId) -> SceneResult<ObjectId> {
        let source = self.objects.get(id).ok_or(SceneError::UnknownObject(id))?;
        let mut copy = source.duplicate(&mut self.transforms, format!("{} copy", source.name()))?;
        if let Some(light) = source.light().and_then(|light| self.lights.point(light)).cloned() {
            copy.set_light(Some(self.lights.insert_point(light)));
        }
        log::debug!("Object '{}' duplicated", source.name());

        let copy_id = self.objects.insert(copy);
        self.order.push(copy_id);
        Ok(copy_id)
    }

    /// Remove an object with its transforms and light
    pub fn remove_object(&mut self, id: ObjectId) -> SceneResult<SceneObject> {
        let object = self.objects.remove(id).ok_or(SceneError::UnknownObject(id))?;
        let owned: Vec<_> = object.transform_ids().collect();
        for transform in owned.into_iter().rev() {
            self.transforms.remove(transform);
        }
        if let Some(light) = object.light() {
            self.lights.remove_point(light);
        }
        self.order.retain(|&other| other != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        log::debug!("Object '{}' removed", object.name());
        Ok(object)
    }

    /// Borrow an object
    pub fn object(&self, id: ObjectId) -> SceneResult<&SceneObject> {
        self.objects.get(id).ok_or(SceneError::UnknownObject(id))
    }

    /// Mutably borrow an object
    pub fn object_mut(&mut self, id: ObjectId) -> SceneResult<&mut SceneObject> {
        self.objects.get_mut(id).ok_or(SceneError::UnknownObject(id))
    }

    /// Objects in insertion order
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.order.iter().filter_map(|&id| self.objects.get(id).map(|object| (id, object)))
    }

    /// Number of objects
    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    /// Transform arena
    pub fn transforms(&self) -> &Transforms {
        &self.transforms
    }

    /// Mutable transform arena, for position/scale/rotation edits
    pub fn transforms_mut(&mut self) -> &mut Transforms {
        &mut self.transforms
    }

    /// Lights
    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    /// Mutable lights
    pub fn lights_mut(&mut self) -> &mut Lights {
        &mut self.lights
    }

    /// Object currently selected in the UI
    pub fn selected(&self) -> Option<ObjectId> {
        self.selected
    }

    /// Change the selection
    pub fn select(&mut self, id: Option<ObjectId>) -> SceneResult<()> {
        if let Some(id) = id {
            if !self.objects.contains_key(id) {
                return Err(SceneError::UnknownObject(id));
            }
        }
        self.selected = id;
        Ok(())
    }

    /// Light carried by an object, if any
    pub fn object_light(&self, id: ObjectId) -> SceneResult<Option<LightId>> {
        self.object(id).map(SceneObject::light)
    }

    /// Per-frame update: animations, bones, skins, bounds, then light positions
    pub fn update(&mut self, now: f64) -> SceneResult<UpdateStats> {
        let mut stats = UpdateStats::default();
        for &id in &self.order {
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            object.update(&mut self.transforms, now, &mut stats)?;

            if let Some(light) = object.light() {
                let position = self.transforms.global_matrix(object.transform())?.transform_point3(&Vec3::zeros());
                self.lights.set_point_position(light, position)?;
            }
        }
        log::trace!("Scene update: {stats:?}");
        Ok(stats)
    }

    /// World-space bounds of an object as of the last update
    pub fn world_bounds(&self, id: ObjectId) -> SceneResult<Option<Aabb>> {
        self.object(id).map(SceneObject::world_bounds)
    }

    /// Nearest visible mesh whose world bounds the ray enters
    pub fn pick(&self, origin: Vec3, direction: Vec3) -> Option<PickHit> {
        self.objects()
            .flat_map(|(object_id, object)| {
                object.meshes().iter().enumerate().filter_map(move |(mesh_index, mesh)| {
                    if !mesh.is_visible() {
                        return None;
                    }
                    let distance = mesh.world_bounds()?.intersect_ray(origin, direction)?;
                    Some(PickHit { object: object_id, mesh: mesh_index, distance })
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::description::{LightDesc, MeshDesc, PrimitiveDesc};
    use approx::assert_relative_eq;

    fn cube(name: &str, position: [f32; 3]) -> ObjectDesc {
        ObjectDesc {
            name: name.into(),
            position,
            meshes: vec![MeshDesc {
                primitives: vec![PrimitiveDesc {
                    positions: vec![[-0.5, -0.5, -0.5], [0.5, 0.5, 0.5]],
                    ..PrimitiveDesc::default()
                }],
                ..MeshDesc::default()
            }],
            ..ObjectDesc::default()
        }
    }

    #[test]
    fn test_pick_returns_nearest() {
        let mut scene = Scene::new();
        let near = scene.add_object(&cube("near", [0.0, 0.0, -3.0])).unwrap();
        scene.add_object(&cube("far", [0.0, 0.0, -10.0])).unwrap();
        scene.update(0.0).unwrap();

        let hit = scene.pick(Vec3::zeros(), -Vec3::z()).unwrap();
        assert_eq!(hit.object, near);
        assert_relative_eq!(hit.distance, 2.5, epsilon = 1e-5);
        assert!(scene.pick(Vec3::zeros(), Vec3::z()).is_none());
    }

    #[test]
    fn test_world_bounds_follow_object_transform() {
        let mut scene = Scene::new();
        let id = scene.add_object(&cube("box", [0.0, 0.0, 0.0])).unwrap();
        scene.update(0.0).unwrap();
        let transform = scene.object(id).unwrap().transform();
        scene.transforms_mut().set_position(transform, Vec3::new(4.0, 0.0, 0.0)).unwrap();

        let stats = scene.update(0.0).unwrap();
        assert_eq!(stats.world_aabb_refits, 1);
        let bounds = scene.world_bounds(id).unwrap().unwrap();
        assert_relative_eq!(bounds.center(), Vec3::new(4.0, 0.0, 0.0), epsilon = 1e-6);

        let stats = scene.update(0.0).unwrap();
        assert_eq!(stats.world_aabb_refits, 0);
    }

    #[test]
    fn test_light_follows_object() {
        let mut desc = cube("lamp", [1.0, 2.0, 3.0]);
        desc.light = Some(LightDesc::default());
        let mut scene = Scene::new();
        let id = scene.add_object(&desc).unwrap();
        scene.update(0.0).unwrap();

        let light = scene.object_light(id).unwrap().unwrap();
        assert_relative_eq!(scene.lights().point(light).unwrap().position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_duplicate_and_remove() {
        let mut desc = cube("lamp", [0.0, 0.0, 0.0]);
        desc.light = Some(LightDesc::default());
        let mut scene = Scene::new();
        let id = scene.add_object(&desc).unwrap();
        let copy = scene.duplicate_object(id).unwrap();
        assert_eq!(scene.object(copy).unwrap().name(), "lamp copy");
        assert_eq!(scene.lights().point_count(), 2);
        assert_eq!(scene.transforms().len(), 4);

        scene.select(Some(copy)).unwrap();
        scene.remove_object(copy).unwrap();
        assert_eq!(scene.selected(), None);
        assert_eq!(scene.lights().point_count(), 1);
        assert_eq!(scene.transforms().len(), 2);
        assert_eq!(scene.object(copy).unwrap_err(), SceneError::UnknownObject(copy));
        assert_eq!(scene.objects().map(|(id, _)| id).collect::<Vec<_>>(), vec![id]);
    }
}
