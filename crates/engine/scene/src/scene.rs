//! The scene registry: materials, lights, textures, viewables, camera, and
//! the kd-tree over the viewables.

use crate::camera::CameraView;
use geom::texture::Texture;
use geom::viewable::Viewable;
use geom::visible_point::VisiblePoint;
use geom::{Light, Material};
use glam::DVec3;
use kdtree::{KdBuildError, KdTree, KdTreeBuilder, SplitAlgorithm};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use vmath::Aabb;

/// Index of a registered material.
pub type MatId = usize;
/// Index of a registered viewable.
pub type ObjId = usize;
/// Index of a registered texture.
pub type TexId = usize;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("the kd-tree is already built; no more viewables can be added")]
    SceneSealed,

    #[error("build_kdtree may be called exactly once")]
    KdTreeAlreadyBuilt,

    #[error("kd-tree construction failed: {0}")]
    KdBuild(#[from] KdBuildError),

    #[error("unknown id {0}")]
    UnknownId(usize),
}

struct ViewableRecord {
    shape: Box<dyn Viewable>,
    texture_front: Option<Arc<dyn Texture>>,
    texture_back: Option<Arc<dyn Texture>>,
}

/// An immutable-after-build scene shared by all render workers.
pub struct SceneDescription {
    background_color: DVec3,
    global_ambient: DVec3,
    camera: CameraView,
    lights: Vec<Light>,
    materials: Vec<Arc<dyn Material>>,
    textures: Vec<Arc<dyn Texture>>,
    viewables: Vec<ViewableRecord>,
    kdtree: Option<KdTree>,
    registered_screen: Option<(f64, f64)>,
}

impl Default for SceneDescription {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneDescription {
    pub fn new() -> Self {
        Self {
            background_color: DVec3::ZERO,
            global_ambient: DVec3::ZERO,
            camera: CameraView::default(),
            lights: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            viewables: Vec::new(),
            kdtree: None,
            registered_screen: None,
        }
    }

    // ------------------------------------------------------------------
    // Global attributes
    // ------------------------------------------------------------------

    pub fn set_background(&mut self, color: DVec3) {
        self.background_color = color;
    }

    pub fn background_color(&self) -> DVec3 {
        self.background_color
    }

    pub fn set_global_ambient(&mut self, color: DVec3) {
        self.global_ambient = color;
    }

    pub fn global_ambient(&self) -> DVec3 {
        self.global_ambient
    }

    pub fn camera(&self) -> &CameraView {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraView {
        &mut self.camera
    }

    /// Remember the current screen dimensions as the reference view for
    /// aspect-ratio changes.
    pub fn register_camera_view(&mut self) {
        self.registered_screen = Some((self.camera.screen_width(), self.camera.screen_height()));
    }

    /// Resize the camera screen for a new aspect ratio without shrinking
    /// the registered view.
    pub fn calc_new_screen_dims(&mut self, aspect_ratio: f64) {
        let Some((reg_width, reg_height)) = self.registered_screen else {
            return;
        };
        let registered_aspect = reg_width / reg_height;
        if aspect_ratio >= registered_aspect {
            self.camera
                .set_screen_dimensions(reg_height * aspect_ratio, reg_height);
        } else {
            self.camera
                .set_screen_dimensions(reg_width, reg_width / aspect_ratio);
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub fn add_material(&mut self, material: Arc<dyn Material>) -> MatId {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn material(&self, id: MatId) -> Arc<dyn Material> {
        self.materials[id].clone()
    }

    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add_texture(&mut self, texture: Arc<dyn Texture>) -> TexId {
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn texture(&self, id: TexId) -> Arc<dyn Texture> {
        self.textures[id].clone()
    }

    /// Register a viewable. Fails once the kd-tree has been built.
    pub fn add_viewable(&mut self, shape: Box<dyn Viewable>) -> Result<ObjId, SceneError> {
        if self.kdtree.is_some() {
            return Err(SceneError::SceneSealed);
        }
        self.viewables.push(ViewableRecord {
            shape,
            texture_front: None,
            texture_back: None,
        });
        Ok(self.viewables.len() - 1)
    }

    /// Attach textures to both sides of a viewable.
    pub fn set_viewable_texture(
        &mut self,
        object: ObjId,
        texture: Option<Arc<dyn Texture>>,
    ) -> Result<(), SceneError> {
        let record = self
            .viewables
            .get_mut(object)
            .ok_or(SceneError::UnknownId(object))?;
        record.texture_front = texture.clone();
        record.texture_back = texture;
        Ok(())
    }

    pub fn set_viewable_texture_front(
        &mut self,
        object: ObjId,
        texture: Option<Arc<dyn Texture>>,
    ) -> Result<(), SceneError> {
        self.viewables
            .get_mut(object)
            .ok_or(SceneError::UnknownId(object))?
            .texture_front = texture;
        Ok(())
    }

    pub fn set_viewable_texture_back(
        &mut self,
        object: ObjId,
        texture: Option<Arc<dyn Texture>>,
    ) -> Result<(), SceneError> {
        self.viewables
            .get_mut(object)
            .ok_or(SceneError::UnknownId(object))?
            .texture_back = texture;
        Ok(())
    }

    pub fn num_viewables(&self) -> usize {
        self.viewables.len()
    }

    pub fn viewable(&self, id: ObjId) -> &dyn Viewable {
        self.viewables[id].shape.as_ref()
    }

    // ------------------------------------------------------------------
    // Kd-tree
    // ------------------------------------------------------------------

    /// Build the kd-tree over all registered viewables. Must be called
    /// exactly once, after which the viewable list is sealed.
    pub fn build_kdtree(&mut self, builder: &KdTreeBuilder) -> Result<(), SceneError> {
        if self.kdtree.is_some() {
            return Err(SceneError::KdTreeAlreadyBuilt);
        }
        let viewables = &self.viewables;
        let extent = |i: usize| viewables[i].shape.calc_aabb();
        let extent_in_box =
            |i: usize, bounds: &Aabb| viewables[i].shape.calc_extents_in_box(bounds);
        let extent_in_box: &kdtree::ExtentInBoxFn<'_> = &extent_in_box;
        let tree = builder.build(viewables.len(), &extent, Some(extent_in_box))?;
        let (leaves, object_refs) = tree.leaf_stats();
        info!(
            objects = viewables.len(),
            nodes = tree.num_nodes(),
            leaves,
            object_refs,
            "scene kd-tree built"
        );
        self.kdtree = Some(tree);
        Ok(())
    }

    /// Build with the tracer's default parameters (double-recursion split,
    /// object cost 8).
    pub fn build_kdtree_default(&mut self) -> Result<(), SceneError> {
        let mut builder = KdTreeBuilder::new();
        builder
            .set_split_algorithm(SplitAlgorithm::DoubleRecurseModifiedCoefs)
            .set_object_cost(kdtree::ObjectCost::Constant(8.0));
        self.build_kdtree(&builder)
    }

    pub fn kdtree(&self) -> Option<&KdTree> {
        self.kdtree.as_ref()
    }

    // ------------------------------------------------------------------
    // Intersection dispatch
    // ------------------------------------------------------------------

    /// Intersect one viewable and, on a hit, stamp the object id and apply
    /// the side's texture.
    pub fn intersect_viewable(
        &self,
        object: ObjId,
        view_pos: DVec3,
        view_dir: DVec3,
        max_dist: f64,
        vis_point: &mut VisiblePoint,
    ) -> Option<f64> {
        let record = &self.viewables[object];
        let distance = record
            .shape
            .find_intersection(view_pos, view_dir, max_dist, vis_point)?;
        vis_point.set_object_id(object);
        let texture = if vis_point.is_front_facing() {
            &record.texture_front
        } else {
            &record.texture_back
        };
        if let Some(texture) = texture {
            texture.apply(vis_point, view_dir, record.shape.as_ref());
        }
        Some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom::material::PhongMaterial;
    use geom::viewable::Sphere;

    fn sphere_at(x: f64) -> Box<dyn Viewable> {
        Box::new(
            Sphere::new(
                DVec3::new(x, 0.0, 0.0),
                0.5,
                Arc::new(PhongMaterial::default()),
            )
            .unwrap(),
        )
    }

    #[test]
    fn viewables_sealed_after_build() {
        let mut scene = SceneDescription::new();
        scene.add_viewable(sphere_at(0.0)).unwrap();
        scene.build_kdtree_default().unwrap();
        assert!(matches!(
            scene.add_viewable(sphere_at(2.0)),
            Err(SceneError::SceneSealed)
        ));
    }

    #[test]
    fn kdtree_build_is_once_only() {
        let mut scene = SceneDescription::new();
        scene.add_viewable(sphere_at(0.0)).unwrap();
        scene.build_kdtree_default().unwrap();
        assert!(matches!(
            scene.build_kdtree_default(),
            Err(SceneError::KdTreeAlreadyBuilt)
        ));
    }

    #[test]
    fn intersect_stamps_object_id() {
        let mut scene = SceneDescription::new();
        let id = scene.add_viewable(sphere_at(0.0)).unwrap();
        let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
        let hit = scene.intersect_viewable(
            id,
            DVec3::new(0.0, 0.0, 5.0),
            -DVec3::Z,
            f64::MAX,
            &mut vp,
        );
        assert!(hit.is_some());
        assert_eq!(vp.object_id(), id);
    }

    #[test]
    fn screen_dims_follow_aspect() {
        let mut scene = SceneDescription::new();
        scene.camera_mut().set_screen_dimensions(2.0, 2.0);
        scene.register_camera_view();
        scene.calc_new_screen_dims(2.0);
        assert!((scene.camera().screen_width() - 4.0).abs() < 1e-12);
        assert!((scene.camera().screen_height() - 2.0).abs() < 1e-12);
        scene.calc_new_screen_dims(0.5);
        assert!((scene.camera().screen_width() - 2.0).abs() < 1e-12);
        assert!((scene.camera().screen_height() - 4.0).abs() < 1e-12);
    }
}
