// Tracer crate - the recursive ray-tracing engine: primary rays, kd-tree
// intersection seeking, shadow feelers, and the parallel pixel loop

use geom::material::PhongMaterial;
use geom::visible_point::VisiblePoint;
use geom::{Light, Material, direct_illuminate_view_dir, direct_illuminate_view_pos};
use glam::DVec3;
use kdtree::TraverseAction;
use rayon::prelude::*;
use scene::{ObjId, PixelBuffer, SceneDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;
use vmath::util::same_sign_nonzero;

/// Offset applied to secondary rays so a surface does not shadow itself.
const ISECT_EPSILON: f64 = 1.0e-6;

/// Default recursion depth for reflection/transmission rays.
pub const DEFAULT_TRACE_DEPTH: u32 = 3;

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("the scene has no kd-tree; call build_kdtree before rendering")]
    KdTreeNotBuilt,
}

/// The ray tracer. Borrows an immutable, kd-tree-sealed scene; rendering is
/// embarrassingly parallel over pixels with no shared mutable state.
pub struct RayTracer<'a> {
    scene: &'a SceneDescription,
    max_depth: u32,
    default_material: Arc<dyn Material>,
}

impl<'a> RayTracer<'a> {
    pub fn new(scene: &'a SceneDescription) -> Result<Self, TracerError> {
        if scene.kdtree().is_none() {
            return Err(TracerError::KdTreeNotBuilt);
        }
        Ok(Self {
            scene,
            max_depth: DEFAULT_TRACE_DEPTH,
            default_material: Arc::new(PhongMaterial::default()),
        })
    }

    pub fn set_max_depth(&mut self, depth: u32) {
        self.max_depth = depth;
    }

    /// Render every pixel of the buffer, scan lines in parallel.
    pub fn render(&self, buffer: &mut PixelBuffer) {
        self.render_inner(buffer, None);
    }

    /// Render, polling `cancel` between scan lines.
    pub fn render_with_cancel(&self, buffer: &mut PixelBuffer, cancel: &AtomicBool) {
        self.render_inner(buffer, Some(cancel));
    }

    fn render_inner(&self, buffer: &mut PixelBuffer, cancel: Option<&AtomicBool>) {
        let width = buffer.width() as usize;
        let height = buffer.height();
        buffer
            .raw_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(j, row)| {
                if let Some(flag) = cancel {
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                }
                for (i, pixel) in row.iter_mut().enumerate() {
                    *pixel = self.trace_pixel(i as f64, j as f64);
                }
            });
        info!(width, height, depth = self.max_depth, "render complete");
    }

    /// Radiance through one pixel center.
    pub fn trace_pixel(&self, i: f64, j: f64) -> DVec3 {
        let camera = self.scene.camera();
        if camera.is_local_viewer() {
            let dir = camera.pixel_direction(i, j);
            self.ray_trace(self.max_depth, camera.position(), dir, None)
        } else {
            let pos = camera.view_position(i, j);
            self.ray_trace(self.max_depth, pos, camera.direction(), None)
        }
    }

    /// Recursive trace: local illumination plus reflection and transmission
    /// children, bounded by `depth`.
    pub fn ray_trace(&self, depth: u32, pos: DVec3, dir: DVec3, avoid: Option<ObjId>) -> DVec3 {
        let mut vis_point = VisiblePoint::new(self.default_material.clone());
        let Some((object, _distance)) = self.seek_intersection(pos, dir, avoid, &mut vis_point)
        else {
            return self.scene.background_color();
        };

        let mut color = self.direct_illumination(pos, &vis_point, Some(object));
        if depth > 1 {
            let material = vis_point.material();
            let normal = vis_point.normal();

            if material.is_reflective() {
                let reflect_dir = (dir - normal * (2.0 * dir.dot(normal))).normalize();
                let coefs = material.reflection_color(&vis_point, -dir, reflect_dir);
                let more =
                    self.ray_trace(depth - 1, vis_point.position(), reflect_dir, Some(object));
                color += coefs * more;
            }

            if material.is_transmissive() {
                if let Some(transmit_dir) = material.calc_refract_dir(normal, dir) {
                    let coefs = material.transmission_color(&vis_point, -dir, transmit_dir);
                    let more =
                        self.ray_trace(depth - 1, vis_point.position(), transmit_dir, Some(object));
                    color += coefs * more;
                }
            }
        }
        color
    }

    /// Nearest intersection along a ray via kd-tree traversal.
    ///
    /// When the traversal reaches the `avoid` object (the surface the ray
    /// leaves), that single test starts from an epsilon-offset position and
    /// the returned distance is adjusted back, so the selection of the true
    /// nearest hit against unrelated primitives stays correct.
    pub fn seek_intersection(
        &self,
        pos: DVec3,
        dir: DVec3,
        avoid: Option<ObjId>,
        vis_point: &mut VisiblePoint,
    ) -> Option<(ObjId, f64)> {
        let kdtree = self.scene.kdtree().expect("checked at construction");
        let pos_avoid = pos + dir * ISECT_EPSILON;

        let mut best: Option<(ObjId, f64)> = None;
        let mut best_dist = f64::MAX;
        let mut temp = VisiblePoint::new(self.default_material.clone());

        kdtree.traverse(pos, dir, None, |object_id| {
            let object = object_id as usize;
            let (test_pos, adjust) = if avoid == Some(object) {
                (pos_avoid, ISECT_EPSILON)
            } else {
                (pos, 0.0)
            };
            match self
                .scene
                .intersect_viewable(object, test_pos, dir, best_dist, &mut temp)
            {
                Some(distance) => {
                    let distance = distance + adjust;
                    best_dist = distance;
                    best = Some((object, distance));
                    vis_point.clone_from(&temp);
                    TraverseAction::Tighten(distance)
                }
                None => TraverseAction::Continue,
            }
        });
        best
    }

    /// Nearest intersection by brute force over every viewable, bypassing
    /// the kd-tree. Slow; kept for cross-checking the accelerated path.
    pub fn seek_intersection_linear(
        &self,
        pos: DVec3,
        dir: DVec3,
        avoid: Option<ObjId>,
        vis_point: &mut VisiblePoint,
    ) -> Option<(ObjId, f64)> {
        let pos_avoid = pos + dir * ISECT_EPSILON;
        let mut best: Option<(ObjId, f64)> = None;
        let mut best_dist = f64::MAX;
        let mut temp = VisiblePoint::new(self.default_material.clone());
        for object in 0..self.scene.num_viewables() {
            let (test_pos, adjust) = if avoid == Some(object) {
                (pos_avoid, ISECT_EPSILON)
            } else {
                (pos, 0.0)
            };
            if let Some(distance) =
                self.scene
                    .intersect_viewable(object, test_pos, dir, best_dist, &mut temp)
            {
                let distance = distance + adjust;
                best_dist = distance;
                best = Some((object, distance));
                vis_point.clone_from(&temp);
            }
        }
        best
    }

    /// True when the light reaches `pos` unobstructed.
    ///
    /// Positional lights cast the feeler from the light toward the surface;
    /// the surface's own object is not skipped (a concave object can shadow
    /// its own points), only epsilon-adjusted.
    pub fn shadow_feeler(&self, pos: DVec3, light: &Light, avoid: Option<ObjId>) -> bool {
        let kdtree = self.scene.kdtree().expect("checked at construction");
        let mut temp = VisiblePoint::new(self.default_material.clone());

        if light.is_positional() {
            let offset = pos - light.position();
            let dist = offset.length();
            if dist < 1.0e-7 {
                return true; // effectively at the light
            }
            let dir = offset / dist;
            let start = light.position();
            !kdtree.traverse(start, dir, Some(dist), |object_id| {
                match self
                    .scene
                    .intersect_viewable(object_id as usize, start, dir, dist, &mut temp)
                {
                    Some(hit) if hit + ISECT_EPSILON < dist => TraverseAction::Stop,
                    _ => TraverseAction::Continue,
                }
            })
        } else {
            // Directional: feel from the surface toward the light
            let dir = light.position();
            let start_avoid = pos + dir * ISECT_EPSILON;
            !kdtree.traverse(pos, dir, None, |object_id| {
                let object = object_id as usize;
                let test_pos = if avoid == Some(object) {
                    start_avoid
                } else {
                    pos
                };
                match self
                    .scene
                    .intersect_viewable(object, test_pos, dir, f64::MAX, &mut temp)
                {
                    Some(hit) if hit > ISECT_EPSILON => TraverseAction::Stop,
                    _ => TraverseAction::Continue,
                }
            })
        }
    }

    /// Ambient, emissive, and per-light local contributions at a hit.
    pub fn direct_illumination(
        &self,
        view_pos: DVec3,
        vis_point: &VisiblePoint,
        avoid: Option<ObjId>,
    ) -> DVec3 {
        let material = vis_point.material();
        let mut color =
            material.core().ambient * self.scene.global_ambient() + material.core().emissive;

        let check_sides = !material.is_transmissive();
        let view_dot = if check_sides {
            (view_pos - vis_point.position()).dot(vis_point.normal())
        } else {
            0.0
        };

        for light in self.scene.lights() {
            let mut clear_path = true;
            if check_sides {
                // Skip the feeler when light and viewer sit on opposite
                // sides of an opaque surface
                let to_light = if light.is_positional() {
                    light.position() - vis_point.position()
                } else {
                    light.position()
                };
                if !same_sign_nonzero(view_dot, to_light.dot(vis_point.normal())) {
                    clear_path = false;
                }
            }
            if clear_path {
                clear_path = self.shadow_feeler(vis_point.position(), light, avoid);
            }
            let percent_lit = if clear_path { DVec3::ONE } else { DVec3::ZERO };

            let contribution = if self.scene.camera().is_local_viewer() {
                direct_illuminate_view_pos(
                    vis_point.position(),
                    vis_point.normal(),
                    view_pos,
                    light,
                    material,
                    percent_lit,
                )
            } else {
                direct_illuminate_view_dir(
                    vis_point.position(),
                    vis_point.normal(),
                    -self.scene.camera().direction(),
                    light,
                    material,
                    percent_lit,
                )
            };
            color += contribution;
        }
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geom::viewable::Sphere;

    fn one_sphere_scene() -> SceneDescription {
        let mut scene = SceneDescription::new();
        let mut mat = PhongMaterial::default();
        mat.set_color_ambient_diffuse(DVec3::new(1.0, 0.0, 0.0));
        mat.set_color_reflective(DVec3::ZERO);
        let mat: Arc<dyn Material> = Arc::new(mat);
        scene.add_material(mat.clone());
        scene
            .add_viewable(Box::new(Sphere::new(DVec3::ZERO, 1.0, mat).unwrap()))
            .unwrap();
        let mut light = Light::default();
        light.set_directional(DVec3::Z);
        light.set_color_ambient(DVec3::ZERO);
        scene.add_light(light);
        scene.set_background(DVec3::new(0.0, 0.0, 0.25));
        scene.build_kdtree_default().unwrap();
        scene
    }

    #[test]
    fn requires_built_kdtree() {
        let scene = SceneDescription::new();
        assert!(matches!(
            RayTracer::new(&scene),
            Err(TracerError::KdTreeNotBuilt)
        ));
    }

    #[test]
    fn primary_ray_hits_sphere() {
        let scene = one_sphere_scene();
        let tracer = RayTracer::new(&scene).unwrap();
        let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
        let (object, dist) = tracer
            .seek_intersection(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, None, &mut vp)
            .unwrap();
        assert_eq!(object, 0);
        assert!((dist - 4.0).abs() < 1e-9);
    }

    #[test]
    fn miss_returns_background() {
        let scene = one_sphere_scene();
        let tracer = RayTracer::new(&scene).unwrap();
        let color = tracer.ray_trace(3, DVec3::new(0.0, 0.0, 5.0), DVec3::Z, None);
        assert_eq!(color, DVec3::new(0.0, 0.0, 0.25));
    }

    #[test]
    fn lit_side_brighter_than_shadow_side() {
        let scene = one_sphere_scene();
        let tracer = RayTracer::new(&scene).unwrap();
        // The light shines from +Z; the camera-facing point is lit
        let front = tracer.ray_trace(1, DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, None);
        let back = tracer.ray_trace(1, DVec3::new(0.0, 0.0, -5.0), DVec3::Z, None);
        assert!(front.x > back.x);
    }

    #[test]
    fn self_intersection_suppressed() {
        let scene = one_sphere_scene();
        let tracer = RayTracer::new(&scene).unwrap();
        let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
        // A ray leaving the sphere surface outward must not re-hit it
        let surface = DVec3::new(0.0, 0.0, 1.0);
        let hit = tracer.seek_intersection(surface, DVec3::Z, Some(0), &mut vp);
        assert!(hit.is_none());
    }

    #[test]
    fn shadow_feeler_detects_occluder() {
        let mut scene = SceneDescription::new();
        let mat: Arc<dyn Material> = Arc::new(PhongMaterial::default());
        // Blocker between the light and the shaded point
        scene
            .add_viewable(Box::new(
                Sphere::new(DVec3::new(0.0, 0.0, 2.0), 0.5, mat.clone()).unwrap(),
            ))
            .unwrap();
        let mut light = Light::default();
        light.set_position(DVec3::new(0.0, 0.0, 4.0));
        scene.add_light(light);
        scene.build_kdtree_default().unwrap();
        let tracer = RayTracer::new(&scene).unwrap();
        assert!(!tracer.shadow_feeler(DVec3::ZERO, &scene.lights()[0], None));
        // A point beside the blocker is lit
        assert!(tracer.shadow_feeler(DVec3::new(3.0, 0.0, 0.0), &scene.lights()[0], None));
    }
}
