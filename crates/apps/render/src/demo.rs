//! The built-in demonstration scene, rendered when no scene file is given.
//!
//! Exercises most of the primitive set: a checkered floor, diffuse / mirror
//! / glass spheres, a torus, a cone, and a Bezier patch, under one
//! directional and one attenuated positional light.

use geom::material::{CookTorranceMaterial, PhongMaterial};
use geom::texture::{AffineXformTexture, CheckerTexture, MultiFaceTexture, SequenceTexture};
use geom::viewable::{BezierSet, CONE_SIDE_FACE, Cone, Parallelogram, Sphere, Torus};
use geom::{Light, Material};
use glam::DVec3;
use scene::SceneDescription;
use std::sync::Arc;

fn phong(build: impl FnOnce(&mut PhongMaterial)) -> Arc<dyn Material> {
    let mut material = PhongMaterial::default();
    build(&mut material);
    Arc::new(material)
}

pub fn build_demo_scene() -> anyhow::Result<SceneDescription> {
    let mut scene = SceneDescription::new();
    scene.set_background(DVec3::new(0.1, 0.1, 0.25));
    scene.set_global_ambient(DVec3::splat(0.3));

    // Camera above and behind, looking down into the scene
    let camera = scene.camera_mut();
    camera.set_look_at(
        DVec3::new(0.0, 3.5, 10.0),
        DVec3::new(0.0, 0.5, 0.0),
        DVec3::Y,
    );
    camera.set_view_frustum(4.0 / 3.0, 40.0f64.to_radians());
    scene.register_camera_view();

    // Lights
    let mut sun = Light::default();
    sun.set_directional(DVec3::new(1.0, 2.0, 1.5));
    sun.set_color_ambient(DVec3::ZERO);
    scene.add_light(sun);

    let mut lamp = Light::default();
    lamp.set_position(DVec3::new(-4.0, 6.0, 3.0));
    lamp.set_color(DVec3::splat(0.9));
    lamp.set_attenuation(1.0, 0.05, 0.004);
    scene.add_light(lamp);

    // Checkered floor
    let white = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::splat(0.9));
        m.set_color_reflective(DVec3::ZERO);
    });
    let slate = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::new(0.2, 0.23, 0.3));
        m.set_color_reflective(DVec3::ZERO);
    });
    scene.add_material(white.clone());
    scene.add_material(slate.clone());
    let floor = Parallelogram::new(
        DVec3::new(-8.0, 0.0, 8.0),
        DVec3::new(8.0, 0.0, 8.0),
        DVec3::new(8.0, 0.0, -8.0),
        white.clone(),
    )?;
    let floor_id = scene.add_viewable(Box::new(floor))?;
    // A uv scale ahead of the checker tiles the floor with 8x8 squares
    let floor_scale: Arc<dyn geom::Texture> = Arc::new(AffineXformTexture::scaling(4.0, 4.0));
    let checker: Arc<dyn geom::Texture> = Arc::new(CheckerTexture::new(Some(slate), None));
    let floor_tex: Arc<dyn geom::Texture> = Arc::new(SequenceTexture::new(vec![
        Some(floor_scale),
        Some(checker),
    ]));
    scene.add_texture(floor_tex.clone());
    scene.set_viewable_texture(floor_id, Some(floor_tex))?;

    // Matte red sphere
    let red = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::new(0.85, 0.1, 0.1));
        m.set_color_specular(DVec3::splat(0.3));
        m.set_shininess(32.0);
        m.set_color_reflective(DVec3::ZERO);
    });
    scene.add_material(red.clone());
    scene.add_viewable(Box::new(Sphere::new(DVec3::new(-2.4, 1.0, 0.0), 1.0, red)?))?;

    // Mirror sphere
    let mirror = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::splat(0.05));
        m.set_color_specular(DVec3::splat(0.8));
        m.set_shininess(200.0);
        m.set_color_reflective(DVec3::splat(0.85));
    });
    scene.add_material(mirror.clone());
    scene.add_viewable(Box::new(Sphere::new(DVec3::new(0.0, 1.2, -1.5), 1.2, mirror)?))?;

    // Glass sphere
    let glass = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::splat(0.02));
        m.set_color_specular(DVec3::splat(0.6));
        m.set_shininess(120.0);
        m.set_color_reflective(DVec3::splat(0.1));
        m.set_color_transmissive(DVec3::splat(0.85));
        m.set_index_of_refraction(1.5);
    });
    scene.add_material(glass.clone());
    scene.add_viewable(Box::new(Sphere::new(DVec3::new(2.4, 1.0, 0.8), 1.0, glass)?))?;

    // Golden torus (Cook-Torrance)
    let mut gold = CookTorranceMaterial::default();
    gold.set_color_ambient(DVec3::new(0.2, 0.15, 0.05));
    gold.set_color_diffuse(DVec3::new(0.75, 0.6, 0.22));
    gold.set_color_specular(DVec3::splat(0.9));
    gold.set_roughness(0.25);
    gold.set_refraction_from_reflectance(DVec3::new(0.9, 0.75, 0.35));
    let gold: Arc<dyn Material> = Arc::new(gold);
    scene.add_material(gold.clone());
    let mut torus = Torus::new(DVec3::new(-0.5, 0.4, 2.5), 0.9, 0.32, gold)?;
    torus.set_axis(DVec3::new(0.2, 1.0, 0.1))?;
    scene.add_viewable(Box::new(torus))?;

    // Green cone
    let green = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::new(0.1, 0.6, 0.2));
        m.set_color_specular(DVec3::splat(0.4));
        m.set_shininess(64.0);
        m.set_color_reflective(DVec3::ZERO);
    });
    scene.add_material(green.clone());
    let mut cone = Cone::new(green);
    cone.set_apex(DVec3::new(3.8, 2.2, -2.0));
    cone.set_center_axis(DVec3::Y)?;
    cone.set_slope(0.45)?;
    cone.set_height(2.2)?;
    let cone_id = scene.add_viewable(Box::new(cone))?;
    // Banded side surface; the base face keeps the plain material
    let mut bands = CheckerTexture::new(Some(white.clone()), None);
    bands.set_widths(1.0, 0.2);
    let bands: Arc<dyn geom::Texture> = Arc::new(bands);
    let mut cone_faces = MultiFaceTexture::new(vec![None; 2]);
    cone_faces.set_texture(CONE_SIDE_FACE, Some(bands));
    let cone_tex: Arc<dyn geom::Texture> = Arc::new(cone_faces);
    scene.add_texture(cone_tex.clone());
    scene.set_viewable_texture(cone_id, Some(cone_tex))?;

    // A wavy Bezier patch standing behind the spheres
    let violet = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::new(0.5, 0.2, 0.7));
        m.set_color_specular(DVec3::splat(0.5));
        m.set_shininess(80.0);
        m.set_color_reflective(DVec3::ZERO);
    });
    scene.add_material(violet.clone());
    let mut patch_set = BezierSet::new(violet);
    let mut control_points = Vec::with_capacity(16);
    for j in 0..4 {
        for i in 0..4 {
            let x = -4.5 + i as f64;
            let y = j as f64;
            let z = -4.0 + 0.8 * ((i as f64 - 1.5) * (j as f64 - 1.5) / 2.25);
            control_points.push(DVec3::new(x, y, z));
        }
    }
    patch_set.add_patch(4, 4, &control_points)?;
    scene.add_viewable(Box::new(patch_set))?;

    Ok(scene)
}
