//! End-to-end shading scenarios over small hand-built scenes.

use geom::material::PhongMaterial;
use geom::viewable::{Parallelogram, Sphere, Triangle};
use geom::visible_point::VisiblePoint;
use geom::{Light, Material};
use glam::DVec3;
use scene::SceneDescription;
use std::sync::Arc;
use tracer::RayTracer;

fn phong(build: impl FnOnce(&mut PhongMaterial)) -> Arc<dyn Material> {
    let mut material = PhongMaterial::default();
    build(&mut material);
    Arc::new(material)
}

fn matte(color: DVec3, ambient: DVec3) -> Arc<dyn Material> {
    phong(|m| {
        m.set_color_diffuse(color);
        m.set_color_ambient(ambient);
        m.set_color_specular(DVec3::ZERO);
        m.set_color_reflective(DVec3::ZERO);
        m.set_color_emissive(DVec3::ZERO);
    })
}

/// Single red diffuse sphere under a white directional light: the camera
/// facing point receives full diffuse plus ambient.
#[test]
fn red_sphere_head_on() {
    let mut scene = SceneDescription::new();
    let red = matte(DVec3::new(1.0, 0.0, 0.0), DVec3::new(0.1, 0.0, 0.0));
    scene.add_material(red.clone());
    scene
        .add_viewable(Box::new(Sphere::new(DVec3::ZERO, 1.0, red).unwrap()))
        .unwrap();
    let mut light = Light::default();
    light.set_directional(DVec3::Z);
    scene.add_light(light);
    scene.build_kdtree_default().unwrap();

    let tracer = RayTracer::new(&scene).unwrap();
    let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
    let (_, dist) = tracer
        .seek_intersection(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, None, &mut vp)
        .unwrap();
    assert!((dist - 4.0).abs() < 1e-9);
    assert!(vp.is_front_facing());
    assert!((vp.normal() - DVec3::Z).length() < 1e-9);

    let color = tracer.ray_trace(1, DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, None);
    // Diffuse 1.0 plus ambient 0.1 (clamping happens in the pixel buffer)
    assert!((color.x - 1.1).abs() < 1e-9);
    assert!(color.y.abs() < 1e-12);
    assert!(color.z.abs() < 1e-12);
}

/// Two triangles forming a unit square in the z = 0 plane: the center ray
/// hits one of them at distance 5 with a white diffuse response.
#[test]
fn triangle_square_center_hit() {
    let mut scene = SceneDescription::new();
    let white = matte(DVec3::ONE, DVec3::ZERO);
    scene.add_material(white.clone());
    let a = DVec3::new(-0.5, -0.5, 0.0);
    let b = DVec3::new(0.5, -0.5, 0.0);
    let c = DVec3::new(0.5, 0.5, 0.0);
    let d = DVec3::new(-0.5, 0.5, 0.0);
    scene
        .add_viewable(Box::new(Triangle::new(a, b, c, white.clone()).unwrap()))
        .unwrap();
    scene
        .add_viewable(Box::new(Triangle::new(a, c, d, white.clone()).unwrap()))
        .unwrap();
    let mut light = Light::default();
    light.set_position(DVec3::new(0.0, 0.0, 10.0));
    scene.add_light(light);
    scene.build_kdtree_default().unwrap();

    let tracer = RayTracer::new(&scene).unwrap();
    let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
    let (_, dist) = tracer
        .seek_intersection(DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, None, &mut vp)
        .unwrap();
    assert!((dist - 5.0).abs() < 1e-9);

    let color = tracer.ray_trace(1, DVec3::new(0.0, 0.0, 5.0), -DVec3::Z, None);
    assert!(color.x > 0.9 && color.y > 0.9 && color.z > 0.9);
    assert!((color.x - color.y).abs() < 1e-9);
}

/// A perfect mirror facing the camera dead-center reflects the ray straight
/// back past the camera: the result is the background color, not the red
/// sphere sitting off-axis.
#[test]
fn mirror_reflects_to_background() {
    let background = DVec3::new(0.0, 0.1, 0.3);
    let mut scene = SceneDescription::new();
    scene.set_background(background);

    let mirror = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::ZERO);
        m.set_color_specular(DVec3::ZERO);
        m.set_color_reflective(DVec3::ONE);
    });
    scene.add_material(mirror.clone());
    scene
        .add_viewable(Box::new(Sphere::new(DVec3::ZERO, 1.0, mirror).unwrap()))
        .unwrap();

    let red = matte(DVec3::new(1.0, 0.0, 0.0), DVec3::new(0.1, 0.0, 0.0));
    scene.add_material(red.clone());
    scene
        .add_viewable(Box::new(
            Sphere::new(DVec3::new(2.0, 0.0, 0.0), 1.0, red).unwrap(),
        ))
        .unwrap();

    let mut light = Light::default();
    light.set_directional(DVec3::new(-1.0, 0.0, 0.0));
    light.set_color_ambient(DVec3::ZERO);
    scene.add_light(light);
    scene.build_kdtree_default().unwrap();

    let tracer = RayTracer::new(&scene).unwrap();
    // Dead-center ray from -x: reflection goes straight back
    let color = tracer.ray_trace(2, DVec3::new(-5.0, 0.0, 0.0), DVec3::X, None);
    assert!((color - background).length() < 1e-9);
}

/// A transmissive sphere in front of a blue plane: the center pixel is at
/// least as blue as the plane alone (the glass passes the plane's radiance
/// through and adds its own surface terms).
#[test]
fn glass_sphere_passes_plane_color() {
    let blue_plane = || {
        Parallelogram::new(
            DVec3::new(-10.0, -10.0, -3.0),
            DVec3::new(10.0, -10.0, -3.0),
            DVec3::new(10.0, 10.0, -3.0),
            matte(DVec3::new(0.1, 0.1, 0.9), DVec3::splat(0.05)),
        )
        .unwrap()
    };
    let camera_pos = DVec3::new(0.0, 0.0, 5.0);

    // Light well off-axis so the sphere does not shadow the plane center
    let mut bare = SceneDescription::new();
    bare.add_viewable(Box::new(blue_plane())).unwrap();
    let mut light = Light::default();
    light.set_position(DVec3::new(4.0, 0.0, 2.0));
    bare.add_light(light.clone());
    bare.build_kdtree_default().unwrap();
    let bare_tracer = RayTracer::new(&bare).unwrap();
    let blue_alone = bare_tracer.ray_trace(3, camera_pos, -DVec3::Z, None);

    // Plane behind a glass sphere
    let mut glassy = SceneDescription::new();
    glassy.add_viewable(Box::new(blue_plane())).unwrap();
    let glass = phong(|m| {
        m.set_color_ambient_diffuse(DVec3::splat(0.02));
        m.set_color_specular(DVec3::ZERO);
        m.set_color_reflective(DVec3::ZERO);
        m.set_color_transmissive(DVec3::ONE);
        m.set_index_of_refraction(1.5);
    });
    glassy
        .add_viewable(Box::new(Sphere::new(DVec3::ZERO, 1.0, glass).unwrap()))
        .unwrap();
    glassy.add_light(light);
    glassy.build_kdtree_default().unwrap();
    let glass_tracer = RayTracer::new(&glassy).unwrap();
    let through_glass = glass_tracer.ray_trace(3, camera_pos, -DVec3::Z, None);

    assert!(blue_alone.z > 0.5, "plane must read blue: {blue_alone}");
    assert!(
        through_glass.z >= blue_alone.z - 1e-9,
        "glass must pass the plane's blue through: {through_glass} vs {blue_alone}"
    );
}

/// Three spheres in a row behind a kd-tree: the traversal finds the first
/// one along the ray at the exact distance.
#[test]
fn kdtree_first_hit_of_three_spheres() {
    let mut scene = SceneDescription::new();
    let gray = matte(DVec3::splat(0.5), DVec3::ZERO);
    for x in [-2.0, 0.0, 2.0] {
        scene
            .add_viewable(Box::new(
                Sphere::new(DVec3::new(x, 0.0, 0.0), 0.5, gray.clone()).unwrap(),
            ))
            .unwrap();
    }
    scene.build_kdtree_default().unwrap();
    let tracer = RayTracer::new(&scene).unwrap();
    let mut vp = VisiblePoint::new(Arc::new(PhongMaterial::default()));
    let (object, dist) = tracer
        .seek_intersection(DVec3::new(-10.0, 0.0, 0.0), DVec3::X, None, &mut vp)
        .unwrap();
    assert_eq!(object, 0);
    assert!((dist - 7.5).abs() < 1e-9);
}

/// Shadow feelers never report the surface itself as its own occluder.
#[test]
fn surface_does_not_shadow_itself() {
    let mut scene = SceneDescription::new();
    let gray = matte(DVec3::splat(0.8), DVec3::ZERO);
    scene
        .add_viewable(Box::new(Sphere::new(DVec3::ZERO, 1.0, gray).unwrap()))
        .unwrap();
    let mut light = Light::default();
    light.set_position(DVec3::new(0.0, 0.0, 6.0));
    scene.add_light(light);
    scene.build_kdtree_default().unwrap();
    let tracer = RayTracer::new(&scene).unwrap();

    // The lit pole faces the light directly; it must be reported lit
    assert!(tracer.shadow_feeler(DVec3::new(0.0, 0.0, 1.0), &scene.lights()[0], Some(0)));
    // A point on the far side is occluded by the sphere's own body
    assert!(!tracer.shadow_feeler(DVec3::new(0.0, 0.0, -1.0), &scene.lights()[0], Some(0)));
}

/// A fully white Lambertian sphere under only white ambient light returns
/// exactly the diffuse color.
#[test]
fn ambient_only_returns_diffuse_color() {
    let mut scene = SceneDescription::new();
    scene.set_global_ambient(DVec3::ONE);
    let chalk = phong(|m| {
        m.set_color_diffuse(DVec3::ONE);
        m.set_color_ambient(DVec3::ONE);
        m.set_color_specular(DVec3::ZERO);
        m.set_color_reflective(DVec3::ZERO);
        m.set_color_emissive(DVec3::ZERO);
    });
    scene
        .add_viewable(Box::new(Sphere::new(DVec3::ZERO, 1.0, chalk).unwrap()))
        .unwrap();
    scene.build_kdtree_default().unwrap();
    let tracer = RayTracer::new(&scene).unwrap();
    let color = tracer.ray_trace(1, DVec3::new(0.0, 0.0, 4.0), -DVec3::Z, None);
    assert!((color - DVec3::ONE).length() < 1e-12);
}
