//! Cross-primitive intersection invariants: any reported hit carries a
//! positive bounded distance, a unit outward normal, and an orientation
//! flag consistent with the ray direction.

use geom::material::PhongMaterial;
use geom::viewable::{
    BezierSet, Cone, Cylinder, Ellipsoid, Parallelepiped, Parallelogram, Sphere, Torus, Triangle,
    Viewable,
};
use geom::visible_point::VisiblePoint;
use glam::DVec3;
use std::sync::Arc;

fn material() -> Arc<PhongMaterial> {
    Arc::new(PhongMaterial::default())
}

fn all_primitives() -> Vec<(&'static str, Box<dyn Viewable>)> {
    let mut out: Vec<(&'static str, Box<dyn Viewable>)> = Vec::new();

    out.push((
        "sphere",
        Box::new(Sphere::new(DVec3::ZERO, 1.0, material()).unwrap()),
    ));

    let mut ellipsoid = Ellipsoid::new(DVec3::ZERO, material());
    ellipsoid.set_radii(1.5, 0.8, 0.6).unwrap();
    out.push(("ellipsoid", Box::new(ellipsoid)));

    let mut cylinder = Cylinder::new(material());
    cylinder.set_center_axis(DVec3::Y).unwrap();
    cylinder.set_radius(0.8).unwrap();
    cylinder.set_height(1.6).unwrap();
    out.push(("cylinder", Box::new(cylinder)));

    let mut cone = Cone::new(material());
    cone.set_apex(DVec3::new(0.0, 1.0, 0.0));
    cone.set_center_axis(DVec3::Y).unwrap();
    cone.set_slope(0.8).unwrap();
    cone.set_height(1.8).unwrap();
    out.push(("cone", Box::new(cone)));

    out.push((
        "torus",
        Box::new(Torus::new(DVec3::ZERO, 1.2, 0.4, material()).unwrap()),
    ));

    out.push((
        "triangle",
        Box::new(
            Triangle::new(
                DVec3::new(-1.0, -1.0, 0.0),
                DVec3::new(1.0, -1.0, 0.0),
                DVec3::new(0.0, 1.2, 0.0),
                material(),
            )
            .unwrap(),
        ),
    ));

    out.push((
        "parallelogram",
        Box::new(
            Parallelogram::new(
                DVec3::new(-1.0, -1.0, 0.2),
                DVec3::new(1.0, -1.0, 0.2),
                DVec3::new(1.2, 1.0, 0.2),
                material(),
            )
            .unwrap(),
        ),
    ));

    out.push((
        "parallelepiped",
        Box::new(
            Parallelepiped::new(
                DVec3::new(-0.7, -0.7, -0.7),
                DVec3::new(0.7, -0.7, -0.7),
                DVec3::new(-0.7, 0.7, -0.7),
                DVec3::new(-0.7, -0.7, 0.7),
                material(),
            )
            .unwrap(),
        ),
    ));

    let mut bezier = BezierSet::new(material());
    let mut pts = Vec::new();
    for j in 0..4 {
        for i in 0..4 {
            pts.push(DVec3::new(
                -1.0 + 2.0 * i as f64 / 3.0,
                -1.0 + 2.0 * j as f64 / 3.0,
                0.3 * ((i + j) as f64 / 6.0),
            ));
        }
    }
    bezier.add_patch(4, 4, &pts).unwrap();
    out.push(("bezier", Box::new(bezier)));

    out
}

/// Deterministic directions roughly covering the sphere.
fn probe_directions() -> Vec<DVec3> {
    let mut dirs = Vec::new();
    for i in 0..8 {
        for j in 1..8 {
            let theta = std::f64::consts::TAU * i as f64 / 8.0;
            let phi = std::f64::consts::PI * j as f64 / 8.0;
            dirs.push(DVec3::new(
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ));
        }
    }
    dirs
}

#[test]
fn hits_carry_unit_normals_and_consistent_orientation() {
    let max_dist = 100.0;
    for (name, primitive) in all_primitives() {
        let mut hits = 0;
        for dir in probe_directions() {
            // Shoot inward from well outside the primitive
            let origin = -dir * 10.0 + DVec3::new(0.013, -0.027, 0.009);
            let mut vp = VisiblePoint::new(material());
            if let Some(t) = primitive.find_intersection(origin, dir, max_dist, &mut vp) {
                hits += 1;
                assert!(t > 0.0 && t <= max_dist, "{name}: t out of range: {t}");
                let n = vp.normal();
                assert!(
                    (n.length() - 1.0).abs() < 1e-9,
                    "{name}: non-unit normal {n}"
                );
                let toward = dir.dot(n);
                if vp.is_front_facing() {
                    assert!(toward <= 1e-9, "{name}: front face but dir.n = {toward}");
                } else {
                    assert!(toward >= -1e-9, "{name}: back face but dir.n = {toward}");
                }
                // The reported position lies on the ray at distance t
                let on_ray = origin + dir * t;
                assert!(
                    (on_ray - vp.position()).length() < 1e-6,
                    "{name}: position off the ray"
                );
            }
        }
        assert!(hits > 0, "{name}: probe rays never hit");
    }
}

#[test]
fn max_dist_is_respected_by_every_primitive() {
    for (name, primitive) in all_primitives() {
        let dir = DVec3::new(0.0, 0.0, -1.0);
        let origin = DVec3::new(0.05, 0.02, 10.0);
        let mut vp = VisiblePoint::new(material());
        if let Some(t) = primitive.find_intersection(origin, dir, 100.0, &mut vp) {
            // Re-intersect with a bound shorter than the hit
            let hit = primitive.find_intersection(origin, dir, t * 0.5, &mut vp);
            assert!(hit.is_none(), "{name}: ignored max_dist");
        }
    }
}

#[test]
fn aabb_contains_all_probe_hits() {
    for (name, primitive) in all_primitives() {
        let mut aabb = primitive.calc_aabb();
        // Pad for flat boxes and the Bezier midpoint acceptance tolerance
        aabb.min -= DVec3::splat(1e-3);
        aabb.max += DVec3::splat(1e-3);
        for dir in probe_directions() {
            let origin = -dir * 10.0;
            let mut vp = VisiblePoint::new(material());
            if primitive
                .find_intersection(origin, dir, 100.0, &mut vp)
                .is_some()
            {
                assert!(
                    aabb.contains_point(vp.position()),
                    "{name}: hit {} outside AABB",
                    vp.position()
                );
            }
        }
    }
}
