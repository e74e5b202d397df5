//! NFF (Neutral File Format) scene loader.

use crate::scan;
use crate::{LoadReport, LoaderError};
use geom::material::PhongMaterial;
use geom::viewable::{Cone, Cylinder, Sphere, Triangle};
use geom::{Light, Material};
use glam::DVec3;
use scene::SceneDescription;
use std::f64::consts::PI;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Pending state of a `v` viewport block.
#[derive(Default)]
struct ViewCommand {
    from: Option<DVec3>,
    at: Option<DVec3>,
    up: Option<DVec3>,
    /// Field of view in radians.
    angle: Option<f64>,
    resolution: Option<(u32, u32)>,
}

impl ViewCommand {
    fn apply(&self, scene: &mut SceneDescription) {
        let (Some(from), Some(at), Some(up), Some(angle)) =
            (self.from, self.at, self.up, self.angle)
        else {
            return;
        };
        let camera = scene.camera_mut();
        camera.set_look_at(from, at, up);
        camera.set_view_frustum(1.0, angle);
        if let Some((width, height)) = self.resolution {
            camera.set_screen_pixel_size(width, height);
        }
        scene.register_camera_view();
    }
}

/// Load an NFF scene file. Parse errors recover to the next line and are
/// counted in the returned report.
pub fn load_nff_file(path: &Path, scene: &mut SceneDescription) -> Result<LoadReport, LoaderError> {
    let text = std::fs::read_to_string(path)?;
    load_nff_str(&text, scene)
}

/// Load NFF from in-memory text (used by the file entry point and tests).
pub fn load_nff_str(text: &str, scene: &mut SceneDescription) -> Result<LoadReport, LoaderError> {
    let mut report = LoadReport::default();
    let mut current_material: Arc<dyn Material> = Arc::new(PhongMaterial::default());
    let mut view: Option<ViewCommand> = None;

    let mut lines = text.lines().enumerate().peekable();
    while let Some((line_number, raw_line)) = lines.next() {
        let line = strip_comment(raw_line).trim_start();
        let mut fields = line.split_whitespace();
        let Some(command) = fields.next() else {
            // Blank line closes a pending view block
            if let Some(v) = view.take() {
                v.apply(scene);
            }
            continue;
        };
        let args = line[command.len()..].trim_start();

        // Any non-view-parameter command closes a pending view block
        let is_view_param = matches!(
            command,
            "from" | "at" | "up" | "angle" | "hither" | "resolution"
        );
        if !is_view_param {
            if let Some(v) = view.take() {
                v.apply(scene);
            }
        }

        let ok = match command {
            "v" => {
                view = Some(ViewCommand::default());
                true
            }
            "b" => match scan::floats::<3>(args) {
                Some(color) => {
                    scene.set_background(scan::vec3(&color));
                    true
                }
                None => false,
            },
            "l" => match scan::floats_up_to::<3, 6>(args) {
                Some((values, count)) if count == 3 || count == 6 => {
                    let mut light = Light::default();
                    light.set_position(scan::vec3(&values[..3]));
                    if count == 6 {
                        light.set_color(scan::vec3(&values[3..]));
                    }
                    scene.add_light(light);
                    true
                }
                _ => false,
            },
            "f" => match scan::floats::<8>(args) {
                Some(values) => {
                    let color = scan::vec3(&values);
                    let (kd, ks, shininess, transmission, index_of_refraction) =
                        (values[3], values[4], values[5], values[6], values[7]);
                    let mut material = PhongMaterial::default();
                    material.set_color_ambient_diffuse(color * kd);
                    material.set_color_specular(color * ks);
                    material.set_color_reflective(color * ks);
                    material.set_shininess(shininess);
                    if transmission > 0.0 {
                        material.set_color_transmissive(DVec3::splat(transmission));
                        material.set_index_of_refraction(index_of_refraction);
                    }
                    let material: Arc<dyn Material> = Arc::new(material);
                    scene.add_material(material.clone());
                    current_material = material;
                    true
                }
                None => false,
            },
            "c" => match scan::floats::<8>(args) {
                Some(values) => {
                    let base = scan::vec3(&values[..3]);
                    let base_radius = values[3];
                    let top = scan::vec3(&values[4..7]);
                    let top_radius = values[7];
                    process_cone_cyl(scene, &current_material, base, base_radius, top, top_radius)
                }
                None => false,
            },
            "s" => match scan::floats::<4>(args) {
                Some(values) if values[3] > 0.0 => {
                    let sphere = Sphere::new(
                        scan::vec3(&values[..3]),
                        values[3],
                        current_material.clone(),
                    )
                    .expect("radius checked positive");
                    scene.add_viewable(Box::new(sphere))?;
                    true
                }
                _ => false,
            },
            "p" | "pp" => {
                if command == "pp" {
                    warn!(line = line_number + 1, "NFF: vertex normals ignored");
                }
                match args.split_whitespace().next().and_then(|s| s.parse().ok()) {
                    Some(num_verts) if num_verts >= 3 => {
                        let mut verts = Vec::with_capacity(num_verts);
                        let mut ok = true;
                        for _ in 0..num_verts {
                            let vert = lines.next().and_then(|(_, vline)| {
                                // 'pp' rows carry a normal after the position
                                scan::floats_up_to::<3, 6>(strip_comment(vline))
                                    .map(|(values, _)| scan::vec3(&values[..3]))
                            });
                            match vert {
                                Some(v) => verts.push(v),
                                None => {
                                    ok = false;
                                    break;
                                }
                            }
                        }
                        if ok {
                            add_polygon(scene, &current_material, &verts)?;
                        }
                        ok
                    }
                    _ => false,
                }
            }
            "from" => update_view_vec(&mut view, args, |v, p| v.from = Some(p)),
            "at" => update_view_vec(&mut view, args, |v, p| v.at = Some(p)),
            "up" => update_view_vec(&mut view, args, |v, p| v.up = Some(p)),
            "angle" => match (view.as_mut(), scan::floats::<1>(args)) {
                (Some(v), Some([degrees])) => {
                    v.angle = Some(degrees * PI / 180.0);
                    true
                }
                _ => false,
            },
            // Hither (near clipping) has no effect on the ray trace; the
            // value is validated and dropped
            "hither" => matches!(
                (view.as_ref(), scan::floats::<1>(args)),
                (Some(_), Some(_))
            ),
            "resolution" => match (view.as_mut(), scan::floats::<2>(args)) {
                (Some(v), Some([w, h])) if w >= 1.0 && h >= 1.0 => {
                    v.resolution = Some((w as u32, h as u32));
                    true
                }
                _ => false,
            },
            other => {
                report.add_unsupported(other);
                true
            }
        };

        if !ok {
            warn!(line = line_number + 1, text = raw_line, "NFF parse error");
            report.skipped_lines += 1;
        }
    }
    if let Some(v) = view.take() {
        v.apply(scene);
    }
    if !report.unsupported_commands.is_empty() {
        warn!(
            commands = ?report.unsupported_commands,
            "NFF: unsupported commands ignored"
        );
    }
    Ok(report)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn update_view_vec(
    view: &mut Option<ViewCommand>,
    args: &str,
    assign: impl FnOnce(&mut ViewCommand, DVec3),
) -> bool {
    match (view.as_mut(), scan::floats::<3>(args)) {
        (Some(v), Some(values)) => {
            assign(v, scan::vec3(&values));
            true
        }
        _ => false,
    }
}

/// The `c` command: equal radii give a cylinder, a zero top radius a cone.
/// Truncated cones are approximated by whichever is closer.
fn process_cone_cyl(
    scene: &mut SceneDescription,
    material: &Arc<dyn Material>,
    base_center: DVec3,
    base_radius: f64,
    top_center: DVec3,
    top_radius: f64,
) -> bool {
    let mut is_cone = top_radius == 0.0;
    let mut radius = base_radius;
    if !is_cone && top_radius != base_radius {
        warn!("NFF: truncated cone approximated by a cone or cylinder");
        if top_radius < 0.5 * base_radius {
            is_cone = true;
        } else {
            radius = base_radius;
        }
    }
    let center_line = top_center - base_center;
    let height = center_line.length();
    if height == 0.0 || radius <= 0.0 {
        return false; // zero-height cylinders are not legal NFF
    }
    let axis = center_line / height;

    let result = if is_cone {
        let mut cone = Cone::new(material.clone());
        cone.set_apex(top_center);
        if cone.set_center_axis(axis).is_err()
            || cone.set_slope(radius / height).is_err()
            || cone.set_height(height).is_err()
        {
            return false;
        }
        scene.add_viewable(Box::new(cone))
    } else {
        let mut cylinder = Cylinder::new(material.clone());
        if cylinder.set_center_axis(axis).is_err()
            || cylinder.set_radius(radius).is_err()
            || cylinder.set_height(height).is_err()
        {
            return false;
        }
        cylinder.set_center((top_center + base_center) * 0.5);
        scene.add_viewable(Box::new(cylinder))
    };
    result.is_ok()
}

/// Triangulate a convex polygon with the bisecting-index scheme: instead of
/// fanning from vertex zero, each triangle takes strides that double as the
/// walk wraps, which keeps slivers shallow for numerically touchy inputs.
pub(crate) fn add_polygon(
    scene: &mut SceneDescription,
    material: &Arc<dyn Material>,
    verts: &[DVec3],
) -> Result<(), scene::SceneError> {
    let n = verts.len();
    let mut start = 0usize;
    let mut step = 1usize;
    let mut next_index = |start: usize, step: &mut usize| {
        let mut idx = start + *step;
        if idx >= n {
            idx = (idx - n) << 1;
            *step <<= 1;
        }
        idx
    };
    for _ in 0..n.saturating_sub(2) {
        let idx2 = next_index(start, &mut step);
        let idx3 = next_index(idx2, &mut step);
        if start == idx2 || start == idx3 || idx2 == idx3 {
            break; // duplicated vertex in a supposedly convex polygon
        }
        if let Ok(triangle) =
            Triangle::new(verts[start], verts[idx2], verts[idx3], material.clone())
        {
            scene.add_viewable(Box::new(triangle))?;
        }
        start = idx3;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scene_parses() {
        let text = "\
b 0 0 0
v
from 0 0 5
at 0 0 0
up 0 1 0
angle 60
hither 1
resolution 4 4
f 1 0 0 0.8 0.0 1 0 1
s 0 0 0 1
";
        let mut scene = SceneDescription::new();
        let report = load_nff_str(text, &mut scene).unwrap();
        assert_eq!(report.skipped_lines, 0);
        assert_eq!(scene.num_viewables(), 1);
        assert_eq!(scene.camera().width_pixels(), 4);
        assert!((scene.camera().position() - DVec3::new(0.0, 0.0, 5.0)).length() < 1e-12);
        // fov 60 degrees at distance 5: screen height = 2*5*tan(30 deg)
        let expected = 10.0 * (30.0f64).to_radians().tan();
        assert!((scene.camera().screen_height() - expected).abs() < 1e-9);
    }

    #[test]
    fn light_with_and_without_color() {
        let text = "l 1 2 3\nl 0 0 9 0.5 0.5 0.5\n";
        let mut scene = SceneDescription::new();
        load_nff_str(text, &mut scene).unwrap();
        assert_eq!(scene.lights().len(), 2);
        assert!(scene.lights()[0].is_positional());
        assert_eq!(scene.lights()[1].color_diffuse(), DVec3::splat(0.5));
    }

    #[test]
    fn polygon_becomes_triangles() {
        let text = "\
f 1 1 1 1 0 1 0 1
p 4
0 0 0
1 0 0
1 1 0
0 1 0
";
        let mut scene = SceneDescription::new();
        let report = load_nff_str(text, &mut scene).unwrap();
        assert_eq!(report.skipped_lines, 0);
        assert_eq!(scene.num_viewables(), 2);
    }

    #[test]
    fn cylinder_and_cone_from_c_command() {
        let text = "\
c 0 0 0 1 0 3 0 1
c 0 0 0 1 0 3 0 0
";
        let mut scene = SceneDescription::new();
        let report = load_nff_str(text, &mut scene).unwrap();
        assert_eq!(report.skipped_lines, 0);
        assert_eq!(scene.num_viewables(), 2);
    }

    #[test]
    fn parse_errors_recover_to_next_line() {
        let text = "\
s not a sphere
s 0 0 0 1
";
        let mut scene = SceneDescription::new();
        let report = load_nff_str(text, &mut scene).unwrap();
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(scene.num_viewables(), 1);
    }

    #[test]
    fn unsupported_commands_counted_once() {
        let text = "zz 1\nzz 2\nqq 3\n";
        let mut scene = SceneDescription::new();
        let report = load_nff_str(text, &mut scene).unwrap();
        assert_eq!(report.unsupported_commands, vec!["zz", "qq"]);
    }

    #[test]
    fn transmissive_material_flag_set() {
        let text = "f 1 1 1 0.5 0.5 10 0.8 1.5\ns 0 0 0 1\n";
        let mut scene = SceneDescription::new();
        load_nff_str(text, &mut scene).unwrap();
        assert_eq!(scene.num_materials(), 1);
        assert!(scene.material(0).is_transmissive());
    }
}
