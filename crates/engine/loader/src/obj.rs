//! Wavefront OBJ loader: positions and convex faces only.

use crate::nff::add_polygon;
use crate::scan;
use crate::{LoadReport, LoaderError};
use geom::material::PhongMaterial;
use geom::viewable::Parallelogram;
use geom::Material;
use glam::{DVec3, DVec4};
use scene::SceneDescription;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use vmath::util::set_from_hg;

/// Load an OBJ file: `v` positions (with optional w), `vt` texture
/// coordinates (parsed, currently unused), `f` faces. Normals and texture
/// indices in face tuples are accepted and ignored; quads that are exact
/// parallelograms become parallelogram primitives, other faces triangulate.
pub fn load_obj_file(path: &Path, scene: &mut SceneDescription) -> Result<LoadReport, LoaderError> {
    let text = std::fs::read_to_string(path)?;
    load_obj_str(&text, scene)
}

pub fn load_obj_str(text: &str, scene: &mut SceneDescription) -> Result<LoadReport, LoaderError> {
    let mut report = LoadReport::default();
    let material: Arc<dyn Material> = Arc::new(PhongMaterial::default());
    let mut vertices: Vec<DVec4> = Vec::new();
    let mut texture_coords: Vec<(f64, f64)> = Vec::new();

    for (line_number, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(command) = fields.next() else {
            continue;
        };
        let args = line[command.len()..].trim_start();

        let ok = match command {
            "v" => match scan::floats_up_to::<3, 4>(args) {
                Some((values, count)) => {
                    let w = if count == 4 && values[3] != 0.0 {
                        values[3]
                    } else {
                        1.0
                    };
                    vertices.push(DVec4::new(values[0], values[1], values[2], w));
                    true
                }
                None => false,
            },
            "vt" => match scan::floats_up_to::<1, 3>(args) {
                Some((values, count)) => {
                    if count == 3 && values[2] != 0.0 {
                        warn!(line = line_number + 1, "OBJ: texture depth ignored");
                    }
                    texture_coords.push((values[0], if count >= 2 { values[1] } else { 0.0 }));
                    true
                }
                None => false,
            },
            "f" => process_face(scene, &material, &vertices, args).unwrap_or(false),
            "l" => {
                warn!(line = line_number + 1, "OBJ: line elements cannot be rendered");
                true
            }
            other => {
                report.add_unsupported(other);
                true
            }
        };
        if !ok {
            warn!(line = line_number + 1, text = raw_line, "OBJ parse error");
            report.skipped_lines += 1;
        }
    }

    if !report.unsupported_commands.is_empty() {
        warn!(
            commands = ?report.unsupported_commands,
            "OBJ: unsupported commands ignored"
        );
    }
    Ok(report)
}

/// One `f` record: `v`, `v/vt`, `v//vn`, or `v/vt/vn` tuples, possibly with
/// negative (relative) indices.
fn process_face(
    scene: &mut SceneDescription,
    material: &Arc<dyn Material>,
    vertices: &[DVec4],
    args: &str,
) -> Result<bool, scene::SceneError> {
    let mut corner_ids: Vec<usize> = Vec::new();
    for tuple in args.split_whitespace() {
        let index_text = tuple.split('/').next().unwrap_or("");
        let Ok(raw_index) = index_text.parse::<i64>() else {
            return Ok(false);
        };
        let resolved = if raw_index > 0 {
            raw_index - 1
        } else {
            vertices.len() as i64 + raw_index
        };
        if resolved < 0 || resolved >= vertices.len() as i64 {
            return Ok(false);
        }
        corner_ids.push(resolved as usize);
    }
    if corner_ids.len() < 3 {
        return Ok(false);
    }
    let corners: Vec<DVec3> = corner_ids
        .iter()
        .map(|&id| set_from_hg(vertices[id]))
        .collect();

    // Exact parallelograms get the dedicated primitive
    if corners.len() == 4 {
        let [a, b, c, d] = [corners[0], corners[1], corners[2], corners[3]];
        if (d - a) == (c - b) && (b - a) == (c - d) {
            if let Ok(para) = Parallelogram::new(a, b, c, material.clone()) {
                scene.add_viewable(Box::new(para))?;
                return Ok(true);
            }
        }
    }

    // Duplicated vertices make the convex-polygon assumption unusable
    for i in 0..corner_ids.len() {
        for j in (i + 1)..corner_ids.len() {
            if corner_ids[i] == corner_ids[j] {
                return Ok(false);
            }
        }
    }
    add_polygon(scene, material, &corners)?;
    Ok(true)
}
