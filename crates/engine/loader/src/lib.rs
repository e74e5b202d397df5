// Loader crate - NFF and OBJ scene file parsers feeding a SceneDescription

mod nff;
mod obj;

pub use nff::{load_nff_file, load_nff_str};
pub use obj::{load_obj_file, load_obj_str};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("unable to open scene file: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene registration failed: {0}")]
    Scene(#[from] scene::SceneError),
}

/// Summary of one load: parse errors recover to the next line, so a partial
/// scene plus this report is the normal failure mode.
#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    /// Lines skipped because of parse errors.
    pub skipped_lines: usize,
    /// Distinct unsupported commands encountered.
    pub unsupported_commands: Vec<String>,
}

impl LoadReport {
    pub(crate) fn add_unsupported(&mut self, command: &str) {
        if !self.unsupported_commands.iter().any(|c| c == command) {
            self.unsupported_commands.push(command.to_string());
        }
    }
}

/// Common whitespace/number scanning helpers shared by both loaders.
pub(crate) mod scan {
    use glam::DVec3;

    /// Parse exactly `N` floats from the argument text.
    pub fn floats<const N: usize>(text: &str) -> Option<[f64; N]> {
        let mut out = [0.0; N];
        let mut fields = text.split_whitespace();
        for slot in &mut out {
            *slot = fields.next()?.parse().ok()?;
        }
        Some(out)
    }

    /// Parse at least `N` floats, returning how many of `M` were present.
    pub fn floats_up_to<const N: usize, const M: usize>(text: &str) -> Option<([f64; M], usize)> {
        let mut out = [0.0; M];
        let mut count = 0;
        for field in text.split_whitespace().take(M) {
            out[count] = field.parse().ok()?;
            count += 1;
        }
        if count < N { None } else { Some((out, count)) }
    }

    pub fn vec3(values: &[f64]) -> DVec3 {
        DVec3::new(values[0], values[1], values[2])
    }
}
