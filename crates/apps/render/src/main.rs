mod demo;
mod settings;

use anyhow::{Context, bail};
use clap::Parser;
use scene::{PixelBuffer, SceneDescription};
use settings::RenderSettings;
use std::path::PathBuf;
use std::time::Instant;
use tracer::RayTracer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "render")]
#[command(about = "Recursive ray tracer", long_about = None)]
struct Args {
    /// Scene file (.nff or .obj); the built-in demo scene when omitted
    scene: Option<PathBuf>,

    /// Output image path (.bmp, .png, ...)
    #[arg(short, long)]
    output: Option<String>,

    /// Output width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Maximum trace recursion depth
    #[arg(long)]
    depth: Option<u32>,

    /// RON settings file merged under the flags
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut settings = match &args.settings {
        Some(path) => RenderSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => RenderSettings::default(),
    };
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(depth) = args.depth {
        settings.depth = depth;
    }
    if let Some(output) = args.output {
        settings.output = output;
    }

    let mut scene = load_scene(&args.scene, &mut settings)?;

    scene
        .camera_mut()
        .set_screen_pixel_size(settings.width, settings.height);
    scene.calc_new_screen_dims(settings.width as f64 / settings.height as f64);
    scene.build_kdtree_default()?;

    let mut ray_tracer = RayTracer::new(&scene)?;
    ray_tracer.set_max_depth(settings.depth);

    let mut buffer = PixelBuffer::new(settings.width, settings.height);
    let start = Instant::now();
    ray_tracer.render(&mut buffer);
    info!(elapsed = ?start.elapsed(), "ray trace finished");

    buffer
        .to_rgb_image()
        .save(&settings.output)
        .with_context(|| format!("writing {}", settings.output))?;
    info!(output = %settings.output, "image written");
    Ok(())
}

fn load_scene(
    path: &Option<PathBuf>,
    settings: &mut RenderSettings,
) -> anyhow::Result<SceneDescription> {
    let Some(path) = path else {
        return demo::build_demo_scene();
    };
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let mut scene = SceneDescription::new();
    let report = match extension.as_deref() {
        Some("nff") => loader::load_nff_file(path, &mut scene)
            .with_context(|| format!("loading {}", path.display()))?,
        Some("obj") => {
            let report = loader::load_obj_file(path, &mut scene)
                .with_context(|| format!("loading {}", path.display()))?;
            // OBJ files carry no camera or lights; frame the geometry
            default_obj_setup(&mut scene);
            report
        }
        _ => bail!("unrecognized scene format: {}", path.display()),
    };
    if report.skipped_lines > 0 {
        info!(skipped = report.skipped_lines, "loader recovered from parse errors");
    }
    // NFF resolution (when present) becomes the default output size
    let camera = scene.camera();
    if camera.width_pixels() > 2 && settings.width == RenderSettings::default().width {
        settings.width = camera.width_pixels();
        settings.height = camera.height_pixels();
    }
    Ok(scene)
}

/// Camera, lights, and ambient defaults for bare OBJ geometry.
fn default_obj_setup(scene: &mut SceneDescription) {
    use glam::DVec3;

    scene.set_background(DVec3::ZERO);
    scene.set_global_ambient(DVec3::new(0.6, 0.6, 0.2));
    let camera = scene.camera_mut();
    camera.set_position(DVec3::new(0.0, 0.0, 40.0));
    camera.set_direction(-DVec3::Z);
    camera.set_screen_distance(40.0);
    camera.set_screen_dimensions(20.0, 20.0);
    scene.register_camera_view();

    let mut key = geom::Light::default();
    key.set_position(DVec3::new(20.0, 30.0, 30.0));
    scene.add_light(key);
    let mut fill = geom::Light::default();
    fill.set_position(DVec3::new(-20.0, 10.0, 30.0));
    fill.set_color(DVec3::splat(0.6));
    scene.add_light(fill);
}
