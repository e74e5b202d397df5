// Scene crate - the scene registry, camera, and pixel buffer shared by the
// tracer and the file loaders

mod camera;
mod pixel;
mod scene;

pub use camera::CameraView;
pub use pixel::PixelBuffer;
pub use scene::{MatId, ObjId, SceneDescription, SceneError, TexId};
