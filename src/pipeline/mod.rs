//! Transform and clip pipeline
//!
//! Local → world → camera → screen. Entities are rotated and translated into
//! world space; terrain zones and the skybox are already there. Faces are then
//! back-face culled, outcoded against the frustum, clipped at the near plane
//! and projected into [`DrawTriangle`]s.

pub mod clip;
mod pass;
mod transform;

pub use clip::{clip_near, outcode, ClipPolygon, ClipVertex};
pub use clip::{CLIP_BOTTOM, CLIP_FAR, CLIP_LEFT, CLIP_NEAR, CLIP_RIGHT, CLIP_TOP};
pub use pass::{process_faces, DrawTriangle, PassOptions, VertexCache};
pub use transform::{is_back_face, rotate_normals, transform_to_world, ViewState};
