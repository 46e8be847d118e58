//! Texture and material store
//!
//! - **Texture**: realized pixels, palette-indexed or direct RGB
//! - **TextureLibrary**: the fixed-size slot table faces index into
//! - **Material**: declarative binding of a source image region to a slot
//!
//! ## Size Rules
//!
//! Texture edges are powers of two from 8 to 256. Anything else is rejected
//! with an unsupported-size error at creation time.

mod material;
mod texture;
mod texture_library;

pub use material::{load_material_list, load_materials, Material, SubRect};
pub use texture::{
    is_key_color, TexelData, Texture, TextureFormat, MAX_TEXTURE_SIZE, MIN_TEXTURE_SIZE,
    TRANSPARENT_INDEX,
};
pub use texture_library::TextureLibrary;
