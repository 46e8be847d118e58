//! Texture table - fixed-capacity slots shared by every face
//!
//! Faces reference textures by slot index. The table is the single owner of
//! CPU-side texture data; backends keep their own native copies keyed by slot
//! and watch [`TextureLibrary::generation`] to know when to re-upload.

use crate::error::{EngineError, Result};
use crate::rasterizer::constants::MAX_TEXTURES;

use super::texture::Texture;

/// A fixed-size table of textures keyed by small integer slot
#[derive(Debug, Clone)]
pub struct TextureLibrary {
    slots: Vec<Option<Texture>>,
    /// Bumped every time a slot's content changes
    generations: Vec<u32>,
}

impl TextureLibrary {
    /// Create a new empty texture library
    pub fn new() -> Self {
        Self {
            slots: vec![None; MAX_TEXTURES],
            generations: vec![0; MAX_TEXTURES],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.slots.len() {
            return Err(EngineError::SizeExceeded {
                what: "texture slot",
                requested: slot,
                max: self.slots.len() - 1,
            });
        }
        Ok(())
    }

    /// Store a texture, replacing any previous occupant
    pub fn set(&mut self, slot: usize, texture: Texture) -> Result<()> {
        self.check_slot(slot)?;
        self.slots[slot] = Some(texture);
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        Ok(())
    }

    /// Get a texture by slot
    pub fn get(&self, slot: usize) -> Option<&Texture> {
        self.slots.get(slot).and_then(|t| t.as_ref())
    }

    /// Remove a texture. Removing from an empty slot is a no-op.
    pub fn remove(&mut self, slot: usize) -> Option<Texture> {
        let removed = self.slots.get_mut(slot).and_then(|t| t.take());
        if removed.is_some() {
            self.generations[slot] = self.generations[slot].wrapping_add(1);
        }
        removed
    }

    /// Release every slot
    pub fn clear(&mut self) {
        for slot in 0..self.slots.len() {
            self.remove(slot);
        }
    }

    /// Change counter of a slot (0 for a slot never written)
    pub fn generation(&self, slot: usize) -> u32 {
        self.generations.get(slot).copied().unwrap_or(0)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate occupied slots in order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Texture)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (i, t)))
    }

    /// First free slot, if any
    pub fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|t| t.is_none())
    }

    /// Slot of the first texture with this name
    pub fn find(&self, name: &str) -> Option<usize> {
        self.iter().find(|(_, t)| t.name == name).map(|(i, _)| i)
    }
}

impl Default for TextureLibrary {
    fn default() -> Self {
        Self::new()
    }
}
