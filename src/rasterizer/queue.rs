//! Sorted element queue
//!
//! Without a Z-buffer, triangles are painted back to front. Each element is
//! keyed by the average camera-space depth of its vertices; the sort is only
//! approximately correct for interpenetrating geometry.

use crate::error::{EngineError, Result};

use super::constants::QUEUE_CAPACITY;

#[derive(Debug, Clone)]
pub struct ElementQueue<T> {
    items: Vec<(f32, T)>,
    capacity: usize,
}

impl<T> ElementQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Queue an element. Refused once the queue holds `capacity` elements.
    pub fn push(&mut self, depth: f32, item: T) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(EngineError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.items.push((depth, item));
        Ok(())
    }

    /// Sort farthest first. Elements at equal depth keep submission order.
    pub fn sort_back_to_front(&mut self) {
        self.items.sort_by(|a, b| b.0.total_cmp(&a.0));
    }

    /// Take every element in current order, leaving the queue empty
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..).map(|(_, item)| item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for ElementQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Average depth of a triangle's three vertices
#[inline]
pub fn average_depth(z: [f32; 3]) -> f32 {
    (z[0] + z[1] + z[2]) / 3.0
}
