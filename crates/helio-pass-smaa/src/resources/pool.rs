//! Texture pooling for transient render-graph resources
//!
//! A texture released by one pass can be handed to a later pass that asks for
//! the same description, so intermediates alias instead of piling up.

use crate::texture::{Texture, TextureDesc};
use crate::Result;
use std::collections::HashMap;

/// Allocation counters, mostly for diagnostics and tests
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub created: usize,
    pub reused: usize,
}

/// Pool for reusing textures
#[derive(Default)]
pub struct TexturePool {
    available: HashMap<TextureDesc, Vec<Texture>>,
    stats: PoolStats,
}

impl TexturePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a cleared texture from the pool (or create a new one)
    pub fn acquire(&mut self, label: &str, desc: TextureDesc) -> Result<Texture> {
        if let Some(mut texture) = self.available.get_mut(&desc).and_then(Vec::pop) {
            log::trace!("Reusing pooled texture {:?} for '{}'", desc, label);
            texture.reset(label);
            self.stats.reused += 1;
            return Ok(texture);
        }

        log::trace!("Creating pooled texture {:?} for '{}'", desc, label);
        self.stats.created += 1;
        Texture::new(label, desc)
    }

    /// Release a texture back to the pool
    pub fn release(&mut self, texture: Texture) {
        self.available.entry(*texture.desc()).or_default().push(texture);
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Number of idle textures held by the pool
    pub fn idle_count(&self) -> usize {
        self.available.values().map(Vec::len).sum()
    }

    /// Drop every idle texture
    pub fn clear(&mut self) {
        self.available.clear();
    }
}
