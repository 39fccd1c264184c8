//! Texture sampling with wgpu filter and address modes

use crate::texture::Texture;
use glam::{Vec2, Vec4};

/// Immutable sampler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    pub filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
}

impl Sampler {
    pub const POINT_CLAMP: Sampler = Sampler {
        filter: wgpu::FilterMode::Nearest,
        address_mode: wgpu::AddressMode::ClampToEdge,
    };

    pub const BILINEAR_CLAMP: Sampler = Sampler {
        filter: wgpu::FilterMode::Linear,
        address_mode: wgpu::AddressMode::ClampToEdge,
    };

    /// Sample at normalized coordinates
    pub fn sample(&self, texture: &Texture, uv: Vec2) -> Vec4 {
        let size = Vec2::new(texture.width() as f32, texture.height() as f32);
        self.sample_texel_space(texture, uv * size)
    }

    /// Sample at texel-space coordinates (texel centres sit at `n + 0.5`)
    pub fn sample_texel_space(&self, texture: &Texture, p: Vec2) -> Vec4 {
        match self.filter {
            wgpu::FilterMode::Nearest => {
                self.texel(texture, p.x.floor() as i32, p.y.floor() as i32)
            }
            wgpu::FilterMode::Linear => {
                let p = p - Vec2::splat(0.5);
                let base = p.floor();
                let f = p - base;
                let (x, y) = (base.x as i32, base.y as i32);

                let top = self.texel(texture, x, y).lerp(self.texel(texture, x + 1, y), f.x);
                let bottom = self
                    .texel(texture, x, y + 1)
                    .lerp(self.texel(texture, x + 1, y + 1), f.x);
                top.lerp(bottom, f.y)
            }
        }
    }

    fn texel(&self, texture: &Texture, x: i32, y: i32) -> Vec4 {
        let x = wrap(x, texture.width() as i32, self.address_mode);
        let y = wrap(y, texture.height() as i32, self.address_mode);
        match (x, y) {
            (Some(x), Some(y)) => texture.load(x as u32, y as u32),
            // Transparent black border
            _ => Vec4::ZERO,
        }
    }
}

fn wrap(i: i32, size: i32, mode: wgpu::AddressMode) -> Option<i32> {
    match mode {
        wgpu::AddressMode::ClampToEdge => Some(i.clamp(0, size - 1)),
        wgpu::AddressMode::Repeat => Some(i.rem_euclid(size)),
        wgpu::AddressMode::MirrorRepeat => {
            let period = size * 2;
            let m = i.rem_euclid(period);
            Some(if m < size { m } else { period - 1 - m })
        }
        wgpu::AddressMode::ClampToBorder => (0..size).contains(&i).then_some(i),
    }
}
