#![allow(dead_code)]

use glam::Vec4;
use helio_pass_smaa::{RawSettings, Texture, TextureDesc, Tunables};
use std::sync::Arc;
use wgpu::TextureFormat;

pub const DARK: f32 = 0.2;
pub const LIGHT: f32 = 0.8;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Tunables with SMAA switched on and everything else at defaults
pub fn enabled_tunables() -> Arc<Tunables> {
    Arc::new(Tunables::with_values(RawSettings {
        enable: 1,
        ..RawSettings::default()
    }))
}

pub fn gray(v: f32) -> Vec4 {
    Vec4::new(v, v, v, 1.0)
}

/// Row where the light region ends in column `x`; shallow staircase of 4-wide steps
pub fn staircase_boundary(x: u32) -> u32 {
    8 + x / 4
}

/// Light above a shallow staircase, dark below
pub fn staircase(width: u32, height: u32, format: TextureFormat) -> Texture {
    Texture::from_fn("staircase", TextureDesc::new(width, height, format), |x, y| {
        gray(if y < staircase_boundary(x) { LIGHT } else { DARK })
    })
    .expect("staircase texture")
}

pub fn flat(width: u32, height: u32, format: TextureFormat, value: f32) -> Texture {
    Texture::from_fn("flat", TextureDesc::new(width, height, format), |_, _| gray(value))
        .expect("flat texture")
}

/// A few axis-aligned boxes on a flat background
pub fn sparse_boxes(width: u32, height: u32, format: TextureFormat) -> Texture {
    let boxes = [(100, 80, 300, 40), (900, 500, 64, 220), (1500, 900, 180, 120)];
    Texture::from_fn("boxes", TextureDesc::new(width, height, format), |x, y| {
        let inside = boxes
            .iter()
            .any(|&(bx, by, bw, bh)| x >= bx && x < bx + bw && y >= by && y < by + bh);
        gray(if inside { LIGHT } else { DARK })
    })
    .expect("boxes texture")
}

/// Depth that steps from near to far along the same staircase
pub fn staircase_depth(width: u32, height: u32) -> Texture {
    Texture::from_fn("depth", TextureDesc::new(width, height, TextureFormat::Depth32Float), |x, y| {
        Vec4::splat(if y < staircase_boundary(x) { 0.1 } else { 0.9 })
    })
    .expect("depth texture")
}
