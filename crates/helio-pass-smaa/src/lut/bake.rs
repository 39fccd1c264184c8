//! Procedural generation of the area and search tables
//!
//! The area table stores, for every end-pattern pair and pair of distances
//! to the line ends, how much of a pixel the revectorized edge covers on each
//! side of the aliased edge. The search table tells the line search how far
//! the last fetched pixel pair extends the line.

use super::{
    AREA_SUBTEXTURE_HEIGHT, AREA_TABLE_FORMAT, AREA_TABLE_HEIGHT, AREA_TABLE_WIDTH, DIAG_BLOCK,
    DIAG_OFFSET_X, ORTHO_BLOCK, SEARCH_TABLE_FORMAT, SEARCH_TABLE_SIZE,
};
use crate::texture::{Texture, TextureDesc};
use crate::Result;
use glam::{Vec2, Vec4};

/// Bake the 160x560 area table
pub fn area_table() -> Result<Texture> {
    let desc = TextureDesc::new(AREA_TABLE_WIDTH, AREA_TABLE_HEIGHT, AREA_TABLE_FORMAT)
        .with_usage(wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST);

    // Single-sample SMAA only addresses the first subtexture; the remaining
    // slots repeat it.
    Texture::from_fn("SMAA.AreaTex", desc, |x, y| {
        let y = y % AREA_SUBTEXTURE_HEIGHT;
        let area = if x < DIAG_OFFSET_X {
            let (p1, i) = (x / ORTHO_BLOCK, x % ORTHO_BLOCK);
            let (p2, j) = (y / ORTHO_BLOCK, y % ORTHO_BLOCK);
            orthogonal_area(p1, p2, (i * i) as f32, (j * j) as f32)
        } else {
            let x = x - DIAG_OFFSET_X;
            let (c1, i) = (x / DIAG_BLOCK, x % DIAG_BLOCK);
            let (c2, j) = (y / DIAG_BLOCK, y % DIAG_BLOCK);
            diagonal_area(c1, c2, i, j)
        };
        Vec4::new(area.x, area.y, 0.0, 1.0)
    })
}

/// Bake the 4x4 search table
pub fn search_table() -> Result<Texture> {
    let desc = TextureDesc::new(SEARCH_TABLE_SIZE, SEARCH_TABLE_SIZE, SEARCH_TABLE_FORMAT)
        .with_usage(wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST);

    Texture::from_fn("SMAA.SearchTex", desc, |top_code, cross_code| {
        Vec4::splat(search_extension(top_code, cross_code) as f32 * 127.0 / 255.0)
    })
}

/// Pixels of the last fetched pair that still belong to the line (0..=2)
///
/// `top_code`: bit 0 = the near pixel carries the edge, bit 1 = the far one.
/// `cross_code`: bit 0 = a crossing edge between the pair, bit 1 = one past
/// the far pixel.
pub fn search_extension(top_code: u32, cross_code: u32) -> u32 {
    let near = top_code & 1 != 0;
    let far = top_code & 2 != 0;
    let crossed_between = cross_code & 1 != 0;
    match (near, far, crossed_between) {
        (false, _, _) => 0,
        (true, true, false) => 2,
        _ => 1,
    }
}

/// Height of the silhouette at a line end for an end pattern
///
/// Patterns are `above + 3 * below` for the crossing edges seen at the end.
fn silhouette(pattern: u32) -> f32 {
    match pattern {
        1 => 0.5,
        3 => -0.5,
        _ => 0.0,
    }
}

/// Coverage of the pixel `left` pixels from the start of an orthogonal line
///
/// x: how far the pixel below (or right of) the edge pulls across it,
/// y: how far the pixel above (or left of) it does.
pub fn orthogonal_area(p1: u32, p2: u32, left: f32, right: f32) -> Vec2 {
    let s1 = silhouette(p1);
    let s2 = silhouette(p2);
    let d = left + right + 1.0;
    let mid = Vec2::new(d * 0.5, 0.0);
    let (a, b) = (left, left + 1.0);

    if s1 != 0.0 && s2 != 0.0 && s1.signum() != s2.signum() {
        // Z shape: one line from end to end
        return line_area(Vec2::new(0.0, s1), Vec2::new(d, s2), a, b);
    }

    let mut area = Vec2::ZERO;
    if s1 != 0.0 {
        area += line_area(Vec2::new(0.0, s1), mid, a, b);
    }
    if s2 != 0.0 {
        area += line_area(mid, Vec2::new(d, s2), a, b);
    }
    area
}

/// Coverage of the pixel `d1` steps from the lower end of a diagonal staircase
pub fn diagonal_area(c1: u32, c2: u32, d1: u32, d2: u32) -> Vec2 {
    let n = (d1 + d2 + 1) as f32;
    let taper = |pattern: u32, d: u32| {
        if pattern == 0 {
            1.0
        } else {
            ((d as f32 + 0.5) / (n * 0.5)).min(1.0)
        }
    };
    Vec2::splat(0.125 * taper(c1, d1) * taper(c2, d2))
}

/// Area between the segment `p0 -> p1` and the axis, clipped to `[a, b]`
///
/// Returns (area below the axis, area above it).
fn line_area(p0: Vec2, p1: Vec2, a: f32, b: f32) -> Vec2 {
    let lo = a.max(p0.x);
    let hi = b.min(p1.x);
    if hi <= lo {
        return Vec2::ZERO;
    }

    let height = |t: f32| p0.y + (p1.y - p0.y) * (t - p0.x) / (p1.x - p0.x);
    let (ya, yb) = (height(lo), height(hi));

    let split = |y0: f32, y1: f32, width: f32| {
        let signed = (y0 + y1) * 0.5 * width;
        if signed < 0.0 {
            Vec2::new(-signed, 0.0)
        } else {
            Vec2::new(0.0, signed)
        }
    };

    if ya * yb >= 0.0 {
        split(ya, yb, hi - lo)
    } else {
        let root = lo + (hi - lo) * ya / (ya - yb);
        split(ya, 0.0, root - lo) + split(0.0, yb, hi - root)
    }
}
