//! SMAA pass 2: blending weight calculation
//!
//! For every edge, follow the line it belongs to in both directions, look at
//! how the line ends, and read the coverage of the revectorized silhouette
//! from the area table.
//!
//! Output channels: `r` the pixel pulls from the pixel above, `g` the pixel
//! above pulls from this one, `b` the pixel pulls from its left neighbour,
//! `a` the left neighbour pulls from this one.

use super::params::{BlendingFlags, BlendingWeightParams};
use crate::graph::{PassContext, PassResourceBuilder, RenderPass, ResourceHandle};
use crate::lut::{
    AREA_TABLE_HEIGHT, AREA_TABLE_WIDTH, DIAG_BLOCK, DIAG_OFFSET_X, ORTHO_BLOCK, SEARCH_TABLE_SIZE,
};
use crate::sampler::Sampler;
use crate::settings::DebugMode;
use crate::texture::Texture;
use crate::Result;
use glam::{Vec2, Vec4};

pub struct BlendingWeightPass {
    edges: ResourceHandle,
    area: ResourceHandle,
    search: ResourceHandle,
    output: ResourceHandle,
    params: BlendingWeightParams,
}

impl BlendingWeightPass {
    pub fn new(
        edges: ResourceHandle,
        area: ResourceHandle,
        search: ResourceHandle,
        output: ResourceHandle,
        params: BlendingWeightParams,
    ) -> Self {
        Self {
            edges,
            area,
            search,
            output,
            params,
        }
    }
}

impl RenderPass for BlendingWeightPass {
    fn name(&self) -> &str {
        "SMAA.BlendingWeightCalculation"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder
            .read(self.edges)
            .read(self.area)
            .read(self.search)
            .create(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let mut weights = ctx.take_target(self.output)?;
        let edges = ctx.texture(self.edges)?;
        let area = ctx.texture(self.area)?;
        let search = ctx.texture(self.search)?;
        calculate_blending_weights(edges, area, search, &self.params, &mut weights);
        ctx.finish_target(self.output, weights);
        Ok(())
    }
}

/// Run the blending weight calculation over the whole target
pub fn calculate_blending_weights(
    edges: &Texture,
    area: &Texture,
    search: &Texture,
    params: &BlendingWeightParams,
    out: &mut Texture,
) {
    let map = EdgeMap::new(edges);
    let tables = Tables { area, search };
    let flags = params.flags();
    let debug = DebugMode::from_index(params.debug_mode as i32);
    let (width, height) = (out.width(), out.height());

    let weigher = Weigher {
        map: &map,
        tables: &tables,
        max_steps: params.max_search_steps,
        max_steps_diag: params.max_search_steps_diag.min(DIAG_BLOCK - 1),
        corner_rounding: params.corner_rounding / 100.0,
        corners: flags.contains(BlendingFlags::CORNER_DETECTION),
        diagonals: flags.contains(BlendingFlags::DIAGONAL_DETECTION),
    };

    for y in 0..height {
        for x in 0..width {
            let uv = Vec2::new((x as f32 + 0.5) / width as f32, (y as f32 + 0.5) / height as f32);
            let value = match debug {
                DebugMode::Edges => {
                    let e = edges.load(x, y);
                    Vec4::new(e.x, e.y, 0.0, 1.0)
                }
                DebugMode::SearchTexture => {
                    let v = Sampler::POINT_CLAMP.sample(search, uv).x;
                    Vec4::new(v, v, v, 1.0)
                }
                DebugMode::AreaTexture => {
                    let a = Sampler::BILINEAR_CLAMP.sample(area, uv);
                    Vec4::new(a.x, a.y, 0.0, 1.0)
                }
                DebugMode::SearchSteps => weigher.search_lengths(x as i32, y as i32),
                DebugMode::TextureDimensions => Vec4::new(uv.x, uv.y, 0.0, 1.0),
                DebugMode::None | DebugMode::BlendWeights => weigher.weights(x as i32, y as i32),
            };
            out.store(x, y, value);
        }
    }
}

// ── Edge queries ─────────────────────────────────────────────────────────────

/// Line direction of an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// Edge on a pixel's top boundary, the line runs along x
    Horizontal,
    /// Edge on a pixel's left boundary, the line runs along y
    Vertical,
}

const LEFT: u8 = 1;
const TOP: u8 = 2;

/// Thresholded edge bits; anything outside the image has no edges
struct EdgeMap {
    width: i32,
    height: i32,
    bits: Vec<u8>,
}

impl EdgeMap {
    fn new(edges: &Texture) -> Self {
        let bits = edges
            .texels()
            .iter()
            .map(|e| (if e.x > 0.5 { LEFT } else { 0 }) | (if e.y > 0.5 { TOP } else { 0 }))
            .collect();
        Self {
            width: edges.width() as i32,
            height: edges.height() as i32,
            bits,
        }
    }

    fn get(&self, x: i32, y: i32, bit: u8) -> bool {
        x >= 0
            && y >= 0
            && x < self.width
            && y < self.height
            && self.bits[(y * self.width + x) as usize] & bit != 0
    }

    fn left(&self, x: i32, y: i32) -> bool {
        self.get(x, y, LEFT)
    }

    fn top(&self, x: i32, y: i32) -> bool {
        self.get(x, y, TOP)
    }

    /// Pixels along the line
    fn len(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    /// Whether pixel `t` of line `line` carries the line's edge
    fn on_line(&self, axis: Axis, line: i32, t: i32) -> bool {
        match axis {
            Axis::Horizontal => self.top(t, line),
            Axis::Vertical => self.left(line, t),
        }
    }

    /// Perpendicular edge at the boundary in front of pixel `t`, in the row
    /// (or column) `offset` away from the line's own pixels
    ///
    /// Offset 0 is the side after the edge (below / right), -1 the side
    /// before it (above / left).
    fn crossing(&self, axis: Axis, line: i32, t: i32, offset: i32) -> bool {
        match axis {
            Axis::Horizontal => self.left(t, line + offset),
            Axis::Vertical => self.top(line + offset, t),
        }
    }

    fn crosses(&self, axis: Axis, line: i32, t: i32) -> bool {
        self.crossing(axis, line, t, 0) || self.crossing(axis, line, t, -1)
    }

    /// End pattern at the boundary in front of pixel `t`: before + 3 * after
    fn end_pattern(&self, axis: Axis, line: i32, t: i32) -> u32 {
        self.crossing(axis, line, t, -1) as u32 + 3 * self.crossing(axis, line, t, 0) as u32
    }
}

// ── Lookup tables ────────────────────────────────────────────────────────────

struct Tables<'t> {
    area: &'t Texture,
    search: &'t Texture,
}

impl Tables<'_> {
    /// How many pixels of the last fetched pair extend the line (0..=2)
    fn search_extension(&self, top_code: u32, cross_code: u32) -> i32 {
        let size = SEARCH_TABLE_SIZE as f32;
        let uv = Vec2::new(
            (top_code as f32 + 0.5) / size,
            (cross_code as f32 + 0.5) / size,
        );
        let v = Sampler::POINT_CLAMP.sample(self.search, uv).x;
        ((v * 255.0 / 127.0).round() as i32).clamp(0, 2)
    }

    fn orthogonal_area(&self, p1: u32, p2: u32, d1: u32, d2: u32) -> Vec2 {
        let max = (ORTHO_BLOCK - 1) as f32;
        let dist = Vec2::new((d1 as f32).sqrt().min(max), (d2 as f32).sqrt().min(max));
        let origin = Vec2::new((ORTHO_BLOCK * p1) as f32, (ORTHO_BLOCK * p2) as f32);
        self.sample_area(origin + dist)
    }

    fn diagonal_area(&self, c1: u32, c2: u32, d1: u32, d2: u32) -> Vec2 {
        let max = DIAG_BLOCK - 1;
        let dist = Vec2::new(d1.min(max) as f32, d2.min(max) as f32);
        let origin = Vec2::new((DIAG_OFFSET_X + DIAG_BLOCK * c1) as f32, (DIAG_BLOCK * c2) as f32);
        self.sample_area(origin + dist)
    }

    /// Bilinear lookup at a texel position of the full-size table
    fn sample_area(&self, texel: Vec2) -> Vec2 {
        let uv = (texel + Vec2::splat(0.5)) / Vec2::new(AREA_TABLE_WIDTH as f32, AREA_TABLE_HEIGHT as f32);
        let a = Sampler::BILINEAR_CLAMP.sample(self.area, uv);
        Vec2::new(a.x, a.y)
    }
}

// ── Weights ──────────────────────────────────────────────────────────────────

struct Weigher<'m> {
    map: &'m EdgeMap,
    tables: &'m Tables<'m>,
    max_steps: u32,
    max_steps_diag: u32,
    corner_rounding: f32,
    corners: bool,
    diagonals: bool,
}

impl Weigher<'_> {
    fn weights(&self, x: i32, y: i32) -> Vec4 {
        let mut weights = Vec4::ZERO;

        if self.map.top(x, y) {
            if self.diagonals {
                let diag = self.diagonal_weights(x, y);
                if diag != Vec2::ZERO {
                    // A diagonal hit replaces both orthogonal lines
                    return Vec4::new(diag.x, diag.y, 0.0, 0.0);
                }
            }
            let w = self.orthogonal_weights(Axis::Horizontal, y, x);
            weights.x = w.x;
            weights.y = w.y;
        }

        if self.map.left(x, y) {
            let w = self.orthogonal_weights(Axis::Vertical, x, y);
            weights.z = w.x;
            weights.w = w.y;
        }

        weights
    }

    /// Line lengths (normalised) through each edge, for visualisation
    fn search_lengths(&self, x: i32, y: i32) -> Vec4 {
        let longest = (2 * (2 * self.max_steps + 1)) as f32;
        let length = |axis, line, t| {
            let d1 = self.search(axis, line, t, -1);
            let d2 = self.search(axis, line, t, 1);
            ((d1 + d2) as f32 / longest).min(1.0)
        };
        let h = if self.map.top(x, y) { length(Axis::Horizontal, y, x) } else { 0.0 };
        let v = if self.map.left(x, y) { length(Axis::Vertical, x, y) } else { 0.0 };
        Vec4::new(h, v, 0.0, 1.0)
    }

    /// Distance from `start` to the last pixel of the line in direction `dir`
    ///
    /// Pixels are fetched in pairs, at most `max_steps` pairs beyond the
    /// first; the search table decides how much of the final pair counts.
    fn search(&self, axis: Axis, line: i32, start: i32, dir: i32) -> u32 {
        let len = self.map.len(axis);
        let mut near = start;
        let mut steps = 0;

        loop {
            let far = near + dir;
            let top_code =
                self.map.on_line(axis, line, near) as u32 | (self.map.on_line(axis, line, far) as u32) << 1;
            let (between, beyond) = if dir < 0 { (near, far) } else { (far, far + 1) };
            let cross_code = self.map.crosses(axis, line, between) as u32
                | (self.map.crosses(axis, line, beyond) as u32) << 1;

            let extension = self.tables.search_extension(top_code, cross_code);
            let next = far + dir;
            if extension == 2
                && cross_code & 2 == 0
                && steps < self.max_steps
                && (0..len).contains(&next)
            {
                near = next;
                steps += 1;
                continue;
            }

            let end = (near + dir * (extension - 1)).clamp(0, len - 1);
            return ((end - start) * dir).max(0) as u32;
        }
    }

    /// (pull across the edge from the after side, from the before side)
    fn orthogonal_weights(&self, axis: Axis, line: i32, t: i32) -> Vec2 {
        let d1 = self.search(axis, line, t, -1);
        let d2 = self.search(axis, line, t, 1);
        let start = t - d1 as i32;
        let end = t + d2 as i32 + 1;

        let p1 = self.map.end_pattern(axis, line, start);
        let p2 = self.map.end_pattern(axis, line, end);
        let mut weights = self.tables.orthogonal_area(p1, p2, d1, d2);

        if self.corners {
            weights *= self.corner_factor(axis, line, start, end, d1, d2);
        }
        weights
    }

    /// Attenuate weights where a crossing edge continues past the line end,
    /// i.e. at real corners rather than staircase steps
    fn corner_factor(&self, axis: Axis, line: i32, start: i32, end: i32, d1: u32, d2: u32) -> Vec2 {
        let near = Vec2::new((d1 <= d2) as u32 as f32, (d2 <= d1) as u32 as f32);
        let rounding = (1.0 - self.corner_rounding) * near / (near.x + near.y);

        let cross = |t, offset| self.map.crossing(axis, line, t, offset) as u32 as f32;
        let after = 1.0 - rounding.x * cross(start, 1) - rounding.y * cross(end, 1);
        let before = 1.0 - rounding.x * cross(start, -2) - rounding.y * cross(end, -2);
        Vec2::new(after, before).clamp(Vec2::ZERO, Vec2::ONE)
    }

    /// Weights contributed by diagonal staircases through the pixel
    fn diagonal_weights(&self, x: i32, y: i32) -> Vec2 {
        let map = self.map;
        let mut weights = Vec2::ZERO;

        // "/" staircase: members carry both a left and a top edge
        let rising = |x, y| map.left(x, y) && map.top(x, y);
        if rising(x, y) {
            let d1 = self.follow(x, y, (-1, 1), rising);
            let d2 = self.follow(x, y, (1, -1), rising);
            if d1 + d2 >= 2 {
                let (lx, ly) = (x - d1 as i32, y + d1 as i32);
                let (ux, uy) = (x + d2 as i32, y - d2 as i32);
                let c1 = map.top(lx - 1, ly) as u32 | (map.left(lx, ly + 1) as u32) << 1;
                let c2 = map.top(ux + 1, uy) as u32 | (map.left(ux, uy - 1) as u32) << 1;
                weights += self.tables.diagonal_area(c1, c2, d1, d2);
            }
        }

        // "\" staircase: members carry a top edge and a right edge
        let falling = |x, y| map.top(x, y) && map.left(x + 1, y);
        if falling(x, y) {
            let d1 = self.follow(x, y, (-1, -1), falling);
            let d2 = self.follow(x, y, (1, 1), falling);
            if d1 + d2 >= 2 {
                let (lx, ly) = (x - d1 as i32, y - d1 as i32);
                let (ux, uy) = (x + d2 as i32, y + d2 as i32);
                let c1 = map.top(lx - 1, ly) as u32 | (map.left(lx + 1, ly - 1) as u32) << 1;
                let c2 = map.top(ux + 1, uy) as u32 | (map.left(ux + 1, uy + 1) as u32) << 1;
                weights += self.tables.diagonal_area(c1, c2, d1, d2);
            }
        }

        weights
    }

    /// Staircase members following `(x, y)` in direction `dir`
    fn follow(&self, x: i32, y: i32, dir: (i32, i32), member: impl Fn(i32, i32) -> bool) -> u32 {
        let (mut cx, mut cy) = (x, y);
        let mut steps = 0;
        while steps < self.max_steps_diag && member(cx + dir.0, cy + dir.1) {
            cx += dir.0;
            cy += dir.1;
            steps += 1;
        }
        steps
    }
}
