//! SMAA pass 1: edge detection
//!
//! Marks, for every pixel, whether it differs from its left neighbour (red)
//! and from its top neighbour (green). Luma and color deltas are taken on
//! gamma-encoded values when the scene color is an sRGB format.

use super::params::EdgeDetectionParams;
use crate::graph::{PassContext, PassResourceBuilder, RenderPass, ResourceHandle};
use crate::settings::EdgeDetectionMode;
use crate::texture::{linear_to_srgb, Texture};
use crate::Result;
use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

/// Rec. 709 luma weights
pub const LUMA_WEIGHTS: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

pub struct EdgeDetectionPass {
    color: ResourceHandle,
    depth: ResourceHandle,
    output: ResourceHandle,
    params: EdgeDetectionParams,
}

impl EdgeDetectionPass {
    /// `depth` may alias `color` when no depth image is bound
    pub fn new(
        color: ResourceHandle,
        depth: ResourceHandle,
        output: ResourceHandle,
        params: EdgeDetectionParams,
    ) -> Self {
        Self {
            color,
            depth,
            output,
            params,
        }
    }
}

impl RenderPass for EdgeDetectionPass {
    fn name(&self) -> &str {
        "SMAA.EdgeDetection"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.read(self.color).read(self.depth).create(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let mut edges = ctx.take_target(self.output)?;
        let color = ctx.texture(self.color)?;
        let depth = ctx.texture(self.depth)?;
        detect_edges(color, depth, &self.params, &mut edges);
        ctx.finish_target(self.output, edges);
        Ok(())
    }
}

/// Run edge detection over the whole target
pub fn detect_edges(color: &Texture, depth: &Texture, params: &EdgeDetectionParams, out: &mut Texture) {
    let mode = EdgeDetectionMode::from_index(params.mode as i32);
    let encoded = color.format().is_srgb();
    let c = |x, y| perceptual(color, encoded, x, y);
    for y in 0..out.height() as i32 {
        for x in 0..out.width() as i32 {
            let edges = match mode {
                EdgeDetectionMode::Luma => contrast_edges(x, y, params, |x, y| c(x, y).dot(LUMA_WEIGHTS)),
                EdgeDetectionMode::Color => color_edges(&c, x, y, params),
                EdgeDetectionMode::Depth => depth_edges(depth, x, y, params),
            };
            out.store(x as u32, y as u32, Vec4::new(edges.x, edges.y, 0.0, 0.0));
        }
    }
}

/// Texel as the shader would sample it through a non-sRGB view
fn perceptual(color: &Texture, encoded: bool, x: i32, y: i32) -> Vec3 {
    let rgb = color.load_clamped(x, y).xyz();
    if encoded {
        Vec3::new(linear_to_srgb(rgb.x), linear_to_srgb(rgb.y), linear_to_srgb(rgb.z))
    } else {
        rgb
    }
}

fn step(edge: f32, x: f32) -> f32 {
    if x >= edge {
        1.0
    } else {
        0.0
    }
}

/// Threshold test followed by local contrast adaptation on a scalar signal
fn contrast_edges(x: i32, y: i32, params: &EdgeDetectionParams, value: impl Fn(i32, i32) -> f32) -> Vec2 {
    let center = value(x, y);
    let left = value(x - 1, y);
    let top = value(x, y - 1);
    let delta = Vec2::new((center - left).abs(), (center - top).abs());

    let edges = Vec2::new(step(params.threshold, delta.x), step(params.threshold, delta.y));
    if edges == Vec2::ZERO {
        return edges;
    }

    // An edge next to a much stronger one is dropped
    let max_delta = delta
        .max_element()
        .max((center - value(x + 1, y)).abs())
        .max((center - value(x, y + 1)).abs())
        .max((left - value(x - 2, y)).abs())
        .max((top - value(x, y - 2)).abs());

    let factor = params.local_contrast_adaptation;
    edges * Vec2::new(step(max_delta, factor * delta.x), step(max_delta, factor * delta.y))
}

fn color_edges(c: impl Fn(i32, i32) -> Vec3, x: i32, y: i32, params: &EdgeDetectionParams) -> Vec2 {
    let channel_delta = |a: Vec3, b: Vec3| (a - b).abs().max_element();

    let center = c(x, y);
    let left = c(x - 1, y);
    let top = c(x, y - 1);
    let delta = Vec2::new(channel_delta(center, left), channel_delta(center, top));

    let edges = Vec2::new(step(params.threshold, delta.x), step(params.threshold, delta.y));
    if edges == Vec2::ZERO {
        return edges;
    }

    let max_delta = delta
        .max_element()
        .max(channel_delta(center, c(x + 1, y)))
        .max(channel_delta(center, c(x, y + 1)))
        .max(channel_delta(left, c(x - 2, y)))
        .max(channel_delta(top, c(x, y - 2)));

    let factor = params.local_contrast_adaptation;
    edges * Vec2::new(step(max_delta, factor * delta.x), step(max_delta, factor * delta.y))
}

fn depth_edges(depth: &Texture, x: i32, y: i32, params: &EdgeDetectionParams) -> Vec2 {
    let d = |x, y| depth.load_clamped(x, y).x;
    let center = d(x, y);
    let delta = Vec2::new((center - d(x - 1, y)).abs(), (center - d(x, y - 1)).abs());
    Vec2::new(
        step(params.depth_threshold, delta.x),
        step(params.depth_threshold, delta.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SmaaSettings;
    use crate::texture::TextureDesc;
    use wgpu::TextureFormat;

    fn run(color: &Texture, depth: &Texture, settings: &SmaaSettings, mode: EdgeDetectionMode) -> Texture {
        let (w, h) = (color.width(), color.height());
        let params = EdgeDetectionParams::new(settings, mode, w, h);
        let mut out = Texture::new("edges", TextureDesc::new(w, h, TextureFormat::Rgba8Unorm)).unwrap();
        detect_edges(color, depth, &params, &mut out);
        out
    }

    fn image(w: u32, h: u32, f: impl Fn(u32, u32) -> f32) -> Texture {
        Texture::from_fn("img", TextureDesc::new(w, h, TextureFormat::Rgba8Unorm), |x, y| {
            let v = f(x, y);
            Vec4::new(v, v, v, 1.0)
        })
        .unwrap()
    }

    #[test]
    fn test_vertical_boundary_marks_left_edges_only() {
        let img = image(8, 4, |x, _| if x >= 4 { 1.0 } else { 0.0 });
        let edges = run(&img, &img, &SmaaSettings::default(), EdgeDetectionMode::Luma);
        for y in 0..4 {
            for x in 0..8 {
                let e = edges.load(x, y);
                assert_eq!(e.x, if x == 4 { 1.0 } else { 0.0 }, "left edge at {x},{y}");
                assert_eq!(e.y, 0.0, "top edge at {x},{y}");
            }
        }
    }

    #[test]
    fn test_threshold_suppresses_weak_edges() {
        let img = image(6, 6, |_, y| if y >= 3 { 0.3 } else { 0.2 });
        let low = run(&img, &img, &SmaaSettings::default().with_threshold(0.05), EdgeDetectionMode::Luma);
        assert_eq!(low.load(2, 3).y, 1.0);
        let high = run(&img, &img, &SmaaSettings::default().with_threshold(0.3), EdgeDetectionMode::Luma);
        assert!(high.texels().iter().all(|e| e.x == 0.0 && e.y == 0.0));
    }

    #[test]
    fn test_local_contrast_drops_edge_beside_stronger_one() {
        // Columns: 0.0 0.0 | 0.15 | 1.0 1.0; the 0.15 step sits next to a 0.85 step
        let img = image(6, 3, |x, _| match x {
            0 | 1 => 0.0,
            2 => 0.15,
            _ => 1.0,
        });
        let edges = run(&img, &img, &SmaaSettings::default(), EdgeDetectionMode::Luma);
        assert_eq!(edges.load(2, 1).x, 0.0);
        assert_eq!(edges.load(3, 1).x, 1.0);
    }

    #[test]
    fn test_color_mode_sees_isoluminant_edges() {
        // Red and a green of roughly equal luma
        let img = Texture::from_fn("rg", TextureDesc::new(4, 2, TextureFormat::Rgba8Unorm), |x, _| {
            if x < 2 {
                Vec4::new(0.7152, 0.0, 0.0, 1.0)
            } else {
                Vec4::new(0.0, 0.2126, 0.0, 1.0)
            }
        })
        .unwrap();
        let luma = run(&img, &img, &SmaaSettings::default(), EdgeDetectionMode::Luma);
        assert_eq!(luma.load(2, 0).x, 0.0);
        let color = run(&img, &img, &SmaaSettings::default(), EdgeDetectionMode::Color);
        assert_eq!(color.load(2, 0).x, 1.0);
    }

    #[test]
    fn test_depth_mode_reads_depth_not_color() {
        let color = image(4, 4, |_, _| 0.5);
        let depth = Texture::from_fn("depth", TextureDesc::new(4, 4, TextureFormat::Depth32Float), |_, y| {
            Vec4::splat(if y >= 2 { 0.9 } else { 0.1 })
        })
        .unwrap();
        let edges = run(&color, &depth, &SmaaSettings::default(), EdgeDetectionMode::Depth);
        assert_eq!(edges.load(1, 2).y, 1.0);
        assert_eq!(edges.load(1, 1).y, 0.0);
        assert!(edges.texels().iter().all(|e| e.x == 0.0));
    }

    #[test]
    fn test_srgb_color_is_compared_gamma_encoded() {
        // 0.002 against 0.02 linear: a 0.018 step, about 0.125 once encoded
        let dark = |format| {
            Texture::from_fn("dark", TextureDesc::new(4, 2, format), |x, _| {
                let v = if x < 2 { 0.002 } else { 0.02 };
                Vec4::new(v, v, v, 1.0)
            })
            .unwrap()
        };
        let srgb = dark(TextureFormat::Rgba8UnormSrgb);
        let linear = dark(TextureFormat::Rgba32Float);
        for mode in [EdgeDetectionMode::Luma, EdgeDetectionMode::Color] {
            let edges = run(&srgb, &srgb, &SmaaSettings::default(), mode);
            assert_eq!(edges.load(2, 0).x, 1.0, "{mode:?} on sRGB");
            let edges = run(&linear, &linear, &SmaaSettings::default(), mode);
            assert_eq!(edges.load(2, 0).x, 0.0, "{mode:?} on linear");
        }
    }
}
