//! SMAA pass 3: neighborhood blending

use super::params::NeighborhoodBlendingParams;
use crate::graph::{PassContext, PassResourceBuilder, RenderPass, ResourceHandle};
use crate::sampler::Sampler;
use crate::settings::DebugMode;
use crate::texture::Texture;
use crate::Result;
use glam::{Vec2, Vec4};

/// Below this, a pixel is copied untouched
const MIN_WEIGHT: f32 = 1e-5;

pub struct NeighborhoodBlendingPass {
    color: ResourceHandle,
    weights: ResourceHandle,
    output: ResourceHandle,
    params: NeighborhoodBlendingParams,
}

impl NeighborhoodBlendingPass {
    pub fn new(
        color: ResourceHandle,
        weights: ResourceHandle,
        output: ResourceHandle,
        params: NeighborhoodBlendingParams,
    ) -> Self {
        Self {
            color,
            weights,
            output,
            params,
        }
    }
}

impl RenderPass for NeighborhoodBlendingPass {
    fn name(&self) -> &str {
        "SMAA.NeighborhoodBlending"
    }

    fn declare_resources(&self, builder: &mut PassResourceBuilder) {
        builder.read(self.color).read(self.weights).create(self.output);
    }

    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        let mut output = ctx.take_target(self.output)?;
        let color = ctx.texture(self.color)?;
        let weights = ctx.texture(self.weights)?;
        blend_neighborhood(color, weights, &self.params, &mut output);
        ctx.finish_target(self.output, output);
        Ok(())
    }
}

/// Resample every pixel toward the neighbours its weights point at
///
/// With a debug mode active the weight image (which then holds the
/// visualization) is written out as-is with opaque alpha.
pub fn blend_neighborhood(
    color: &Texture,
    weights: &Texture,
    params: &NeighborhoodBlendingParams,
    out: &mut Texture,
) {
    let debug = DebugMode::from_index(params.debug_mode as i32);

    for y in 0..out.height() {
        for x in 0..out.width() {
            if debug.is_active() {
                let w = weights.load(x, y);
                out.store(x, y, Vec4::new(w.x, w.y, w.z, 1.0));
                continue;
            }

            let (xi, yi) = (x as i32, y as i32);
            let here = weights.load(x, y);
            let pull_up = here.x;
            let pull_left = here.z;
            let pull_down = weights.fetch(xi, yi + 1).map_or(0.0, |w| w.y);
            let pull_right = weights.fetch(xi + 1, yi).map_or(0.0, |w| w.w);

            let horizontal = pull_left.max(pull_right);
            let vertical = pull_up.max(pull_down);
            if horizontal.max(vertical) < MIN_WEIGHT {
                out.store(x, y, color.load(x, y));
                continue;
            }

            let (o1, o2, w1, w2) = if horizontal > vertical {
                (Vec2::new(-pull_left, 0.0), Vec2::new(pull_right, 0.0), pull_left, pull_right)
            } else {
                (Vec2::new(0.0, -pull_up), Vec2::new(0.0, pull_down), pull_up, pull_down)
            };

            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let sampler = Sampler::BILINEAR_CLAMP;
            let blended = sampler.sample_texel_space(color, center + o1) * w1
                + sampler.sample_texel_space(color, center + o2) * w2;
            out.store(x, y, blended / (w1 + w2));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SmaaSettings;
    use crate::texture::TextureDesc;
    use wgpu::TextureFormat;

    fn checker() -> Texture {
        Texture::from_fn("checker", TextureDesc::new(4, 4, TextureFormat::Rgba8UnormSrgb), |x, y| {
            if (x + y) % 2 == 0 {
                Vec4::new(0.9, 0.2, 0.1, 1.0)
            } else {
                Vec4::new(0.05, 0.4, 0.7, 0.5)
            }
        })
        .unwrap()
    }

    fn blend(color: &Texture, weights: &Texture, settings: &SmaaSettings) -> Texture {
        let params = NeighborhoodBlendingParams::new(settings, color.width(), color.height());
        let mut out = Texture::new("out", *color.desc()).unwrap();
        blend_neighborhood(color, weights, &params, &mut out);
        out
    }

    fn weights(w: u32, h: u32, marks: &[(u32, u32, Vec4)]) -> Texture {
        let mut tex = Texture::new("w", TextureDesc::new(w, h, TextureFormat::Rgba16Float)).unwrap();
        for &(x, y, v) in marks {
            tex.store(x, y, v);
        }
        tex
    }

    #[test]
    fn test_zero_weights_copy_exactly() {
        let color = checker();
        let out = blend(&color, &weights(4, 4, &[]), &SmaaSettings::default());
        assert_eq!(out.texels(), color.texels());
    }

    #[test]
    fn test_pull_from_above() {
        let color = Texture::from_fn("col", TextureDesc::new(2, 2, TextureFormat::Rgba32Float), |_, y| {
            Vec4::splat(if y == 0 { 1.0 } else { 0.0 })
        })
        .unwrap();
        let w = weights(2, 2, &[(0, 1, Vec4::new(0.25, 0.0, 0.0, 0.0))]);
        let out = blend(&color, &w, &SmaaSettings::default());
        assert!((out.load(0, 1).x - 0.25).abs() < 1e-6);
        assert_eq!(out.load(1, 1).x, 0.0);
        assert_eq!(out.load(0, 0).x, 1.0);
    }

    #[test]
    fn test_neighbour_weights_pull_this_pixel() {
        // The pixel right of (0, 0) says its left neighbour pulls from it
        let color = Texture::from_fn("col", TextureDesc::new(2, 1, TextureFormat::Rgba32Float), |x, _| {
            Vec4::splat(x as f32)
        })
        .unwrap();
        let w = weights(2, 1, &[(1, 0, Vec4::new(0.0, 0.0, 0.0, 0.5))]);
        let out = blend(&color, &w, &SmaaSettings::default());
        assert!((out.load(0, 0).x - 0.5).abs() < 1e-6);
        assert_eq!(out.load(1, 0).x, 1.0);
    }

    #[test]
    fn test_dominant_axis_wins() {
        let color = Texture::from_fn("col", TextureDesc::new(3, 3, TextureFormat::Rgba32Float), |x, y| {
            Vec4::new(x as f32, y as f32, 0.0, 1.0)
        })
        .unwrap();
        let w = weights(3, 3, &[(1, 1, Vec4::new(0.1, 0.0, 0.4, 0.0))]);
        let out = blend(&color, &w, &SmaaSettings::default());
        let c = out.load(1, 1);
        assert!((c.x - 0.6).abs() < 1e-3, "{c:?}");
        assert_eq!(c.y, 1.0);
    }

    #[test]
    fn test_debug_outputs_weights_raw() {
        let color = checker();
        let w = weights(4, 4, &[(2, 2, Vec4::new(0.5, 0.25, 0.0, 0.0))]);
        let out = blend(&color, &w, &SmaaSettings::default().with_debug_mode(DebugMode::BlendWeights));
        assert_eq!(out.format(), TextureFormat::Rgba8UnormSrgb);
        assert_eq!(out.load(0, 0), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!((out.load(2, 2).x - 0.5).abs() < 0.01);
    }
}
