//! SMAA chain assembly: eligibility and one invocation of the three passes

use crate::graph::{GraphContext, RenderGraph, ResourceHandle};
use crate::lut::{neutral_table, LookupTables, TableKind};
use crate::passes::{
    BlendingWeightParams, BlendingWeightPass, EdgeDetectionParams, EdgeDetectionPass,
    NeighborhoodBlendingParams, NeighborhoodBlendingPass, EDGES_FORMAT, WEIGHTS_FORMAT,
};
use crate::resources::TexturePool;
use crate::settings::{EdgeDetectionMode, SmaaSettings};
use crate::texture::{ScreenPassTexture, Texture, TextureDesc};
use crate::{Error, Result};
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Per-view conditions the host reports each frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FrameFlags: u32 {
        const WIREFRAME = 1 << 0;
        const SCENE_CAPTURE = 1 << 1;
        const REFLECTION_CAPTURE = 1 << 2;
    }
}

/// Frame-level state consulted by the gate
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameContext {
    pub frame: u64,
    pub flags: FrameFlags,
}

impl FrameContext {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            flags: FrameFlags::empty(),
        }
    }

    pub fn with_flags(mut self, flags: FrameFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// The three-pass SMAA chain
pub struct SmaaPipeline {
    tables: Arc<LookupTables>,
}

impl SmaaPipeline {
    pub fn new(tables: Arc<LookupTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &Arc<LookupTables> {
        &self.tables
    }

    /// Whether the chain applies to this frame at all
    pub fn should_run(frame: &FrameContext, settings: &SmaaSettings) -> bool {
        let excluded = FrameFlags::WIREFRAME | FrameFlags::SCENE_CAPTURE | FrameFlags::REFLECTION_CAPTURE;
        settings.enabled() && !frame.flags.intersects(excluded)
    }

    /// Run edge detection, blending weight calculation and neighborhood
    /// blending, in that order
    ///
    /// The result is newly allocated with the input's dimensions, format and
    /// view rect. Depth edge detection without a depth image falls back to
    /// luma; missing lookup tables fall back to neutral ones.
    pub fn run(
        &self,
        frame: &FrameContext,
        color: &ScreenPassTexture<'_>,
        depth: Option<&Texture>,
        settings: &SmaaSettings,
    ) -> Result<ScreenPassTexture<'static>> {
        let input = color.texture();
        if !color.is_valid() {
            return Err(Error::InvalidInput(format!(
                "view rect {:?} does not fit {}x{} scene color",
                color.view_rect,
                input.width(),
                input.height()
            )));
        }
        if input.format().is_depth_stencil_format() {
            return Err(Error::InvalidInput(format!(
                "scene color has depth format {:?}",
                input.format()
            )));
        }

        let (width, height) = (input.width(), input.height());
        let mode = match (settings.edge_detection_mode(), depth) {
            (EdgeDetectionMode::Depth, None) => {
                log::debug!("No depth bound; SMAA edge detection falls back to luma");
                EdgeDetectionMode::Luma
            }
            (EdgeDetectionMode::Depth, Some(depth)) if depth.extent() != input.extent() => {
                return Err(Error::InvalidInput(format!(
                    "depth is {}x{}, scene color is {}x{}",
                    depth.width(),
                    depth.height(),
                    width,
                    height
                )));
            }
            (mode, _) => mode,
        };

        // ── Lookup tables ────────────────────────────────────────────────────
        self.tables.load();
        let fallback_area;
        let area = match self.tables.area_table() {
            Some(table) => table,
            None => {
                fallback_area = neutral_table(TableKind::Area)?;
                &fallback_area
            }
        };
        let fallback_search;
        let search = match self.tables.search_table() {
            Some(table) => table,
            None => {
                fallback_search = neutral_table(TableKind::Search)?;
                &fallback_search
            }
        };

        // ── Graph ────────────────────────────────────────────────────────────
        let mut graph = RenderGraph::new();
        let color_h = graph.import("SMAA.SceneColor", input);
        let depth_h = match (mode, depth) {
            (EdgeDetectionMode::Depth, Some(depth)) => graph.import("SMAA.SceneDepth", depth),
            _ => color_h,
        };
        let area_h = graph.import("SMAA.AreaTex", area);
        let search_h = graph.import("SMAA.SearchTex", search);

        let edges_h = ResourceHandle::named("SMAA.Edges");
        let weights_h = ResourceHandle::named("SMAA.BlendingWeights");
        let output_h = ResourceHandle::named("SMAA.Output");
        graph.declare_transient(edges_h, "SMAA.Edges", TextureDesc::new(width, height, EDGES_FORMAT));
        graph.declare_transient(
            weights_h,
            "SMAA.BlendingWeights",
            TextureDesc::new(width, height, WEIGHTS_FORMAT),
        );
        graph.declare_transient(output_h, "SMAA.Output", TextureDesc::new(width, height, input.format()));
        graph.mark_output(output_h);

        graph.add_pass(EdgeDetectionPass::new(
            color_h,
            depth_h,
            edges_h,
            EdgeDetectionParams::new(settings, mode, width, height),
        ));
        graph.add_pass(BlendingWeightPass::new(
            edges_h,
            area_h,
            search_h,
            weights_h,
            BlendingWeightParams::new(settings, width, height),
        ));
        graph.add_pass(NeighborhoodBlendingPass::new(
            color_h,
            weights_h,
            output_h,
            NeighborhoodBlendingParams::new(settings, width, height),
        ));
        graph.build()?;

        let mut pool = TexturePool::new();
        graph.execute(&mut GraphContext {
            pool: &mut pool,
            frame: frame.frame,
        })?;
        let output = graph.take_output(output_h)?;

        log::trace!(
            "SMAA frame {}: {}x{} {:?}, {:?} edges, debug {:?}, pool {:?}",
            frame.frame,
            width,
            height,
            input.format(),
            mode,
            settings.debug_mode(),
            pool.stats()
        );
        Ok(ScreenPassTexture::owned(output, color.view_rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::ViewRect;
    use wgpu::TextureFormat;

    fn enabled() -> SmaaSettings {
        SmaaSettings::default().with_enabled(true)
    }

    #[test]
    fn test_should_run_gate() {
        let frame = FrameContext::new(1);
        assert!(SmaaPipeline::should_run(&frame, &enabled()));
        assert!(!SmaaPipeline::should_run(&frame, &SmaaSettings::default()));
        for flag in [FrameFlags::WIREFRAME, FrameFlags::SCENE_CAPTURE, FrameFlags::REFLECTION_CAPTURE] {
            assert!(!SmaaPipeline::should_run(&frame.with_flags(flag), &enabled()));
        }
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let pipeline = SmaaPipeline::new(Arc::new(LookupTables::baked()));
        let frame = FrameContext::new(0);
        let color = Texture::new("c", TextureDesc::new(8, 8, TextureFormat::Rgba8Unorm)).unwrap();

        let outside = ScreenPassTexture::new(&color, ViewRect::new(4, 4, 8, 8));
        assert!(matches!(pipeline.run(&frame, &outside, None, &enabled()), Err(Error::InvalidInput(_))));

        let depth = Texture::new("d", TextureDesc::new(4, 8, TextureFormat::Depth32Float)).unwrap();
        let full = ScreenPassTexture::full(&color);
        let depth_mode = enabled().with_edge_detection_mode(EdgeDetectionMode::Depth);
        assert!(matches!(pipeline.run(&frame, &full, Some(&depth), &depth_mode), Err(Error::InvalidInput(_))));

        let as_color = ScreenPassTexture::full(&depth);
        assert!(matches!(pipeline.run(&frame, &as_color, None, &enabled()), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_output_is_new_and_keeps_view_rect() {
        let pipeline = SmaaPipeline::new(Arc::new(LookupTables::baked()));
        let color = Texture::new("c", TextureDesc::new(16, 8, TextureFormat::Rgba16Float)).unwrap();
        let input = ScreenPassTexture::new(&color, ViewRect::new(2, 1, 12, 6));
        let output = pipeline.run(&FrameContext::new(3), &input, None, &enabled()).unwrap();
        assert!(!output.is_borrowed());
        assert_eq!(output.view_rect, input.view_rect);
        assert_eq!(output.texture().desc().format, TextureFormat::Rgba16Float);
        assert_eq!(output.texture().extent(), color.extent());
    }

    #[test]
    fn test_unread_depth_size_is_not_checked() {
        let pipeline = SmaaPipeline::new(Arc::new(LookupTables::baked()));
        let color = Texture::new("c", TextureDesc::new(8, 8, TextureFormat::Rgba8Unorm)).unwrap();
        let depth = Texture::new("d", TextureDesc::new(4, 8, TextureFormat::Depth32Float)).unwrap();
        let full = ScreenPassTexture::full(&color);
        for mode in [EdgeDetectionMode::Luma, EdgeDetectionMode::Color] {
            let settings = enabled().with_edge_detection_mode(mode);
            let output = pipeline.run(&FrameContext::new(0), &full, Some(&depth), &settings).unwrap();
            assert_eq!(output.texture().extent(), color.extent());
        }
    }
}
