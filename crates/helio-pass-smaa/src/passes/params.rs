//! Per-pass parameter blocks
//!
//! Laid out like the uniform buffers a GPU implementation would bind
//! (16-byte multiples, no implicit padding).

use crate::settings::{EdgeDetectionMode, SmaaSettings};
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

/// SMAA_CORNER_ROUNDING, in percent
pub const CORNER_ROUNDING: f32 = 25.0;
/// Depth edges use a tenth of the color threshold
pub const DEPTH_THRESHOLD_SCALE: f32 = 0.1;

bitflags! {
    /// Optional stages of the blending weight pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlendingFlags: u32 {
        const CORNER_DETECTION = 1 << 0;
        const DIAGONAL_DETECTION = 1 << 1;
    }
}

/// (1/width, 1/height, width, height)
pub fn rt_metrics(width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width as f32, height as f32);
    [1.0 / w, 1.0 / h, w, h]
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct EdgeDetectionParams {
    pub rt_metrics: [f32; 4],
    pub threshold: f32,
    pub depth_threshold: f32,
    pub local_contrast_adaptation: f32,
    pub mode: u32,
}

impl EdgeDetectionParams {
    /// `mode` is the effective mode, after any depth fallback
    pub fn new(settings: &SmaaSettings, mode: EdgeDetectionMode, width: u32, height: u32) -> Self {
        Self {
            rt_metrics: rt_metrics(width, height),
            threshold: settings.threshold(),
            depth_threshold: settings.threshold() * DEPTH_THRESHOLD_SCALE,
            local_contrast_adaptation: settings.local_contrast_adaptation(),
            mode: mode.index(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlendingWeightParams {
    pub rt_metrics: [f32; 4],
    pub max_search_steps: u32,
    pub max_search_steps_diag: u32,
    pub corner_rounding: f32,
    pub flags: u32,
    pub debug_mode: u32,
    pub _pad: [u32; 3],
}

impl BlendingWeightParams {
    pub fn new(settings: &SmaaSettings, width: u32, height: u32) -> Self {
        let mut flags = BlendingFlags::empty();
        flags.set(BlendingFlags::CORNER_DETECTION, settings.corner_detection());
        flags.set(BlendingFlags::DIAGONAL_DETECTION, settings.diagonal_detection());

        Self {
            rt_metrics: rt_metrics(width, height),
            max_search_steps: settings.max_search_steps(),
            max_search_steps_diag: settings.max_search_steps_diag(),
            corner_rounding: CORNER_ROUNDING,
            flags: flags.bits(),
            debug_mode: settings.debug_mode().index(),
            _pad: [0; 3],
        }
    }

    pub fn flags(&self) -> BlendingFlags {
        BlendingFlags::from_bits_truncate(self.flags)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct NeighborhoodBlendingParams {
    pub rt_metrics: [f32; 4],
    pub debug_mode: u32,
    pub _pad: [u32; 3],
}

impl NeighborhoodBlendingParams {
    pub fn new(settings: &SmaaSettings, width: u32, height: u32) -> Self {
        Self {
            rt_metrics: rt_metrics(width, height),
            debug_mode: settings.debug_mode().index(),
            _pad: [0; 3],
        }
    }
}
