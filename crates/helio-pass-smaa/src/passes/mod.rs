//! The three SMAA passes
//!
//! Each pass is a [`RenderPass`](crate::graph::RenderPass) wrapping a plain
//! kernel function, so the kernels can also be driven directly.

pub mod params;
mod edge_detection;
mod blending_weight;
mod neighborhood_blending;

pub use params::{
    BlendingFlags, BlendingWeightParams, EdgeDetectionParams, NeighborhoodBlendingParams,
};
pub use edge_detection::{detect_edges, EdgeDetectionPass, LUMA_WEIGHTS};
pub use blending_weight::{calculate_blending_weights, BlendingWeightPass};
pub use neighborhood_blending::{blend_neighborhood, NeighborhoodBlendingPass};

/// Intermediate formats
pub const EDGES_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const WEIGHTS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
