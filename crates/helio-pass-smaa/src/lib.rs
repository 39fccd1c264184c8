//! Helio SMAA pass - subpixel morphological anti-aliasing as a post-process
//!
//! A single-sample, purely image-space anti-aliasing chain of three passes:
//!
//! - Edge detection (luma, color or depth discontinuities)
//! - Blending weight calculation (line search + precomputed area coverage)
//! - Neighborhood blending (resample each pixel toward its weighted neighbours)
//!
//! The passes are scheduled through a small render graph with transient
//! resource pooling, fed by a settings snapshot resolved from console-style
//! tunables and by two precomputed lookup tables. [`SmaaModule`] wires it into a
//! host's post-process chain through the [`ViewExtension`] capability.

pub mod texture;
pub mod sampler;
pub mod graph;
pub mod resources;
pub mod settings;
pub mod tunables;
pub mod lut;
pub mod passes;
pub mod pipeline;
pub mod extension;

pub use texture::{ScreenPassTexture, Texture, TextureDesc, ViewRect};
pub use sampler::Sampler;
pub use settings::{DebugMode, EdgeDetectionMode, QualityPreset, SettingsResolver, SmaaSettings};
pub use tunables::{RawSettings, Tunables};
pub use lut::{LookupTables, TableSource};
pub use pipeline::{FrameContext, FrameFlags, SmaaPipeline};
pub use extension::{
    ExtensionRegistry, PostProcessInputs, SmaaModule, SmaaModuleConfig, SmaaViewExtension,
    ViewExtension,
};

/// Result type for SMAA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running the SMAA chain
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Asset error: {0}")]
    Asset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported texture format: {0:?}")]
    UnsupportedFormat(wgpu::TextureFormat),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Asset(err.to_string())
    }
}
