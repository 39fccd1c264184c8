//! Resolved, range-checked SMAA settings

use crate::tunables::{RawSettings, Tunables};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Quality preset; fixes the diagonal search step limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    /// Out-of-range indices clamp to the nearest preset
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 3) as usize]
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    /// Pixels followed along a diagonal in each direction
    pub fn max_search_steps_diag(self) -> u32 {
        match self {
            QualityPreset::Low => 2,
            QualityPreset::Medium => 4,
            QualityPreset::High => 8,
            QualityPreset::Ultra => 16,
        }
    }
}

/// Which signal the edge detection pass compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeDetectionMode {
    #[default]
    Luma,
    Color,
    Depth,
}

impl EdgeDetectionMode {
    pub const ALL: [EdgeDetectionMode; 3] = [Self::Luma, Self::Color, Self::Depth];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 2) as usize]
    }

    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Debug visualization replacing the normal output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DebugMode {
    #[default]
    None,
    Edges,
    BlendWeights,
    SearchTexture,
    AreaTexture,
    SearchSteps,
    TextureDimensions,
}

impl DebugMode {
    pub const ALL: [DebugMode; 7] = [
        Self::None,
        Self::Edges,
        Self::BlendWeights,
        Self::SearchTexture,
        Self::AreaTexture,
        Self::SearchSteps,
        Self::TextureDimensions,
    ];

    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.clamp(0, 6) as usize]
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn is_active(self) -> bool {
        self != DebugMode::None
    }
}

/// Immutable settings snapshot for one invocation
///
/// Every constructor and `with_*` method clamps, so a snapshot is always in
/// range. Non-finite floats fall back to their defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmaaSettings {
    enabled: bool,
    quality: QualityPreset,
    edge_detection_mode: EdgeDetectionMode,
    threshold: f32,
    local_contrast_adaptation: f32,
    max_search_steps: u32,
    corner_detection: bool,
    diagonal_detection: bool,
    debug_mode: DebugMode,
}

impl SmaaSettings {
    pub const MIN_THRESHOLD: f32 = 0.01;
    pub const MAX_THRESHOLD: f32 = 0.5;
    pub const DEFAULT_THRESHOLD: f32 = 0.1;
    pub const MIN_LOCAL_CONTRAST_ADAPTATION: f32 = 1.0;
    pub const MAX_LOCAL_CONTRAST_ADAPTATION: f32 = 4.0;
    pub const DEFAULT_LOCAL_CONTRAST_ADAPTATION: f32 = 2.0;
    pub const MAX_SEARCH_STEPS: u32 = 112;
    pub const DEFAULT_SEARCH_STEPS: u32 = 32;

    /// Resolve raw tunable values
    pub fn from_raw(raw: &RawSettings) -> Self {
        Self {
            enabled: raw.enable != 0,
            quality: QualityPreset::from_index(raw.quality),
            edge_detection_mode: EdgeDetectionMode::from_index(raw.edge_detection_mode),
            threshold: clamp_finite(
                raw.threshold,
                Self::MIN_THRESHOLD,
                Self::MAX_THRESHOLD,
                Self::DEFAULT_THRESHOLD,
            ),
            local_contrast_adaptation: clamp_finite(
                raw.local_contrast_adaptation,
                Self::MIN_LOCAL_CONTRAST_ADAPTATION,
                Self::MAX_LOCAL_CONTRAST_ADAPTATION,
                Self::DEFAULT_LOCAL_CONTRAST_ADAPTATION,
            ),
            max_search_steps: raw.max_search_steps.clamp(0, Self::MAX_SEARCH_STEPS as i32) as u32,
            corner_detection: raw.corner_detection != 0,
            diagonal_detection: raw.diagonal_detection != 0,
            debug_mode: DebugMode::from_index(raw.debug_mode),
        }
    }

    // ── Builder ──────────────────────────────────────────────────────────────

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_quality(mut self, quality: QualityPreset) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_edge_detection_mode(mut self, mode: EdgeDetectionMode) -> Self {
        self.edge_detection_mode = mode;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = clamp_finite(
            threshold,
            Self::MIN_THRESHOLD,
            Self::MAX_THRESHOLD,
            Self::DEFAULT_THRESHOLD,
        );
        self
    }

    pub fn with_local_contrast_adaptation(mut self, factor: f32) -> Self {
        self.local_contrast_adaptation = clamp_finite(
            factor,
            Self::MIN_LOCAL_CONTRAST_ADAPTATION,
            Self::MAX_LOCAL_CONTRAST_ADAPTATION,
            Self::DEFAULT_LOCAL_CONTRAST_ADAPTATION,
        );
        self
    }

    pub fn with_max_search_steps(mut self, steps: u32) -> Self {
        self.max_search_steps = steps.min(Self::MAX_SEARCH_STEPS);
        self
    }

    pub fn with_corner_detection(mut self, enabled: bool) -> Self {
        self.corner_detection = enabled;
        self
    }

    pub fn with_diagonal_detection(mut self, enabled: bool) -> Self {
        self.diagonal_detection = enabled;
        self
    }

    pub fn with_debug_mode(mut self, mode: DebugMode) -> Self {
        self.debug_mode = mode;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn quality(&self) -> QualityPreset {
        self.quality
    }

    pub fn edge_detection_mode(&self) -> EdgeDetectionMode {
        self.edge_detection_mode
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn local_contrast_adaptation(&self) -> f32 {
        self.local_contrast_adaptation
    }

    pub fn max_search_steps(&self) -> u32 {
        self.max_search_steps
    }

    pub fn max_search_steps_diag(&self) -> u32 {
        self.quality.max_search_steps_diag()
    }

    pub fn corner_detection(&self) -> bool {
        self.corner_detection
    }

    pub fn diagonal_detection(&self) -> bool {
        self.diagonal_detection
    }

    pub fn debug_mode(&self) -> DebugMode {
        self.debug_mode
    }
}

impl Default for SmaaSettings {
    fn default() -> Self {
        Self::from_raw(&RawSettings::default())
    }
}

fn clamp_finite(value: f32, min: f32, max: f32, default: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        default
    }
}

/// Produces a fresh snapshot from the shared tunables
#[derive(Debug)]
pub struct SettingsResolver {
    tunables: Arc<Tunables>,
    resolved: AtomicUsize,
}

impl SettingsResolver {
    pub fn new(tunables: Arc<Tunables>) -> Self {
        Self {
            tunables,
            resolved: AtomicUsize::new(0),
        }
    }

    pub fn resolve(&self) -> SmaaSettings {
        self.resolved.fetch_add(1, Ordering::Relaxed);
        let settings = SmaaSettings::from_raw(&self.tunables.snapshot());
        log::trace!("Resolved SMAA settings: {:?}", settings);
        settings
    }

    /// Snapshots taken so far
    pub fn resolve_count(&self) -> usize {
        self.resolved.load(Ordering::Relaxed)
    }

    pub fn tunables(&self) -> &Arc<Tunables> {
        &self.tunables
    }
}
