//! Console-variable style tunables
//!
//! Values are stored raw, exactly as a user typed them; range checks happen
//! when a [`SmaaSettings`](crate::SmaaSettings) snapshot is resolved.

use crate::{Error, Result};
use parking_lot::RwLock;

/// Unvalidated tunable values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSettings {
    pub enable: i32,
    pub quality: i32,
    pub edge_detection_mode: i32,
    pub threshold: f32,
    pub local_contrast_adaptation: f32,
    pub max_search_steps: i32,
    pub corner_detection: i32,
    pub diagonal_detection: i32,
    pub debug_mode: i32,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            enable: 0,
            quality: 2,
            edge_detection_mode: 0,
            threshold: 0.1,
            local_contrast_adaptation: 2.0,
            max_search_steps: 32,
            corner_detection: 1,
            diagonal_detection: 1,
            debug_mode: 0,
        }
    }
}

/// Description of one tunable
#[derive(Debug, Clone, Copy)]
pub struct TunableInfo {
    pub name: &'static str,
    pub env: &'static str,
    pub help: &'static str,
}

pub const TUNABLES: &[TunableInfo] = &[
    TunableInfo {
        name: "r.SMAA.Enable",
        env: "SMAA_ENABLE",
        help: "Enable SMAA. 0: off, 1: on",
    },
    TunableInfo {
        name: "r.SMAA.Quality",
        env: "SMAA_QUALITY",
        help: "Quality preset. 0: Low, 1: Medium, 2: High, 3: Ultra",
    },
    TunableInfo {
        name: "r.SMAA.EdgeDetectionMode",
        env: "SMAA_EDGE_DETECTION_MODE",
        help: "Edge detection input. 0: Luma, 1: Color, 2: Depth",
    },
    TunableInfo {
        name: "r.SMAA.Threshold",
        env: "SMAA_THRESHOLD",
        help: "Edge detection threshold, clamped to [0.01, 0.5]",
    },
    TunableInfo {
        name: "r.SMAA.LocalContrastAdaptation",
        env: "SMAA_LOCAL_CONTRAST_ADAPTATION",
        help: "Local contrast adaptation factor, clamped to [1, 4]",
    },
    TunableInfo {
        name: "r.SMAA.MaxSearchSteps",
        env: "SMAA_MAX_SEARCH_STEPS",
        help: "Maximum orthogonal search steps, clamped to [0, 112]",
    },
    TunableInfo {
        name: "r.SMAA.CornerDetection",
        env: "SMAA_CORNER_DETECTION",
        help: "Corner detection. 0: off, 1: on",
    },
    TunableInfo {
        name: "r.SMAA.DiagonalDetection",
        env: "SMAA_DIAGONAL_DETECTION",
        help: "Diagonal detection. 0: off, 1: on",
    },
    TunableInfo {
        name: "r.SMAA.DebugMode",
        env: "SMAA_DEBUG_MODE",
        help: "0: off, 1: edges, 2: blend weights, 3: search table, 4: area table, 5: search steps, 6: texture dimensions",
    },
];

fn lookup(name: &str) -> Option<usize> {
    TUNABLES.iter().position(|t| t.name.eq_ignore_ascii_case(name))
}

/// Shared tunable registry
///
/// Read once per frame by the settings resolver; written from a console,
/// the environment or the command line.
#[derive(Debug, Default)]
pub struct Tunables {
    values: RwLock<RawSettings>,
}

impl Tunables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: RawSettings) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Defaults overridden by any `SMAA_*` environment variables
    pub fn from_env() -> Self {
        let tunables = Self::new();
        tunables.apply_env(std::env::vars());
        tunables
    }

    /// Apply environment-style variables; returns how many were accepted
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_env<I, K, V>(&self, vars: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut applied = 0;
        for (key, value) in vars {
            let Some(info) = TUNABLES.iter().find(|t| t.env == key.as_ref()) else {
                continue;
            };
            match self.set(info.name, value.as_ref()) {
                Ok(()) => applied += 1,
                Err(e) => log::warn!("Ignoring {}: {}", info.env, e),
            }
        }
        applied
    }

    /// Set a tunable by name (case-insensitive)
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        let index = lookup(name).ok_or_else(|| Error::Config(format!("unknown tunable '{}'", name)))?;
        let value = value.trim();
        let int = || {
            value
                .parse::<i32>()
                .map_err(|e| Error::Config(format!("invalid value '{}' for {}: {}", value, TUNABLES[index].name, e)))
        };
        let float = || {
            value
                .parse::<f32>()
                .map_err(|e| Error::Config(format!("invalid value '{}' for {}: {}", value, TUNABLES[index].name, e)))
        };

        let mut values = self.values.write();
        match index {
            0 => values.enable = int()?,
            1 => values.quality = int()?,
            2 => values.edge_detection_mode = int()?,
            3 => values.threshold = float()?,
            4 => values.local_contrast_adaptation = float()?,
            5 => values.max_search_steps = int()?,
            6 => values.corner_detection = int()?,
            7 => values.diagonal_detection = int()?,
            _ => values.debug_mode = int()?,
        }
        log::debug!("{} = {}", TUNABLES[index].name, value);
        Ok(())
    }

    /// Apply a `name=value` assignment
    pub fn assign(&self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected name=value, got '{}'", assignment)))?;
        self.set(name.trim(), value)
    }

    /// Current value of a tunable, formatted as it would be typed
    pub fn get(&self, name: &str) -> Result<String> {
        let index = lookup(name).ok_or_else(|| Error::Config(format!("unknown tunable '{}'", name)))?;
        let values = self.values.read();
        Ok(match index {
            0 => values.enable.to_string(),
            1 => values.quality.to_string(),
            2 => values.edge_detection_mode.to_string(),
            3 => values.threshold.to_string(),
            4 => values.local_contrast_adaptation.to_string(),
            5 => values.max_search_steps.to_string(),
            6 => values.corner_detection.to_string(),
            7 => values.diagonal_detection.to_string(),
            _ => values.debug_mode.to_string(),
        })
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> RawSettings {
        *self.values.read()
    }
}
