use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::StitchError;

/// Frame sampling along the video timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub sample_interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 100,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Static header/footer detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub sample_count: usize,
    /// Per-row difference at or below this counts as unchanged.
    pub noise_threshold: f32,
    /// Sampled window, as fractions of duration. Skips fades at either end.
    pub window_start: f64,
    pub window_end: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_count: 5,
            noise_threshold: 15.0,
            window_start: 0.1,
            window_end: 0.9,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), StitchError> {
        if !(0.0..=1.0).contains(&self.window_start)
            || !(0.0..=1.0).contains(&self.window_end)
            || self.window_start >= self.window_end
        {
            return Err(StitchError::Config(format!(
                "detection window [{}, {}] is invalid",
                self.window_start, self.window_end
            )));
        }
        if !(self.noise_threshold >= 0.0) {
            return Err(StitchError::Config(format!(
                "noise_threshold must be >= 0, got {}",
                self.noise_threshold
            )));
        }
        Ok(())
    }
}

/// Template search between consecutive frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetConfig {
    /// Step between candidate alignments, in rows.
    pub search_stride: u32,
    /// Step between compared rows inside the signature window.
    pub sample_stride: u32,
    /// Best score above this is treated as no match.
    pub rejection_threshold: u64,
    /// Score added per row of candidate offset.
    pub distance_penalty: u64,
    pub max_scroll_fraction: f32,
    pub signature_fraction: f32,
    pub min_search_height: u32,
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            search_stride: 2,
            sample_stride: 5,
            rejection_threshold: 8000,
            distance_penalty: 5,
            max_scroll_fraction: 0.5,
            signature_fraction: 0.2,
            min_search_height: 10,
        }
    }
}

impl OffsetConfig {
    pub fn validate(&self) -> Result<(), StitchError> {
        if self.search_stride == 0 || self.sample_stride == 0 {
            return Err(StitchError::Config("offset strides must be > 0".into()));
        }
        for (name, value) in [
            ("max_scroll_fraction", self.max_scroll_fraction),
            ("signature_fraction", self.signature_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(StitchError::Config(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    pub sampling: SamplingConfig,
    pub detection: DetectionConfig,
    pub offset: OffsetConfig,
}

impl StitchConfig {
    /// Denser sampling and a wider search for quick flicks.
    pub fn for_fast_scroll() -> Self {
        Self {
            sampling: SamplingConfig {
                sample_interval_ms: 50,
            },
            offset: OffsetConfig {
                max_scroll_fraction: 0.7,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Exhaustive row search, slower but aligns odd offsets exactly.
    pub fn for_precise() -> Self {
        Self {
            offset: OffsetConfig {
                search_stride: 1,
                sample_stride: 2,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, StitchError> {
        let config: StitchConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StitchError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), StitchError> {
        if self.sampling.sample_interval_ms == 0 {
            return Err(StitchError::Config("sample_interval_ms must be > 0".into()));
        }
        self.detection.validate()?;
        self.offset.validate()
    }
}
