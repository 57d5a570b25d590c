use std::ops::Range;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::StitchError;

/// Horizontal sample positions, as fractions of frame width, shared by the
/// static-region detector and the offset estimator.
pub const SAMPLE_COLUMNS: [f32; 3] = [0.25, 0.5, 0.75];

/// A decoded video frame in RGBA layout
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA, stride = width * 4
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, timestamp_ms: u64) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
        }
    }

    pub fn from_rgba_image(img: image::RgbaImage, timestamp: Duration) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
            timestamp,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Checks that the pixel buffer holds exactly `width * height` RGBA pixels.
    pub fn check_buffer(&self) -> Result<(), StitchError> {
        let expected = self.pixel_count() * 4;
        if self.data.len() != expected {
            return Err(StitchError::decode_at(
                format!(
                    "{}x{} frame carries {} bytes, expected {}",
                    self.width,
                    self.height,
                    self.data.len(),
                    expected
                ),
                self.timestamp,
            ));
        }
        Ok(())
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = y as usize * self.stride() + x as usize * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Sum of absolute R, G, B differences between `self[x, y]` and
    /// `other[x, other_y]`. Alpha is ignored.
    pub fn rgb_diff(&self, other: &Frame, x: u32, y: u32, other_y: u32) -> u32 {
        let a = y as usize * self.stride() + x as usize * 4;
        let b = other_y as usize * other.stride() + x as usize * 4;
        (0..3)
            .map(|c| (self.data[a + c] as i32 - other.data[b + c] as i32).unsigned_abs())
            .sum()
    }

    /// Raw bytes of the half-open row range.
    pub fn rows(&self, range: Range<u32>) -> &[u8] {
        let stride = self.stride();
        &self.data[range.start as usize * stride..range.end as usize * stride]
    }

    pub fn same_size(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Pixel x coordinates of [`SAMPLE_COLUMNS`] for this frame's width.
    pub fn sample_columns(&self) -> [u32; 3] {
        SAMPLE_COLUMNS.map(|f| (self.width as f32 * f) as u32)
    }
}

/// Stream-level information reported by a [`FrameSource`](super::source::FrameSource).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub duration: Duration,
}

/// Rows excluded from matching because they are fixed overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropMask {
    pub top: u32,
    pub bottom: u32,
}

impl CropMask {
    pub fn new(top: u32, bottom: u32) -> Self {
        Self { top, bottom }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Enforces `top + bottom < height`.
    pub fn validate(&self, height: u32) -> Result<(), StitchError> {
        if self.top as u64 + self.bottom as u64 >= height as u64 {
            return Err(StitchError::InvalidCrop {
                top: self.top,
                bottom: self.bottom,
                height,
            });
        }
        Ok(())
    }

    /// Height of the scrolling content region between the bands.
    pub fn content_height(&self, height: u32) -> u32 {
        height.saturating_sub(self.top).saturating_sub(self.bottom)
    }
}

/// Detected fixed header/footer heights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRegion {
    pub top_height: u32,
    pub bottom_height: u32,
}

impl StaticRegion {
    pub fn is_empty(&self) -> bool {
        self.top_height == 0 && self.bottom_height == 0
    }
}

impl From<StaticRegion> for CropMask {
    fn from(region: StaticRegion) -> Self {
        CropMask {
            top: region.top_height,
            bottom: region.bottom_height,
        }
    }
}
