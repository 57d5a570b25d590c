use std::time::Duration;

use log::{debug, info, warn};
use rayon::prelude::*;

use super::config::DetectionConfig;
use super::error::StitchError;
use super::frame::{Frame, StaticRegion};
use super::source::FrameSource;

/// Finds fixed header/footer bands by comparing a few frames spread over
/// the recording. A row is static only if it never changed between any two
/// adjacent samples.
pub struct StaticRegionDetector {
    config: DetectionConfig,
}

impl StaticRegionDetector {
    pub fn new() -> Self {
        Self::with_config(DetectionConfig::default())
    }

    pub fn with_config(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, source: &mut dyn FrameSource) -> Result<StaticRegion, StitchError> {
        self.config.validate()?;
        let meta = source.metadata()?;
        let frames = self
            .sample_timestamps(meta.duration)
            .into_iter()
            .map(|t| {
                let frame = source.seek(t)?;
                frame.check_buffer()?;
                Ok(frame)
            })
            .collect::<Result<Vec<_>, StitchError>>()?;
        Ok(self.detect_frames(&frames))
    }

    /// Evenly spaced over `[window_start, window_end] * duration`.
    pub fn sample_timestamps(&self, duration: Duration) -> Vec<Duration> {
        let n = self.config.sample_count;
        let start = self.config.window_start;
        let span = self.config.window_end - self.config.window_start;
        let total = duration.as_secs_f64();

        (0..n)
            .map(|i| {
                let frac = if n > 1 {
                    start + span * i as f64 / (n - 1) as f64
                } else {
                    start
                };
                Duration::from_secs_f64(total * frac)
            })
            .collect()
    }

    pub fn detect_frames(&self, frames: &[Frame]) -> StaticRegion {
        if frames.len() < 2 {
            return StaticRegion::default();
        }
        let height = frames[0].height;
        if frames.iter().any(|f| !f.same_size(&frames[0])) || height == 0 {
            warn!("⚠️ Static region detection skipped: sampled frames differ in size");
            return StaticRegion::default();
        }

        let per_pair: Vec<Vec<f32>> = frames
            .par_windows(2)
            .map(|pair| Self::row_differences(&pair[0], &pair[1]))
            .collect();

        let mut worst = vec![0f32; height as usize];
        for diffs in &per_pair {
            for (w, &d) in worst.iter_mut().zip(diffs) {
                *w = w.max(d);
            }
        }

        let threshold = self.config.noise_threshold;
        let top = worst.iter().take_while(|&&d| d <= threshold).count() as u32;
        if top == height {
            warn!("⚠️ No row changed across {} samples, no motion to crop around", frames.len());
            return StaticRegion::default();
        }

        // Bottom scan stops at the midline, and never runs into the top band.
        let floor = (height / 2).max(top) as usize;
        let bottom = worst[floor..]
            .iter()
            .rev()
            .take_while(|&&d| d <= threshold)
            .count() as u32;

        debug!("row difference maxima: top={} bottom={}", top, bottom);
        info!("📐 Static region detected: header {}px, footer {}px", top, bottom);

        StaticRegion {
            top_height: top,
            bottom_height: bottom,
        }
    }

    /// Per row, the RGB difference at the sample columns averaged over columns.
    fn row_differences(a: &Frame, b: &Frame) -> Vec<f32> {
        let columns = a.sample_columns();
        (0..a.height)
            .map(|y| {
                let sum: u32 = columns.iter().map(|&x| a.rgb_diff(b, x, y, y)).sum();
                sum as f32 / columns.len() as f32
            })
            .collect()
    }
}

impl Default for StaticRegionDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stitch::test_support::{scrolled_frame, scrolling_source, uniform_frame};

    #[test]
    fn test_sample_timestamps_skip_edges() {
        let detector = StaticRegionDetector::new();
        let ts = detector.sample_timestamps(Duration::from_secs(10));

        assert_eq!(ts.len(), 5);
        assert_eq!(ts[0].as_millis(), 1000);
        assert_eq!(ts[2].as_millis(), 5000);
        assert_eq!(ts[4].as_millis(), 9000);
    }

    #[test]
    fn test_detects_fixed_header() {
        let mut source = scrolling_source(120, 200, 20, 7, 50, 0, 100);
        let region = StaticRegionDetector::new().detect(&mut source).unwrap();

        assert!(region.top_height >= 50);
        assert!(region.top_height < 55);
        assert_eq!(region.bottom_height, 0);
    }

    #[test]
    fn test_detects_header_and_footer() {
        let mut source = scrolling_source(120, 200, 20, 9, 24, 30, 100);
        let region = StaticRegionDetector::new().detect(&mut source).unwrap();

        assert!(region.top_height >= 24 && region.top_height < 30);
        assert!(region.bottom_height >= 30 && region.bottom_height < 36);
    }

    #[test]
    fn test_no_bands_when_everything_moves() {
        let frames: Vec<Frame> = (0..5)
            .map(|i| scrolled_frame(64, 100, i * 11, 0, 0, 0))
            .collect();
        let region = StaticRegionDetector::new().detect_frames(&frames);
        assert_eq!(region, StaticRegion::default());
    }

    #[test]
    fn test_fully_static_recording_returns_empty() {
        let frames = vec![uniform_frame(32, 40, [200, 200, 200]); 5];
        let region = StaticRegionDetector::new().detect_frames(&frames);
        assert!(region.is_empty());
    }

    #[test]
    fn test_single_sample_returns_empty() {
        let detector = StaticRegionDetector::with_config(DetectionConfig {
            sample_count: 1,
            ..Default::default()
        });
        let mut source = scrolling_source(64, 100, 10, 5, 20, 0, 100);
        assert!(detector.detect(&mut source).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_window_rejected() {
        let detector = StaticRegionDetector::with_config(DetectionConfig {
            window_start: 0.8,
            window_end: 0.2,
            ..Default::default()
        });
        let mut source = scrolling_source(64, 100, 10, 5, 20, 0, 100);
        assert!(matches!(
            detector.detect(&mut source),
            Err(StitchError::Config(_))
        ));
    }

    #[test]
    fn test_bands_never_overlap() {
        fn with_moving_row(row: usize) -> Vec<Frame> {
            let mut frames = vec![uniform_frame(16, 40, [10, 10, 10]); 3];
            let stride = frames[1].stride();
            for x in 0..stride {
                frames[1].data[row * stride + x] = 250;
            }
            frames
        }
        let detector = StaticRegionDetector::new();

        // Bottom scan halts at the midline.
        let region = detector.detect_frames(&with_moving_row(3));
        assert_eq!(region.top_height, 3);
        assert_eq!(region.bottom_height, 20);

        // Top band reaches past the midline, bottom scan stops at its edge.
        let region = detector.detect_frames(&with_moving_row(30));
        assert_eq!(region.top_height, 30);
        assert_eq!(region.bottom_height, 9);
        assert!(region.top_height + region.bottom_height < 40);
    }
}
