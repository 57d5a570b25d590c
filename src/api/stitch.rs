//! Scroll recording stitcher

use crate::core::stitch::{
    CancelToken, CropMask, FrameSource, StaticRegionDetector, StitchConfig, StitchError,
    StitchOutput, StitchPipeline,
};
use log::info;

/// Turns a scroll recording into one tall PNG.
///
/// ```no_run
/// use scrollshot_lib::api::stitch::ScrollStitcher;
/// use scrollshot_lib::core::stitch::ImageSequenceSource;
///
/// let mut source = ImageSequenceSource::from_dir("frames/", 30.0)?;
/// let stitcher = ScrollStitcher::create();
/// let crop = stitcher.suggest_crop(&mut source)?;
/// let output = stitcher.stitch(&mut source, crop, |p| println!("{:.0}%", p))?;
/// std::fs::write("long.png", output.png)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ScrollStitcher {
    config: StitchConfig,
    cancel: CancelToken,
}

impl ScrollStitcher {
    pub fn create() -> Self {
        Self::with_config(StitchConfig::default())
    }

    pub fn with_config(config: StitchConfig) -> Self {
        info!("🎬 ScrollStitcher: created");
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Detected header/footer, offered as the default crop. The caller may
    /// override it freely.
    pub fn suggest_crop(&self, source: &mut dyn FrameSource) -> Result<CropMask, StitchError> {
        let region =
            StaticRegionDetector::with_config(self.config.detection.clone()).detect(source)?;
        Ok(region.into())
    }

    pub fn stitch(
        &self,
        source: &mut dyn FrameSource,
        crop: CropMask,
        mut on_progress: impl FnMut(f32),
    ) -> Result<StitchOutput, StitchError> {
        let mut pipeline =
            StitchPipeline::with_config(self.config.clone()).with_cancel_token(self.cancel.clone());
        let result = pipeline.run(source, crop, &mut on_progress);
        // A cancel only applies to the run it was raised during or before.
        self.cancel.reset();
        result
    }

    /// Stops a running [`stitch`](Self::stitch) before its next frame. If no
    /// run is active, the next one is cancelled before its first frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }
}

impl Default for ScrollStitcher {
    fn default() -> Self {
        Self::create()
    }
}

impl Drop for ScrollStitcher {
    fn drop(&mut self) {
        info!("🗑️ ScrollStitcher: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stitch::test_support::scrolling_source;

    #[test]
    fn test_suggest_then_stitch() {
        let mut source = scrolling_source(64, 200, 15, 12, 40, 16, 100);
        let stitcher = ScrollStitcher::create();

        let crop = stitcher.suggest_crop(&mut source).unwrap();
        assert!(crop.top >= 40 && crop.top < 46);
        assert!(crop.bottom >= 16 && crop.bottom < 22);

        let output = stitcher.stitch(&mut source, crop, |_| {}).unwrap();
        assert_eq!(output.width, 64);
        assert_eq!(output.height, 200 + 12 * 14);

        let decoded = image::load_from_memory(&output.png).unwrap();
        assert_eq!(decoded.height(), output.height);
    }

    #[test]
    fn test_user_crop_overrides_suggestion() {
        let mut source = scrolling_source(64, 200, 5, 10, 40, 0, 100);
        let stitcher = ScrollStitcher::create();
        let output = stitcher
            .stitch(&mut source, CropMask::new(40, 0), |_| {})
            .unwrap();
        assert_eq!(output.height, 200 + 10 * 4);
    }

    #[test]
    fn test_cancel_then_rerun() {
        let mut source = scrolling_source(32, 120, 10, 6, 0, 0, 100);
        let stitcher = ScrollStitcher::create();
        let token = stitcher.cancel_token();

        let err = stitcher
            .stitch(&mut source, CropMask::none(), |_| token.cancel())
            .unwrap_err();
        assert!(matches!(err, StitchError::Cancelled));

        // A new run starts uncancelled.
        let output = stitcher.stitch(&mut source, CropMask::none(), |_| {}).unwrap();
        assert_eq!(output.height, 120 + 6 * 9);
    }

    #[test]
    fn test_cancel_before_stitch_is_honoured() {
        let mut source = scrolling_source(32, 120, 10, 6, 0, 0, 100);
        let stitcher = ScrollStitcher::create();
        stitcher.cancel();

        let mut calls = 0;
        let err = stitcher
            .stitch(&mut source, CropMask::none(), |_| calls += 1)
            .unwrap_err();
        assert!(matches!(err, StitchError::Cancelled));
        assert_eq!(calls, 0);
        assert!(!stitcher.cancel_token().is_cancelled());

        let output = stitcher.stitch(&mut source, CropMask::none(), |_| {}).unwrap();
        assert_eq!(output.height, 120 + 6 * 9);
    }
}
