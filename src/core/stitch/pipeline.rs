use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use super::compositor::{Compositor, StitchedImage};
use super::config::StitchConfig;
use super::error::{Stage, StitchError};
use super::frame::{CropMask, Frame};
use super::offset::OffsetEstimator;
use super::source::FrameSource;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Sampling { step: usize, total: usize },
    Finalizing,
    Done,
    Failed { stage: Stage },
    Cancelled,
}

/// Shared flag checked before every seek.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StitchStats {
    pub sampled_frames: usize,
    pub appended_frames: usize,
    pub skipped_frames: usize,
    pub total_offset: u64,
}

#[derive(Debug, Clone)]
pub struct StitchOutput {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stats: StitchStats,
}

/// Progress reported to the caller, clamped to `[0, 100]` and never
/// decreasing.
struct ProgressReporter<'a> {
    callback: &'a mut dyn FnMut(f32),
    last: f32,
}

impl<'a> ProgressReporter<'a> {
    fn new(callback: &'a mut dyn FnMut(f32)) -> Self {
        Self {
            callback,
            last: 0.0,
        }
    }

    fn report(&mut self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0).max(self.last);
        self.last = percent;
        (self.callback)(percent);
    }
}

/// Samples the recording at a fixed interval and stitches consecutive
/// frames. Strictly sequential: each estimate needs the previous frame.
pub struct StitchPipeline {
    config: StitchConfig,
    estimator: OffsetEstimator,
    state: PipelineState,
    cancel: CancelToken,
}

impl StitchPipeline {
    pub fn new() -> Self {
        Self::with_config(StitchConfig::default())
    }

    pub fn with_config(config: StitchConfig) -> Self {
        Self {
            estimator: OffsetEstimator::with_config(config.offset.clone()),
            config,
            state: PipelineState::Idle,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn config(&self) -> &StitchConfig {
        &self.config
    }

    /// `t_i = i * interval` for every `t_i < duration`; at least one sample.
    pub fn sample_timestamps(&self, duration: Duration) -> Vec<Duration> {
        let interval = self.config.sampling.interval();
        let steps = duration.as_nanos().div_ceil(interval.as_nanos()).max(1) as usize;
        (0..steps).map(|i| interval * i as u32).collect()
    }

    /// Stitches and encodes the result as PNG.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        crop: CropMask,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<StitchOutput, StitchError> {
        let (image, stats) = self.stitch(source, crop, on_progress)?;
        let png = image.to_png().inspect_err(|e| {
            error!("❌ PNG encoding failed: {}", e);
            self.state = PipelineState::Failed { stage: e.stage() };
        })?;
        Ok(StitchOutput {
            png,
            width: image.width,
            height: image.height,
            stats,
        })
    }

    /// Stitches without encoding; the caller takes ownership of the pixels.
    pub fn stitch(
        &mut self,
        source: &mut dyn FrameSource,
        crop: CropMask,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(StitchedImage, StitchStats), StitchError> {
        let result = self.stitch_inner(source, crop, on_progress);
        match &result {
            Ok(_) => self.state = PipelineState::Done,
            Err(StitchError::Cancelled) => {
                info!("🛑 Stitching cancelled, partial image discarded");
                self.state = PipelineState::Cancelled;
            }
            Err(e) => {
                error!("❌ Stitching failed in {:?} stage: {}", e.stage(), e);
                self.state = PipelineState::Failed { stage: e.stage() };
            }
        }
        result
    }

    fn stitch_inner(
        &mut self,
        source: &mut dyn FrameSource,
        crop: CropMask,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<(StitchedImage, StitchStats), StitchError> {
        self.config.validate()?;
        let meta = source.metadata()?;
        crop.validate(meta.height)?;

        let timestamps = self.sample_timestamps(meta.duration);
        let total = timestamps.len();
        info!(
            "🎬 Stitching {}x{}, {} ms, {} samples, crop top {} bottom {}",
            meta.width,
            meta.height,
            meta.duration.as_millis(),
            total,
            crop.top,
            crop.bottom
        );

        let mut progress = ProgressReporter::new(on_progress);
        let mut stats = StitchStats::default();
        let mut compositor: Option<Compositor> = None;
        let mut prev: Option<Frame> = None;

        for (step, t) in timestamps.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(StitchError::Cancelled);
            }
            self.state = PipelineState::Sampling { step, total };

            let curr = source.seek(t)?;
            curr.check_buffer()?;
            if curr.width != meta.width || curr.height != meta.height {
                return Err(StitchError::decode_at(
                    format!(
                        "decoded {}x{} frame, stream reports {}x{}",
                        curr.width, curr.height, meta.width, meta.height
                    ),
                    t,
                ));
            }
            stats.sampled_frames += 1;

            if step == 0 {
                compositor = Some(Compositor::init(&curr, crop)?);
            } else if let (Some(comp), Some(prev_frame)) = (compositor.as_mut(), prev.as_ref()) {
                let result = self.estimator.find_offset(prev_frame, &curr, crop)?;
                if result.is_scroll() {
                    comp.append(&curr, result.offset)?;
                    stats.appended_frames += 1;
                    stats.total_offset += result.offset as u64;
                } else {
                    stats.skipped_frames += 1;
                }
                debug!(
                    "t={} ms offset={} score={:?} height={}",
                    t.as_millis(),
                    result.offset,
                    result.score,
                    comp.height()
                );
            }

            prev = Some(curr);
            if !meta.duration.is_zero() {
                progress.report((t.as_secs_f64() / meta.duration.as_secs_f64() * 100.0) as f32);
            }
        }

        self.state = PipelineState::Finalizing;
        let (compositor, last) = compositor
            .zip(prev)
            .ok_or_else(|| StitchError::decode("no frames sampled"))?;
        let image = compositor.finalize_footer(&last)?;
        progress.report(100.0);

        info!(
            "✅ Stitched {}x{}: {} appended, {} skipped",
            image.width, image.height, stats.appended_frames, stats.skipped_frames
        );
        Ok((image, stats))
    }
}

impl Default for StitchPipeline {
    fn default() -> Self {
        Self::new()
    }
}
