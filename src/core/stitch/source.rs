//! Random-access frame providers.
//!
//! Decoding lives behind [`FrameSource`]; the pipeline only asks for the
//! frame at a timestamp and blocks until it is materialized.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};

use super::error::StitchError;
use super::frame::{Frame, VideoMetadata};

pub trait FrameSource: Send {
    fn metadata(&self) -> Result<VideoMetadata, StitchError>;

    /// Returns the frame shown at `timestamp`, clamped to `[0, duration]`.
    fn seek(&mut self, timestamp: Duration) -> Result<Frame, StitchError>;
}

/// Precomputed frames at a fixed frame interval.
pub struct MemoryFrameSource {
    frames: Vec<Frame>,
    frame_interval: Duration,
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Frame>, frame_interval: Duration) -> Result<Self, StitchError> {
        let first = frames
            .first()
            .ok_or_else(|| StitchError::decode("frame list is empty"))?;
        if frame_interval.is_zero() {
            return Err(StitchError::decode("frame interval must be > 0"));
        }
        for frame in &frames {
            frame.check_buffer()?;
        }
        if let Some(bad) = frames.iter().find(|f| !f.same_size(first)) {
            return Err(StitchError::decode_at(
                format!(
                    "frame size {}x{} differs from {}x{}",
                    bad.width, bad.height, first.width, first.height
                ),
                bad.timestamp,
            ));
        }
        Ok(Self {
            frames,
            frame_interval,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn duration(&self) -> Duration {
        self.frame_interval * self.frames.len() as u32
    }
}

impl FrameSource for MemoryFrameSource {
    fn metadata(&self) -> Result<VideoMetadata, StitchError> {
        let first = &self.frames[0];
        Ok(VideoMetadata {
            width: first.width,
            height: first.height,
            duration: self.duration(),
        })
    }

    fn seek(&mut self, timestamp: Duration) -> Result<Frame, StitchError> {
        let t = timestamp.min(self.duration());
        let idx = (t.as_nanos() / self.frame_interval.as_nanos()) as usize;
        let idx = idx.min(self.frames.len() - 1);

        let mut frame = self.frames[idx].clone();
        frame.timestamp = t;
        Ok(frame)
    }
}

/// Still images played back at a fixed frame rate, one file per frame.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: f64,
    width: u32,
    height: u32,
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>, fps: f64) -> Result<Self, StitchError> {
        if paths.is_empty() {
            return Err(StitchError::decode("image sequence is empty"));
        }
        if !(fps > 0.0 && fps.is_finite()) {
            return Err(StitchError::decode(format!("invalid frame rate {}", fps)));
        }

        let (width, height) = image::image_dimensions(&paths[0]).map_err(|e| {
            StitchError::decode(format!("cannot open {}: {}", paths[0].display(), e))
        })?;

        info!(
            "🎞️ ImageSequenceSource: {} frames, {}x{} @ {} fps",
            paths.len(),
            width,
            height,
            fps
        );

        Ok(Self {
            paths,
            fps,
            width,
            height,
        })
    }

    /// Collects png/jpeg/bmp files in `dir`, ordered by file name.
    pub fn from_dir(dir: impl AsRef<Path>, fps: f64) -> Result<Self, StitchError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| {
                        matches!(
                            ext.to_ascii_lowercase().as_str(),
                            "png" | "jpg" | "jpeg" | "bmp"
                        )
                    })
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        Self::new(paths, fps)
    }

    fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.paths.len() as f64 / self.fps)
    }
}

impl FrameSource for ImageSequenceSource {
    fn metadata(&self) -> Result<VideoMetadata, StitchError> {
        Ok(VideoMetadata {
            width: self.width,
            height: self.height,
            duration: self.duration(),
        })
    }

    fn seek(&mut self, timestamp: Duration) -> Result<Frame, StitchError> {
        let t = timestamp.min(self.duration());
        let idx = ((t.as_secs_f64() * self.fps).floor() as usize).min(self.paths.len() - 1);
        let path = &self.paths[idx];
        debug!("seek {} ms -> {}", t.as_millis(), path.display());

        let img = image::open(path)
            .map_err(|e| StitchError::decode_at(format!("{}: {}", path.display(), e), t))?
            .to_rgba8();
        if img.dimensions() != (self.width, self.height) {
            return Err(StitchError::decode_at(
                format!(
                    "{} is {}x{}, expected {}x{}",
                    path.display(),
                    img.width(),
                    img.height(),
                    self.width,
                    self.height
                ),
                t,
            ));
        }

        Ok(Frame::from_rgba_image(img, t))
    }
}
