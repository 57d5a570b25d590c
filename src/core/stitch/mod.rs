//! Scroll-recording stitcher - rebuilds one tall image from a screen
//! recording of someone scrolling.
//!
//! 1. Static region detection - fixed header/footer bands across samples
//! 2. Offset estimation - sparse, distance-penalized 1-D template search
//! 3. Compositing - append-only growth of the output image
//! 4. Pipeline - fixed-interval sampling, progress, cancellation

pub mod compositor;
pub mod config;
pub mod error;
pub mod frame;
pub mod offset;
pub mod pipeline;
pub mod source;
pub mod static_region;

#[cfg(test)]
pub(crate) mod test_support;

pub use compositor::{Compositor, StitchedImage};
pub use config::{DetectionConfig, OffsetConfig, SamplingConfig, StitchConfig};
pub use error::{Stage, StitchError};
pub use frame::{CropMask, Frame, StaticRegion, VideoMetadata, SAMPLE_COLUMNS};
pub use offset::{OffsetEstimator, OffsetResult};
pub use pipeline::{CancelToken, PipelineState, StitchOutput, StitchPipeline, StitchStats};
pub use source::{FrameSource, ImageSequenceSource, MemoryFrameSource};
pub use static_region::StaticRegionDetector;
