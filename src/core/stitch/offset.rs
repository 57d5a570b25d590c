//! Vertical scroll estimation between two frames.
//!
//! A band just above the footer in the previous frame (the signature window)
//! is searched for in the current frame along a single column of candidate
//! rows. Only a sparse grid of pixels is compared: three fixed columns, every
//! `sample_stride` rows. Each candidate pays a penalty proportional to its
//! offset, so among near-equal matches the smallest scroll wins; this keeps
//! repeating patterns (list rows, stripes) from jumping a whole period.

use log::debug;
use rayon::prelude::*;

use super::config::OffsetConfig;
use super::error::StitchError;
use super::frame::{CropMask, Frame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetResult {
    /// Rows scrolled; 0 when nothing moved or no confident match.
    pub offset: u32,
    /// Penalized score of the best candidate, `None` if no search ran.
    pub score: Option<u64>,
}

impl OffsetResult {
    pub fn none() -> Self {
        Self {
            offset: 0,
            score: None,
        }
    }

    pub fn is_scroll(&self) -> bool {
        self.offset > 0
    }
}

pub struct OffsetEstimator {
    config: OffsetConfig,
}

impl OffsetEstimator {
    pub fn new() -> Self {
        Self::with_config(OffsetConfig::default())
    }

    pub fn with_config(config: OffsetConfig) -> Self {
        Self { config }
    }

    pub fn find_offset(
        &self,
        prev: &Frame,
        curr: &Frame,
        crop: CropMask,
    ) -> Result<OffsetResult, StitchError> {
        self.config.validate()?;
        prev.check_buffer()?;
        curr.check_buffer()?;
        if !prev.same_size(curr) {
            return Err(StitchError::Estimate(format!(
                "frame size changed from {}x{} to {}x{}",
                prev.width, prev.height, curr.width, curr.height
            )));
        }
        crop.validate(prev.height)?;

        let height = prev.height;
        let search_height =
            (self.config.signature_fraction * crop.content_height(height) as f32) as u32;
        if search_height < self.config.min_search_height {
            debug!(
                "signature window {} rows too small, skipping estimate",
                search_height
            );
            return Ok(OffsetResult::none());
        }

        let signature_y = height - crop.bottom - search_height;
        let max_scroll = (self.config.max_scroll_fraction * height as f32) as u32;
        let lowest = crop.top.max(signature_y.saturating_sub(max_scroll));

        // scan_y runs from signature_y down to lowest, closest candidate first.
        let candidates: Vec<u32> = (lowest..=signature_y)
            .rev()
            .step_by(self.config.search_stride as usize)
            .collect();

        let columns = prev.sample_columns();
        let sample_rows: Vec<u32> = (0..search_height)
            .step_by(self.config.sample_stride as usize)
            .collect();

        let scores: Vec<u64> = candidates
            .par_iter()
            .map(|&scan_y| {
                let dissimilarity: u64 = columns
                    .iter()
                    .flat_map(|&x| {
                        sample_rows
                            .iter()
                            .map(move |&k| prev.rgb_diff(curr, x, signature_y + k, scan_y + k) as u64)
                    })
                    .sum();
                dissimilarity + (signature_y - scan_y) as u64 * self.config.distance_penalty
            })
            .collect();

        // Strict `<` keeps the first (smallest offset) candidate on ties.
        let mut best: Option<(u32, u64)> = None;
        for (&scan_y, &score) in candidates.iter().zip(&scores) {
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((scan_y, score));
            }
        }

        let Some((best_y, best_score)) = best else {
            return Ok(OffsetResult::none());
        };

        if best_score > self.config.rejection_threshold {
            debug!(
                "no confident match: best score {} > {}",
                best_score, self.config.rejection_threshold
            );
            return Ok(OffsetResult {
                offset: 0,
                score: Some(best_score),
            });
        }

        let offset = signature_y - best_y;
        debug!(
            "offset {} (score {}, {} candidates)",
            offset,
            best_score,
            candidates.len()
        );
        Ok(OffsetResult {
            offset,
            score: Some(best_score),
        })
    }
}

impl Default for OffsetEstimator {
    fn default() -> Self {
        Self::new()
    }
}
