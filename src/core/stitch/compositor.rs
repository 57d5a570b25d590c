use std::io::Cursor;

use image::{ImageOutputFormat, RgbaImage};
use log::{debug, info, warn};

use super::error::StitchError;
use super::frame::{CropMask, Frame};

/// The growing output image. Rows are only ever appended.
#[derive(Debug, Clone)]
pub struct StitchedImage {
    pub width: u32,
    pub height: u32,
    data: Vec<u8>, // RGBA, stride = width * 4
}

impl StitchedImage {
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        &self.data[y as usize * stride..(y as usize + 1) * stride]
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_rgba_image(self) -> Result<RgbaImage, StitchError> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.data).ok_or_else(|| {
            StitchError::Composite(format!("buffer does not hold {}x{} RGBA", width, height))
        })
    }

    /// Lossless PNG of the whole image.
    pub fn to_png(&self) -> Result<Vec<u8>, StitchError> {
        let img = self.clone().into_rgba_image()?;
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// Owns the [`StitchedImage`] while it is being built.
///
/// The first frame is copied down to the footer (capturing the header once),
/// each scroll appends the strip that just appeared above the footer, and the
/// footer itself is appended once from the last frame.
pub struct Compositor {
    image: StitchedImage,
    frame_width: u32,
    frame_height: u32,
    crop: CropMask,
}

impl Compositor {
    pub fn init(frame: &Frame, crop: CropMask) -> Result<Self, StitchError> {
        frame.check_buffer()?;
        crop.validate(frame.height)?;

        let initial_height = frame.height - crop.bottom;
        let content = frame.rows(0..initial_height);
        let mut data = Vec::new();
        data.try_reserve(content.len())
            .map_err(|_| StitchError::OutOfMemory {
                requested: content.len(),
            })?;
        data.extend_from_slice(content);

        debug!(
            "🧩 Compositor: initial {}x{} (crop top {}, bottom {})",
            frame.width, initial_height, crop.top, crop.bottom
        );

        Ok(Self {
            image: StitchedImage {
                width: frame.width,
                height: initial_height,
                data,
            },
            frame_width: frame.width,
            frame_height: frame.height,
            crop,
        })
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn image(&self) -> &StitchedImage {
        &self.image
    }

    /// Appends the `offset` rows of `curr` that lie just above the footer.
    pub fn append(&mut self, curr: &Frame, offset: u32) -> Result<(), StitchError> {
        self.check_frame(curr)?;
        if offset == 0 {
            return Ok(());
        }

        let end = self.frame_height - self.crop.bottom;
        if offset > end {
            return Err(StitchError::Composite(format!(
                "offset {} exceeds the {} rows above the footer",
                offset, end
            )));
        }
        if offset > self.crop.content_height(self.frame_height) {
            // Strip reaches into the header band; composited as-is.
            warn!(
                "⚠️ offset {} larger than content height {}, header rows leak into output",
                offset,
                self.crop.content_height(self.frame_height)
            );
        }

        self.push_rows(curr, end - offset..end)
    }

    /// Appends the footer band of the last frame and hands the image over.
    pub fn finalize_footer(mut self, last: &Frame) -> Result<StitchedImage, StitchError> {
        self.check_frame(last)?;
        if self.crop.bottom > 0 {
            let h = self.frame_height;
            self.push_rows(last, h - self.crop.bottom..h)?;
        }
        info!(
            "✅ Compositor: finished {}x{}",
            self.image.width, self.image.height
        );
        Ok(self.image)
    }

    fn push_rows(&mut self, frame: &Frame, rows: std::ops::Range<u32>) -> Result<(), StitchError> {
        let added = rows.end - rows.start;
        self.reserve_rows(added)?;
        self.image.data.extend_from_slice(frame.rows(rows));
        self.image.height += added;
        Ok(())
    }

    /// Amortized growth; reports failure instead of aborting.
    fn reserve_rows(&mut self, rows: u32) -> Result<(), StitchError> {
        let additional = (rows as usize)
            .checked_mul(self.image.stride())
            .ok_or(StitchError::OutOfMemory {
                requested: usize::MAX,
            })?;
        self.image.data.try_reserve(additional).map_err(|_| {
            StitchError::OutOfMemory {
                requested: self.image.data.len().saturating_add(additional),
            }
        })
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), StitchError> {
        frame.check_buffer()?;
        if frame.width != self.frame_width || frame.height != self.frame_height {
            return Err(StitchError::Composite(format!(
                "frame {}x{} does not match {}x{}",
                frame.width, frame.height, self.frame_width, self.frame_height
            )));
        }
        Ok(())
    }
}
