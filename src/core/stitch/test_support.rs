//! Synthetic scroll recordings for tests.

use std::time::Duration;

use super::frame::Frame;
use super::source::MemoryFrameSource;

const HEADER_SEED: u32 = 0x5EED_0001;
const FOOTER_SEED: u32 = 0x5EED_0002;

fn mix(mut v: u32) -> u32 {
    v ^= v >> 16;
    v = v.wrapping_mul(0x7feb_352d);
    v ^= v >> 15;
    v = v.wrapping_mul(0x846c_a68b);
    v ^= v >> 16;
    v
}

/// Deterministic noise texture: every (row, column) gets its own colour.
pub fn texel(seed: u32, row: u32, x: u32) -> [u8; 4] {
    let h = mix(seed ^ mix(row.wrapping_mul(0x9e37_79b9) ^ mix(x)));
    [h as u8, (h >> 8) as u8, (h >> 16) as u8, 255]
}

pub fn content_texel(row: u32, x: u32) -> [u8; 4] {
    texel(0, row, x)
}

/// Rows `[0, height)` of the scrolling document.
pub fn document(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&content_texel(y, x));
        }
    }
    data
}

/// One screen of the document scrolled by `scroll` rows, with a fixed header
/// and footer painted over it.
pub fn scrolled_frame(
    width: u32,
    height: u32,
    scroll: u32,
    header: u32,
    footer: u32,
    timestamp_ms: u64,
) -> Frame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let px = if y < header {
                texel(HEADER_SEED, y, x)
            } else if y >= height - footer {
                texel(FOOTER_SEED, y, x)
            } else {
                content_texel(scroll + y, x)
            };
            data.extend_from_slice(&px);
        }
    }
    Frame::new(width, height, data, timestamp_ms)
}

pub fn uniform_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
    let data = (0..width * height)
        .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
        .collect();
    Frame::new(width, height, data, 0)
}

/// A recording that scrolls `step` rows every `interval_ms`, one frame per step.
pub fn scrolling_source(
    width: u32,
    height: u32,
    frames: u32,
    step: u32,
    header: u32,
    footer: u32,
    interval_ms: u64,
) -> MemoryFrameSource {
    let frames = (0..frames)
        .map(|i| scrolled_frame(width, height, i * step, header, footer, i as u64 * interval_ms))
        .collect();
    MemoryFrameSource::new(frames, Duration::from_millis(interval_ms))
        .expect("synthetic frames share one size")
}

/// Smooth ramp: rows `r` and `r + n` differ by exactly `n` per sample, valid
/// while `scroll + height` stays below 510.
pub fn gradient_frame(width: u32, height: u32, scroll: u32) -> Frame {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        let row = scroll + y;
        for x in 0..width {
            data.extend_from_slice(&[(row / 2) as u8, ((row + 1) / 2) as u8, x as u8, 255]);
        }
    }
    Frame::new(width, height, data, 0)
}
