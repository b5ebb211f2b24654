//! Row splicing: left half from one frame, right half from another.

use crate::error::{CompositeError, Result};
use crate::video::Frame;

/// Sample value of the divider column
pub const DIVIDER_SAMPLE: u8 = u8::MAX;

/// Index of the first divider sample in a row of `width` pixels
///
/// The split works on samples, so for odd widths the left side gets the
/// floor of the half.
pub fn split_point(width: u32, channels: usize) -> usize {
    width as usize * channels / 2
}

/// Copy the left half of `left` over `right` and draw the divider after it
///
/// Both rows must have the same length. The divider is `channels` samples
/// wide and is clipped at the end of the row.
pub fn splice_row(left: &[u8], right: &mut [u8], channels: usize) {
    debug_assert_eq!(left.len(), right.len());

    let split = right.len() / 2;
    right[..split].copy_from_slice(&left[..split]);

    let end = (split + channels).min(right.len());
    right[split..end].fill(DIVIDER_SAMPLE);
}

/// Splice every row of `left` into `right` in place
pub fn splice_frames(left: &Frame, right: &mut Frame) -> Result<()> {
    if left.channels() != right.channels() {
        return Err(CompositeError::ChannelMismatch {
            expected: left.channels(),
            found: right.channels(),
        }
        .into());
    }
    if left.size() != right.size() {
        return Err(CompositeError::SizeMismatch {
            width: right.width(),
            height: right.height(),
            found_width: left.width(),
            found_height: left.height(),
        }
        .into());
    }

    let channels = right.channels();
    let row_len = right.row_len();
    if row_len == 0 {
        return Ok(());
    }

    for (src, dst) in left
        .as_bytes()
        .chunks_exact(row_len)
        .zip(right.as_bytes_mut().chunks_exact_mut(row_len))
    {
        splice_row(src, dst, channels);
    }
    Ok(())
}
