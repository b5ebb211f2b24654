use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VideoError};

/// A single decoded video frame
///
/// Samples are `u8`, channels are interleaved and rows are stored
/// top to bottom without padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw interleaved buffer, checking its length against the geometry
    pub fn from_raw(width: u32, height: u32, channels: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * channels;
        if channels == 0 || data.len() != expected {
            return Err(VideoError::InvalidFrame {
                details: format!(
                    "{}x{}x{} needs {} samples, got {}",
                    width,
                    height,
                    channels,
                    expected,
                    data.len()
                ),
            }
            .into());
        }

        Ok(Self { width, height, channels, data })
    }

    /// Create a frame with every pixel set to `pixel`; its length is the channel count
    pub fn new_filled(width: u32, height: u32, pixel: &[u8]) -> Self {
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * pixel.len())
            .collect();

        Self {
            width,
            height,
            channels: pixel.len(),
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// (width, height)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of samples in one row
    pub fn row_len(&self) -> usize {
        self.width as usize * self.channels
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let len = self.row_len();
        let start = y as usize * len;
        &self.data[start..start + len]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let len = self.row_len();
        let start = y as usize * len;
        &mut self.data[start..start + len]
    }

    /// Samples of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let start = x as usize * self.channels;
        &self.row(y)[start..start + self.channels]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Return a copy scaled to `width` x `height` with bilinear filtering
    pub fn resized(&self, width: u32, height: u32) -> Result<Frame> {
        if (width, height) == self.size() {
            return Ok(self.clone());
        }

        match self.channels {
            1 => self.resize_as::<Luma<u8>>(width, height),
            2 => self.resize_as::<LumaA<u8>>(width, height),
            3 => self.resize_as::<Rgb<u8>>(width, height),
            4 => self.resize_as::<Rgba<u8>>(width, height),
            n => Err(VideoError::InvalidFrame {
                details: format!("cannot resize a frame with {} channels", n),
            }
            .into()),
        }
    }

    // Channel order is irrelevant to the filter, so BGR data goes through Rgb as-is.
    fn resize_as<P>(&self, width: u32, height: u32) -> Result<Frame>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        let view: ImageBuffer<P, &[u8]> =
            ImageBuffer::from_raw(self.width, self.height, self.data.as_slice()).ok_or_else(
                || VideoError::InvalidFrame {
                    details: format!("{}x{} buffer is too short", self.width, self.height),
                },
            )?;

        let resized = imageops::resize(&view, width, height, FilterType::Triangle);
        Ok(Frame {
            width,
            height,
            channels: self.channels,
            data: resized.into_raw(),
        })
    }
}

/// Raw pixel layout frames are decoded into and encoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Bgr24,
    Rgb24,
    Bgra,
    Rgba,
    Gray,
}

impl PixelFormat {
    /// Name understood by ffmpeg's `-pix_fmt`
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Bgr24 => "bgr24",
            Self::Rgb24 => "rgb24",
            Self::Bgra => "bgra",
            Self::Rgba => "rgba",
            Self::Gray => "gray",
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Bgr24 | Self::Rgb24 => 3,
            Self::Bgra | Self::Rgba => 4,
            Self::Gray => 1,
        }
    }

    /// Bytes in one frame of the given size
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.channels()
    }
}

impl FromStr for PixelFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bgr24" => Ok(Self::Bgr24),
            "rgb24" => Ok(Self::Rgb24),
            "bgra" => Ok(Self::Bgra),
            "rgba" => Ok(Self::Rgba),
            "gray" | "grey" => Ok(Self::Gray),
            other => Err(format!(
                "unsupported pixel format '{}' (expected bgr24, rgb24, bgra, rgba or gray)",
                other
            )),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ffmpeg_name())
    }
}

/// Metadata of an input video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Path the video was opened from
    pub path: PathBuf,

    pub width: u32,

    pub height: u32,

    /// Four character codec tag, as stored in the container
    pub codec: String,

    /// Frames per second
    pub fps: f64,

    /// Total number of frames
    pub frame_count: u64,
}

impl VideoInfo {
    /// (width, height)
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Duration in seconds derived from frame count and rate
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }
}

impl fmt::Display for VideoInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\t\tPath:\t{}", self.path.display())?;
        writeln!(f, "\t\tWidth:\t{}", self.width)?;
        writeln!(f, "\t\tHeight:\t{}", self.height)?;
        writeln!(f, "\t\tCodec:\t{}", self.codec)?;
        writeln!(f, "\t\tFPS:\t{:.6}", self.fps)?;
        writeln!(f, "\t\tFrames:\t{}", self.frame_count)?;
        write!(f, "\t\tDuration:\t{:.6} seconds", self.duration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_checks_length() {
        assert!(Frame::from_raw(4, 2, 3, vec![0; 24]).is_ok());
        assert!(Frame::from_raw(4, 2, 3, vec![0; 23]).is_err());
        assert!(Frame::from_raw(4, 2, 0, Vec::new()).is_err());
    }

    #[test]
    fn test_rows_and_pixels() {
        let data: Vec<u8> = (0..18).collect();
        let frame = Frame::from_raw(3, 2, 3, data).unwrap();

        assert_eq!(frame.row_len(), 9);
        assert_eq!(frame.row(1), &[9, 10, 11, 12, 13, 14, 15, 16, 17]);
        assert_eq!(frame.pixel(2, 0), &[6, 7, 8]);
    }

    #[test]
    fn test_resize_keeps_channels_and_solid_color() {
        let frame = Frame::new_filled(64, 48, &[10, 20, 30]);
        let resized = frame.resized(32, 20).unwrap();

        assert_eq!(resized.size(), (32, 20));
        assert_eq!(resized.channels(), 3);
        assert_eq!(resized.as_bytes().len(), 32 * 20 * 3);
        assert_eq!(resized.pixel(7, 11), &[10, 20, 30]);
    }

    #[test]
    fn test_resize_gray_and_bgra() {
        let gray = Frame::new_filled(10, 10, &[200]);
        assert_eq!(gray.resized(20, 5).unwrap().pixel(19, 4), &[200]);

        let bgra = Frame::new_filled(10, 10, &[1, 2, 3, 255]);
        assert_eq!(bgra.resized(3, 3).unwrap().channels(), 4);
    }

    #[test]
    fn test_resize_rejects_odd_layouts() {
        let frame = Frame::new_filled(4, 4, &[0, 0, 0, 0, 0]);
        assert!(frame.resized(2, 2).is_err());
    }

    #[test]
    fn test_pixel_format_parsing() {
        assert_eq!("BGR24".parse::<PixelFormat>().unwrap(), PixelFormat::Bgr24);
        assert_eq!("grey".parse::<PixelFormat>().unwrap(), PixelFormat::Gray);
        assert!("yuv420p".parse::<PixelFormat>().is_err());
        assert_eq!(PixelFormat::Rgba.frame_len(2, 2), 16);
    }

    #[test]
    fn test_video_info_display() {
        let info = VideoInfo {
            path: PathBuf::from("a.mp4"),
            width: 640,
            height: 480,
            codec: "avc1".to_string(),
            fps: 25.0,
            frame_count: 100,
        };

        assert_eq!(info.duration(), 4.0);
        let text = info.to_string();
        assert!(text.contains("\t\tCodec:\tavc1"));
        assert!(text.ends_with("\t\tDuration:\t4.000000 seconds"));
    }
}
