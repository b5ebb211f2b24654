//! FourCC codec tags and the encoder each one selects.

use crate::error::{ConfigError, Result};

/// Pack a 4 character codec name into a little-endian `u32`, case-folded to lowercase
pub fn codec_to_int(codec: &str) -> Result<u32> {
    let bytes: [u8; 4] = codec
        .as_bytes()
        .try_into()
        .map_err(|_| ConfigError::UnknownCodec { codec: codec.to_string() })?;

    Ok(u32::from_le_bytes(bytes.map(|b| b.to_ascii_lowercase())))
}

/// Unpack a little-endian FourCC into its characters
pub fn fourcc_to_string(fourcc: u32) -> String {
    fourcc
        .to_le_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect()
}

/// Encoder arguments chosen for an output FourCC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSelection {
    /// ffmpeg encoder name; `None` leaves the choice to the container
    pub encoder: Option<&'static str>,

    /// Tag forced onto the output stream
    pub tag: Option<String>,
}

impl EncoderSelection {
    pub fn for_fourcc(fourcc: u32) -> Self {
        let name = fourcc_to_string(fourcc);
        let encoder = match name.as_str() {
            "h264" | "avc1" | "x264" => Some("libx264"),
            "hevc" | "hvc1" | "hev1" | "h265" | "x265" => Some("libx265"),
            "mp4v" | "fmp4" | "xvid" | "divx" => Some("mpeg4"),
            "mjpg" => Some("mjpeg"),
            "vp80" => Some("libvpx"),
            "vp90" => Some("libvpx-vp9"),
            "av01" => Some("libaom-av1"),
            "ffv1" => Some("ffv1"),
            _ => None,
        };

        let tag = match name.as_str() {
            "xvid" | "divx" => Some(name.to_ascii_uppercase()),
            _ if encoder.is_none() => Some(name),
            _ => None,
        };

        Self { encoder, tag }
    }

    /// ffmpeg output arguments for this selection
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(encoder) = self.encoder {
            args.push("-c:v".to_string());
            args.push(encoder.to_string());
        }
        if let Some(tag) = &self.tag {
            args.push("-tag:v".to_string());
            args.push(tag.clone());
        }
        args
    }
}
