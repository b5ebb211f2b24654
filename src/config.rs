use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    video::{codec_to_int, FfmpegTools, PixelFormat},
};

/// Main configuration for a side-by-side run
///
/// Built once at startup from an optional TOML file with command line
/// flags layered on top, then passed around by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SxsConfig {
    /// The two videos and where to start in each
    pub inputs: InputsConfig,

    /// Output file and codec
    pub output: OutputConfig,

    /// Compositing behaviour
    pub pipeline: PipelineConfig,

    /// External tool locations
    pub tools: FfmpegTools,
}

impl SxsConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: SxsConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.inputs.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Input videos
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    /// First video, shown on the left
    pub input1: Option<PathBuf>,

    /// Second video, shown on the right
    pub input2: Option<PathBuf>,

    /// Frame to start the first video from
    pub input1_start_frame: i64,

    /// Frame to start the second video from
    pub input2_start_frame: i64,
}

impl InputsConfig {
    pub fn input1(&self) -> Result<&Path> {
        require_path(self.input1.as_deref(), "input1")
    }

    pub fn input2(&self) -> Result<&Path> {
        require_path(self.input2.as_deref(), "input2")
    }

    fn validate(&self) -> Result<()> {
        self.input1()?;
        self.input2()?;
        Ok(())
    }
}

/// Output video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File to write
    pub path: Option<PathBuf>,

    /// Four character code of the output codec
    pub fourcc_codec: String,

    /// Constant rate factor for encoders that support one (0-51)
    pub crf: Option<u8>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            fourcc_codec: "h264".to_string(),
            crf: None,
        }
    }
}

impl OutputConfig {
    pub fn path(&self) -> Result<&Path> {
        require_path(self.path.as_deref(), "output")
    }

    /// Packed FourCC of `fourcc_codec`
    pub fn fourcc(&self) -> Result<u32> {
        codec_to_int(&self.fourcc_codec)
    }

    fn validate(&self) -> Result<()> {
        self.path()?;
        self.fourcc()?;

        if let Some(crf) = self.crf.filter(|crf| *crf > 51) {
            return Err(ConfigError::InvalidValue {
                key: "output.crf".to_string(),
                value: crf.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Compositing behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resize the first video to the second one's geometry instead of the reverse
    pub adapt_first: bool,

    /// Show a live preview window while encoding
    pub preview: bool,

    /// Title of the preview window
    pub preview_title: String,

    /// Raw pixel layout used between decoder, compositor and encoder
    pub pixel_format: PixelFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            adapt_first: false,
            preview: true,
            preview_title: "video".to_string(),
            pixel_format: PixelFormat::Bgr24,
        }
    }
}

fn require_path<'a>(path: Option<&'a Path>, flag: &str) -> Result<&'a Path> {
    match path {
        Some(path) if !path.as_os_str().is_empty() => Ok(path),
        _ => Err(ConfigError::MissingFlag { flag: flag.to_string() }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn complete_config() -> SxsConfig {
        let mut config = SxsConfig::default();
        config.inputs.input1 = Some(PathBuf::from("a.mp4"));
        config.inputs.input2 = Some(PathBuf::from("b.mp4"));
        config.output.path = Some(PathBuf::from("out.mp4"));
        config
    }

    #[test]
    fn test_defaults() {
        let config = SxsConfig::default();
        assert_eq!(config.output.fourcc_codec, "h264");
        assert_eq!(config.inputs.input1_start_frame, 0);
        assert!(!config.pipeline.adapt_first);
        assert!(config.pipeline.preview);
        assert_eq!(config.pipeline.pixel_format, PixelFormat::Bgr24);
    }

    #[test]
    fn test_missing_inputs_are_reported_by_flag() {
        let err = SxsConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("Flag --input1 must be non-empty."));

        let mut config = complete_config();
        config.output.path = Some(PathBuf::new());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Flag --output must be non-empty."));
    }

    #[test]
    fn test_bad_codec_and_crf() {
        let mut config = complete_config();
        assert!(config.validate().is_ok());

        config.output.fourcc_codec = "h26".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Unknown output codec: h26"));

        config.output.fourcc_codec = "mp4v".to_string();
        config.output.crf = Some(60);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("sxs.toml");

        let mut original = complete_config();
        original.inputs.input2_start_frame = 10;
        original.pipeline.pixel_format = PixelFormat::Gray;

        original.save_to_file(&file_path).unwrap();
        let loaded = SxsConfig::from_file(&file_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(
            &file_path,
            "[inputs]\ninput1 = \"left.mkv\"\n\n[tools]\nffmpeg = \"/opt/ffmpeg/bin/ffmpeg\"\n",
        )
        .unwrap();

        let config = SxsConfig::from_file(&file_path).unwrap();
        assert_eq!(config.inputs.input1, Some(PathBuf::from("left.mkv")));
        assert_eq!(config.tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.output.fourcc_codec, "h264");
    }

    #[test]
    fn test_missing_file() {
        let err = SxsConfig::from_file("/no/such/sxs.toml").unwrap_err();
        assert_eq!(err.user_message(), "Configuration file '/no/such/sxs.toml' not found.");
    }
}
