use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VideoError};

/// Locations of the FFmpeg command line tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegTools {
    /// Decoder and encoder binary
    pub ffmpeg: PathBuf,

    /// Metadata probe binary
    pub ffprobe: PathBuf,

    /// Preview player binary
    pub ffplay: PathBuf,

    /// Value passed to `-loglevel` of every spawned tool
    pub log_level: String,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            ffplay: PathBuf::from("ffplay"),
            log_level: "error".to_string(),
        }
    }
}

impl FfmpegTools {
    /// Check that a tool starts and reports its version
    pub fn is_available(tool: &Path) -> bool {
        Command::new(tool)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Fail unless both `ffmpeg` and `ffprobe` can be run
    pub fn ensure_available(&self) -> Result<()> {
        for tool in [&self.ffprobe, &self.ffmpeg] {
            if !Self::is_available(tool) {
                return Err(VideoError::ToolMissing {
                    tool: tool.display().to_string(),
                }
                .into());
            }
            debug!("Found {}", tool.display());
        }
        Ok(())
    }

    /// Arguments shared by every spawned tool
    pub(crate) fn quiet_args(&self) -> [String; 3] {
        [
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.log_level.clone(),
        ]
    }
}

/// Write an executable shell script standing in for one of the tools
#[cfg(all(test, unix))]
pub(crate) fn script_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let path = dir.join(name);
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o755)
        .open(&path)
        .unwrap();
    writeln!(file, "#!/bin/sh\n{}", body).unwrap();
    file.sync_all().unwrap();
    path
}
