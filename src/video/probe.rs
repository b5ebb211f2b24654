use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::video::fourcc::fourcc_to_string;
use crate::video::tools::FfmpegTools;
use crate::video::types::VideoInfo;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    codec_tag: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Read the metadata of the first video stream in `path` with ffprobe
///
/// `path` is handed to ffprobe as is, so stream URLs and devices work too.
pub fn probe_video(tools: &FfmpegTools, path: &Path) -> Result<VideoInfo> {
    let output = Command::new(&tools.ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
            "-select_streams",
            "v:0",
        ])
        .arg(path)
        .output()
        .map_err(|_| VideoError::ToolMissing {
            tool: tools.ffprobe.display().to_string(),
        })?;

    if !output.status.success() {
        debug!(
            "ffprobe exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Err(VideoError::OpenFailed {
            path: path.display().to_string(),
        }
        .into());
    }

    parse_probe_output(path, &output.stdout)
}

/// Turn ffprobe's JSON report into a [`VideoInfo`]
pub fn parse_probe_output(path: &Path, json: &[u8]) -> Result<VideoInfo> {
    let probe_failed = |reason: String| VideoError::ProbeFailed {
        path: path.display().to_string(),
        reason,
    };

    let report: FfprobeOutput =
        serde_json::from_slice(json).map_err(|e| probe_failed(e.to_string()))?;

    let stream = report
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VideoError::OpenFailed {
            path: path.display().to_string(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(probe_failed("video stream has no dimensions".to_string()).into()),
    };

    let fps = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|rate| parse_rate(rate))
        .ok_or_else(|| probe_failed("video stream has no frame rate".to_string()))?;

    let codec = match stream.codec_tag.as_deref().and_then(parse_tag) {
        Some(tag) if tag != 0 => fourcc_to_string(tag),
        _ => stream.codec_name.clone().unwrap_or_else(|| "none".to_string()),
    };

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) if n > 0 => n,
        _ => {
            let duration = stream
                .duration
                .as_deref()
                .or(report.format.as_ref().and_then(|f| f.duration.as_deref()))
                .and_then(|d| d.parse::<f64>().ok())
                .ok_or_else(|| probe_failed("frame count and duration are unknown".to_string()))?;

            let estimated = (duration * fps).round() as u64;
            warn!(
                "{} does not report a frame count, estimated {} frames from {:.3}s",
                path.display(),
                estimated,
                duration
            );
            estimated
        }
    };

    Ok(VideoInfo {
        path: path.to_path_buf(),
        width,
        height,
        codec,
        fps,
        frame_count,
    })
}

/// Parse an ffprobe rational such as `30000/1001`
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (rate.trim().parse::<f64>().ok()?, 1.0),
    };

    if den == 0.0 || num <= 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// Parse an ffprobe codec tag such as `0x31637661`
fn parse_tag(tag: &str) -> Option<u32> {
    let hex = tag.strip_prefix("0x").or_else(|| tag.strip_prefix("0X"))?;
    u32::from_str_radix(hex, 16).ok()
}
