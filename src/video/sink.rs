use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{CompositeError, Result, VideoError};
use crate::video::fourcc::{fourcc_to_string, EncoderSelection};
use crate::video::tools::FfmpegTools;
use crate::video::types::{Frame, PixelFormat};

/// Consumes composited frames in order
pub trait FrameSink {
    /// Append one frame to the output
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the output; no frames may follow
    fn finish(&mut self) -> Result<()>;
}

/// Output stream parameters fixed when the sink is created
#[derive(Debug, Clone, PartialEq)]
pub struct SinkParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Packed FourCC of the output codec
    pub fourcc: u32,
    pub pixel_format: PixelFormat,
    /// Constant rate factor for encoders that take one
    pub crf: Option<u8>,
}

/// Encodes raw frames into a video file through an `ffmpeg` child process
pub struct FfmpegSink {
    path: PathBuf,
    params: SinkParams,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    frames_written: u64,
}

impl FfmpegSink {
    /// Start an encoder writing to `path`
    pub fn create(tools: &FfmpegTools, path: &Path, params: SinkParams) -> Result<Self> {
        // ffmpeg only reports an unwritable output once it has consumed the first frame
        File::create(path).map_err(|_| VideoError::OutputFailed {
            path: path.display().to_string(),
        })?;

        let args = encoder_args(tools, path, &params);
        debug!("Spawning encoder: {} {}", tools.ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&tools.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|_| VideoError::ToolMissing {
                tool: tools.ffmpeg.display().to_string(),
            })?;

        let stdin = child.stdin.take();
        info!(
            "Writing {}x{} @ {:.3} fps ({}) to {}",
            params.width,
            params.height,
            params.fps,
            fourcc_to_string(params.fourcc),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            params,
            child: Some(child),
            stdin,
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn wait_for_encoder(&mut self) -> Result<()> {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(VideoError::EncodingFailed {
                    reason: format!("encoder for {} exited with {}", self.path.display(), status),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.size() != (self.params.width, self.params.height) {
            return Err(CompositeError::SizeMismatch {
                width: self.params.width,
                height: self.params.height,
                found_width: frame.width(),
                found_height: frame.height(),
            }
            .into());
        }
        if frame.channels() != self.params.pixel_format.channels() {
            return Err(VideoError::InvalidFrame {
                details: format!(
                    "{} channels cannot be encoded as {}",
                    frame.channels(),
                    self.params.pixel_format
                ),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodingFailed {
            reason: format!("{} is already closed", self.path.display()),
        })?;

        match stdin.write_all(frame.as_bytes()) {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // The encoder died; its exit status carries the reason.
                self.wait_for_encoder()?;
                Err(VideoError::EncodingFailed {
                    reason: format!("encoder for {} closed its input", self.path.display()),
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.wait_for_encoder()?;
        debug!("Encoder finished after {} frames", self.frames_written);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            warn!("Closing {} before the run completed", self.path.display());
            let _ = self.wait_for_encoder();
        }
    }
}

fn encoder_args(tools: &FfmpegTools, path: &Path, params: &SinkParams) -> Vec<String> {
    let mut args: Vec<String> = tools.quiet_args().into();
    args.extend([
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        params.pixel_format.ffmpeg_name().to_string(),
        "-s".to_string(),
        format!("{}x{}", params.width, params.height),
        "-r".to_string(),
        format!("{:.6}", params.fps),
        "-i".to_string(),
        "-".to_string(),
        "-an".to_string(),
    ]);

    let selection = EncoderSelection::for_fourcc(params.fourcc);
    if selection.encoder.is_none() {
        warn!(
            "No known encoder for FourCC '{}', leaving the choice to ffmpeg",
            fourcc_to_string(params.fourcc)
        );
    }
    args.extend(selection.ffmpeg_args());

    let output_pix_fmt = match selection.encoder {
        Some("mjpeg") => Some("yuvj420p"),
        Some("ffv1") | None => None,
        Some(_) => Some("yuv420p"),
    };
    if let Some(pix_fmt) = output_pix_fmt {
        args.push("-pix_fmt".to_string());
        args.push(pix_fmt.to_string());
    }

    if let (Some(crf), Some("libx264" | "libx265" | "libvpx-vp9" | "libaom-av1")) =
        (params.crf, selection.encoder)
    {
        args.push("-crf".to_string());
        args.push(crf.to_string());
    }

    args.push(path.display().to_string());
    args
}
