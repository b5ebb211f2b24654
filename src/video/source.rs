use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::debug;

use crate::error::{Result, VideoError};
use crate::video::probe::probe_video;
use crate::video::tools::FfmpegTools;
use crate::video::types::{Frame, PixelFormat, VideoInfo};

/// A stream of decoded frames from one input
pub trait FrameSource {
    /// Metadata of the underlying video
    fn info(&self) -> &VideoInfo;

    /// Move the read cursor so the next frame read is `frame`
    fn seek(&mut self, frame: u64) -> Result<()>;

    /// Decode the next frame; `None` once the stream is exhausted
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

struct Decoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
}

impl Drop for Decoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Decodes a video file to raw frames through an `ffmpeg` child process
///
/// The decoder process is started lazily on the first read, so seeking
/// before reading costs nothing. Seeking after reading restarts it.
pub struct FfmpegSource {
    info: VideoInfo,
    tools: FfmpegTools,
    pixel_format: PixelFormat,
    start_frame: u64,
    frames_read: u64,
    decoder: Option<Decoder>,
}

impl FfmpegSource {
    /// Probe `path` and prepare to decode it as `pixel_format`
    pub fn open(tools: &FfmpegTools, path: &Path, pixel_format: PixelFormat) -> Result<Self> {
        let info = probe_video(tools, path)?;
        debug!(
            "Opened {} ({}x{} {} @ {:.3} fps, {} frames)",
            path.display(),
            info.width,
            info.height,
            info.codec,
            info.fps,
            info.frame_count
        );

        Ok(Self {
            info,
            tools: tools.clone(),
            pixel_format,
            start_frame: 0,
            frames_read: 0,
            decoder: None,
        })
    }

    fn decoder_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.tools.quiet_args().into();
        args.push("-nostdin".to_string());
        args.push("-noautorotate".to_string());

        if self.start_frame > 0 {
            args.push("-ss".to_string());
            args.push(format!("{:.6}", self.start_frame as f64 / self.info.fps));
        }

        args.push("-i".to_string());
        args.push(self.info.path.display().to_string());
        args.extend(
            [
                "-map",
                "0:v:0",
                "-an",
                "-sn",
                "-fps_mode",
                "passthrough",
                "-f",
                "rawvideo",
                "-pix_fmt",
                self.pixel_format.ffmpeg_name(),
                "-",
            ]
            .map(String::from),
        );
        args
    }

    fn spawn_decoder(&self) -> Result<Decoder> {
        let args = self.decoder_args();
        debug!("Spawning decoder: {} {}", self.tools.ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&self.tools.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|_| VideoError::ToolMissing {
                tool: self.tools.ffmpeg.display().to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::DecodingFailed {
            reason: "decoder stdout was not captured".to_string(),
        })?;

        Ok(Decoder {
            child,
            stdout: BufReader::with_capacity(
                self.pixel_format.frame_len(self.info.width, self.info.height),
                stdout,
            ),
        })
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        self.decoder = None;
        self.start_frame = frame;
        self.frames_read = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let decoder = match self.decoder.take() {
            Some(decoder) => decoder,
            None => self.spawn_decoder()?,
        };
        let decoder = self.decoder.insert(decoder);

        let len = self.pixel_format.frame_len(self.info.width, self.info.height);
        let mut data = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match decoder.stdout.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(VideoError::DecodingFailed {
                        reason: format!("{}: {}", self.info.path.display(), e),
                    }
                    .into())
                }
            }
        }

        if filled == 0 {
            let status = decoder.child.wait()?;
            if !status.success() {
                return Err(VideoError::DecodingFailed {
                    reason: format!("{}: decoder exited with {}", self.info.path.display(), status),
                }
                .into());
            }
            debug!(
                "{} ended after {} frames from frame {}",
                self.info.path.display(),
                self.frames_read,
                self.start_frame
            );
            return Ok(None);
        }

        if filled < len {
            return Err(VideoError::DecodingFailed {
                reason: format!(
                    "{}: truncated frame ({} of {} bytes)",
                    self.info.path.display(),
                    filled,
                    len
                ),
            }
            .into());
        }

        self.frames_read += 1;
        Frame::from_raw(
            self.info.width,
            self.info.height,
            self.pixel_format.channels(),
            data,
        )
        .map(Some)
    }
}
