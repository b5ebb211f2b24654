use std::io::{ErrorKind, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info};

use crate::error::{Result, VideoError};
use crate::video::tools::FfmpegTools;
use crate::video::types::{Frame, PixelFormat};

/// A live view of the frames being written
pub trait Preview {
    /// Display a frame
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// True once the user asked to close the preview
    ///
    /// An error means the preview stopped on its own and cannot be used any
    /// more. Must not block for more than a few milliseconds; it is polled
    /// once per frame.
    fn poll_cancel(&mut self) -> Result<bool>;

    /// Close the preview window
    fn close(&mut self);
}

/// Preview window backed by an `ffplay` child process
///
/// Frames are streamed to ffplay's stdin. Pressing Escape (or `q`) in the
/// window quits ffplay with a zero status, which is how cancellation is
/// detected. Any other exit status is reported as a failure.
pub struct FfplayPreview {
    program: String,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    cancelled: bool,
}

impl FfplayPreview {
    pub fn open(
        tools: &FfmpegTools,
        title: &str,
        size: (u32, u32),
        fps: f64,
        pixel_format: PixelFormat,
    ) -> Result<Self> {
        let mut args: Vec<String> = tools.quiet_args().into();
        args.extend([
            "-window_title".to_string(),
            title.to_string(),
            "-fflags".to_string(),
            "nobuffer".to_string(),
            "-framedrop".to_string(),
            "-an".to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pixel_format".to_string(),
            pixel_format.ffmpeg_name().to_string(),
            "-video_size".to_string(),
            format!("{}x{}", size.0, size.1),
            "-framerate".to_string(),
            format!("{:.6}", fps),
            "-".to_string(),
        ]);
        debug!("Spawning preview: {} {}", tools.ffplay.display(), args.join(" "));

        let mut child = Command::new(&tools.ffplay)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| VideoError::PreviewFailed {
                reason: format!("cannot start {}: {}", tools.ffplay.display(), e),
            })?;

        let stdin = child.stdin.take();
        info!("Press [Escape] to close the video preview.");

        Ok(Self {
            program: tools.ffplay.display().to_string(),
            child: Some(child),
            stdin,
            cancelled: false,
        })
    }
}

impl Preview for FfplayPreview {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };

        match stdin.write_all(frame.as_bytes()) {
            Ok(()) => Ok(()),
            // ffplay exited between polls; its status tells why.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                self.stdin = None;
                Ok(())
            }
            Err(e) => Err(VideoError::PreviewFailed {
                reason: e.to_string(),
            }
            .into()),
        }
    }

    fn poll_cancel(&mut self) -> Result<bool> {
        if self.cancelled {
            return Ok(true);
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };

        // A closed pipe means ffplay is already on its way out.
        let status = if self.stdin.is_none() {
            Some(child.wait()?)
        } else {
            child.try_wait()?
        };

        match status {
            None => Ok(false),
            Some(status) if status.success() => {
                self.cancelled = true;
                Ok(true)
            }
            Some(status) => {
                self.child = None;
                self.stdin = None;
                Err(VideoError::PreviewFailed {
                    reason: format!("{} exited with {}", self.program, status),
                }
                .into())
            }
        }
    }

    fn close(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FfplayPreview {
    fn drop(&mut self) {
        self.close();
    }
}
