//! In-memory sources, sinks and previews.
//!
//! These drive the compositor without any external tool, which is what the
//! test-suite and the benchmarks use.

use std::path::PathBuf;

use crate::error::{Result, VideoError};
use crate::video::preview::Preview;
use crate::video::sink::FrameSink;
use crate::video::source::FrameSource;
use crate::video::types::{Frame, VideoInfo};

/// A source that replays a fixed list of frames
#[derive(Debug, Clone)]
pub struct MemorySource {
    info: VideoInfo,
    frames: Vec<Frame>,
    position: usize,
}

impl MemorySource {
    /// Build a source from frames; size and count are taken from them
    pub fn new(name: &str, fps: f64, frames: Vec<Frame>) -> Self {
        let (width, height) = frames.first().map(Frame::size).unwrap_or((0, 0));
        let info = VideoInfo {
            path: PathBuf::from(name),
            width,
            height,
            codec: "raw ".to_string(),
            fps,
            frame_count: frames.len() as u64,
        };
        Self { info, frames, position: 0 }
    }

    /// `count` frames of a solid pixel value
    pub fn solid(name: &str, size: (u32, u32), pixel: &[u8], count: usize) -> Self {
        let frame = Frame::new_filled(size.0, size.1, pixel);
        Self::new(name, 30.0, vec![frame; count])
    }

    /// Report a different frame count than the frames actually held
    pub fn with_reported_frames(mut self, frame_count: u64) -> Self {
        self.info.frame_count = frame_count;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn seek(&mut self, frame: u64) -> Result<()> {
        self.position = frame as usize;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames.get(self.position).cloned();
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}

/// A sink that keeps every frame it receives
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Frame>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.finished {
            return Err(VideoError::EncodingFailed {
                reason: "sink already finished".to_string(),
            }
            .into());
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// A preview that reports a cancel key press, or a crash, after a given
/// number of frames
#[derive(Debug, Default)]
pub struct ScriptedPreview {
    pub shown: usize,
    pub cancel_after: Option<usize>,
    pub fail_after: Option<usize>,
    pub closed: bool,
}

impl ScriptedPreview {
    pub fn cancel_after(frames: usize) -> Self {
        Self {
            cancel_after: Some(frames),
            ..Self::default()
        }
    }

    pub fn fail_after(frames: usize) -> Self {
        Self {
            fail_after: Some(frames),
            ..Self::default()
        }
    }
}

impl Preview for ScriptedPreview {
    fn show(&mut self, _frame: &Frame) -> Result<()> {
        self.shown += 1;
        Ok(())
    }

    fn poll_cancel(&mut self) -> Result<bool> {
        if self.fail_after.is_some_and(|n| self.shown >= n) {
            return Err(VideoError::PreviewFailed {
                reason: "window went away".to_string(),
            }
            .into());
        }
        Ok(self.cancel_after.is_some_and(|n| self.shown >= n))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
