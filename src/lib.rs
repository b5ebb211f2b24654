//! # video-sxs
//!
//! Compare two videos side by side: every output frame takes its left half
//! from the first video and its right half from the second, separated by a
//! one pixel white divider.
//!
//! Decoding, encoding and the live preview go through the FFmpeg command
//! line tools (`ffmpeg`, `ffprobe`, `ffplay`); resizing uses the `image` crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use video_sxs::{SideBySideEngine, SxsConfig};
//!
//! # fn main() -> video_sxs::Result<()> {
//! let mut config = SxsConfig::default();
//! config.inputs.input1 = Some(PathBuf::from("before.mp4"));
//! config.inputs.input2 = Some(PathBuf::from("after.mp4"));
//! config.output.path = Some(PathBuf::from("compare.mp4"));
//! config.pipeline.preview = false;
//!
//! let report = SideBySideEngine::new(config).compose(&mut |_, _| {})?;
//! println!("wrote {} frames", report.summary.frames_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - frames, probing, FFmpeg-backed sources, sinks and preview
//! - [`composition`] - start frame validation, geometry negotiation, the splice and the frame loop
//! - [`config`] - configuration file and flag handling
//!
//! The frame loop ([`composition::run_composition`]) only sees the
//! [`video::FrameSource`], [`video::FrameSink`] and [`video::Preview`] traits,
//! so it can be driven by the in-memory types in [`video::memory`].

pub mod composition;
pub mod config;
pub mod error;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CompositionPlan, RunReport, SideBySideEngine},
    config::SxsConfig,
    error::{Result, SxsError},
    video::{Frame, PixelFormat},
};
