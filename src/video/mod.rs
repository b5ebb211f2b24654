//! # Video I/O
//!
//! Probing, decoding, encoding and previewing video through the FFmpeg
//! command line tools, plus the frame type the compositor works on.

pub mod fourcc;
pub mod memory;
pub mod preview;
pub mod probe;
pub mod sink;
pub mod source;
pub mod tools;
pub mod types;

pub use fourcc::{codec_to_int, fourcc_to_string, EncoderSelection};
pub use preview::{FfplayPreview, Preview};
pub use probe::probe_video;
pub use sink::{FfmpegSink, FrameSink, SinkParams};
pub use source::{FfmpegSource, FrameSource};
pub use tools::FfmpegTools;
pub use types::{Frame, PixelFormat, VideoInfo};
