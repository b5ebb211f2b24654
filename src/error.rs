use thiserror::Error;

/// Main error type for video-sxs
#[derive(Error, Debug)]
pub enum SxsError {
    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Composition error: {0}")]
    Composite(#[from] CompositeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Video I/O errors (probing, decoding, encoding, preview)
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Unable to open input file: {path}")]
    OpenFailed { path: String },

    #[error("Unable to open output file: {path}")]
    OutputFailed { path: String },

    #[error("Probing {path} failed: {reason}")]
    ProbeFailed { path: String, reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Preview failed: {reason}")]
    PreviewFailed { reason: String },

    #[error("Required tool not available: {tool}")]
    ToolMissing { tool: String },

    #[error("Invalid frame buffer: {details}")]
    InvalidFrame { details: String },
}

/// Errors raised while aligning and compositing the two streams
#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("Video {video} start frame {start} ought to be in range [0, {frames})")]
    StartFrameOutOfRange { video: u8, start: i64, frames: u64 },

    #[error("Mismatched number of channels in videos 1 and 2: {expected}, {found}")]
    ChannelMismatch { expected: usize, found: usize },

    #[error("Frame size {found_width}x{found_height} does not match output size {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Flag --{flag} must be non-empty.")]
    MissingFlag { flag: String },

    #[error("Unknown output codec: {codec}")]
    UnknownCodec { codec: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to parse configuration file: {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using SxsError
pub type Result<T> = std::result::Result<T, SxsError>;

impl SxsError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io(_) => 1,
            Self::Config(_) => 2,
            Self::Video(VideoError::OpenFailed { .. } | VideoError::OutputFailed { .. }) => 3,
            Self::Composite(CompositeError::ChannelMismatch { .. }) => 4,
            Self::Composite(_) => 3,
            Self::Video(_) => 5,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::OpenFailed { path }) => {
                format!("Unable to open input file '{}'. Check the file exists and contains a video stream.", path)
            }
            Self::Video(VideoError::ToolMissing { tool }) => {
                format!("'{}' was not found. Install FFmpeg or point [tools] in the config file at it.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
