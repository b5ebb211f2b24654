use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use video_sxs::{PixelFormat, SideBySideEngine, SxsConfig, SxsError};

#[derive(Parser, Debug)]
#[command(
    name = "video-sxs",
    version,
    about = "Compose two videos side by side",
    long_about = "Writes a video whose frames show the left half of the first input next to the right half of the second input, split by a white divider line. The run can be previewed live; press Escape in the preview window to close it while encoding continues."
)]
struct Cli {
    /// First video, shown on the left
    #[arg(long = "input1")]
    input1: Option<PathBuf>,

    /// Second video, shown on the right
    #[arg(long = "input2")]
    input2: Option<PathBuf>,

    /// Frame to start the first video from
    #[arg(long = "input1_start_frame", visible_alias = "input1-start-frame", allow_negative_numbers = true)]
    input1_start_frame: Option<i64>,

    /// Frame to start the second video from
    #[arg(long = "input2_start_frame", visible_alias = "input2-start-frame", allow_negative_numbers = true)]
    input2_start_frame: Option<i64>,

    /// Resize the first video to the second one's size and frame rate.
    /// By default the second video is adapted to the first.
    #[arg(
        long = "adapt_first",
        visible_alias = "adapt-first",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    adapt_first: Option<bool>,

    /// Output video file
    #[arg(short, long = "output")]
    output: Option<PathBuf>,

    /// FourCC codec identifier of the output [default: h264]
    #[arg(long = "fourcc_codec", visible_alias = "fourcc-codec")]
    fourcc_codec: Option<String>,

    /// Constant rate factor for x264/x265/VP9/AV1 output (0-51)
    #[arg(long)]
    crf: Option<u8>,

    /// Raw pixel layout used while compositing (bgr24, rgb24, bgra, rgba, gray)
    #[arg(long = "pixel_format", visible_alias = "pixel-format")]
    pixel_format: Option<PixelFormat>,

    /// Do not open the preview window
    #[arg(long = "no_preview", visible_alias = "no-preview")]
    no_preview: bool,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Layer the flags that were given over `config`
    fn apply(self, config: &mut SxsConfig) {
        if let Some(path) = self.input1 {
            config.inputs.input1 = Some(path);
        }
        if let Some(path) = self.input2 {
            config.inputs.input2 = Some(path);
        }
        if let Some(start) = self.input1_start_frame {
            config.inputs.input1_start_frame = start;
        }
        if let Some(start) = self.input2_start_frame {
            config.inputs.input2_start_frame = start;
        }
        if let Some(adapt_first) = self.adapt_first {
            config.pipeline.adapt_first = adapt_first;
        }
        if let Some(path) = self.output {
            config.output.path = Some(path);
        }
        if let Some(codec) = self.fourcc_codec {
            config.output.fourcc_codec = codec;
        }
        if let Some(crf) = self.crf {
            config.output.crf = Some(crf);
        }
        if let Some(pixel_format) = self.pixel_format {
            config.pipeline.pixel_format = pixel_format;
        }
        if self.no_preview {
            config.pipeline.preview = false;
        }
    }
}

/// Set while the progress counter line on stdout is unterminated
static PROGRESS_LINE_OPEN: AtomicBool = AtomicBool::new(false);

/// Log writer that first ends an open progress line
struct LogWriter<W>(W);

impl<W: Write> Write for LogWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if PROGRESS_LINE_OPEN.swap(false, Ordering::Relaxed) {
            self.0.write_all(b"\n")?;
        }
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(|| LogWriter(io::stdout()))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (message, code) = match err.downcast_ref::<SxsError>() {
                Some(sxs) => (sxs.user_message(), sxs.exit_code()),
                None => (format!("{:#}", err), 1),
            };
            if PROGRESS_LINE_OPEN.swap(false, Ordering::Relaxed) {
                println!();
            }
            eprintln!("Error: {}", message);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("Starting video-sxs v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            SxsConfig::from_file(config_path)?
        }
        None => SxsConfig::default(),
    };
    cli.apply(&mut config);

    let engine = SideBySideEngine::new(config);
    let report = engine.compose(&mut |done, total| {
        print!("\rVideo Frame: {}/{}", done, total);
        let _ = io::stdout().flush();
        PROGRESS_LINE_OPEN.store(true, Ordering::Relaxed);
    })?;

    if PROGRESS_LINE_OPEN.swap(false, Ordering::Relaxed) {
        println!();
    }
    if report.summary.frames_written < report.summary.frames_expected {
        println!(
            "Inputs ended early: wrote {} of {} frames.",
            report.summary.frames_written, report.summary.frames_expected
        );
    }
    if report.summary.preview_dismissed {
        println!("Preview was closed during the run.");
    }
    if report.summary.preview_failed {
        println!("Preview stopped unexpectedly; encoding continued without it.");
    }
    println!(
        "Wrote {} frames ({}x{} @ {:.3} fps) to: {}",
        report.summary.frames_written,
        report.plan.frame_matrix_dims.0,
        report.plan.frame_matrix_dims.1,
        report.plan.fps,
        report.output().display()
    );
    Ok(())
}
