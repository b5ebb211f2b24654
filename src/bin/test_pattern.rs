// Generates a synthetic input clip for trying out video-sxs by hand

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use video_sxs::video::{codec_to_int, FfmpegSink, FfmpegTools, Frame, FrameSink, PixelFormat, SinkParams};

#[derive(Parser)]
#[command(name = "sxs-test-pattern", about = "Write a hue sweep test clip with a moving bar")]
struct Args {
    /// Output video file
    #[arg(short, long)]
    output: PathBuf,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Number of frames to write
    #[arg(long, default_value_t = 90)]
    frames: u32,

    /// Hue offset in degrees, so two clips can be told apart
    #[arg(long, default_value_t = 0.0)]
    hue: f32,

    /// FourCC codec identifier of the output
    #[arg(long, default_value = "h264")]
    fourcc_codec: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let tools = FfmpegTools::default();
    tools.ensure_available()?;

    let mut sink = FfmpegSink::create(
        &tools,
        &args.output,
        SinkParams {
            width: args.width,
            height: args.height,
            fps: args.fps,
            fourcc: codec_to_int(&args.fourcc_codec)?,
            pixel_format: PixelFormat::Bgr24,
            crf: None,
        },
    )?;

    for i in 0..args.frames {
        let t = i as f32 / args.frames.max(1) as f32;
        let [r, g, b] = hsv_to_rgb(frame_hue(args.hue, t), 0.7, 0.9);
        let mut frame = Frame::new_filled(args.width, args.height, &[b, g, r]);

        // A dark vertical bar sweeping left to right shows motion and alignment.
        let bar_x = (t * args.width as f32) as u32;
        for y in 0..args.height {
            for x in bar_x..(bar_x + 8).min(args.width) {
                let start = x as usize * 3;
                frame.row_mut(y)[start..start + 3].fill(32);
            }
        }

        sink.write_frame(&frame)?;
    }
    sink.finish()?;

    info!("Wrote {} frames to {}", sink.frames_written(), args.output.display());
    Ok(())
}

/// Hue in [0, 360) for a frame `t` of the way through the clip
fn frame_hue(start: f32, t: f32) -> f32 {
    (start + t * 360.0).rem_euclid(360.0)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    ]
}
