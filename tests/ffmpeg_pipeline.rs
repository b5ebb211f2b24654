//! End-to-end runs through the real FFmpeg tools.
//!
//! Skipped when `ffmpeg` or `ffprobe` is not on the PATH. Clips are encoded
//! losslessly with FFV1 so pixel values survive the round trip.

use std::path::Path;

use video_sxs::video::{
    codec_to_int, probe_video, FfmpegSink, FfmpegSource, FfmpegTools, Frame, FrameSink,
    FrameSource, PixelFormat, SinkParams,
};
use video_sxs::{SideBySideEngine, SxsConfig};

fn tools() -> Option<FfmpegTools> {
    let tools = FfmpegTools::default();
    if tools.ensure_available().is_err() {
        eprintln!("ffmpeg/ffprobe not available, skipping");
        return None;
    }
    Some(tools)
}

fn write_clip(tools: &FfmpegTools, path: &Path, size: (u32, u32), pixel: [u8; 3], frames: usize) {
    let mut sink = FfmpegSink::create(
        tools,
        path,
        SinkParams {
            width: size.0,
            height: size.1,
            fps: 25.0,
            fourcc: codec_to_int("ffv1").unwrap(),
            pixel_format: PixelFormat::Bgr24,
            crf: None,
        },
    )
    .unwrap();

    for _ in 0..frames {
        sink.write_frame(&Frame::new_filled(size.0, size.1, &pixel)).unwrap();
    }
    sink.finish().unwrap();
}

fn read_all(tools: &FfmpegTools, path: &Path) -> Vec<Frame> {
    let mut source = FfmpegSource::open(tools, path, PixelFormat::Bgr24).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = source.read_frame().unwrap() {
        frames.push(frame);
    }
    frames
}

#[test]
fn probe_reports_written_clip() {
    let Some(tools) = tools() else { return };
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mkv");
    write_clip(&tools, &clip, (64, 48), [10, 20, 30], 8);

    let info = probe_video(&tools, &clip).unwrap();
    assert_eq!(info.size(), (64, 48));
    assert_eq!(info.fps, 25.0);
    assert_eq!(info.frame_count, 8);
}

#[test]
fn composes_two_clips_side_by_side() {
    let Some(tools) = tools() else { return };
    let dir = tempfile::tempdir().unwrap();
    let left = dir.path().join("left.mkv");
    let right = dir.path().join("right.mkv");
    let output = dir.path().join("sxs.mkv");
    write_clip(&tools, &left, (64, 48), [10, 20, 30], 8);
    write_clip(&tools, &right, (32, 24), [200, 100, 50], 8);

    let mut config = SxsConfig::default();
    config.inputs.input1 = Some(left);
    config.inputs.input2 = Some(right);
    config.inputs.input2_start_frame = 2;
    config.output.path = Some(output.clone());
    config.output.fourcc_codec = "FFV1".to_string();
    config.pipeline.preview = false;

    let report = SideBySideEngine::new(config).compose(&mut |_, _| {}).unwrap();
    assert_eq!(report.plan.frame_matrix_dims, (64, 48));
    assert_eq!(report.summary.frames_expected, 6);
    assert_eq!(report.summary.frames_written, 6);

    let frames = read_all(&tools, &output);
    assert_eq!(frames.len(), 6);
    let frame = &frames[0];
    assert_eq!(frame.size(), (64, 48));
    assert_eq!(frame.pixel(0, 0), &[10, 20, 30]);
    assert_eq!(frame.pixel(32, 10), &[255, 255, 255]);
    assert_eq!(frame.pixel(63, 47), &[200, 100, 50]);
}

#[test]
fn out_of_range_start_frame_is_rejected() {
    let Some(tools) = tools() else { return };
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("clip.mkv");
    write_clip(&tools, &clip, (16, 16), [0, 0, 0], 4);

    let mut config = SxsConfig::default();
    config.inputs.input1 = Some(clip.clone());
    config.inputs.input2 = Some(clip);
    config.inputs.input1_start_frame = 4;
    config.output.path = Some(dir.path().join("never.mkv"));
    config.pipeline.preview = false;

    let err = SideBySideEngine::new(config).compose(&mut |_, _| {}).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Composition error: Video 1 start frame 4 ought to be in range [0, 4)"
    );
    assert!(!dir.path().join("never.mkv").exists());
}
