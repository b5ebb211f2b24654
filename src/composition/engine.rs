use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    composition::splice::splice_frames,
    config::SxsConfig,
    error::{CompositeError, Result},
    video::{
        FfmpegSink, FfmpegSource, FfplayPreview, Frame, FrameSink, FrameSource, Preview,
        SinkParams, VideoInfo,
    },
};

/// Which input gets resized to the other's geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapted {
    First,
    Second,
}

/// Geometry and frame range agreed on before the first frame is read
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPlan {
    /// Common (width, height) of every output frame
    pub frame_matrix_dims: (u32, u32),

    /// Output frame rate, taken from the reference video
    pub fps: f64,

    /// The input that is resized
    pub adapted: Adapted,

    /// False when both inputs already share a size
    pub resize_required: bool,

    pub start1: u64,
    pub start2: u64,

    /// Number of output frames: min(frames1 - start1, frames2 - start2)
    pub min_frames: u64,
}

impl CompositionPlan {
    /// Validate start offsets and negotiate the output geometry
    pub fn new(
        video1: &VideoInfo,
        video2: &VideoInfo,
        start1: i64,
        start2: i64,
        adapt_first: bool,
    ) -> Result<Self> {
        let start1 = validate_start(1, start1, video1.frame_count)?;
        let start2 = validate_start(2, start2, video2.frame_count)?;

        let (reference, adapted) = if adapt_first {
            (video2, Adapted::First)
        } else {
            (video1, Adapted::Second)
        };

        Ok(Self {
            frame_matrix_dims: reference.size(),
            fps: reference.fps,
            adapted,
            resize_required: video1.size() != video2.size(),
            start1,
            start2,
            min_frames: (video1.frame_count - start1).min(video2.frame_count - start2),
        })
    }
}

fn validate_start(video: u8, start: i64, frames: u64) -> Result<u64> {
    match u64::try_from(start) {
        Ok(start) if start < frames => Ok(start),
        _ => Err(CompositeError::StartFrameOutOfRange { video, start, frames }.into()),
    }
}

/// Turns frame pairs into side-by-side frames
///
/// Holds the channel count detected from the first frame of video one; every
/// later frame of either video must match it.
#[derive(Debug)]
pub struct Compositor {
    plan: CompositionPlan,
    channels: Option<usize>,
}

impl Compositor {
    pub fn new(plan: CompositionPlan) -> Self {
        Self { plan, channels: None }
    }

    /// Compose one pair; the result is `frame2` with its left half replaced
    pub fn compose(&mut self, mut frame1: Frame, mut frame2: Frame) -> Result<Frame> {
        let (width, height) = self.plan.frame_matrix_dims;
        if self.plan.resize_required {
            match self.plan.adapted {
                Adapted::First => frame1 = frame1.resized(width, height)?,
                Adapted::Second => frame2 = frame2.resized(width, height)?,
            }
        }

        let channels = match self.channels {
            Some(channels) => channels,
            None => {
                info!("Number of channels detected: {}", frame1.channels());
                *self.channels.insert(frame1.channels())
            }
        };

        for found in [frame1.channels(), frame2.channels()] {
            if found != channels {
                return Err(CompositeError::ChannelMismatch {
                    expected: channels,
                    found,
                }
                .into());
            }
        }

        splice_frames(&frame1, &mut frame2)?;
        Ok(frame2)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Frames handed to the sink
    pub frames_written: u64,

    /// Frames the plan called for
    pub frames_expected: u64,

    /// True if the user closed the preview during the run
    pub preview_dismissed: bool,

    /// True if the preview stopped on its own and the run went on without it
    pub preview_failed: bool,
}

/// Drive the frame loop from two sources into a sink
///
/// The sources must already be positioned at the plan's start frames. The
/// loop stops after `plan.min_frames` frames, or earlier if a source runs
/// dry. `on_progress` is called with (frames written, frames expected) after
/// every frame. The sink is not finished here.
pub fn run_composition(
    plan: &CompositionPlan,
    source1: &mut dyn FrameSource,
    source2: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    mut preview: Option<&mut dyn Preview>,
    on_progress: &mut dyn FnMut(u64, u64),
) -> Result<RunSummary> {
    let mut compositor = Compositor::new(plan.clone());
    let mut summary = RunSummary {
        frames_written: 0,
        frames_expected: plan.min_frames,
        preview_dismissed: false,
        preview_failed: false,
    };

    for i in 0..plan.min_frames {
        let (frame1, frame2) = match (source1.read_frame()?, source2.read_frame()?) {
            (Some(frame1), Some(frame2)) => (frame1, frame2),
            _ => {
                warn!(
                    "Input ran out of frames at {}/{}, stopping early",
                    i, plan.min_frames
                );
                break;
            }
        };

        let frame = compositor.compose(frame1, frame2)?;
        sink.write_frame(&frame)?;
        summary.frames_written += 1;
        debug!("Wrote frame {}/{}", i + 1, plan.min_frames);
        on_progress(summary.frames_written, plan.min_frames);

        if let Some(window) = preview.as_deref_mut() {
            match window.show(&frame).and_then(|()| window.poll_cancel()) {
                Ok(false) => {}
                Ok(true) => {
                    info!("Closing preview window.");
                    window.close();
                    summary.preview_dismissed = true;
                    preview = None;
                }
                Err(e) => {
                    warn!("Preview stopped, continuing without it: {}", e);
                    window.close();
                    summary.preview_failed = true;
                    preview = None;
                }
            }
        }
    }

    Ok(summary)
}

/// Main engine: opens the inputs named in the configuration, composes them
/// and writes the output
///
/// The pipeline follows these steps:
/// 1. Input resolution - probe both videos and log their metadata
/// 2. Planning - validate start frames and negotiate the output geometry
/// 3. Output - start the encoder and, if enabled, the preview
/// 4. Frame loop - splice every frame pair and write it
pub struct SideBySideEngine {
    config: SxsConfig,
}

impl SideBySideEngine {
    pub fn new(config: SxsConfig) -> Self {
        Self { config }
    }

    /// Run the whole pipeline
    pub fn compose(&self, on_progress: &mut dyn FnMut(u64, u64)) -> Result<RunReport> {
        self.config.validate()?;
        let tools = &self.config.tools;
        tools.ensure_available()?;

        // Step 1: Input resolution
        let pixel_format = self.config.pipeline.pixel_format;
        let mut source1 = FfmpegSource::open(tools, self.config.inputs.input1()?, pixel_format)?;
        info!("Input video 1:\n{}", source1.info());
        let mut source2 = FfmpegSource::open(tools, self.config.inputs.input2()?, pixel_format)?;
        info!("Input video 2:\n{}", source2.info());
        let output_path = self.config.output.path()?;

        // Step 2: Planning
        let plan = self.plan(source1.info(), source2.info())?;
        info!("Starting video 1 from frame: {}", plan.start1);
        source1.seek(plan.start1)?;
        info!("Starting video 2 from frame: {}", plan.start2);
        source2.seek(plan.start2)?;

        // Step 3: Output
        let mut sink = FfmpegSink::create(
            tools,
            output_path,
            SinkParams {
                width: plan.frame_matrix_dims.0,
                height: plan.frame_matrix_dims.1,
                fps: plan.fps,
                fourcc: self.config.output.fourcc()?,
                pixel_format,
                crf: self.config.output.crf,
            },
        )?;

        let mut preview = if self.config.pipeline.preview {
            match FfplayPreview::open(
                tools,
                &self.config.pipeline.preview_title,
                plan.frame_matrix_dims,
                plan.fps,
                pixel_format,
            ) {
                Ok(preview) => Some(preview),
                Err(e) => {
                    warn!("Continuing without preview: {}", e);
                    None
                }
            }
        } else {
            None
        };

        // Step 4: Frame loop
        let summary = run_composition(
            &plan,
            &mut source1,
            &mut source2,
            &mut sink,
            preview.as_mut().map(|p| p as &mut dyn Preview),
            on_progress,
        )?;
        sink.finish()?;

        Ok(RunReport {
            output: output_path.to_path_buf(),
            plan,
            summary,
        })
    }

    /// Build the plan for two probed inputs using the configured offsets
    pub fn plan(&self, video1: &VideoInfo, video2: &VideoInfo) -> Result<CompositionPlan> {
        let plan = CompositionPlan::new(
            video1,
            video2,
            self.config.inputs.input1_start_frame,
            self.config.inputs.input2_start_frame,
            self.config.pipeline.adapt_first,
        )?;

        info!(
            "Output {}x{} @ {:.3} fps, {} frames{}",
            plan.frame_matrix_dims.0,
            plan.frame_matrix_dims.1,
            plan.fps,
            plan.min_frames,
            match (plan.resize_required, plan.adapted) {
                (false, _) => "",
                (true, Adapted::First) => ", resizing video 1",
                (true, Adapted::Second) => ", resizing video 2",
            }
        );
        Ok(plan)
    }
}

/// Everything the binary reports after a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub output: PathBuf,
    pub plan: CompositionPlan,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn output(&self) -> &Path {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SxsError;
    use crate::video::memory::{MemorySink, MemorySource, ScriptedPreview};
    use proptest::prelude::*;

    fn info(frames: u64, size: (u32, u32), fps: f64) -> VideoInfo {
        VideoInfo {
            path: PathBuf::from("clip.mp4"),
            width: size.0,
            height: size.1,
            codec: "avc1".to_string(),
            fps,
            frame_count: frames,
        }
    }

    fn run(
        plan: &CompositionPlan,
        source1: &mut MemorySource,
        source2: &mut MemorySource,
        sink: &mut MemorySink,
        preview: Option<&mut dyn Preview>,
    ) -> Result<RunSummary> {
        source1.seek(plan.start1)?;
        source2.seek(plan.start2)?;
        run_composition(plan, source1, source2, sink, preview, &mut |_, _| {})
    }

    #[test]
    fn test_start_frame_bounds() {
        let a = info(100, (640, 480), 30.0);
        let b = info(80, (640, 480), 30.0);

        assert!(CompositionPlan::new(&a, &b, 99, 79, false).is_ok());

        let err = CompositionPlan::new(&a, &b, 100, 0, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Composition error: Video 1 start frame 100 ought to be in range [0, 100)"
        );

        let err = CompositionPlan::new(&a, &b, 0, -1, false).unwrap_err();
        assert!(matches!(
            err,
            SxsError::Composite(CompositeError::StartFrameOutOfRange { video: 2, start: -1, frames: 80 })
        ));
    }

    #[test]
    fn test_negotiation_follows_reference_video() {
        let a = info(10, (640, 480), 30.0);
        let b = info(10, (1280, 720), 25.0);

        let plan = CompositionPlan::new(&a, &b, 0, 0, false).unwrap();
        assert_eq!(plan.frame_matrix_dims, (640, 480));
        assert_eq!(plan.fps, 30.0);
        assert_eq!(plan.adapted, Adapted::Second);
        assert!(plan.resize_required);

        let plan = CompositionPlan::new(&a, &b, 0, 0, true).unwrap();
        assert_eq!(plan.frame_matrix_dims, (1280, 720));
        assert_eq!(plan.fps, 25.0);
        assert_eq!(plan.adapted, Adapted::First);

        let same = CompositionPlan::new(&a, &a, 0, 0, true).unwrap();
        assert!(!same.resize_required);
    }

    #[test]
    fn test_example_run_writes_seventy_frames() {
        let mut a = MemorySource::solid("a.mp4", (64, 48), &[10, 20, 30], 100);
        let mut b = MemorySource::solid("b.mp4", (64, 48), &[200, 100, 50], 80);
        let mut sink = MemorySink::new();

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 10, false).unwrap();
        assert_eq!(plan.min_frames, 70);

        let summary = run(&plan, &mut a, &mut b, &mut sink, None).unwrap();
        assert_eq!(summary.frames_written, 70);
        assert_eq!(sink.frames.len(), 70);
        assert_eq!(a.position(), 70);
        assert_eq!(b.position(), 80);

        let frame = &sink.frames[0];
        assert_eq!(frame.pixel(0, 0), &[10, 20, 30]);
        assert_eq!(frame.pixel(32, 0), &[255, 255, 255]);
        assert_eq!(frame.pixel(33, 47), &[200, 100, 50]);
    }

    #[test]
    fn test_second_video_is_resized_to_first() {
        let mut a = MemorySource::solid("a.mp4", (32, 16), &[1, 2, 3], 3);
        let mut b = MemorySource::solid("b.mp4", (64, 64), &[7, 8, 9], 3);
        let mut sink = MemorySink::new();

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, false).unwrap();
        run(&plan, &mut a, &mut b, &mut sink, None).unwrap();

        for frame in &sink.frames {
            assert_eq!(frame.size(), (32, 16));
            assert_eq!(frame.pixel(0, 0), &[1, 2, 3]);
            assert_eq!(frame.pixel(31, 15), &[7, 8, 9]);
        }
    }

    #[test]
    fn test_first_video_is_resized_when_adapted() {
        let mut a = MemorySource::solid("a.mp4", (64, 64), &[1, 2, 3], 2);
        let mut b = MemorySource::solid("b.mp4", (20, 10), &[7, 8, 9], 2);
        let mut sink = MemorySink::new();

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, true).unwrap();
        run(&plan, &mut a, &mut b, &mut sink, None).unwrap();

        assert_eq!(sink.frames[1].size(), (20, 10));
        assert_eq!(sink.frames[1].pixel(0, 9), &[1, 2, 3]);
        assert_eq!(sink.frames[1].pixel(10, 0), &[255, 255, 255]);
    }

    #[test]
    fn test_channel_mismatch_fails_on_first_frame() {
        let mut a = MemorySource::solid("a.mp4", (8, 8), &[0, 0, 0], 5);
        let mut b = MemorySource::solid("b.mp4", (8, 8), &[0], 5);
        let mut sink = MemorySink::new();

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, false).unwrap();
        let err = run(&plan, &mut a, &mut b, &mut sink, None).unwrap_err();

        assert!(matches!(
            err,
            SxsError::Composite(CompositeError::ChannelMismatch { expected: 3, found: 1 })
        ));
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_channel_mismatch_later_in_the_stream() {
        let mut frames = vec![Frame::new_filled(8, 8, &[5, 5, 5]); 3];
        frames.push(Frame::new_filled(8, 8, &[5, 5, 5, 5]));
        let mut a = MemorySource::solid("a.mp4", (8, 8), &[0, 0, 0], 4);
        let mut b = MemorySource::new("b.mp4", 30.0, frames);
        let mut sink = MemorySink::new();

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, false).unwrap();
        let err = run(&plan, &mut a, &mut b, &mut sink, None).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert_eq!(sink.frames.len(), 3);
    }

    #[test]
    fn test_short_source_stops_early() {
        let mut a = MemorySource::solid("a.mp4", (8, 8), &[0, 0, 0], 10).with_reported_frames(20);
        let mut b = MemorySource::solid("b.mp4", (8, 8), &[0, 0, 0], 20);
        let mut sink = MemorySink::new();

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, false).unwrap();
        let summary = run(&plan, &mut a, &mut b, &mut sink, None).unwrap();

        assert_eq!(summary.frames_expected, 20);
        assert_eq!(summary.frames_written, 10);
    }

    #[test]
    fn test_escape_stops_preview_but_not_encoding() {
        let mut a = MemorySource::solid("a.mp4", (8, 8), &[0, 0, 0], 10);
        let mut b = MemorySource::solid("b.mp4", (8, 8), &[0, 0, 0], 10);
        let mut sink = MemorySink::new();
        let mut preview = ScriptedPreview::cancel_after(3);

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, false).unwrap();
        let summary = run(&plan, &mut a, &mut b, &mut sink, Some(&mut preview)).unwrap();

        assert_eq!(summary.frames_written, 10);
        assert!(summary.preview_dismissed);
        assert_eq!(preview.shown, 3);
        assert!(preview.closed);
    }

    #[test]
    fn test_crashed_preview_is_not_a_dismissal() {
        let mut a = MemorySource::solid("a.mp4", (8, 8), &[0, 0, 0], 10);
        let mut b = MemorySource::solid("b.mp4", (8, 8), &[0, 0, 0], 10);
        let mut sink = MemorySink::new();
        let mut preview = ScriptedPreview::fail_after(1);

        let plan = CompositionPlan::new(a.info(), b.info(), 0, 0, false).unwrap();
        let summary = run(&plan, &mut a, &mut b, &mut sink, Some(&mut preview)).unwrap();

        assert_eq!(summary.frames_written, 10);
        assert!(summary.preview_failed);
        assert!(!summary.preview_dismissed);
        assert_eq!(preview.shown, 1);
        assert!(preview.closed);
    }

    #[test]
    fn test_progress_reports_every_frame() {
        let mut a = MemorySource::solid("a.mp4", (4, 4), &[0], 6);
        let mut b = MemorySource::solid("b.mp4", (4, 4), &[0], 6);
        let mut sink = MemorySink::new();
        let plan = CompositionPlan::new(a.info(), b.info(), 2, 0, false).unwrap();

        let mut calls = Vec::new();
        run_composition(&plan, &mut a, &mut b, &mut sink, None, &mut |done, total| {
            calls.push((done, total))
        })
        .unwrap();

        assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    proptest! {
        #[test]
        fn run_length_is_shorter_remaining_stream(
            frames1 in 1u64..40,
            frames2 in 1u64..40,
            start1_seed in any::<u64>(),
            start2_seed in any::<u64>(),
        ) {
            let start1 = start1_seed % frames1;
            let start2 = start2_seed % frames2;
            let mut a = MemorySource::solid("a.mp4", (4, 2), &[1], frames1 as usize);
            let mut b = MemorySource::solid("b.mp4", (4, 2), &[2], frames2 as usize);
            let mut sink = MemorySink::new();

            let plan = CompositionPlan::new(a.info(), b.info(), start1 as i64, start2 as i64, false).unwrap();
            let summary = run(&plan, &mut a, &mut b, &mut sink, None).unwrap();

            let expected = (frames1 - start1).min(frames2 - start2);
            prop_assert_eq!(plan.min_frames, expected);
            prop_assert_eq!(summary.frames_written, expected);
            prop_assert_eq!(sink.frames.len() as u64, expected);
        }
    }
}
