use std::path::PathBuf;

use anyhow::Context as _;

use crate::{
    blend::composite_frame,
    config::ComposeConfig,
    core::FrameRgba,
    encode::{FfmpegEncoder, default_mp4_config},
    error::{PoseoverError, PoseoverResult},
    log::{LogRow, TransformLog},
    solver::{self, SolveMode},
    sources::{FfmpegBackground, ForegroundSource},
    sync::FrameSynchronizer,
    timeline::PoseTimeline,
};

pub const OUT_VIDEO_NAME: &str = "composite.mp4";
pub const OUT_LOG_NAME: &str = "composite.log.csv";

/// One compositing run: input paths plus fully resolved parameters.
#[derive(Clone, Debug)]
pub struct ComposeJob {
    pub timeline_path: PathBuf,
    pub bg_video: PathBuf,
    pub fg_dir: Option<PathBuf>,
    pub fg_index: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub mode: SolveMode,
    pub config: ComposeConfig,
}

#[derive(Clone, Debug)]
pub struct RunArtifacts {
    pub video_path: PathBuf,
    pub log_path: PathBuf,
    pub frames_written: u64,
}

/// Drive the whole timeline: select frames, solve a placement, composite,
/// encode, log. Ends when the timeline or the background runs out; the
/// latter is a successful early finish, and frames already produced are kept.
#[tracing::instrument(skip(job), fields(timeline = %job.timeline_path.display()))]
pub fn run(job: &ComposeJob) -> PoseoverResult<RunArtifacts> {
    job.config.validate()?;

    let timeline = PoseTimeline::load(&job.timeline_path)?;

    std::fs::create_dir_all(&job.out_dir)
        .with_context(|| format!("create output directory '{}'", job.out_dir.display()))
        .map_err(|e| PoseoverError::resource(format!("{e:#}")))?;
    let video_path = job.out_dir.join(OUT_VIDEO_NAME);
    let log_path = job.out_dir.join(OUT_LOG_NAME);

    // Foreground configuration is checked before any media is opened so a
    // misconfigured run fails before frame processing begins.
    let foreground = ForegroundSource::configure(job.fg_dir.as_deref(), job.fg_index.as_deref())?;
    let background = FfmpegBackground::open(&job.bg_video, job.config.canvas)?;
    tracing::info!(
        bg = %job.bg_video.display(),
        bg_fps = background.info().source_fps(),
        records = timeline.len(),
        "starting composite run"
    );

    let mut sync = FrameSynchronizer::new(background, foreground, job.config.sync)?;
    let mut encoder = FfmpegEncoder::new(default_mp4_config(
        &video_path,
        job.config.canvas.width,
        job.config.canvas.height,
        job.config.sync.demo_fps,
    ))?;
    let mut log = TransformLog::default();

    for (i, record) in timeline.records().iter().enumerate() {
        let frame = i as u64;
        let Some(selection) = sync.select(frame, record)? else {
            tracing::info!(frame, "background exhausted, finishing early");
            break;
        };

        let placement = solver::solve(job.mode, record.bbox, record.pose, job.config.canvas, &job.config.rule);
        let matrix = solver::affine_from_params(
            &placement,
            selection.foreground.width,
            selection.foreground.height,
            job.config.canvas,
        );

        let out = composite_frame(
            &selection.background,
            &selection.foreground,
            matrix,
            &job.config.blend,
        )?;
        encoder.encode_frame(&out)?;
        log.push(LogRow {
            frame,
            t_ms: selection.t_ms,
            scale: placement.scale,
            rot: placement.rotation_deg,
            tx: placement.translate.0,
            ty: placement.translate.1,
        });
        tracing::debug!(frame, t_ms = selection.t_ms, scale = placement.scale, "composited");
    }

    encoder.finish()?;
    log.write_csv(&log_path)?;

    let frames_written = log.rows().len() as u64;
    tracing::info!(frames_written, out = %video_path.display(), "composite run finished");

    Ok(RunArtifacts {
        video_path,
        log_path,
        frames_written,
    })
}

/// Composite a single timeline record to an in-memory frame, honoring the
/// same synchronization state a full run would have reached at that point.
/// Sequential-mode background frames before the target are read and discarded
/// to keep the cursor honest.
pub fn compose_single_frame(job: &ComposeJob, frame: u64) -> PoseoverResult<FrameRgba> {
    job.config.validate()?;

    let timeline = PoseTimeline::load(&job.timeline_path)?;
    let record = *timeline.records().get(frame as usize).ok_or_else(|| {
        PoseoverError::config(format!(
            "frame {frame} is out of range (timeline has {} records)",
            timeline.len()
        ))
    })?;

    let foreground = ForegroundSource::configure(job.fg_dir.as_deref(), job.fg_index.as_deref())?;
    let background = FfmpegBackground::open(&job.bg_video, job.config.canvas)?;
    let mut sync = FrameSynchronizer::new(background, foreground, job.config.sync)?;

    for (i, rec) in timeline.records().iter().take(frame as usize).enumerate() {
        if !sync.skip(i as u64, rec)? {
            return Err(PoseoverError::config(format!(
                "background ends before frame {frame}"
            )));
        }
    }

    let selection = sync.select(frame, &record)?.ok_or_else(|| {
        PoseoverError::config(format!("background ends before frame {frame}"))
    })?;

    let placement = solver::solve(job.mode, record.bbox, record.pose, job.config.canvas, &job.config.rule);
    let matrix = solver::affine_from_params(
        &placement,
        selection.foreground.width,
        selection.foreground.height,
        job.config.canvas,
    );
    composite_frame(
        &selection.background,
        &selection.foreground,
        matrix,
        &job.config.blend,
    )
}
