use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use crate::{
    config::PipelineConfig,
    encode::ffmpeg::{EncodeReport, encode_frames},
    field::sequence::discover_frame_pairs,
    foundation::{
        core::FrameIndex,
        error::{BulbError, BulbResult},
    },
    render::{
        frame::{FrameRenderConfig, RenderedFrame, render_frame},
        scheduler::{BatchScheduler, CancelToken},
    },
    staging::{ensure_dir, purge_dir_with, remove_entry},
};

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Frames rendered, in index order.
    pub frames: Vec<RenderedFrame>,
    /// Set when a video was requested and written.
    pub video: Option<EncodeReport>,
    /// Non-fatal cleanup failures.
    pub cleanup_failures: Vec<BulbError>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn image_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.frames
            .iter()
            .flat_map(|f| f.images.iter().map(|(_, p)| p))
    }
}

/// Purge, discover, render every frame and, if configured, encode the video.
///
/// Any failed frame aborts the run before encoding; the error names the lowest failing frame.
pub fn run(cfg: &PipelineConfig) -> BulbResult<RunReport> {
    run_with_cancel(cfg, CancelToken::new())
}

pub fn run_with_cancel(cfg: &PipelineConfig, cancel: CancelToken) -> BulbResult<RunReport> {
    run_with(cfg, cancel, remove_entry)
}

fn run_with<R>(cfg: &PipelineConfig, cancel: CancelToken, remove: R) -> BulbResult<RunReport>
where
    R: Fn(&Path, bool) -> io::Result<()>,
{
    let started = Instant::now();
    cfg.validate()?;

    let cleanup_failures = if cfg.cleanup {
        purge_dir_with(&cfg.image_dir, remove)?
    } else {
        Vec::new()
    };
    ensure_dir(&cfg.image_dir)?;

    let pairs = discover_frame_pairs(&cfg.data_dir, cfg.stride)?;
    if pairs.is_empty() {
        return Err(BulbError::missing_input(
            &cfg.data_dir,
            "no distance_*/light_* inputs found",
        ));
    }

    let frame_cfg = FrameRenderConfig {
        out_dir: cfg.image_dir.clone(),
        raster: cfg.raster,
        colormap: cfg.colormap.clone(),
        delimiter: cfg.delimiter,
    };
    let scheduler = BatchScheduler::new(cfg.scheduler_opts())?.with_cancel_token(cancel);
    let indices: Vec<FrameIndex> = pairs.iter().map(|p| p.index).collect();
    let report = scheduler.run_with_discard(
        &indices,
        |frame, ctx| {
            let pair = &pairs[frame.0 as usize];
            render_frame(pair, &frame_cfg, ctx)
        },
        |_, rendered: RenderedFrame| rendered.discard(),
    )?;

    for failure in &report.failures {
        tracing::error!(kind = failure.kind(), "{failure}");
    }
    let frames: Vec<RenderedFrame> = report
        .into_result()?
        .into_iter()
        .map(|(_, rendered)| rendered)
        .collect();

    // Every unit has finished at this point; the encoder sees the full sequence.
    let video = match &cfg.video {
        Some(video) => Some(encode_frames(
            &cfg.image_dir,
            video,
            Some(frames.len() as u64),
        )?),
        None => None,
    };

    let elapsed = started.elapsed();
    tracing::info!(
        frames = frames.len(),
        cleanup_failures = cleanup_failures.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "run finished"
    );
    Ok(RunReport {
        frames,
        video,
        cleanup_failures,
        elapsed,
    })
}
