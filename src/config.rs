use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use anyhow::Context as _;

use crate::{
    colorize::colormap::ColorMapConfig,
    encode::ffmpeg::VideoConfig,
    field::DEFAULT_DELIMITER,
    foundation::{
        core::Size,
        error::{BulbError, BulbResult},
    },
    fractal::grid::GridConfig,
    render::scheduler::{FailurePolicy, SchedulerOpts},
};

/// Everything a pipeline run needs. Missing JSON keys take the defaults below.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `distance_*` and `light_*` field files.
    pub data_dir: PathBuf,
    /// Directory the raster images are written to.
    pub image_dir: PathBuf,
    /// Purge `image_dir` before rendering.
    pub cleanup: bool,
    /// Keep every `stride`-th input frame.
    pub stride: usize,
    pub delimiter: char,
    pub raster: Size,
    pub colormap: ColorMapConfig,
    /// Worker threads; `None` uses available parallelism.
    pub workers: Option<usize>,
    pub failure_policy: FailurePolicy,
    pub unit_timeout_secs: Option<f64>,
    /// `None` renders frames only.
    pub video: Option<VideoConfig>,
    pub grid: GridConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            image_dir: PathBuf::from("images"),
            cleanup: true,
            stride: 3,
            delimiter: DEFAULT_DELIMITER,
            // 3in × 3in at 300 dpi
            raster: Size {
                width: 900,
                height: 900,
            },
            colormap: ColorMapConfig::default(),
            workers: None,
            failure_policy: FailurePolicy::default(),
            unit_timeout_secs: None,
            video: Some(VideoConfig::default()),
            grid: GridConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> BulbResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config '{}'", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BulbResult<()> {
        if self.stride == 0 {
            return Err(BulbError::validation("stride must be >= 1"));
        }
        Size::new(self.raster.width, self.raster.height)?;
        if self.workers == Some(0) {
            return Err(BulbError::validation("workers must be >= 1 when set"));
        }
        if let Some(secs) = self.unit_timeout_secs
            && !(secs.is_finite() && secs > 0.0)
        {
            return Err(BulbError::validation(
                "unit_timeout_secs must be a positive number",
            ));
        }
        if self.image_dir == self.data_dir && self.cleanup {
            return Err(BulbError::validation(
                "image_dir must differ from data_dir when cleanup is enabled",
            ));
        }
        self.colormap.validate()?;
        if let Some(video) = &self.video {
            video.validate()?;
        }
        self.grid.validate()
    }

    pub fn scheduler_opts(&self) -> SchedulerOpts {
        SchedulerOpts {
            threads: self.workers,
            policy: self.failure_policy,
            unit_timeout: self.unit_timeout_secs.map(Duration::from_secs_f64),
        }
    }
}
