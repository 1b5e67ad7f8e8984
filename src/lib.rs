//! Escape-time mandelbulb sampling and batch rendering of density frames to video.
//!
//! - [`sample_grid`] evaluates the escape-time map over a grid.
//! - [`pipeline::run`] reads per-frame distance/light fields, merges and colorizes them on a
//!   worker pool, writes `<kind>_<index:03>.png` images and encodes the merged sequence with
//!   `ffmpeg`.
#![forbid(unsafe_code)]

mod foundation;

pub mod colorize;
pub mod config;
pub mod encode;
pub mod field;
pub mod fractal;
pub mod pipeline;
pub mod render;
pub mod staging;

pub use crate::foundation::core::{Domain, FrameIndex, Size};
pub use crate::foundation::error::{BulbError, BulbResult};

pub use crate::colorize::colormap::{ColorMap, ColorMapConfig};
pub use crate::colorize::raster::{ImageKind, colorize, rasterize};
pub use crate::config::PipelineConfig;
pub use crate::encode::ffmpeg::{EncodeReport, VideoConfig, encode_frames, is_ffmpeg_on_path};
pub use crate::encode::frames::{FrameSequence, validate_sequence};
pub use crate::field::Field;
pub use crate::field::combine::combine;
pub use crate::field::sequence::{FramePair, decimate, discover_frame_pairs};
pub use crate::fractal::evaluator::{EscapeParams, RadiusFormula, Vec3, escape_index, evaluate};
pub use crate::fractal::grid::{GridConfig, sample_grid, sample_grid_with};
pub use crate::pipeline::{RunReport, run};
pub use crate::render::frame::{FrameRenderConfig, RenderedFrame, render_fields, render_frame};
pub use crate::render::scheduler::{
    BatchReport, BatchScheduler, CancelToken, FailurePolicy, SchedulerOpts, UnitContext,
};
