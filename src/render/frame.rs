use std::path::{Path, PathBuf};

use crate::{
    colorize::{
        colormap::ColorMapConfig,
        raster::{ImageKind, colorize, rasterize, save_png_atomic},
    },
    field::{Field, combine::combine, sequence::FramePair},
    foundation::{
        core::{FrameIndex, Size},
        error::BulbResult,
    },
    render::scheduler::UnitContext,
};

/// Settings shared by every frame unit of a run.
#[derive(Clone, Debug)]
pub struct FrameRenderConfig {
    pub out_dir: PathBuf,
    pub raster: Size,
    pub colormap: ColorMapConfig,
    pub delimiter: char,
}

/// Images written for one frame, in [`ImageKind::ALL`] order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFrame {
    pub index: FrameIndex,
    pub images: Vec<(ImageKind, PathBuf)>,
}

impl RenderedFrame {
    /// Delete the written images of a frame that was failed after it finished.
    pub fn discard(self) {
        for (_, path) in &self.images {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(frame = self.index.0, "could not remove '{}': {e}", path.display());
            }
        }
    }
}

/// Load, combine, colorize and persist one frame.
#[tracing::instrument(skip_all, fields(frame = pair.index.0))]
pub fn render_frame(
    pair: &FramePair,
    cfg: &FrameRenderConfig,
    ctx: &UnitContext<'_>,
) -> BulbResult<RenderedFrame> {
    ctx.checkpoint()?;
    let distance = Field::read_delimited(pair.distance_path()?, cfg.delimiter)?;
    ctx.checkpoint()?;
    let light = Field::read_delimited(pair.light_path()?, cfg.delimiter)?;
    ctx.checkpoint()?;
    render_fields(pair.index, &distance, &light, cfg)
}

/// Render already-loaded fields for `index`.
pub fn render_fields(
    index: FrameIndex,
    distance: &Field<f64>,
    light: &Field<f64>,
    cfg: &FrameRenderConfig,
) -> BulbResult<RenderedFrame> {
    let merged = combine(distance, light)?;
    let map = cfg.colormap.for_frame(index)?;

    let mut images = Vec::with_capacity(ImageKind::ALL.len());
    for kind in ImageKind::ALL {
        let field = match kind {
            ImageKind::Distance => distance,
            ImageKind::Light => light,
            ImageKind::Merged => &merged,
        };
        let img = rasterize(colorize(field, &map), cfg.raster);
        let path = image_path(&cfg.out_dir, kind, index);
        save_png_atomic(&img, &path)?;
        images.push((kind, path));
    }

    tracing::debug!("wrote {} images", images.len());
    Ok(RenderedFrame { index, images })
}

pub fn image_path(dir: &Path, kind: ImageKind, index: FrameIndex) -> PathBuf {
    dir.join(kind.file_name(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::scheduler::CancelToken;
    use std::sync::atomic::AtomicBool;

    fn cfg(out_dir: &Path) -> FrameRenderConfig {
        FrameRenderConfig {
            out_dir: out_dir.to_path_buf(),
            raster: Size::new(8, 8).unwrap(),
            colormap: ColorMapConfig::viridis_like(),
            delimiter: ',',
        }
    }

    #[test]
    fn writes_three_images_for_a_pair() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("distance_0.txt"), "0,1\n2,3\n").unwrap();
        std::fs::write(dir.path().join("light_0.txt"), "1,1\n1,1\n").unwrap();
        let pair = FramePair::new(
            FrameIndex(3),
            dir.path().join("distance_0.txt"),
            dir.path().join("light_0.txt"),
        );
        let cancel = CancelToken::new();
        let abort = AtomicBool::new(false);
        let ctx = UnitContext::new(FrameIndex(3), None, &cancel, &abort);

        let out = render_frame(&pair, &cfg(dir.path()), &ctx).unwrap();
        let names: Vec<_> = out
            .images
            .iter()
            .map(|(_, p)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["distance_003.png", "light_003.png", "mandelbulb_003.png"]);
        for (_, p) in &out.images {
            assert_eq!(image::image_dimensions(p).unwrap(), (8, 8));
        }

        out.discard();
        assert!(!dir.path().join("mandelbulb_003.png").exists());
        assert!(!dir.path().join("distance_003.png").exists());
    }

    #[test]
    fn unmatched_frame_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("distance_0.txt"), "0,1\n").unwrap();
        let pair = FramePair {
            index: FrameIndex(2),
            distance: Some(dir.path().join("distance_0.txt")),
            light: None,
        };
        let cancel = CancelToken::new();
        let abort = AtomicBool::new(false);
        let ctx = UnitContext::new(FrameIndex(2), None, &cancel, &abort);

        let err = render_frame(&pair, &cfg(dir.path()), &ctx).unwrap_err();
        assert_eq!(err.kind(), "MissingInput");
        assert!(!dir.path().join("distance_002.png").exists());
    }

    #[test]
    fn shape_mismatch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let d = Field::from_vec(Size::new(2, 1).unwrap(), vec![0.0, 1.0]).unwrap();
        let l = Field::from_vec(Size::new(1, 2).unwrap(), vec![0.0, 1.0]).unwrap();
        let err = render_fields(FrameIndex(0), &d, &l, &cfg(dir.path())).unwrap_err();
        assert_eq!(err.kind(), "ShapeMismatch");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn cancelled_unit_stops_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let pair = FramePair::new(
            FrameIndex(0),
            dir.path().join("missing_a"),
            dir.path().join("missing_b"),
        );
        let cancel = CancelToken::new();
        cancel.cancel();
        let abort = AtomicBool::new(false);
        let ctx = UnitContext::new(FrameIndex(0), None, &cancel, &abort);
        let err = render_frame(&pair, &cfg(dir.path()), &ctx).unwrap_err();
        assert_eq!(err.kind(), "Cancelled");
    }
}
