use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage, imageops::FilterType};

use crate::{
    colorize::colormap::ColorMap,
    field::Field,
    foundation::{
        core::{FrameIndex, Size},
        error::{BulbError, BulbResult},
    },
};

/// Which field an output image shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageKind {
    Distance,
    Light,
    Merged,
}

impl ImageKind {
    pub const ALL: [ImageKind; 3] = [ImageKind::Distance, ImageKind::Light, ImageKind::Merged];

    /// File name prefix. Merged frames are the ones that end up in the video.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Light => "light",
            Self::Merged => "mandelbulb",
        }
    }

    /// `<prefix>_<index:03>.png`
    pub fn file_name(self, frame: FrameIndex) -> String {
        format!("{}_{}.png", self.prefix(), frame.padded())
    }
}

/// Map each cell through `map` after normalizing the field's finite range to `[0, 1]`.
///
/// Row 0 of the field lands on the bottom row of the image. A constant field maps every
/// finite cell to the first color.
pub fn colorize(field: &Field<f64>, map: &ColorMap) -> RgbImage {
    let (lo, hi) = field.finite_range().unwrap_or((0.0, 0.0));
    let span = hi - lo;
    let height = field.height();
    RgbImage::from_fn(field.width(), height, |x, y| {
        let v = field
            .get(x, height - 1 - y)
            .copied()
            .unwrap_or(f64::NAN);
        let t = if !v.is_finite() {
            f64::NAN
        } else if span > 0.0 {
            (v - lo) / span
        } else {
            0.0
        };
        map.lookup(t)
    })
}

/// Resample to the output raster size with nearest-neighbour sampling.
pub fn rasterize(img: RgbImage, size: Size) -> RgbImage {
    if img.width() == size.width && img.height() == size.height {
        return img;
    }
    image::imageops::resize(&img, size.width, size.height, FilterType::Nearest)
}

/// Write `img` as PNG to `path` through a temporary sibling and a rename, so readers never
/// observe a partial file.
pub fn save_png_atomic(img: &RgbImage, path: &Path) -> BulbResult<()> {
    write_atomic(path, |tmp| {
        img.save_with_format(tmp, ImageFormat::Png)
            .map_err(|e| BulbError::raster(format!("write '{}': {e}", tmp.display())))
    })
}

/// Run `write` against a hidden sibling of `path`, then rename it into place. The sibling
/// is removed if either step fails.
fn write_atomic<W>(path: &Path, write: W) -> BulbResult<()>
where
    W: FnOnce(&Path) -> BulbResult<()>,
{
    let tmp = temp_sibling(path)?;
    let result = write(&tmp).and_then(|()| {
        std::fs::rename(&tmp, path).map_err(|e| {
            BulbError::raster(format!(
                "rename '{}' -> '{}': {e}",
                tmp.display(),
                path.display()
            ))
        })
    });
    if result.is_err() && tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn temp_sibling(path: &Path) -> BulbResult<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| BulbError::raster(format!("'{}' has no file name", path.display())))?;
    Ok(path.with_file_name(format!(".{}.tmp", name.to_string_lossy())))
}
