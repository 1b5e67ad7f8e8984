use crate::foundation::error::{BulbError, BulbResult};

/// 0-based index of an output frame (after decimation).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// Zero-padded label used in output file names (`007`, `123`, `1000`).
    pub fn padded(self) -> String {
        format!("{:03}", self.0)
    }
}

/// Width and height of a grid, field or raster, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> BulbResult<Self> {
        if width == 0 || height == 0 {
            return Err(BulbError::validation(format!(
                "size must be non-zero, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn cells(self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Axis-aligned rectangle of the complex plane sampled by a grid.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Domain {
    pub re_min: f64,
    pub re_max: f64,
    pub im_min: f64,
    pub im_max: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            re_min: -2.0,
            re_max: 2.0,
            im_min: -2.0,
            im_max: 2.0,
        }
    }
}

impl Domain {
    pub fn validate(&self) -> BulbResult<()> {
        let bounds = [self.re_min, self.re_max, self.im_min, self.im_max];
        if bounds.iter().any(|v| !v.is_finite()) {
            return Err(BulbError::validation("domain bounds must be finite"));
        }
        if self.re_min >= self.re_max || self.im_min >= self.im_max {
            return Err(BulbError::validation(
                "domain bounds must satisfy min < max on both axes",
            ));
        }
        Ok(())
    }

    /// Real coordinate of column `col` out of `width`, endpoints inclusive.
    pub fn re_at(&self, col: u32, width: u32) -> f64 {
        lerp_inclusive(self.re_min, self.re_max, col, width)
    }

    /// Imaginary coordinate of row `row` out of `height`, endpoints inclusive.
    pub fn im_at(&self, row: u32, height: u32) -> f64 {
        lerp_inclusive(self.im_min, self.im_max, row, height)
    }
}

// Matches `linspace(lo, hi, n)`: a single sample sits on `lo`.
fn lerp_inclusive(lo: f64, hi: f64, i: u32, n: u32) -> f64 {
    if n <= 1 {
        return lo;
    }
    let t = f64::from(i) / f64::from(n - 1);
    lo + (hi - lo) * t
}
