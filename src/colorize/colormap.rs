use image::Rgb;
use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::foundation::{
    core::FrameIndex,
    error::{BulbError, BulbResult},
};

/// Number of entries in every color map.
pub const COLORMAP_LEN: usize = 256;

/// How the per-frame color map is built.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorMapConfig {
    /// Piecewise-linear gradient through `stops`, identical for every frame.
    Gradient { stops: Vec<[u8; 3]> },
    /// 256 pseudo-random colors derived from `seed`. With `per_frame`, the seed is mixed with
    /// the frame index so each frame gets its own palette.
    Random { seed: u64, per_frame: bool },
}

impl Default for ColorMapConfig {
    fn default() -> Self {
        Self::Random {
            seed: 0,
            per_frame: true,
        }
    }
}

impl ColorMapConfig {
    /// Dark blue through teal to yellow.
    pub fn viridis_like() -> Self {
        Self::Gradient {
            stops: vec![
                [68, 1, 84],
                [59, 82, 139],
                [33, 145, 140],
                [94, 201, 98],
                [253, 231, 37],
            ],
        }
    }

    pub fn validate(&self) -> BulbResult<()> {
        if let Self::Gradient { stops } = self
            && stops.is_empty()
        {
            return Err(BulbError::validation(
                "gradient color map needs at least one stop",
            ));
        }
        Ok(())
    }

    /// Build the color map used for `frame`.
    pub fn for_frame(&self, frame: FrameIndex) -> BulbResult<ColorMap> {
        self.validate()?;
        Ok(match self {
            Self::Gradient { stops } => ColorMap::gradient(stops),
            Self::Random { seed, per_frame } => {
                let seed = if *per_frame {
                    xxh3_64_with_seed(&frame.0.to_le_bytes(), *seed)
                } else {
                    *seed
                };
                ColorMap::random(seed)
            }
        })
    }
}

/// Lookup table from a normalized value to an RGB color. NaN maps to black.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorMap {
    entries: Vec<Rgb<u8>>,
}

impl ColorMap {
    pub fn gradient(stops: &[[u8; 3]]) -> Self {
        let entries = (0..COLORMAP_LEN)
            .map(|i| {
                if stops.len() == 1 {
                    return Rgb(stops[0]);
                }
                let t = i as f64 / (COLORMAP_LEN - 1) as f64 * (stops.len() - 1) as f64;
                let lo = (t.floor() as usize).min(stops.len() - 2);
                let frac = t - lo as f64;
                let (a, b) = (stops[lo], stops[lo + 1]);
                Rgb(std::array::from_fn(|c| {
                    (f64::from(a[c]) + (f64::from(b[c]) - f64::from(a[c])) * frac).round() as u8
                }))
            })
            .collect();
        Self { entries }
    }

    pub fn random(seed: u64) -> Self {
        let entries = (0..COLORMAP_LEN as u64)
            .map(|i| {
                let h = xxh3_64_with_seed(&i.to_le_bytes(), seed).to_le_bytes();
                Rgb([h[0], h[1], h[2]])
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[Rgb<u8>] {
        &self.entries
    }

    /// Color for `t` in `[0, 1]`; values outside are clamped.
    pub fn lookup(&self, t: f64) -> Rgb<u8> {
        if t.is_nan() {
            return Rgb([0, 0, 0]);
        }
        let last = self.entries.len() - 1;
        let idx = (t.clamp(0.0, 1.0) * last as f64).round() as usize;
        self.entries[idx.min(last)]
    }
}
