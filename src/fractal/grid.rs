use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    field::Field,
    foundation::{
        core::{Domain, Size},
        error::{BulbError, BulbResult},
    },
    fractal::evaluator::{EscapeParams, RadiusFormula, escape_index},
};

/// Parameters for [`sample_grid`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub max_iter: u32,
    pub power: f64,
    pub domain: Domain,
    pub radius: RadiusFormula,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            max_iter: 100,
            power: 8.0,
            domain: Domain::default(),
            radius: RadiusFormula::default(),
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> BulbResult<()> {
        Size::new(self.width, self.height)?;
        self.domain.validate()?;
        if !self.power.is_finite() {
            return Err(BulbError::validation("power must be finite"));
        }
        Ok(())
    }

    pub fn params(&self) -> EscapeParams {
        EscapeParams::new(self.max_iter, self.power).with_radius(self.radius)
    }
}

/// Sample the escape index over a `width × height` grid spanning `domain`.
///
/// Row `j` maps to the imaginary axis and column `i` to the real axis, both with inclusive
/// endpoints. Rows are evaluated in parallel on the current rayon pool.
pub fn sample_grid(
    width: u32,
    height: u32,
    max_iter: u32,
    power: f64,
    domain: Domain,
) -> BulbResult<Field<u32>> {
    sample_grid_with(&GridConfig {
        width,
        height,
        max_iter,
        power,
        domain,
        ..GridConfig::default()
    })
}

#[tracing::instrument(skip(cfg), fields(width = cfg.width, height = cfg.height, max_iter = cfg.max_iter))]
pub fn sample_grid_with(cfg: &GridConfig) -> BulbResult<Field<u32>> {
    cfg.validate()?;
    let size = Size::new(cfg.width, cfg.height)?;
    let params = cfg.params();
    let domain = cfg.domain;

    let mut cells = vec![0u32; size.cells()];
    cells
        .par_chunks_mut(size.width as usize)
        .enumerate()
        .for_each(|(row, out)| {
            let im = domain.im_at(row as u32, size.height);
            for (col, cell) in out.iter_mut().enumerate() {
                let re = domain.re_at(col as u32, size.width);
                *cell = escape_index(Complex64::new(re, im), &params);
            }
        });

    tracing::debug!("sampled {} cells", cells.len());
    Field::from_vec(size, cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn centre_cell_is_interior() {
        let field = sample_grid(5, 5, 50, 8.0, Domain::default()).unwrap();
        assert_eq!(field.get(2, 2), Some(&50));
    }

    #[test]
    fn corner_cells_escape_immediately() {
        // Corners sit at |z| = 2·sqrt(2).
        let field = sample_grid(9, 7, 50, 8.0, Domain::default()).unwrap();
        assert_eq!(field.get(0, 0), Some(&0));
        assert_eq!(field.get(8, 6), Some(&0));
    }

    #[test]
    fn grid_matches_pointwise_evaluation() {
        let cfg = GridConfig {
            width: 6,
            height: 4,
            max_iter: 40,
            ..GridConfig::default()
        };
        let field = sample_grid_with(&cfg).unwrap();
        for row in 0..4 {
            for col in 0..6 {
                let z0 = Complex64::new(cfg.domain.re_at(col, 6), cfg.domain.im_at(row, 4));
                assert_eq!(field.get(col, row), Some(&escape_index(z0, &cfg.params())));
            }
        }
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        assert!(sample_grid(0, 3, 10, 8.0, Domain::default()).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn shape_and_range_hold(w in 1u32..24, h in 1u32..24, max_iter in 0u32..30) {
            let field = sample_grid(w, h, max_iter, 8.0, Domain::default()).unwrap();
            prop_assert_eq!(field.size(), Size { width: w, height: h });
            prop_assert_eq!(field.values().len(), (w * h) as usize);
            prop_assert!(field.values().iter().all(|&v| v <= max_iter));
        }
    }
}
