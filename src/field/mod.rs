//! Row-major 2D fields and the distance/light frame inputs.

pub mod combine;
pub mod sequence;

use std::{fmt::Display, io::Write as _, path::Path};

use anyhow::Context as _;

use crate::foundation::{
    core::Size,
    error::{BulbError, BulbResult},
};

/// Delimiter used by the upstream field writer.
pub const DEFAULT_DELIMITER: char = ',';

/// Row-major `width × height` array.
#[derive(Clone, Debug, PartialEq)]
pub struct Field<T> {
    size: Size,
    data: Vec<T>,
}

impl<T> Field<T> {
    pub fn from_vec(size: Size, data: Vec<T>) -> BulbResult<Self> {
        if data.len() != size.cells() {
            return Err(BulbError::validation(format!(
                "field data has {} cells, expected {}x{}",
                data.len(),
                size.width,
                size.height
            )));
        }
        Ok(Self { size, data })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn get(&self, col: u32, row: u32) -> Option<&T> {
        if col >= self.size.width || row >= self.size.height {
            return None;
        }
        self.data
            .get(row as usize * self.size.width as usize + col as usize)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks_exact(self.size.width as usize)
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Field<U> {
        Field {
            size: self.size,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Write one line per row, cells joined by `delimiter`.
    pub fn write_delimited(&self, path: &Path, delimiter: char) -> BulbResult<()>
    where
        T: Display,
    {
        let file = std::fs::File::create(path)
            .with_context(|| format!("create field file '{}'", path.display()))?;
        let mut w = std::io::BufWriter::new(file);
        let sep = delimiter.to_string();
        for row in self.rows() {
            let line = row
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(&sep);
            writeln!(w, "{line}").with_context(|| format!("write '{}'", path.display()))?;
        }
        w.flush()
            .with_context(|| format!("flush '{}'", path.display()))?;
        Ok(())
    }
}

impl Field<f64> {
    /// Read a delimiter-separated numeric text file.
    ///
    /// Blank lines and `#` comments are skipped, a trailing delimiter is ignored and empty
    /// cells read as NaN. Every row must have the same number of cells. All failures are
    /// reported as [`BulbError::MissingInput`].
    pub fn read_delimited(path: &Path, delimiter: char) -> BulbResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BulbError::missing_input(path, e.to_string()))?;
        Self::parse_delimited(&text, delimiter)
            .map_err(|reason| BulbError::missing_input(path, reason))
    }

    pub fn parse_delimited(text: &str, delimiter: char) -> Result<Self, String> {
        let mut width: Option<usize> = None;
        let mut data = Vec::new();
        let mut height = 0usize;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_suffix(delimiter).unwrap_or(line);
            let before = data.len();
            for cell in line.split(delimiter) {
                let cell = cell.trim();
                if cell.is_empty() {
                    data.push(f64::NAN);
                    continue;
                }
                let v = cell
                    .parse::<f64>()
                    .map_err(|_| format!("line {}: '{cell}' is not a number", line_no + 1))?;
                data.push(v);
            }
            let cols = data.len() - before;
            match width {
                None => width = Some(cols),
                Some(w) if w != cols => {
                    return Err(format!(
                        "line {}: expected {w} cells, found {cols}",
                        line_no + 1
                    ));
                }
                Some(_) => {}
            }
            height += 1;
        }

        let Some(width) = width else {
            return Err("field file contains no data rows".to_string());
        };
        let size = Size::new(
            u32::try_from(width).map_err(|_| "field is too wide".to_string())?,
            u32::try_from(height).map_err(|_| "field is too tall".to_string())?,
        )
        .map_err(|e| e.to_string())?;
        Ok(Self { size, data })
    }

    /// Smallest and largest finite values, or `None` when no cell is finite.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl From<&Field<u32>> for Field<f64> {
    fn from(field: &Field<u32>) -> Self {
        field.map(|&v| f64::from(v))
    }
}
