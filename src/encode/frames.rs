use std::{collections::BTreeSet, path::Path};

use crate::foundation::{
    core::Size,
    error::{BulbError, BulbResult},
};

/// A validated on-disk image sequence `<prefix>_000.png ..= <prefix>_{count-1}.png`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSequence {
    pub count: u64,
    pub size: Size,
}

/// Parse `<prefix>_<digits>.png` into its index.
pub fn parse_frame_name(name: &str, prefix: &str) -> Option<u64> {
    let digits = name
        .strip_prefix(prefix)?
        .strip_prefix('_')?
        .strip_suffix(".png")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let idx: u64 = digits.parse().ok()?;
    // Only the canonical padding counts; `_0007` is not frame 7.
    (format!("{idx:03}") == digits).then_some(idx)
}

/// Check that `dir` holds a gap-free `<prefix>_NNN.png` sequence starting at 0 whose frames
/// all share one size.
///
/// With `expected`, exactly frames `0..expected` are required and later indices are ignored;
/// without it the sequence runs up to the highest index found. The first absent index is
/// reported as [`BulbError::MissingFrame`].
pub fn validate_sequence(
    dir: &Path,
    prefix: &str,
    expected: Option<u64>,
) -> BulbResult<FrameSequence> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        BulbError::encode(format!("read frame directory '{}': {e}", dir.display()))
    })?;

    let mut present = BTreeSet::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| BulbError::encode(format!("read '{}': {e}", dir.display())))?;
        if let Some(idx) = parse_frame_name(&entry.file_name().to_string_lossy(), prefix) {
            present.insert(idx);
        }
    }

    let count = match expected {
        Some(n) => n,
        None => present.last().map(|max| max + 1).unwrap_or(0),
    };
    if let Some(missing) = (0..count.max(1)).find(|i| !present.contains(i)) {
        return Err(BulbError::MissingFrame {
            index: missing,
            dir: dir.to_path_buf(),
        });
    }

    let mut size: Option<Size> = None;
    for idx in 0..count {
        let path = dir.join(format!("{prefix}_{idx:03}.png"));
        let (width, height) = image::image_dimensions(&path)
            .map_err(|e| BulbError::encode(format!("read '{}': {e}", path.display())))?;
        let this = Size { width, height };
        match size {
            None => size = Some(this),
            Some(first) if first != this => {
                return Err(BulbError::encode(format!(
                    "frame {idx:03} is {width}x{height}, expected {}x{}",
                    first.width, first.height
                )));
            }
            Some(_) => {}
        }
    }

    let size = size.ok_or_else(|| BulbError::MissingFrame {
        index: 0,
        dir: dir.to_path_buf(),
    })?;
    Ok(FrameSequence { count, size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn write_frames(dir: &Path, prefix: &str, indices: &[u64], w: u32, h: u32) {
        for i in indices {
            RgbImage::new(w, h)
                .save(dir.join(format!("{prefix}_{i:03}.png")))
                .unwrap();
        }
    }

    #[test]
    fn parses_frame_names() {
        assert_eq!(parse_frame_name("mandelbulb_007.png", "mandelbulb"), Some(7));
        assert_eq!(parse_frame_name("mandelbulb_1200.png", "mandelbulb"), Some(1200));
        assert_eq!(parse_frame_name("light_007.png", "mandelbulb"), None);
        assert_eq!(parse_frame_name("mandelbulb_.png", "mandelbulb"), None);
        assert_eq!(parse_frame_name("mandelbulb_00a.png", "mandelbulb"), None);
        assert_eq!(parse_frame_name("mandelbulb_0007.png", "mandelbulb"), None);
        assert_eq!(parse_frame_name(".mandelbulb_000.png.tmp", "mandelbulb"), None);
    }

    #[test]
    fn contiguous_sequence_validates() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), "mandelbulb", &[0, 1, 2, 3, 4], 4, 2);
        write_frames(dir.path(), "light", &[0, 1], 4, 2);
        let seq = validate_sequence(dir.path(), "mandelbulb", None).unwrap();
        assert_eq!(seq.count, 5);
        assert_eq!(seq.size, Size { width: 4, height: 2 });
    }

    #[test]
    fn gap_is_reported_as_missing_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), "mandelbulb", &[0, 1, 3, 4], 4, 2);
        let err = validate_sequence(dir.path(), "mandelbulb", None).unwrap_err();
        assert!(matches!(err, BulbError::MissingFrame { index: 2, .. }));
    }

    #[test]
    fn expected_count_catches_missing_tail_and_ignores_extras() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), "mandelbulb", &[0, 1, 2], 4, 2);
        let err = validate_sequence(dir.path(), "mandelbulb", Some(5)).unwrap_err();
        assert!(matches!(err, BulbError::MissingFrame { index: 3, .. }));
        assert_eq!(
            validate_sequence(dir.path(), "mandelbulb", Some(2))
                .unwrap()
                .count,
            2
        );
    }

    #[test]
    fn empty_directory_is_missing_frame_zero() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_sequence(dir.path(), "mandelbulb", None).unwrap_err();
        assert!(matches!(err, BulbError::MissingFrame { index: 0, .. }));
    }

    #[test]
    fn mixed_sizes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_frames(dir.path(), "mandelbulb", &[0], 4, 2);
        write_frames(dir.path(), "mandelbulb", &[1], 2, 2);
        let err = validate_sequence(dir.path(), "mandelbulb", None).unwrap_err();
        assert_eq!(err.kind(), "EncodeFailure");
    }
}
