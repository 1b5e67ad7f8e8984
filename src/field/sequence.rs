use std::path::{Path, PathBuf};

use crate::foundation::{
    core::FrameIndex,
    error::{BulbError, BulbResult},
};

pub const DISTANCE_PREFIX: &str = "distance_";
pub const LIGHT_PREFIX: &str = "light_";

/// The two input files that make up one output frame.
///
/// A side is `None` when the other sequence is longer; rendering such a frame fails with
/// [`BulbError::MissingInput`] for that frame alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePair {
    pub index: FrameIndex,
    pub distance: Option<PathBuf>,
    pub light: Option<PathBuf>,
}

impl FramePair {
    pub fn new(index: FrameIndex, distance: impl Into<PathBuf>, light: impl Into<PathBuf>) -> Self {
        Self {
            index,
            distance: Some(distance.into()),
            light: Some(light.into()),
        }
    }

    pub fn distance_path(&self) -> BulbResult<&Path> {
        self.distance
            .as_deref()
            .ok_or_else(|| self.unmatched(DISTANCE_PREFIX))
    }

    pub fn light_path(&self) -> BulbResult<&Path> {
        self.light
            .as_deref()
            .ok_or_else(|| self.unmatched(LIGHT_PREFIX))
    }

    fn unmatched(&self, missing_prefix: &str) -> BulbError {
        let present = self
            .distance
            .as_deref()
            .or(self.light.as_deref())
            .unwrap_or(Path::new(""));
        BulbError::missing_input(
            present,
            format!(
                "no matching '{missing_prefix}*' input for frame {}",
                self.index.padded()
            ),
        )
    }
}

/// List regular files in `dir` whose name starts with `prefix`, in frame order.
///
/// Names sort by the integer following the prefix (`light_9` before `light_10`), then by
/// the full name. Names without a number sort after numbered ones.
pub fn list_inputs(dir: &Path, prefix: &str) -> BulbResult<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| BulbError::missing_input(dir, e.to_string()))?;

    let mut keyed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BulbError::missing_input(dir, e.to_string()))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let number = digits.parse::<u64>().ok();
        keyed.push(((number.is_none(), number, name), entry.path()));
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

/// Keep every `stride`-th item starting with the first.
pub fn decimate<T>(items: Vec<T>, stride: usize) -> BulbResult<Vec<T>> {
    if stride == 0 {
        return Err(BulbError::validation("decimation stride must be >= 1"));
    }
    Ok(items.into_iter().step_by(stride).collect())
}

/// Pair two ordered sequences and number them from 0.
///
/// The result is as long as the longer input; frames past the end of the shorter one carry
/// `None` on that side.
pub fn pair_frames(distance: Vec<PathBuf>, light: Vec<PathBuf>) -> Vec<FramePair> {
    let len = distance.len().max(light.len());
    if distance.len() != light.len() {
        tracing::warn!(
            distance = distance.len(),
            light = light.len(),
            "distance and light input counts differ; unmatched frames will fail"
        );
    }
    let mut distance = distance.into_iter();
    let mut light = light.into_iter();
    (0..len)
        .map(|i| FramePair {
            index: FrameIndex(i as u64),
            distance: distance.next(),
            light: light.next(),
        })
        .collect()
}

/// Locate, order, decimate and pair the distance/light inputs in `dir`.
#[tracing::instrument]
pub fn discover_frame_pairs(dir: &Path, stride: usize) -> BulbResult<Vec<FramePair>> {
    let distance = decimate(list_inputs(dir, DISTANCE_PREFIX)?, stride)?;
    let light = decimate(list_inputs(dir, LIGHT_PREFIX)?, stride)?;
    let pairs = pair_frames(distance, light);
    tracing::info!(frames = pairs.len(), stride, "discovered frame inputs");
    Ok(pairs)
}
