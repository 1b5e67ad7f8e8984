use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use anyhow::Context as _;

use crate::{
    encode::frames::{FrameSequence, validate_sequence},
    foundation::error::{BulbError, BulbResult},
};

/// Target parameters for the final video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub out_path: PathBuf,
    /// Output width in pixels; height follows the frames' aspect ratio.
    pub width: u32,
    pub fps: u32,
    /// ffmpeg bitrate, e.g. `40M` or `8000k`.
    pub bitrate: String,
    pub codec: String,
    /// Prefix of the frame files to encode.
    pub prefix: String,
    /// Encoder executable, looked up on `PATH` when not absolute.
    pub ffmpeg: PathBuf,
    pub overwrite: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            out_path: PathBuf::from("mandelbulb.mp4"),
            width: 1440,
            fps: 60,
            bitrate: "40M".to_string(),
            codec: "mpeg4".to_string(),
            prefix: "mandelbulb".to_string(),
            ffmpeg: PathBuf::from("ffmpeg"),
            overwrite: true,
        }
    }
}

impl VideoConfig {
    pub fn validate(&self) -> BulbResult<()> {
        if self.width == 0 {
            return Err(BulbError::validation("video width must be non-zero"));
        }
        if !self.width.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(BulbError::validation("video width must be even"));
        }
        if self.fps == 0 {
            return Err(BulbError::validation("video fps must be non-zero"));
        }
        if !is_valid_bitrate(&self.bitrate) {
            return Err(BulbError::validation(format!(
                "invalid video bitrate '{}'",
                self.bitrate
            )));
        }
        if self.codec.trim().is_empty() || self.prefix.trim().is_empty() {
            return Err(BulbError::validation(
                "video codec and frame prefix must be non-empty",
            ));
        }
        Ok(())
    }

    pub fn with_out_path(mut self, out_path: impl Into<PathBuf>) -> Self {
        self.out_path = out_path.into();
        self
    }

    /// Arguments for encoding `count` frames from `frames_dir`, without the program name.
    pub fn ffmpeg_args(&self, frames_dir: &Path, count: u64) -> Vec<OsString> {
        let pattern = frames_dir.join(format!("{}_%03d.png", self.prefix));
        let mut args: Vec<OsString> = Vec::new();
        args.push(if self.overwrite { "-y" } else { "-n" }.into());
        for a in [
            "-loglevel".to_string(),
            "error".to_string(),
            "-framerate".to_string(),
            self.fps.to_string(),
            "-start_number".to_string(),
            "0".to_string(),
            "-i".to_string(),
        ] {
            args.push(a.into());
        }
        args.push(pattern.into_os_string());
        for a in [
            "-frames:v".to_string(),
            count.to_string(),
            "-an".to_string(),
            "-b:v".to_string(),
            self.bitrate.clone(),
            "-vf".to_string(),
            format!("scale={}:-2", self.width),
            "-c:v".to_string(),
            self.codec.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ] {
            args.push(a.into());
        }
        args.push(self.out_path.clone().into_os_string());
        args
    }
}

/// Result of a successful encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeReport {
    pub out_path: PathBuf,
    pub frames: FrameSequence,
}

fn is_valid_bitrate(s: &str) -> bool {
    let digits = s.strip_suffix(['k', 'K', 'm', 'M', 'g', 'G']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && digits != "0"
}

pub fn is_ffmpeg_on_path(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> BulbResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Encode `<prefix>_000.png ..` in `frames_dir` into one video.
///
/// The sequence is validated before the encoder starts: a gap fails with
/// [`BulbError::MissingFrame`] and nothing is spawned. With `expected`, exactly that many
/// frames are encoded.
#[tracing::instrument(skip(cfg), fields(out = %cfg.out_path.display()))]
pub fn encode_frames(
    frames_dir: &Path,
    cfg: &VideoConfig,
    expected: Option<u64>,
) -> BulbResult<EncodeReport> {
    cfg.validate()?;
    let frames = validate_sequence(frames_dir, &cfg.prefix, expected)?;

    ensure_parent_dir(&cfg.out_path)?;
    if cfg.out_path.exists() {
        if !cfg.overwrite {
            return Err(BulbError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }
        std::fs::remove_file(&cfg.out_path).with_context(|| {
            format!("remove stale output '{}'", cfg.out_path.display())
        })?;
    }

    tracing::info!(
        frames = frames.count,
        width = cfg.width,
        fps = cfg.fps,
        "invoking {}",
        cfg.ffmpeg.display()
    );

    let output = Command::new(&cfg.ffmpeg)
        .args(cfg.ffmpeg_args(frames_dir, frames.count))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            BulbError::encode(format!(
                "failed to spawn '{}' (is it installed and on PATH?): {e}",
                cfg.ffmpeg.display()
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BulbError::encode(format!(
            "ffmpeg exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let written = std::fs::metadata(&cfg.out_path)
        .map(|m| m.len())
        .unwrap_or(0);
    if written == 0 {
        return Err(BulbError::encode(format!(
            "ffmpeg reported success but '{}' is missing or empty",
            cfg.out_path.display()
        )));
    }

    tracing::info!(bytes = written, "video written");
    Ok(EncodeReport {
        out_path: cfg.out_path.clone(),
        frames,
    })
}
