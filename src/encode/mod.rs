//! Ordered image sequence → video, via the system `ffmpeg`.
//!
//! The encoder runs once, after every frame unit has finished, and only on a validated
//! gap-free sequence.

/// `ffmpeg` invocation.
pub mod ffmpeg;
/// On-disk frame sequence validation.
pub mod frames;
