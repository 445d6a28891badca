//! FFmpeg-backed media plumbing for reelcut.
//!
//! This crate provides:
//! - FFmpeg command building and timed execution with stderr capture
//! - FFprobe metadata extraction
//! - Audio extraction and PCM loading
//! - Audio and video signal analyzers
//! - Encoder capability probing and profile resolution
//! - Parallel segment cutting with index-ordered concatenation
//! - Orientation resize, subtitle burn-in and filesystem helpers

pub mod analysis;
pub mod audio;
pub mod command;
pub mod concat;
pub mod cutter;
pub mod encode;
pub mod encoder;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod resize;
pub mod subtitles;

pub use analysis::{AudioAnalyzer, FfmpegFrameSource, FrameSource, VideoAnalyzer};
pub use audio::{extract_audio, load_pcm_samples, ANALYSIS_SAMPLE_RATE};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::{build_concat_list, concat_segments, ConcatMode};
pub use cutter::{CutReport, CutSettings, VideoProcessor};
pub use encode::{EncodeJob, EncodeMode, FfmpegEncoder, SegmentEncoder};
pub use encoder::{resolve_profile, EncoderCapabilities, EncoderSettings};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{is_supported_video, move_file, validate_input, SUPPORTED_EXTENSIONS};
pub use probe::probe_media;
pub use subtitles::{burn_subtitles, subtitles_filter};
