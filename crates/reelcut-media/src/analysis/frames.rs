//! Decoded frame sources for video analysis.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Small thumbnail resolution used for analysis frames.
pub const ANALYSIS_WIDTH: u32 = 160;
pub const ANALYSIS_HEIGHT: u32 = 90;

/// Raw pixel layout of decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Rgb24,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb24 => 3,
        }
    }

    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Self::Gray => "gray",
            Self::Rgb24 => "rgb24",
        }
    }
}

/// Which frames to decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRequest {
    /// Window start (seconds)
    pub start: f64,
    /// Window length (seconds)
    pub duration: f64,
    /// Frames per second to sample within the window
    pub sample_fps: f64,
    pub format: PixelFormat,
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Frame filled with one grayscale value.
    pub fn solid_gray(width: u32, height: u32, value: u8) -> Self {
        Self::new(width, height, PixelFormat::Gray, vec![value; (width * height) as usize])
    }

    /// Frame filled with one RGB colour.
    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(width, height, PixelFormat::Rgb24, data)
    }
}

/// Anything that can decode sampled frames of a video window.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn frames(&self, request: &FrameRequest) -> MediaResult<Vec<Frame>>;
}

/// Frame source decoding through FFmpeg rawvideo output on stdout.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    input: PathBuf,
    width: u32,
    height: u32,
    runner: FfmpegRunner,
}

impl FfmpegFrameSource {
    pub fn new(input: impl AsRef<Path>, runner: FfmpegRunner) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            width: ANALYSIS_WIDTH,
            height: ANALYSIS_HEIGHT,
            runner,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn frames(&self, request: &FrameRequest) -> MediaResult<Vec<Frame>> {
        if request.duration <= 0.0 || request.sample_fps <= 0.0 {
            return Ok(Vec::new());
        }

        let cmd = FfmpegCommand::new(&self.input, "-")
            .seek(request.start.max(0.0))
            .duration(request.duration)
            .no_audio()
            .video_filter(format!(
                "fps={:.6},scale={}:{}",
                request.sample_fps, self.width, self.height
            ))
            .output_args(["-pix_fmt", request.format.ffmpeg_name()])
            .format("rawvideo");

        let buffer = self.runner.run_capture(&cmd).await?;

        let bytes_per_frame = (self.width * self.height) as usize * request.format.bytes_per_pixel();
        let frames: Vec<Frame> = buffer
            .chunks_exact(bytes_per_frame)
            .map(|chunk| Frame::new(self.width, self.height, request.format, chunk.to_vec()))
            .collect();

        debug!(
            start = request.start,
            duration = request.duration,
            frames = frames.len(),
            "Decoded analysis frames"
        );

        Ok(frames)
    }
}
