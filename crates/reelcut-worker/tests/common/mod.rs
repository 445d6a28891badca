//! Fakes shared by the integration tests.
//!
//! Encoded "videos" are text files listing segment indices, so the order of
//! a concatenated reel can be read back directly.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use reelcut_media::{
    ConcatMode, EncodeJob, EncodeMode, EncoderCapabilities, MediaError, MediaResult,
    SegmentEncoder,
};
use reelcut_models::{EncodingProfile, MediaInfo};
use reelcut_worker::{MediaBackend, PipelineConfig, WindowScorer};

pub const MB: u64 = 1024 * 1024;

pub fn media_info(duration: f64, size: u64) -> MediaInfo {
    MediaInfo {
        duration,
        width: 1280,
        height: 720,
        fps: 30.0,
        video_codec: "h264".to_string(),
        audio_codec: Some("aac".to_string()),
        bitrate: 2_000_000,
        size,
        format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
    }
}

/// Deterministic, uneven scores in [0, 1] keyed on the window start.
pub struct ScriptedScorer;

impl ScriptedScorer {
    pub fn raw(start: f64) -> f64 {
        let k = (start / 10.0).round() as u64;
        ((k * 37 + 11) % 100) as f64 / 100.0
    }
}

#[async_trait]
impl WindowScorer for ScriptedScorer {
    async fn audio_score(&self, start: f64, _end: f64) -> f64 {
        Self::raw(start)
    }

    async fn video_score(&self, start: f64, _end: f64) -> f64 {
        1.0 - Self::raw(start)
    }
}

/// Equal audio/video scores: ranking comes from the time term alone.
pub struct FlatScorer;

#[async_trait]
impl WindowScorer for FlatScorer {
    async fn audio_score(&self, _start: f64, _end: f64) -> f64 {
        0.5
    }

    async fn video_score(&self, _start: f64, _end: f64) -> f64 {
        0.5
    }
}

/// Backend answering probes from a fixed [`MediaInfo`].
pub struct FakeBackend {
    pub info: MediaInfo,
    pub extracted: Mutex<Vec<PathBuf>>,
    pub probed: Mutex<usize>,
    pub missing_probe_tool: bool,
}

impl FakeBackend {
    pub fn new(info: MediaInfo) -> Arc<Self> {
        Arc::new(Self {
            info,
            extracted: Mutex::new(Vec::new()),
            probed: Mutex::new(0),
            missing_probe_tool: false,
        })
    }

    /// Backend whose tool check reports ffprobe as absent.
    pub fn without_ffprobe(info: MediaInfo) -> Arc<Self> {
        Arc::new(Self {
            info,
            extracted: Mutex::new(Vec::new()),
            probed: Mutex::new(0),
            missing_probe_tool: true,
        })
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    async fn check_tools(&self) -> MediaResult<()> {
        if self.missing_probe_tool {
            Err(MediaError::FfprobeNotFound)
        } else {
            Ok(())
        }
    }

    async fn probe(&self, _input: &Path) -> MediaResult<MediaInfo> {
        *self.probed.lock().unwrap() += 1;
        Ok(self.info.clone())
    }

    async fn extract_audio(&self, _input: &Path, output: &Path) -> MediaResult<PathBuf> {
        tokio::fs::write(output, vec![0u8; 64]).await?;
        self.extracted.lock().unwrap().push(output.to_path_buf());
        Ok(output.to_path_buf())
    }

    async fn scorer(
        &self,
        _input: &Path,
        _info: &MediaInfo,
        _audio: Option<&Path>,
    ) -> MediaResult<Arc<dyn WindowScorer>> {
        Ok(Arc::new(FlatScorer))
    }
}

/// How the fake encoder treats one segment index.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Finish after the given delay
    Delay(Duration),
    /// Fail with an FFmpeg-style error
    Fail,
    /// Exit successfully without writing anything
    Empty,
}

/// Encoder writing `"{index}\n"` per segment and concatenating by list order.
#[derive(Default)]
pub struct FakeEncoder {
    pub behaviors: HashMap<usize, Behavior>,
    pub completion_order: Mutex<Vec<usize>>,
    pub missing_tool: bool,
}

impl FakeEncoder {
    pub fn with(behaviors: impl IntoIterator<Item = (usize, Behavior)>) -> Arc<Self> {
        Arc::new(Self {
            behaviors: behaviors.into_iter().collect(),
            ..Default::default()
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::with(Vec::new())
    }

    pub fn missing() -> Arc<Self> {
        Arc::new(Self {
            missing_tool: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl SegmentEncoder for FakeEncoder {
    async fn check_available(&self) -> MediaResult<()> {
        if self.missing_tool {
            Err(MediaError::FfmpegNotFound)
        } else {
            Ok(())
        }
    }

    async fn capabilities(&self) -> MediaResult<EncoderCapabilities> {
        Ok(EncoderCapabilities::from_names(["libx264"]))
    }

    async fn encode(&self, job: &EncodeJob, _profile: &EncodingProfile) -> MediaResult<()> {
        match self.behaviors.get(&job.index).copied() {
            Some(Behavior::Fail) if job.mode == EncodeMode::Reencode => {
                return Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some("Invalid data found when processing input\n".to_string()),
                    Some(1),
                ));
            }
            Some(Behavior::Empty) => return Ok(()),
            Some(Behavior::Delay(delay)) => tokio::time::sleep(delay).await,
            _ => {}
        }
        tokio::fs::write(&job.output, format!("{}\n", job.index)).await?;
        self.completion_order.lock().unwrap().push(job.index);
        Ok(())
    }

    async fn concat(
        &self,
        list_file: &Path,
        output: &Path,
        _mode: ConcatMode,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        let list = tokio::fs::read_to_string(list_file).await?;
        let mut joined = String::new();
        for line in list.lines() {
            let path = line
                .strip_prefix("file '")
                .and_then(|l| l.strip_suffix('\''))
                .ok_or_else(|| MediaError::invalid_input(format!("bad list line: {line}")))?;
            joined.push_str(&tokio::fs::read_to_string(path).await?);
        }
        tokio::fs::write(output, joined).await?;
        Ok(())
    }

    async fn resize(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        let body = tokio::fs::read_to_string(input).await?;
        tokio::fs::write(output, format!("{body}{width}x{height}\n")).await?;
        Ok(())
    }

    async fn burn_subtitles(
        &self,
        input: &Path,
        subtitles: &Path,
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        let body = tokio::fs::read_to_string(input).await?;
        let name = subtitles
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::write(output, format!("{body}subs:{name}\n")).await?;
        Ok(())
    }
}

/// Config writing into `root`, with a 1s per-segment timeout.
pub fn test_config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        output_dir: root.join("out"),
        work_dir: Some(root.join("work")),
        ffmpeg_timeout_secs: 1,
        ..Default::default()
    }
    .sanitized()
}

/// Create a non-empty input file with a supported extension.
pub fn touch_video(root: &Path, name: &str) -> PathBuf {
    let path = root.join(name);
    std::fs::write(&path, b"not really a video").unwrap();
    path
}

