//! Video encoding configuration.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Which encoder the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncoderPreference {
    /// Software H.264 (libx264)
    #[default]
    Software,
    /// First hardware encoder found, otherwise software
    Auto,
    Nvenc,
    Qsv,
    Amf,
    VideoToolbox,
}

impl EncoderPreference {
    /// Hardware preferences in probing order for `Auto`.
    pub const HARDWARE: [EncoderPreference; 4] = [
        EncoderPreference::Nvenc,
        EncoderPreference::Qsv,
        EncoderPreference::Amf,
        EncoderPreference::VideoToolbox,
    ];

    /// FFmpeg encoder name, `None` for `Auto`.
    pub fn encoder_name(&self) -> Option<&'static str> {
        match self {
            Self::Software => Some(DEFAULT_VIDEO_CODEC),
            Self::Auto => None,
            Self::Nvenc => Some("h264_nvenc"),
            Self::Qsv => Some("h264_qsv"),
            Self::Amf => Some("h264_amf"),
            Self::VideoToolbox => Some("h264_videotoolbox"),
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, Self::Software | Self::Auto)
    }
}

impl FromStr for EncoderPreference {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "software" | "cpu" | "libx264" => Ok(Self::Software),
            "auto" => Ok(Self::Auto),
            "nvenc" | "h264_nvenc" => Ok(Self::Nvenc),
            "qsv" | "h264_qsv" => Ok(Self::Qsv),
            "amf" | "h264_amf" => Ok(Self::Amf),
            "videotoolbox" | "h264_videotoolbox" => Ok(Self::VideoToolbox),
            other => Err(ModelError::unknown("encoder", other)),
        }
    }
}

impl fmt::Display for EncoderPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Software => "software",
            Self::Auto => "auto",
            Self::Nvenc => "nvenc",
            Self::Qsv => "qsv",
            Self::Amf => "amf",
            Self::VideoToolbox => "videotoolbox",
        };
        f.write_str(name)
    }
}

/// Resolved encoder plus rate-control parameters.
///
/// Built once when the processor starts and shared read-only by every cut
/// task afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingProfile {
    /// FFmpeg encoder name (e.g., "libx264", "h264_nvenc")
    pub encoder: String,
    /// Whether this is a GPU encoder
    pub hardware: bool,
    /// Rate-control arguments placed after `-c:v <encoder>`
    pub rate_control: Vec<String>,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl EncodingProfile {
    /// Software H.264 profile.
    pub fn software(preset: &str, crf: u8, audio_codec: &str, audio_bitrate: &str) -> Self {
        Self {
            encoder: DEFAULT_VIDEO_CODEC.to_string(),
            hardware: false,
            rate_control: vec![
                "-preset".to_string(),
                preset.to_string(),
                "-crf".to_string(),
                crf.min(51).to_string(),
            ],
            audio_codec: audio_codec.to_string(),
            audio_bitrate: audio_bitrate.to_string(),
        }
    }

    /// Video output arguments: codec plus rate control.
    pub fn video_args(&self) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.encoder.clone()];
        args.extend(self.rate_control.iter().cloned());
        args
    }

    /// Audio output arguments.
    pub fn audio_args(&self) -> Vec<String> {
        vec![
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
        ]
    }
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self::software(DEFAULT_PRESET, DEFAULT_CRF, DEFAULT_AUDIO_CODEC, DEFAULT_AUDIO_BITRATE)
    }
}

/// Output frame orientation for the optional resize stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Keep the source dimensions (no resize)
    #[default]
    Original,
    /// 1920x1080
    Landscape,
    /// 1080x1920
    Portrait,
}

impl Orientation {
    /// Target dimensions, `None` when no resize is needed.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Original => None,
            Self::Landscape => Some((1920, 1080)),
            Self::Portrait => Some((1080, 1920)),
        }
    }
}

impl FromStr for Orientation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Self::Original),
            "landscape" | "horizontal" => Ok(Self::Landscape),
            "portrait" | "vertical" => Ok(Self::Portrait),
            other => Err(ModelError::unknown("orientation", other)),
        }
    }
}
