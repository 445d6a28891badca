//! Encoder capability probing and profile resolution.

use std::collections::BTreeSet;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use reelcut_models::encoding::{
    DEFAULT_AUDIO_BITRATE, DEFAULT_AUDIO_CODEC, DEFAULT_CRF, DEFAULT_PRESET, DEFAULT_VIDEO_CODEC,
};
use reelcut_models::{EncoderPreference, EncodingProfile};

use crate::command::check_ffmpeg;
use crate::error::{MediaError, MediaResult};

/// Operator-facing encoder choice and quality.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub preference: EncoderPreference,
    /// CRF-style quality (0-51, lower is better)
    pub quality: u8,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preference: EncoderPreference::Software,
            quality: DEFAULT_CRF,
            preset: DEFAULT_PRESET.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
        }
    }
}

/// Video encoders compiled into the local FFmpeg build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderCapabilities {
    encoders: BTreeSet<String>,
}

impl EncoderCapabilities {
    /// Parse the output of `ffmpeg -encoders`.
    ///
    /// Encoder lines look like ` V....D libx264    libx264 H.264 ...`: a
    /// six-character flag column starting with the media type, then the name.
    pub fn parse(listing: &str) -> Self {
        let encoders = listing
            .lines()
            .filter_map(|line| {
                let mut parts = line.split_whitespace();
                let flags = parts.next()?;
                let name = parts.next()?;
                (flags.len() == 6 && flags.starts_with('V') && name != "=").then(|| name.to_string())
            })
            .collect();
        Self { encoders }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            encoders: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn supports(&self, encoder: &str) -> bool {
        self.encoders.contains(encoder)
    }

    /// Hardware H.264 encoders present, in probing order.
    pub fn hardware_encoders(&self) -> Vec<EncoderPreference> {
        EncoderPreference::HARDWARE
            .into_iter()
            .filter(|p| p.encoder_name().is_some_and(|name| self.supports(name)))
            .collect()
    }
}

/// Query `ffmpeg -hide_banner -encoders`, bounded by `timeout_secs`.
pub async fn probe_encoders(timeout_secs: u64) -> MediaResult<EncoderCapabilities> {
    let program = check_ffmpeg()?;

    let child = Command::new(program)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let timeout_secs = timeout_secs.max(1);
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child)
        .await
        .map_err(|_| MediaError::Timeout(timeout_secs))??;

    if !output.status.success() {
        return Err(MediaError::ffmpeg_failed(
            "Encoder listing failed",
            None,
            output.status.code(),
        ));
    }

    Ok(EncoderCapabilities::parse(&String::from_utf8_lossy(&output.stdout)))
}

/// Resolve the encoding profile for `settings` given what FFmpeg supports.
///
/// An unavailable hardware encoder falls back to libx264 with a warning.
pub fn resolve_profile(settings: &EncoderSettings, caps: &EncoderCapabilities) -> EncodingProfile {
    let chosen = match settings.preference {
        EncoderPreference::Software => EncoderPreference::Software,
        EncoderPreference::Auto => caps
            .hardware_encoders()
            .into_iter()
            .next()
            .unwrap_or(EncoderPreference::Software),
        hardware => {
            let available = hardware
                .encoder_name()
                .is_some_and(|name| caps.supports(name));
            if available {
                hardware
            } else {
                warn!(
                    requested = %hardware,
                    fallback = DEFAULT_VIDEO_CODEC,
                    "Requested encoder unavailable, falling back to software encoding"
                );
                EncoderPreference::Software
            }
        }
    };

    let profile = profile_for(chosen, settings);
    info!(
        encoder = %profile.encoder,
        hardware = profile.hardware,
        "Resolved encoding profile"
    );
    profile
}

fn profile_for(preference: EncoderPreference, settings: &EncoderSettings) -> EncodingProfile {
    let quality = settings.quality.min(51);
    let q = quality.to_string();

    let rate_control: Vec<String> = match preference {
        EncoderPreference::Nvenc => vec!["-preset", "p4", "-rc", "vbr", "-cq", q.as_str(), "-b:v", "0"]
            .into_iter()
            .map(String::from)
            .collect(),
        EncoderPreference::Qsv => vec!["-global_quality".to_string(), q],
        EncoderPreference::Amf => vec!["-quality", "balanced", "-rc", "cqp", "-qp_i", q.as_str(), "-qp_p", q.as_str()]
            .into_iter()
            .map(String::from)
            .collect(),
        // VideoToolbox quality runs 1-100, higher is better
        EncoderPreference::VideoToolbox => vec![
            "-q:v".to_string(),
            (100 - quality as i32 * 2).clamp(1, 100).to_string(),
        ],
        EncoderPreference::Software | EncoderPreference::Auto => {
            return EncodingProfile::software(
                &settings.preset,
                quality,
                &settings.audio_codec,
                &settings.audio_bitrate,
            )
        }
    };

    EncodingProfile {
        encoder: preference
            .encoder_name()
            .unwrap_or(DEFAULT_VIDEO_CODEC)
            .to_string(),
        hardware: true,
        rate_control,
        audio_codec: settings.audio_codec.clone(),
        audio_bitrate: settings.audio_bitrate.clone(),
    }
}
