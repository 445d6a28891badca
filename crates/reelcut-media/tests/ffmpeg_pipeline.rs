//! Cut and concatenate against a real FFmpeg install.
//!
//! These tests return early when ffmpeg/ffprobe or libx264 are unavailable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use reelcut_media::encoder::probe_encoders;
use reelcut_media::{
    check_ffmpeg, check_ffprobe, probe_media, CutSettings, EncoderSettings, FfmpegCommand,
    FfmpegEncoder, FfmpegRunner, MediaError, VideoProcessor,
};
use reelcut_models::Segment;

/// Allowed drift per join, in seconds.
const JOIN_TOLERANCE: f64 = 0.2;

async fn ffmpeg_ready() -> bool {
    if check_ffmpeg().is_err() || check_ffprobe().is_err() {
        eprintln!("ffmpeg/ffprobe not installed, skipping");
        return false;
    }
    match probe_encoders(10).await {
        Ok(caps) if caps.supports("libx264") => true,
        _ => {
            eprintln!("libx264 not available, skipping");
            false
        }
    }
}

/// Render a test pattern with a sine tone.
async fn render_source(dir: &Path, seconds: u32) -> PathBuf {
    let output = dir.join("source.mp4");
    let cmd = FfmpegCommand::new(
        format!("testsrc=size=320x240:rate=25:duration={seconds}"),
        &output,
    )
    .input_args([
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("sine=frequency=440:duration={seconds}"),
        "-f".to_string(),
        "lavfi".to_string(),
    ])
    .video_codec("libx264")
    .audio_codec("aac")
    .output_args(["-pix_fmt", "yuv420p", "-shortest"]);

    FfmpegRunner::new()
        .with_timeout(60)
        .run(&cmd)
        .await
        .unwrap();
    output
}

async fn processor(scratch: &Path) -> VideoProcessor {
    let settings = CutSettings {
        scratch_root: Some(scratch.to_path_buf()),
        ..Default::default()
    };
    VideoProcessor::new(
        Arc::new(FfmpegEncoder::new(60)),
        &EncoderSettings::default(),
        settings,
    )
    .await
}

#[tokio::test]
async fn test_cut_reel_duration_matches_segments() {
    if !ffmpeg_ready().await {
        return;
    }
    let dir = TempDir::new().unwrap();
    let source = render_source(dir.path(), 8).await;
    let output = dir.path().join("reel.mp4");

    // Deliberately out of time order
    let segments = vec![
        Segment::new(3, 6.0, 8.0, 0.9),
        Segment::new(0, 0.0, 2.0, 0.8),
        Segment::new(2, 3.0, 5.0, 0.4),
    ];
    let report = processor(dir.path())
        .await
        .cut_video(&source, &segments, &output)
        .await
        .unwrap();

    assert_eq!(report.succeeded().count(), 3);
    assert!(report.warnings().is_empty());

    let info = probe_media(&output, 30).await.unwrap();
    let expected: f64 = segments.iter().map(|s| s.duration).sum();
    let tolerance = JOIN_TOLERANCE * segments.len() as f64;
    assert!(
        (info.duration - expected).abs() <= tolerance,
        "reel {}s, expected {}s",
        info.duration,
        expected
    );
    assert!(info.has_audio());
}

#[tokio::test]
async fn test_single_segment_reel() {
    if !ffmpeg_ready().await {
        return;
    }
    let dir = TempDir::new().unwrap();
    let source = render_source(dir.path(), 4).await;
    let output = dir.path().join("nested").join("reel.mp4");

    let report = processor(dir.path())
        .await
        .cut_video(&source, &[Segment::new(0, 1.0, 3.0, 0.5)], &output)
        .await
        .unwrap();

    assert_eq!(report.output, output);
    let info = probe_media(&output, 30).await.unwrap();
    assert!((info.duration - 2.0).abs() <= JOIN_TOLERANCE);
}

#[tokio::test]
async fn test_corrupt_input_reports_tool_diagnostic() {
    if check_ffprobe().is_err() {
        eprintln!("ffprobe not installed, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("corrupt.mp4");
    std::fs::write(&input, b"definitely not an mp4 container").unwrap();

    let err = probe_media(&input, 30).await.unwrap_err();
    assert!(matches!(err, MediaError::FfprobeFailed { .. }), "{err:?}");
    let diagnostic = err.diagnostic();
    assert!(
        diagnostic.len() > "FFprobe failed".len(),
        "no tool output in {diagnostic:?}"
    );
}
