//! End-to-end workflow behaviour with fake media tooling.
//!
//! A 40s small input is selected down to windows 0, 1 and 2 (the time term
//! ranks the middle windows first and three 10s windows fit the 20-32s
//! adjusted target), so every test below cuts those three segments.

mod common;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use common::{media_info, test_config, touch_video, Behavior, FakeBackend, FakeEncoder, MB};
use reelcut_models::{BatchItem, Orientation, ProcessOutcome, ProcessStage};
use reelcut_worker::{
    PipelineConfig, SubtitleCollaborator, SubtitleRequest, WorkerError, WorkerResult, Workflow,
};

async fn workflow(config: PipelineConfig, encoder: Arc<FakeEncoder>) -> Workflow {
    Workflow::new(
        Arc::new(config),
        FakeBackend::new(media_info(40.0, 5 * MB)),
        encoder,
    )
    .await
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

/// Nothing left behind in the scratch root.
fn assert_scratch_clean(root: &Path) {
    let work = root.join("work");
    if work.exists() {
        let leftovers: Vec<PathBuf> = std::fs::read_dir(&work)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert!(leftovers.is_empty(), "scratch left behind: {leftovers:?}");
    }
}

#[tokio::test]
async fn test_successful_video() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "match.mp4");
    let workflow = workflow(test_config(dir.path()), FakeEncoder::healthy()).await;

    let result = workflow.process_video(&input, "run-1").await;

    assert!(result.is_success(), "{:?}", result.outcome);
    let output = result.output_path().unwrap();
    assert_eq!(output, dir.path().join("out").join("match_highlights.mp4"));
    assert_eq!(read(output), "0\n1\n2\n");

    let highlights = result.highlights().unwrap();
    assert_eq!(highlights.segment_count, 3);
    assert!(highlights.in_target_range);
    assert!(result.warnings().is_empty());

    for stage in [
        ProcessStage::Validate,
        ProcessStage::Probe,
        ProcessStage::ExtractAudio,
        ProcessStage::Detect,
        ProcessStage::Cut,
    ] {
        assert!(result.timing(stage).is_some(), "missing timing for {stage}");
    }
    assert!(result.timing(ProcessStage::Resize).is_none());
    assert_eq!(result.run_id, "run-1");
    assert_scratch_clean(dir.path());
}

#[tokio::test]
async fn test_reassembly_follows_time_order() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "race.mp4");
    // Earlier segments finish last
    let encoder = FakeEncoder::with([
        (0, Behavior::Delay(Duration::from_millis(300))),
        (1, Behavior::Delay(Duration::from_millis(150))),
    ]);
    let workflow = workflow(test_config(dir.path()), encoder.clone()).await;

    let result = workflow.process_video(&input, "run").await;

    assert_eq!(*encoder.completion_order.lock().unwrap(), vec![2, 1, 0]);
    assert_eq!(read(result.output_path().unwrap()), "0\n1\n2\n");
}

#[tokio::test]
async fn test_segment_timeout_is_a_warning() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "slow.mp4");
    let encoder = FakeEncoder::with([(1, Behavior::Delay(Duration::from_secs(3)))]);
    let workflow = workflow(test_config(dir.path()), encoder).await;

    let result = workflow.process_video(&input, "run").await;

    assert!(result.is_success());
    assert_eq!(read(result.output_path().unwrap()), "0\n2\n");
    let warnings = result.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("segment 1"));
    assert!(warnings[0].contains("timed out"));
}

#[tokio::test]
async fn test_empty_segment_output_is_dropped() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "empty.mp4");
    let workflow = workflow(test_config(dir.path()), FakeEncoder::with([(2, Behavior::Empty)])).await;

    let result = workflow.process_video(&input, "run").await;

    assert!(result.is_success());
    assert_eq!(read(result.output_path().unwrap()), "0\n1\n");
    assert_eq!(result.warnings().len(), 1);
}

#[tokio::test]
async fn test_all_segments_failing_fails_cut_stage() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "broken.mp4");
    let encoder = FakeEncoder::with([(0, Behavior::Fail), (1, Behavior::Fail), (2, Behavior::Fail)]);
    let workflow = workflow(test_config(dir.path()), encoder).await;

    let result = workflow.process_video(&input, "run").await;

    assert!(!result.is_success());
    assert_eq!(result.failed_stage(), Some(ProcessStage::Cut));
    assert!(result.output_path().is_none());
    assert!(!dir.path().join("out").join("broken_highlights.mp4").exists());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["stage"], "cut");
    let diagnostic = json["diagnostic"].as_str().unwrap();
    assert!(diagnostic.starts_with("all 3 segments failed"));
    assert!(diagnostic.contains("Invalid data found when processing input"));
    assert_scratch_clean(dir.path());
}

#[tokio::test]
async fn test_stream_copy_fallback_rescues_segments() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "copy.mp4");
    let config = PipelineConfig {
        stream_copy_fallback: true,
        ..test_config(dir.path())
    };
    let encoder = FakeEncoder::with([(0, Behavior::Fail), (1, Behavior::Fail), (2, Behavior::Fail)]);
    let workflow = workflow(config, encoder).await;

    let result = workflow.process_video(&input, "run").await;

    assert!(result.is_success());
    assert_eq!(read(result.output_path().unwrap()), "0\n1\n2\n");
}

#[tokio::test]
async fn test_missing_encoder_fails_before_any_work() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "nofmpeg.mp4");
    let backend = FakeBackend::new(media_info(40.0, 5 * MB));
    let workflow = Workflow::new(
        Arc::new(test_config(dir.path())),
        backend.clone(),
        FakeEncoder::missing(),
    )
    .await;

    let result = workflow.process_video(&input, "run").await;

    assert_eq!(result.failed_stage(), Some(ProcessStage::Validate));
    assert!(result.timings.is_empty());
    assert_eq!(*backend.probed.lock().unwrap(), 0);
    assert!(backend.extracted.lock().unwrap().is_empty());
    assert!(!dir.path().join("work").exists());
}

#[tokio::test]
async fn test_missing_ffprobe_fails_before_any_work() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "noprobe.mp4");
    let backend = FakeBackend::without_ffprobe(media_info(40.0, 5 * MB));
    let workflow = Workflow::new(
        Arc::new(test_config(dir.path())),
        backend.clone(),
        FakeEncoder::healthy(),
    )
    .await;

    let result = workflow.process_video(&input, "run").await;

    assert_eq!(result.failed_stage(), Some(ProcessStage::Validate));
    match &result.outcome {
        ProcessOutcome::Failure { diagnostic, .. } => {
            assert!(diagnostic.to_lowercase().contains("ffprobe"), "{diagnostic}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(backend.extracted.lock().unwrap().is_empty());
    assert!(!dir.path().join("work").exists());
}

#[tokio::test]
async fn test_invalid_inputs_fail_validation() {
    let dir = TempDir::new().unwrap();
    let workflow = workflow(test_config(dir.path()), FakeEncoder::healthy()).await;

    let unsupported = touch_video(dir.path(), "notes.txt");
    let empty = dir.path().join("empty.mp4");
    std::fs::write(&empty, b"").unwrap();
    let missing = dir.path().join("missing.mp4");

    for input in [unsupported, empty, missing] {
        let result = workflow.process_video(&input, "run").await;
        assert_eq!(result.failed_stage(), Some(ProcessStage::Validate), "{input:?}");
        assert!(result.timing(ProcessStage::Probe).is_none());
    }
}

#[tokio::test]
async fn test_resize_stage() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "tall.mp4");
    let config = PipelineConfig {
        orientation: Orientation::Portrait,
        ..test_config(dir.path())
    };
    let workflow = workflow(config, FakeEncoder::healthy()).await;

    let result = workflow.process_video(&input, "run").await;

    assert_eq!(read(result.output_path().unwrap()), "0\n1\n2\n1080x1920\n");
    assert!(result.timing(ProcessStage::Resize).is_some());
}

struct RecordingSubtitles {
    fail: bool,
    /// Write the subtitle file next to the reel
    write: bool,
    seen: Mutex<Vec<(bool, usize)>>,
}

impl RecordingSubtitles {
    fn new(fail: bool, write: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            write,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SubtitleCollaborator for RecordingSubtitles {
    async fn generate(&self, request: SubtitleRequest<'_>) -> WorkerResult<Option<PathBuf>> {
        self.seen
            .lock()
            .unwrap()
            .push((request.audio.is_some(), request.time_ranges.len()));
        if self.fail {
            return Err(WorkerError::subtitle_failed("recognizer crashed"));
        }
        let path = request.reel.with_extension("srt");
        if self.write {
            tokio::fs::write(&path, "1\n00:00:00,000 --> 00:00:02,000\nhello\n").await?;
        }
        Ok(Some(path))
    }
}

#[tokio::test]
async fn test_subtitle_stage() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "talk.mp4");
    let config = PipelineConfig {
        subtitles_enabled: true,
        ..test_config(dir.path())
    };
    let subtitles = RecordingSubtitles::new(false, true);
    let workflow = workflow(config, FakeEncoder::healthy())
        .await
        .with_subtitles(subtitles.clone());

    let result = workflow.process_video(&input, "run").await;

    assert!(result.is_success());
    assert_eq!(*subtitles.seen.lock().unwrap(), vec![(true, 3)]);
    assert!(result.timing(ProcessStage::Subtitle).is_some());
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["subtitle_path"].as_str().unwrap().ends_with("talk_highlights.srt"));
    // Burned in by default
    assert_eq!(
        read(result.output_path().unwrap()),
        "0\n1\n2\nsubs:talk_highlights.srt\n"
    );
    assert_scratch_clean(dir.path());
}

#[tokio::test]
async fn test_subtitles_kept_as_sidecar_when_burn_disabled() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "talk.mp4");
    let config = PipelineConfig {
        subtitles_enabled: true,
        burn_subtitles: false,
        ..test_config(dir.path())
    };
    let workflow = workflow(config, FakeEncoder::healthy())
        .await
        .with_subtitles(RecordingSubtitles::new(false, true));

    let result = workflow.process_video(&input, "run").await;

    assert!(result.is_success());
    assert_eq!(read(result.output_path().unwrap()), "0\n1\n2\n");
    assert!(dir.path().join("out").join("talk_highlights.srt").exists());
}

#[tokio::test]
async fn test_burn_of_missing_subtitle_file_removes_reel() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "talk.mp4");
    let config = PipelineConfig {
        subtitles_enabled: true,
        ..test_config(dir.path())
    };
    let workflow = workflow(config, FakeEncoder::healthy())
        .await
        .with_subtitles(RecordingSubtitles::new(false, false));

    let result = workflow.process_video(&input, "run").await;

    assert_eq!(result.failed_stage(), Some(ProcessStage::Subtitle));
    assert!(!dir.path().join("out").join("talk_highlights.mp4").exists());
    assert_scratch_clean(dir.path());
}

#[tokio::test]
async fn test_subtitle_failure_removes_reel() {
    let dir = TempDir::new().unwrap();
    let input = touch_video(dir.path(), "talk.mp4");
    let config = PipelineConfig {
        subtitles_enabled: true,
        ..test_config(dir.path())
    };
    let workflow = workflow(config, FakeEncoder::healthy())
        .await
        .with_subtitles(RecordingSubtitles::new(true, false));

    let result = workflow.process_video(&input, "run").await;

    assert_eq!(result.failed_stage(), Some(ProcessStage::Subtitle));
    assert!(!dir.path().join("out").join("talk_highlights.mp4").exists());
}

#[tokio::test]
async fn test_batch_reports_in_input_order() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        touch_video(dir.path(), "a.mp4"),
        touch_video(dir.path(), "b.txt"),
        touch_video(dir.path(), "c.mkv"),
    ];
    let config = PipelineConfig {
        batch_workers: 2,
        ..test_config(dir.path())
    };
    // The first video is slowest, so completion order differs from input order
    let encoder = FakeEncoder::with([(0, Behavior::Delay(Duration::from_millis(100)))]);
    let workflow = workflow(config, encoder).await;

    let report = workflow
        .process_batch(inputs.clone(), CancellationToken::new())
        .await;

    let order: Vec<&Path> = report.items.iter().map(BatchItem::input_path).collect();
    assert_eq!(order, inputs.iter().map(PathBuf::as_path).collect::<Vec<_>>());
    assert_eq!((report.succeeded, report.failed, report.skipped), (2, 1, 0));
    assert!(!report.cancelled);

    let run_ids: Vec<&str> = report
        .items
        .iter()
        .filter_map(|i| i.result())
        .map(|r| r.run_id.as_str())
        .collect();
    assert!(run_ids.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_cancelled_batch_skips_everything() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![touch_video(dir.path(), "a.mp4"), touch_video(dir.path(), "b.mp4")];
    let workflow = workflow(test_config(dir.path()), FakeEncoder::healthy()).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = workflow.process_batch(inputs, cancel).await;

    assert!(report.cancelled);
    assert_eq!(report.skipped, 2);
    assert!(report
        .items
        .iter()
        .all(|i| matches!(i, BatchItem::Skipped { .. })));
}

#[tokio::test]
async fn test_cancellation_stops_dispatch_not_in_flight_work() {
    let dir = TempDir::new().unwrap();
    let inputs = vec![
        touch_video(dir.path(), "a.mp4"),
        touch_video(dir.path(), "b.mp4"),
        touch_video(dir.path(), "c.mp4"),
    ];
    let config = PipelineConfig {
        batch_workers: 1,
        ..test_config(dir.path())
    };
    let slow = Behavior::Delay(Duration::from_millis(500));
    let workflow = workflow(config, FakeEncoder::with([(0, slow), (1, slow), (2, slow)])).await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let report = workflow.process_batch(inputs, cancel).await;

    assert!(report.cancelled);
    assert_eq!((report.succeeded, report.skipped), (1, 2));
    assert!(report.items[0].result().unwrap().is_success());
    assert!(dir.path().join("out").join("a_highlights.mp4").exists());
    assert!(!dir.path().join("out").join("b_highlights.mp4").exists());
}
