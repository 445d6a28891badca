//! Concatenation via an FFmpeg concat list-file.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use reelcut_models::EncodingProfile;

use crate::encode::SegmentEncoder;
use crate::error::{MediaError, MediaResult};

/// How segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcatMode {
    /// Demuxer-level join; inputs must share codec parameters
    StreamCopy,
    /// Transcode the joined stream so every seam has uniform parameters
    Reencode,
}

/// Build concat list-file contents in the given order.
///
/// Paths are made absolute and single quotes are escaped as `'\''`.
pub fn build_concat_list(files: &[PathBuf]) -> MediaResult<String> {
    let cwd = std::env::current_dir()?;
    let mut list = String::new();
    for file in files {
        let absolute = if file.is_absolute() {
            file.clone()
        } else {
            cwd.join(file)
        };
        let escaped = absolute.to_string_lossy().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    Ok(list)
}

/// Join `files`, in order, into `output`.
///
/// The list-file is created in `list_dir` and removed when this returns,
/// whatever the outcome.
pub async fn concat_segments(
    encoder: &dyn SegmentEncoder,
    files: &[PathBuf],
    output: &Path,
    mode: ConcatMode,
    profile: &EncodingProfile,
    list_dir: &Path,
) -> MediaResult<()> {
    if files.is_empty() {
        return Err(MediaError::invalid_input("nothing to concatenate"));
    }

    let list_file = tempfile::Builder::new()
        .prefix("concat_")
        .suffix(".txt")
        .tempfile_in(list_dir)?;
    tokio::fs::write(list_file.path(), build_concat_list(files)?).await?;

    debug!(
        list = %list_file.path().display(),
        inputs = files.len(),
        mode = ?mode,
        "Concatenating segments"
    );

    encoder.concat(list_file.path(), output, mode, profile).await?;

    let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(MediaError::EmptyOutput(output.to_path_buf()));
    }

    info!(
        output = %output.display(),
        inputs = files.len(),
        size,
        "Concatenation complete"
    );
    Ok(())
}
