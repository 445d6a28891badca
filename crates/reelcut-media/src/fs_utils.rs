//! Filesystem utilities: input validation and cross-device moves.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Container extensions accepted as input (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "m4v", "webm"];

/// Whether `path` has a supported video extension (case-insensitive).
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let ext = e.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Reject inputs that cannot be probed: missing, not a regular file, empty,
/// or with an unsupported extension. Returns the file size.
pub async fn validate_input(path: &Path) -> MediaResult<u64> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MediaError::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(MediaError::from(e)),
    };

    if !metadata.is_file() {
        return Err(MediaError::invalid_input(format!(
            "{} is not a regular file",
            path.display()
        )));
    }

    if metadata.len() == 0 {
        return Err(MediaError::invalid_input(format!("{} is empty", path.display())));
    }

    if !is_supported_video(path) {
        return Err(MediaError::UnsupportedFormat(
            path.extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_else(|| "<none>".to_string()),
        ));
    }

    Ok(metadata.len())
}

/// Move `src` to `dst`, creating the destination directory if needed.
///
/// Attempts a fast rename first. If that fails with EXDEV it falls back to
/// copying into a temp file next to `dst`, renaming it into place and
/// deleting the source.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Rename crossed filesystems, copying instead"
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV (18 on Linux and macOS).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = dst.with_extension("partial");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(src = %src.display(), error = %e, "Copied reel but could not remove source");
    }

    Ok(())
}
