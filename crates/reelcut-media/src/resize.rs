//! Orientation resize.

use std::path::Path;

use tracing::info;

use reelcut_models::{EncodingProfile, Orientation};

use crate::encode::SegmentEncoder;
use crate::error::{MediaError, MediaResult};

/// Letterbox filter fitting the frame inside `width`x`height` on black.
pub fn scale_pad_filter(width: u32, height: u32) -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:black",
        w = width,
        h = height
    )
}

/// Resize `input` into `output` for `orientation`.
///
/// Returns `false` (and writes nothing) for [`Orientation::Original`].
pub async fn resize_video(
    encoder: &dyn SegmentEncoder,
    input: &Path,
    output: &Path,
    orientation: Orientation,
    profile: &EncodingProfile,
) -> MediaResult<bool> {
    let Some((width, height)) = orientation.dimensions() else {
        return Ok(false);
    };

    info!(
        input = %input.display(),
        width,
        height,
        "Resizing reel"
    );
    encoder.resize(input, output, width, height, profile).await?;

    let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(MediaError::EmptyOutput(output.to_path_buf()));
    }
    Ok(true)
}
