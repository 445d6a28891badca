//! Burning subtitle files into a reel.

use std::path::Path;

use tracing::info;

use reelcut_models::EncodingProfile;

use crate::encode::SegmentEncoder;
use crate::error::{MediaError, MediaResult};

/// `subtitles` filter for `path`, escaped for both the option value and the
/// filtergraph level.
pub fn subtitles_filter(path: &Path) -> String {
    let value = escape(&path.to_string_lossy(), &['\\', '\'', ':']);
    format!("subtitles=filename={}", escape(&value, &['\\', '\'', '[', ']', ',', ';']))
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render `subtitles` onto the frames of `input`, writing `output`.
pub async fn burn_subtitles(
    encoder: &dyn SegmentEncoder,
    input: &Path,
    subtitles: &Path,
    output: &Path,
    profile: &EncodingProfile,
) -> MediaResult<()> {
    if !tokio::fs::try_exists(subtitles).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(subtitles.to_path_buf()));
    }

    info!(
        input = %input.display(),
        subtitles = %subtitles.display(),
        "Burning subtitles"
    );
    encoder.burn_subtitles(input, subtitles, output, profile).await?;

    let size = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(MediaError::EmptyOutput(output.to_path_buf()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitles_filter_plain_path() {
        assert_eq!(
            subtitles_filter(Path::new("/tmp/reel.srt")),
            "subtitles=filename=/tmp/reel.srt"
        );
    }

    #[test]
    fn test_subtitles_filter_escapes_both_levels() {
        assert_eq!(
            subtitles_filter(Path::new("C:/subs/it's,here.srt")),
            r"subtitles=filename=C\\:/subs/it\\\'s\,here.srt"
        );
    }
}
