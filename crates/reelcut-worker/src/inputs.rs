//! Input discovery for batch runs.

use std::path::PathBuf;

use tracing::{debug, warn};
use walkdir::WalkDir;

use reelcut_media::is_supported_video;

/// Expand directories into the supported video files they contain.
///
/// Explicit file arguments are kept as given (the validate stage rejects
/// unusable ones). Directory contents are sorted for a stable batch order;
/// subdirectories are only visited when `recursive` is set.
pub fn discover_inputs(paths: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut inputs = Vec::new();

    for path in paths {
        if !path.is_dir() {
            inputs.push(path.clone());
            continue;
        }

        let walker = WalkDir::new(path)
            .follow_links(true)
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 });

        let mut found: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && is_supported_video(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        found.sort();

        debug!(dir = %path.display(), videos = found.len(), "Scanned input directory");
        inputs.extend(found);
    }

    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_inputs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.mp4"), b"x").unwrap();
        fs::write(dir.path().join("a.MOV"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.mkv"), b"x").unwrap();

        let flat = discover_inputs(&[dir.path().to_path_buf()], false);
        assert_eq!(
            flat,
            vec![dir.path().join("a.MOV"), dir.path().join("b.mp4")]
        );

        let deep = discover_inputs(&[dir.path().to_path_buf()], true);
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("nested").join("c.mkv")));

        // Explicit files pass through untouched
        let explicit = dir.path().join("notes.txt");
        assert_eq!(discover_inputs(&[explicit.clone()], false), vec![explicit]);
    }
}
