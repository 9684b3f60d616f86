//! Video file discovery and the per-session catalog.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use log::debug;

use crate::pool::PoolError;

pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 11] = [
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "mpeg", "mpg", "ts", "m4v",
];

pub fn is_supported_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_VIDEO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

pub fn collect_video_files_from_folder(folder_path: &Path) -> Vec<PathBuf> {
    let mut pending_directories = vec![folder_path.to_path_buf()];
    let mut files = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Failed to read directory {}: {}", directory.display(), err);
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(
                        "Failed to read a directory entry in {}: {}",
                        directory.display(),
                        err
                    );
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!("Failed to inspect {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending_directories.push(path);
                continue;
            }

            if file_type.is_file() && is_supported_video_file(&path) {
                files.push(path);
            }
        }
    }

    files.sort_unstable();
    files
}

pub fn collect_video_files_from_dropped_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for path in paths {
        if path.is_file() {
            if is_supported_video_file(path) {
                files.insert(path.clone());
            }
            continue;
        }
        if path.is_dir() {
            for file in collect_video_files_from_folder(path) {
                files.insert(file);
            }
        }
    }
    files.into_iter().collect()
}

/// The discovered set of playable files for the current session.
///
/// Immutable once loaded; selecting a new root folder replaces the catalog
/// wholesale. A catalog is never empty: `load` rejects roots with no
/// playable files before the pool touches anything.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
    files: Vec<PathBuf>,
}

impl Catalog {
    pub fn load(root: &Path) -> Result<Catalog, PoolError> {
        let files = collect_video_files_from_folder(root);
        if files.is_empty() {
            return Err(PoolError::CatalogEmpty {
                root: root.to_path_buf(),
            });
        }
        debug!(
            "Catalog loaded: {} files under {}",
            files.len(),
            root.display()
        );
        Ok(Catalog {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Builds a catalog from an explicit file list. Used for manual playlist
    /// drops; same non-empty precondition as `load`.
    pub fn from_files(root: &Path, files: Vec<PathBuf>) -> Result<Catalog, PoolError> {
        if files.is_empty() {
            return Err(PoolError::CatalogEmpty {
                root: root.to_path_buf(),
            });
        }
        Ok(Catalog {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shufflegrid-catalog-{}", name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("failed to create scratch dir");
        dir
    }

    fn touch(path: &Path) {
        fs::write(path, b"").expect("failed to create file");
    }

    #[test]
    fn test_extension_match_is_case_insensitive_and_allow_listed() {
        assert!(is_supported_video_file(Path::new("/tmp/clip.mp4")));
        assert!(is_supported_video_file(Path::new("/tmp/CLIP.MKV")));
        assert!(is_supported_video_file(Path::new("/tmp/clip.m4v")));
        assert!(!is_supported_video_file(Path::new("/tmp/track.mp3")));
        assert!(!is_supported_video_file(Path::new("/tmp/noext")));
        assert!(!is_supported_video_file(Path::new("/tmp/notes.txt")));
    }

    #[test]
    fn test_folder_walk_recurses_and_sorts() {
        let root = scratch_dir("walk");
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        touch(&root.join("b.mp4"));
        touch(&root.join("a.mkv"));
        touch(&root.join("skip.txt"));
        touch(&root.join("nested/c.webm"));
        touch(&root.join("nested/deeper/d.avi"));

        let files = collect_video_files_from_folder(&root);
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 4);
        let mut sorted = files.clone();
        sorted.sort_unstable();
        assert_eq!(files, sorted);
        assert!(names.iter().all(|n| !n.ends_with(".txt")));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_empty_root_is_a_rejected_precondition() {
        let root = scratch_dir("empty");
        touch(&root.join("readme.txt"));

        let result = Catalog::load(&root);
        assert!(matches!(result, Err(PoolError::CatalogEmpty { .. })));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_loaded_catalog_exposes_root_and_files() {
        let root = scratch_dir("loaded");
        touch(&root.join("one.mp4"));
        touch(&root.join("two.mov"));

        let catalog = Catalog::load(&root).expect("catalog should load");
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.root(), root.as_path());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_dropped_paths_deduplicate_and_filter() {
        let root = scratch_dir("dropped");
        touch(&root.join("one.mp4"));
        touch(&root.join("two.txt"));

        let dropped = vec![root.clone(), root.join("one.mp4"), root.join("two.txt")];
        let files = collect_video_files_from_dropped_paths(&dropped);
        assert_eq!(files, vec![root.join("one.mp4")]);

        let _ = fs::remove_dir_all(&root);
    }
}
