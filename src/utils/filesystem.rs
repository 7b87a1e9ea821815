use crate::utils::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

/// Regular files directly inside `dir` (no recursion), sorted by path.
pub fn list_directory_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();

    if !dir.is_dir() {
        return Err(Error::configuration(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Creates `dir` and its parents; an unwritable root is a configuration error.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::configuration(format!("Cannot create directory {}: {}", dir.display(), e))
    })
}

pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let size = bytes as f64;
    let unit_index = (size.log(THRESHOLD) as usize).min(UNITS.len() - 1);
    let size_in_unit = size / THRESHOLD.powi(unit_index as i32);

    format!("{:.2} {}", size_in_unit, UNITS[unit_index])
}

/// A per-job scratch file next to its final destination.
///
/// The file is removed on drop unless [`TempOutput::commit`] moved it into place, so
/// failed, timed-out and cancelled jobs never leave anything behind.
#[derive(Debug)]
pub struct TempOutput {
    path: PathBuf,
    committed: bool,
}

impl TempOutput {
    pub fn new<P: AsRef<Path>>(final_path: P, suffix: &str) -> Self {
        let final_path = final_path.as_ref();
        let file_name = final_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let name = format!(".{}.{}.{}", file_name, Uuid::new_v4().simple(), suffix);
        let path = final_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(name);

        Self {
            path,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the scratch file to `final_path` if it is larger than `min_bytes`.
    pub fn commit<P: AsRef<Path>>(mut self, final_path: P, min_bytes: u64) -> Result<u64> {
        let final_path = final_path.as_ref();
        let size = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.len(),
            Err(_) => {
                return Err(Error::render_failed(format!(
                    "Renderer reported success but produced no file for {}",
                    final_path.display()
                )));
            }
        };

        if size <= min_bytes {
            return Err(Error::render_failed(format!(
                "Output for {} is only {} bytes (minimum {})",
                final_path.display(),
                size,
                min_bytes
            )));
        }

        std::fs::rename(&self.path, final_path)?;
        self.committed = true;
        debug!("Committed {} ({})", final_path.display(), format_file_size(size));
        Ok(size)
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        if self.committed || !self.path.exists() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial output {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove partial output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_directory_files_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"b").unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.mp4"), b"c").unwrap();

        let files = list_directory_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.jpg"), dir.path().join("b.mp4")]
        );
    }

    #[test]
    fn test_temp_output_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("clip.mp4");
        let temp_path = {
            let temp = TempOutput::new(&final_path, "partial");
            std::fs::write(temp.path(), vec![0u8; 4096]).unwrap();
            temp.path().to_path_buf()
        };
        assert!(!temp_path.exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn test_temp_output_commit_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("clip.mp4");
        let temp = TempOutput::new(&final_path, "partial");
        assert!(temp
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(".clip.mp4."));
        std::fs::write(temp.path(), vec![0u8; 4096]).unwrap();
        let temp_path = temp.path().to_path_buf();

        let size = temp.commit(&final_path, 1000).unwrap();
        assert_eq!(size, 4096);
        assert!(final_path.exists());
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_temp_output_rejects_tiny_file() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("clip.mp4");
        let temp = TempOutput::new(&final_path, "partial");
        std::fs::write(temp.path(), b"tiny").unwrap();

        let result = temp.commit(&final_path, 1000);
        assert!(matches!(result, Err(Error::RenderFailed { .. })));
        assert!(!final_path.exists());
        assert_eq!(list_directory_files(dir.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.00 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1_048_576), "1.00 MB");
    }
}
