use super::*;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSizeComputation {
    pub size_bytes: u64,
    /// First unreadable path, when the total is a lower bound.
    pub incomplete_at: Option<(PathBuf, String)>,
}

/// Apparent size of a path without following symlinks. Unreadable subtrees
/// are skipped and reported through `incomplete_at`.
pub fn path_size_bytes(path: &Path) -> PathSizeComputation {
    let mut computation = PathSizeComputation::default();
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(error) => {
            computation.incomplete_at = Some((path.to_path_buf(), error.to_string()));
            return computation;
        }
    };
    if !meta.is_dir() {
        computation.size_bytes = meta.len();
        return computation;
    }

    let mut queue = VecDeque::new();
    queue.push_back(path.to_path_buf());
    while let Some(dir) = queue.pop_front() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(error) => {
                note_incomplete(&mut computation, dir.as_path(), &error);
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    note_incomplete(&mut computation, dir.as_path(), &error);
                    continue;
                }
            };
            let entry_path = entry.path();
            let meta = match fs::symlink_metadata(&entry_path) {
                Ok(meta) => meta,
                Err(error) => {
                    note_incomplete(&mut computation, entry_path.as_path(), &error);
                    continue;
                }
            };
            if meta.is_dir() {
                queue.push_back(entry_path);
            } else {
                computation.size_bytes = computation.size_bytes.saturating_add(meta.len());
            }
        }
    }
    computation
}

fn note_incomplete(computation: &mut PathSizeComputation, path: &Path, error: &io::Error) {
    if computation.incomplete_at.is_none() {
        computation.incomplete_at = Some((path.to_path_buf(), error.to_string()));
    }
}

/// Human-readable size with binary units, e.g. `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
#[path = "../tests/scanning/size_tests.rs"]
mod size_tests;
