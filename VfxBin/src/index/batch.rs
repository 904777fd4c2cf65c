//! Batch indexing
//!
//! Indexes many ritobin text files in parallel and finds them on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use super::EntryIndex;

/// One successfully indexed file
#[derive(Debug, Clone, Serialize)]
pub struct IndexedFile {
    pub path: PathBuf,
    pub index: EntryIndex,
}

/// Outcome of [`index_files`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchIndexResult {
    /// Indexed files, in input order
    pub files: Vec<IndexedFile>,
    /// Files that could not be read, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchIndexResult {
    /// VFX systems across every file
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.files.iter().map(|f| f.index.systems().count()).sum()
    }
}

/// Find ritobin text dumps (`.py`) under a directory, sorted
pub fn find_bin_texts<P: AsRef<Path>>(dir: P) -> Vec<PathBuf> {
    let mut files: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("py"))
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    files.sort();
    files
}

/// Index files in parallel
///
/// `progress` is called with `(done, total, path)` as each file finishes.
/// A file that cannot be read as UTF-8 text lands in `failures`; the rest
/// still index.
pub fn index_files<F>(paths: &[PathBuf], progress: F) -> BatchIndexResult
where
    F: Fn(usize, usize, &Path) + Send + Sync,
{
    let processed = AtomicUsize::new(0);
    let total = paths.len();

    let outcomes: Vec<(PathBuf, Result<EntryIndex, String>)> = paths
        .par_iter()
        .map(|path| {
            let outcome = fs::read_to_string(path)
                .map(|text| EntryIndex::build(&text))
                .map_err(|e| e.to_string());
            let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(current, total, path);
            (path.clone(), outcome)
        })
        .collect();

    let mut result = BatchIndexResult::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(index) => result.files.push(IndexedFile { path, index }),
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "could not index file");
                result.failures.push((path, reason));
            }
        }
    }
    tracing::debug!(files = result.files.len(), failures = result.failures.len(), "batch index finished");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_index_files_keeps_order_and_failures() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("skins");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("a.py"), "\"A\" = VfxSystemDefinitionData {}\n").unwrap();
        fs::write(nested.join("b.PY"), "\"B\" = VfxSystemDefinitionData {}\n\"C\" = VfxSystemDefinitionData {}\n").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let mut paths = find_bin_texts(temp.path());
        assert_eq!(paths, vec![temp.path().join("a.py"), nested.join("b.PY")]);

        paths.push(temp.path().join("gone.py"));
        let seen = AtomicUsize::new(0);
        let result = index_files(&paths, |_, total, _| {
            assert_eq!(total, 3);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(result.files.len(), 2);
        assert_eq!(result.files[1].path, nested.join("b.PY"));
        assert_eq!(result.system_count(), 3);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0, temp.path().join("gone.py"));
    }
}
