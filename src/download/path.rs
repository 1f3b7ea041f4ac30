//! Mapping archive file names onto the download directory.

use std::path::{Path, PathBuf};

/// Highest numeric suffix tried by [`unique_path`].
const MAX_SUFFIX: u32 = 1000;

/// Maps `file_name` under `download_dir`, one component per `/` or `\`.
///
/// Empty, `.` and `..` components are dropped, so the result always stays
/// inside `download_dir`. Returns `None` when nothing usable remains.
#[must_use]
pub fn local_path(download_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut path = download_dir.to_path_buf();
    let mut pushed = false;
    for component in file_name.split(['/', '\\']) {
        let component = component.trim();
        if component.is_empty() || component == "." || component == ".." {
            continue;
        }
        path.push(component);
        pushed = true;
    }
    pushed.then_some(path)
}

/// Returns `path` if nothing exists there, otherwise the first free
/// `{stem}_{n}{ext}` sibling.
#[must_use]
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
    let ext = path
        .extension()
        .map_or_else(String::new, |e| format!(".{}", e.to_string_lossy()));

    for i in 1..MAX_SUFFIX {
        let candidate = path.with_file_name(format!("{stem}_{i}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    path.with_file_name(format!("{stem}_{timestamp}{ext}"))
}

/// Sibling that a download streams into before being renamed into place.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        assert_eq!(
            local_path(Path::new("downloads"), "book.pdf"),
            Some(PathBuf::from("downloads/book.pdf"))
        );
    }

    #[test]
    fn test_sub_folders_are_kept() {
        assert_eq!(
            local_path(Path::new("downloads"), "scans/vol 1/book.pdf"),
            Some(PathBuf::from("downloads/scans/vol 1/book.pdf"))
        );
    }

    #[test]
    fn test_traversal_components_are_dropped() {
        assert_eq!(
            local_path(Path::new("downloads"), "../../etc/./passwd.pdf"),
            Some(PathBuf::from("downloads/etc/passwd.pdf"))
        );
        assert_eq!(
            local_path(Path::new("downloads"), "/abs\\win.pdf"),
            Some(PathBuf::from("downloads/abs/win.pdf"))
        );
    }

    #[test]
    fn test_nothing_usable_is_none() {
        assert_eq!(local_path(Path::new("downloads"), ""), None);
        assert_eq!(local_path(Path::new("downloads"), "../.."), None);
    }

    #[test]
    fn test_unique_path_keeps_free_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("book.pdf");
        assert_eq!(unique_path(&path), path);
    }

    #[test]
    fn test_unique_path_suffixes_taken_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("book.pdf");
        std::fs::write(&path, b"a").unwrap();
        assert_eq!(unique_path(&path), temp_dir.path().join("book_1.pdf"));

        std::fs::write(temp_dir.path().join("book_1.pdf"), b"b").unwrap();
        assert_eq!(unique_path(&path), temp_dir.path().join("book_2.pdf"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("README");
        std::fs::write(&path, b"a").unwrap();
        assert_eq!(unique_path(&path), temp_dir.path().join("README_1"));
    }

    #[test]
    fn test_partial_path_is_sibling() {
        assert_eq!(
            partial_path(Path::new("downloads/vol 1/book.pdf")),
            PathBuf::from("downloads/vol 1/book.pdf.part")
        );
    }
}
