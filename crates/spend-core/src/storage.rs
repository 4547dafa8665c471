use std::path::{Path, PathBuf};

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers never observe a half-written artifact.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    std::fs::rename(&tmp, path)
}

/// Make a catalogue value safe to embed in a single file name.
///
/// Anything outside `[A-Za-z0-9_.-]` becomes `-`, so `2024/25` turns into
/// `2024-25`. A value made only of dots (or nothing) is replaced entirely,
/// which keeps `.` and `..` from naming a directory.
pub fn file_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        "-".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}

/// `name.ext` becomes `name.ext.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("analysis").join("report.txt");

        write_atomic(&path, b"hello").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!tmp.path().join("analysis").join("report.txt.tmp").exists());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a_2024-25.csv");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_file_component_replaces_separators() {
        assert_eq!(file_component("2024-25"), "2024-25");
        assert_eq!(file_component("2024/25"), "2024-25");
        assert_eq!(file_component(r"a\b c"), "a-b-c");
        assert_eq!(file_component("../etc"), "..-etc");
    }

    #[test]
    fn test_file_component_never_names_a_directory() {
        assert_eq!(file_component("."), "-");
        assert_eq!(file_component(".."), "--");
        assert_eq!(file_component(""), "-");
    }

    #[test]
    fn test_temp_path_keeps_extension() {
        let path = Path::new("/data/processed_x.csv");
        assert_eq!(temp_path(path), PathBuf::from("/data/processed_x.csv.tmp"));
    }
}
