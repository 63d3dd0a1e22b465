//! Path helpers

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Make a path absolute and resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Join `pieces` onto `root`, refusing any result outside of `root`.
///
/// `safe_abs_path("/b", &[".."])` fails instead of yielding `/`.
pub fn safe_abs_path(root: impl AsRef<Path>, pieces: &[&str]) -> Result<PathBuf> {
    let root = root.as_ref();
    let joined = pieces
        .iter()
        .fold(root.to_path_buf(), |acc, piece| acc.join(piece));

    let base = normalize(root)?;
    let path = normalize(&joined)?;
    if !path.starts_with(&base) {
        return Err(Error::PathOutsideRoot {
            root: root.to_path_buf(),
            pieces: pieces.iter().map(|p| p.to_string()).collect(),
        });
    }
    Ok(path)
}

/// Create a directory and any missing ancestors.
///
/// Returns `Ok(false)` when the directory already existed.
pub fn ensure_tree(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(false);
    }
    match fs::create_dir_all(path) {
        Ok(()) => Ok(true),
        // Lost a creation race with another process
        Err(_) if path.is_dir() => Ok(false),
        Err(e) => Err(Error::IoWrite {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_safe_abs_path_inside_root() {
        let path = safe_abs_path("/srv/locks", &["group", "member-1"]).unwrap();
        assert_eq!(path, PathBuf::from("/srv/locks/group/member-1"));
    }

    #[test]
    fn test_safe_abs_path_resolves_dots_inside_root() {
        let path = safe_abs_path("/srv/locks", &["a", "..", "b", ".", "c"]).unwrap();
        assert_eq!(path, PathBuf::from("/srv/locks/b/c"));
    }

    #[test]
    fn test_safe_abs_path_rejects_escape() {
        let err = safe_abs_path("/b", &[".."]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PathOutsideRoot);
        assert!(err.to_string().contains("'/b'"));
        assert!(err.to_string().contains(r#"[".."]"#));
    }

    #[test]
    fn test_safe_abs_path_rejects_sibling_prefix() {
        // "/srv/locks-evil" shares a string prefix but not a path prefix
        assert!(safe_abs_path("/srv/locks", &["..", "locks-evil"]).is_err());
    }

    #[test]
    fn test_safe_abs_path_rejects_absolute_piece() {
        assert!(safe_abs_path("/srv/locks", &["/etc/passwd"]).is_err());
    }

    #[test]
    fn test_ensure_tree_creates_then_reports_existing() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b").join("c");

        assert!(ensure_tree(&nested).unwrap());
        assert!(nested.is_dir());
        assert!(!ensure_tree(&nested).unwrap());
    }

    #[test]
    fn test_ensure_tree_fails_on_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("occupied");
        fs::write(&file, b"x").unwrap();

        let err = ensure_tree(&file).unwrap_err();
        assert_eq!(err.code(), ErrorCode::IoWrite);
    }
}
