//! Pics-directory resolution.
//!
//! The engine only ever writes into a directory named `pics`. Callers
//! may hand us either that directory or its parent; resolution confirms
//! the former and redirects from the latter, surfacing the redirect so
//! the caller's input is never silently rewritten. Platform-specific
//! install discovery is a control-plane concern and stays outside the
//! engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DownloadError;

/// How a pics directory was resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PicsDirSource {
    /// The input was itself a directory named `pics`.
    Direct,
    /// The input contained a `pics` child; the child was selected.
    Redirected {
        /// The directory the caller originally gave us.
        from: PathBuf,
    },
}

/// Outcome of pics-directory resolution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PicsDirResolution {
    /// The confirmed pics directory.
    pub path: PathBuf,
    /// How it was found.
    pub source: PicsDirSource,
}

impl PicsDirResolution {
    /// Whether the caller's input was redirected to a child directory.
    #[must_use]
    pub const fn is_redirected(&self) -> bool {
        matches!(self.source, PicsDirSource::Redirected { .. })
    }
}

/// Resolve `input` to an existing `pics` directory.
///
/// Accepts the `pics` directory itself (any capitalization of the name)
/// or a directory directly containing one. Anything else is
/// [`DownloadError::InvalidPicsDir`].
pub fn resolve_pics_dir(input: &Path) -> Result<PicsDirResolution, DownloadError> {
    let reject = |reason: &str| {
        Err(DownloadError::invalid_pics_dir(
            input.display().to_string(),
            reason,
        ))
    };

    if input.as_os_str().is_empty() {
        return reject("no directory given");
    }
    if !input.exists() {
        return reject("does not exist");
    }
    if !input.is_dir() {
        return reject("not a directory");
    }

    if input
        .file_name()
        .is_some_and(|name| name.eq_ignore_ascii_case("pics"))
    {
        return Ok(PicsDirResolution {
            path: input.to_path_buf(),
            source: PicsDirSource::Direct,
        });
    }

    let child = input.join("pics");
    if child.is_dir() {
        return Ok(PicsDirResolution {
            path: child,
            source: PicsDirSource::Redirected {
                from: input.to_path_buf(),
            },
        });
    }

    reject("is not a pics directory and does not contain one")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn direct_pics_dir_is_confirmed() {
        let root = tempfile::tempdir().unwrap();
        let pics = root.path().join("pics");
        fs::create_dir(&pics).unwrap();

        let resolution = resolve_pics_dir(&pics).unwrap();
        assert_eq!(resolution.path, pics);
        assert_eq!(resolution.source, PicsDirSource::Direct);
        assert!(!resolution.is_redirected());
    }

    #[test]
    fn parent_of_pics_is_redirected_with_surfaced_origin() {
        let root = tempfile::tempdir().unwrap();
        let pics = root.path().join("pics");
        fs::create_dir(&pics).unwrap();

        let resolution = resolve_pics_dir(root.path()).unwrap();
        assert_eq!(resolution.path, pics);
        assert!(resolution.is_redirected());
        assert_eq!(
            resolution.source,
            PicsDirSource::Redirected {
                from: root.path().to_path_buf()
            }
        );
    }

    #[test]
    fn pics_name_match_ignores_case() {
        let root = tempfile::tempdir().unwrap();
        let pics = root.path().join("Pics");
        fs::create_dir(&pics).unwrap();

        let resolution = resolve_pics_dir(&pics).unwrap();
        assert_eq!(resolution.source, PicsDirSource::Direct);
    }

    #[test]
    fn missing_path_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_pics_dir(&root.path().join("nope")).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidPicsDir { .. }));
    }

    #[test]
    fn file_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("pics");
        fs::write(&file, b"not a dir").unwrap();

        let err = resolve_pics_dir(&file).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidPicsDir { .. }));
    }

    #[test]
    fn unrelated_dir_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = resolve_pics_dir(root.path()).unwrap_err();
        match err {
            DownloadError::InvalidPicsDir { reason, .. } => {
                assert!(reason.contains("does not contain one"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = resolve_pics_dir(Path::new("")).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidPicsDir { .. }));
    }
}
