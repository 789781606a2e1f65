//! Path and URL joining used by the resolver.

use std::io;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Lexically normalizes a filesystem path, dropping `.` and folding `..` into its parent.
///
/// Symlinks are not consulted.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let parent_is_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if parent_is_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Joins `specifier` onto the directory containing `importer`.
pub fn join_importer_dir(importer: &str, specifier: &str) -> PathBuf {
    Path::new(importer)
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(specifier)
}

/// Anchors a relative path at the current working directory and normalizes it.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}

/// Cleans a `/`-separated path the way URL paths are cleaned: empty and `.` segments
/// are dropped and `..` removes the preceding segment.
pub fn clean_posix(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            segment => segments.push(segment),
        }
    }
    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Resolves `specifier` relative to a remote importer.
///
/// Absolute URL importers use URL reference resolution, so the importer's origin is
/// kept. Other importers are treated as registry paths and joined lexically.
pub fn join_remote(importer: &str, specifier: &str) -> Result<String, url::ParseError> {
    match Url::parse(importer) {
        Ok(base) => Ok(base.join(specifier)?.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let dir = match importer.rfind('/') {
                Some(0) => "/",
                Some(idx) => &importer[..idx],
                None => "",
            };
            if dir.is_empty() || specifier.starts_with('/') {
                Ok(clean_posix(specifier))
            } else {
                Ok(clean_posix(&format!("{dir}/{specifier}")))
            }
        }
        Err(err) => Err(err),
    }
}

/// Returns true for `http://` and `https://` URLs.
pub fn is_http_url(path: &str) -> bool {
    path.starts_with("https://") || path.starts_with("http://")
}
