//! Default project inputs written before a build when they are missing.

use crate::error::{BundleError, Result};
use crate::import_map::ImportMap;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const STARTER_APP: &str = r#"import Alpine from "alpinejs";

// Define components and pages
Alpine.data("content", () => ({}));

Alpine.start();
"#;

/// Creates the files a build expects when a project does not provide them.
///
/// Every method must leave existing files untouched.
pub trait Scaffold {
    /// Ensures `<app_dir>/<entry>` exists.
    fn ensure_app(&self, app_dir: &Path, entry: &str) -> Result<()>;

    fn ensure_import_map(&self, path: &Path) -> Result<()>;

    /// Ensures a deno config exists so editors resolve the same specifiers as the build.
    fn ensure_deno_config(&self, path: &Path, import_map_path: &Path) -> Result<()>;
}

/// Writes an Alpine.js starter app and the default import map.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScaffold;

impl Scaffold for DefaultScaffold {
    fn ensure_app(&self, app_dir: &Path, entry: &str) -> Result<()> {
        let entry_path = app_dir.join(entry);
        if entry_path.exists() {
            return Ok(());
        }
        if !app_dir.exists() {
            info!("No app directory, creating {}", app_dir.display());
        }
        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|source| scaffold_error(parent, source))?;
        }
        info!("No app entry, creating {}", entry_path.display());
        fs::write(&entry_path, STARTER_APP).map_err(|source| scaffold_error(&entry_path, source))
    }

    fn ensure_import_map(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        info!("Cannot find {}, creating...", path.display());
        write_default_import_map(path)
    }

    fn ensure_deno_config(&self, path: &Path, import_map_path: &Path) -> Result<()> {
        // A dangling symlink still counts as present
        if path.symlink_metadata().is_ok() {
            return Ok(());
        }
        info!("Cannot find {}, linking...", path.display());
        match link(&link_target(path, import_map_path), path) {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!(
                    "Could not link {} to {}: {}",
                    path.display(),
                    import_map_path.display(),
                    err
                );
                write_default_import_map(path)
            }
        }
    }
}

fn write_default_import_map(path: &Path) -> Result<()> {
    let document = ImportMap::default_document().to_json_pretty()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| scaffold_error(parent, source))?;
    }
    fs::write(path, document).map_err(|source| scaffold_error(path, source))
}

/// Symlink targets are relative to the link, so siblings link by file name.
fn link_target(link: &Path, target: &Path) -> PathBuf {
    match (link.parent(), target.parent(), target.file_name()) {
        (Some(link_dir), Some(target_dir), Some(name)) if link_dir == target_dir => {
            PathBuf::from(name)
        }
        _ => crate::paths::absolutize(target).unwrap_or_else(|_| target.to_path_buf()),
    }
}

#[cfg(unix)]
fn link(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn link(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks are only created on unix",
    ))
}

fn scaffold_error(path: &Path, source: std::io::Error) -> BundleError {
    BundleError::Scaffold {
        path: path.to_path_buf(),
        source,
    }
}
