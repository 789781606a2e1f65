//! Import-map aware module resolution.
//!
//! Every import edge goes through [`RemoteResolver::resolve`], including plain local
//! imports, so the local rule has to reproduce ordinary relative resolution.
//!
//! Rules, first match wins:
//! 1. a specifier that is an import map key resolves to its target in the remote namespace
//! 2. inside the remote namespace, `.`-prefixed specifiers are joined against the importer
//!    and anything else is passed through unchanged
//! 3. inside the file namespace, specifiers are joined against the importer's directory
//! 4. other namespaces pass through untouched

use crate::import_map::ImportMap;
use crate::paths::{absolutize, join_importer_dir, join_remote};
use crate::plugin::{Namespace, ResolveArgs, ResolveResult};
use log::{debug, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    ImportMap(&'a str),
    RemoteRelative,
    RemoteBare,
    LocalRelative,
    Passthrough,
}

#[derive(Debug, Clone)]
pub struct RemoteResolver {
    import_map: Arc<ImportMap>,
}

impl RemoteResolver {
    pub fn new(import_map: Arc<ImportMap>) -> Self {
        Self { import_map }
    }

    pub fn import_map(&self) -> &ImportMap {
        &self.import_map
    }

    fn route(&self, args: &ResolveArgs) -> Route<'_> {
        if let Some(target) = self.import_map.lookup(&args.path) {
            return Route::ImportMap(target);
        }
        match args.namespace {
            Namespace::Remote if args.path.starts_with('.') => Route::RemoteRelative,
            Namespace::Remote => Route::RemoteBare,
            Namespace::File => Route::LocalRelative,
            Namespace::VirtualEnv | Namespace::Unset => Route::Passthrough,
        }
    }

    /// Resolves one import edge. Never fails: a path that cannot be normalized is
    /// logged and passed through as-is.
    pub fn resolve(&self, args: &ResolveArgs) -> ResolveResult {
        match self.route(args) {
            Route::ImportMap(target) => ResolveResult {
                path: target.to_string(),
                namespace: Namespace::Remote,
            },
            Route::RemoteRelative => {
                let path = match join_remote(&args.importer, &args.path) {
                    Ok(path) => {
                        debug!("Resolved {} to {}", args.path, path);
                        path
                    }
                    Err(err) => {
                        warn!(
                            "Failed to resolve {} against remote importer {}: {}",
                            args.path, args.importer, err
                        );
                        args.path.clone()
                    }
                };
                ResolveResult {
                    path,
                    namespace: Namespace::Remote,
                }
            }
            Route::RemoteBare => ResolveResult {
                path: args.path.clone(),
                namespace: Namespace::Remote,
            },
            Route::LocalRelative => {
                let joined = join_importer_dir(&args.importer, &args.path);
                let path = absolutize(&joined).unwrap_or_else(|err| {
                    warn!(
                        "Failed to resolve absolute path from {}: {}",
                        joined.display(),
                        err
                    );
                    joined
                });
                ResolveResult {
                    path: path.to_string_lossy().into_owned(),
                    namespace: Namespace::File,
                }
            }
            Route::Passthrough => ResolveResult {
                path: args.path.clone(),
                namespace: args.namespace,
            },
        }
    }
}
