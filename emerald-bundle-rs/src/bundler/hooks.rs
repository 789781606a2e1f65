//! Adapters that let deno_graph drive the plugin hooks.
//!
//! deno_graph identifies modules by URL, while hooks work with `(namespace, path)`
//! pairs. Filesystem modules map to `file://` URLs and remote modules with an absolute
//! `http(s)` path keep their URL; everything else is encoded as `<namespace>:<path>`.
//! Imports marked external become `external:<specifier>` and are never loaded.

use super::engine::Message;
use super::text::transform_json_source;
use crate::paths::{absolutize, is_http_url};
use crate::plugin::{
    LoadArgs, LoadResult, LoaderHint, Namespace, PluginBuild, ResolveArgs, ResolveKind,
    ResolveResult,
};
use deno_graph::source::{
    LoadError, LoadFuture, LoadOptions, LoadResponse, Loader, ResolutionKind, ResolveError,
    Resolver,
};
use deno_graph::{ModuleSpecifier, Range};
use log::warn;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

const EXTERNAL_SCHEME: &str = "external";

pub(crate) fn to_specifier(resolved: &ResolveResult) -> Option<ModuleSpecifier> {
    match resolved.namespace {
        Namespace::File => ModuleSpecifier::from_file_path(&resolved.path).ok(),
        Namespace::Remote if is_http_url(&resolved.path) => {
            ModuleSpecifier::parse(&resolved.path).ok()
        }
        namespace => ModuleSpecifier::parse(&format!("{}:{}", namespace, resolved.path)).ok(),
    }
}

pub(crate) fn from_specifier(specifier: &ModuleSpecifier) -> (Namespace, String) {
    match specifier.scheme() {
        "file" => {
            let path = specifier
                .to_file_path()
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(|_| specifier.path().to_string());
            (Namespace::File, path)
        }
        "http" | "https" => (Namespace::Remote, specifier.to_string()),
        scheme => match Namespace::from_wire(scheme) {
            Some(namespace) => (namespace, specifier.as_str()[scheme.len() + 1..].to_string()),
            None => (Namespace::Unset, specifier.to_string()),
        },
    }
}

fn is_external(specifier: &ModuleSpecifier) -> bool {
    specifier.scheme() == EXTERNAL_SCHEME
}

/// Resolves an entry point through the hooks, falling back to the working directory.
pub(crate) fn resolve_entry_point(
    plugins: &PluginBuild,
    entry: &Path,
) -> Result<ModuleSpecifier, Message> {
    let args = ResolveArgs {
        path: entry.to_string_lossy().into_owned(),
        importer: String::new(),
        namespace: Namespace::File,
        kind: ResolveKind::EntryPoint,
    };
    let resolved = match plugins.resolve(&args) {
        Ok(Some(resolved)) => resolved,
        Ok(None) => ResolveResult {
            path: absolutize(entry)
                .unwrap_or_else(|_| entry.to_path_buf())
                .to_string_lossy()
                .into_owned(),
            namespace: Namespace::File,
        },
        Err(err) => {
            return Err(Message::new(format!(
                "Failed to resolve entry point {}: {}",
                entry.display(),
                err
            )))
        }
    };
    to_specifier(&resolved).ok_or_else(|| {
        Message::new(format!(
            "Entry point {} resolved to {} ({}), which is not a valid module specifier",
            entry.display(),
            resolved.path,
            resolved.namespace
        ))
    })
}

/// deno_graph resolver that asks the resolve hooks.
///
/// Hook failures cannot be expressed as deno_graph resolve errors, so they are
/// collected and reported after the graph is built.
#[derive(Debug)]
pub(crate) struct HookResolver<'a> {
    plugins: &'a PluginBuild,
    external: &'a [String],
    errors: Mutex<Vec<Message>>,
}

impl<'a> HookResolver<'a> {
    pub fn new(plugins: &'a PluginBuild, external: &'a [String]) -> Self {
        Self {
            plugins,
            external,
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn take_errors(&self) -> Vec<Message> {
        self.errors
            .lock()
            .map(|mut errors| std::mem::take(&mut *errors))
            .unwrap_or_default()
    }

    /// The `external:` specifier for an import that must stay unbundled.
    fn external_specifier(&self, specifier: &str) -> Option<ModuleSpecifier> {
        if !self.external.iter().any(|name| name == specifier) {
            return None;
        }
        ModuleSpecifier::parse(&format!("{EXTERNAL_SCHEME}:{specifier}")).ok()
    }

    fn record(&self, message: String) {
        warn!("{message}");
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(Message::new(message));
        }
    }
}

impl Resolver for HookResolver<'_> {
    fn resolve(
        &self,
        specifier: &str,
        referrer_range: &Range,
        _mode: ResolutionKind,
    ) -> Result<ModuleSpecifier, ResolveError> {
        if let Some(external) = self.external_specifier(specifier) {
            return Ok(external);
        }

        let (namespace, importer) = from_specifier(&referrer_range.specifier);
        let args = ResolveArgs {
            path: specifier.to_string(),
            importer,
            namespace,
            kind: ResolveKind::ImportStatement,
        };
        match self.plugins.resolve(&args) {
            Ok(Some(resolved)) => match to_specifier(&resolved) {
                Some(resolved_specifier) => return Ok(resolved_specifier),
                None => self.record(format!(
                    "Import {} from {} resolved to {} ({}), which is not a valid module specifier",
                    specifier, referrer_range.specifier, resolved.path, resolved.namespace
                )),
            },
            Ok(None) => {}
            Err(err) => self.record(format!(
                "Failed to resolve {} from {}: {}",
                specifier, referrer_range.specifier, err
            )),
        }
        deno_graph::resolve_import(specifier, &referrer_range.specifier).map_err(|err| err.into())
    }
}

/// deno_graph loader that asks the load hooks.
///
/// Unclaimed filesystem modules are read from disk; unclaimed modules in any other
/// namespace are an error.
pub(crate) struct HookLoader<'a> {
    plugins: &'a PluginBuild,
}

impl<'a> HookLoader<'a> {
    pub fn new(plugins: &'a PluginBuild) -> Self {
        Self { plugins }
    }

    fn load_module(&self, specifier: &ModuleSpecifier) -> Result<(String, &'static str), io::Error> {
        let (namespace, path) = from_specifier(specifier);
        let args = LoadArgs { path, namespace };

        let loaded = match self.plugins.load(&args) {
            Ok(Some(loaded)) => loaded,
            Ok(None) if namespace == Namespace::File => LoadResult {
                contents: std::fs::read_to_string(&args.path).map_err(|err| {
                    io::Error::new(err.kind(), format!("Failed to read {}: {}", args.path, err))
                })?,
                loader: None,
            },
            Ok(None) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "No loader is registered for {} in namespace {}",
                        args.path, namespace
                    ),
                ))
            }
            Err(err) => return Err(io::Error::other(err.to_string())),
        };

        let hint = loaded
            .loader
            .or_else(|| LoaderHint::from_extension(&args.path))
            .unwrap_or(LoaderHint::Js);
        Ok(match hint {
            // deno_graph only accepts JSON behind an import attribute, so serve it as a module.
            LoaderHint::Json => (
                transform_json_source(&loaded.contents),
                "application/javascript",
            ),
            LoaderHint::Js => (loaded.contents, "application/javascript"),
            LoaderHint::Jsx => (loaded.contents, "text/jsx"),
            LoaderHint::Ts => (loaded.contents, "application/typescript"),
            LoaderHint::Tsx => (loaded.contents, "text/tsx"),
        })
    }
}

impl Loader for HookLoader<'_> {
    fn load(&self, specifier: &ModuleSpecifier, _options: LoadOptions) -> LoadFuture {
        let specifier = specifier.clone();
        if is_external(&specifier) {
            return Box::pin(async move { Ok(Some(LoadResponse::External { specifier })) });
        }
        let result = self.load_module(&specifier);

        Box::pin(async move {
            match result {
                Ok((content, content_type)) => {
                    let mut headers = HashMap::new();
                    headers.insert("content-type".to_string(), content_type.to_string());

                    Ok(Some(LoadResponse::Module {
                        specifier,
                        maybe_headers: Some(headers),
                        content: Arc::from(content.into_bytes()),
                        mtime: None,
                    }))
                }
                Err(e) => Err(LoadError::Other(Arc::new(e))),
            }
        })
    }
}
