//! Plugin hooks consumed by the bundling engine.
//!
//! Plugins register resolve and load callbacks on a [`PluginBuild`]. Each callback is
//! guarded by a [`HookFilter`]: a regular expression over the request path plus an
//! optional namespace. During a build the engine asks the `PluginBuild` to resolve
//! every import and load every resolved module; callbacks run in registration order
//! and the first one returning `Some` wins.

use crate::error::Result;
use log::debug;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Partition of the module resolution space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Modules read from the local filesystem
    File,
    /// The synthesized environment module
    VirtualEnv,
    /// Modules fetched over HTTP
    Remote,
    /// Requests whose namespace is not known to this crate
    Unset,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::File => "file",
            Namespace::VirtualEnv => "env-ns",
            Namespace::Remote => "esm-ns",
            Namespace::Unset => "unset",
        }
    }

    /// Parses a namespace wire name. The empty name is the unset namespace.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "file" => Some(Namespace::File),
            "env-ns" => Some(Namespace::VirtualEnv),
            "esm-ns" => Some(Namespace::Remote),
            "unset" | "" => Some(Namespace::Unset),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a path is being resolved. Static and dynamic imports are both `ImportStatement`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    EntryPoint,
    ImportStatement,
}

/// An import edge the engine needs resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveArgs {
    /// The specifier as written in the import statement
    pub path: String,
    /// Path of the importing module, empty for entry points
    pub importer: String,
    /// Namespace of the importing module
    pub namespace: Namespace,
    pub kind: ResolveKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    pub path: String,
    pub namespace: Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadArgs {
    pub path: String,
    pub namespace: Namespace,
}

/// Tells the engine how to interpret loaded contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderHint {
    Js,
    Jsx,
    Ts,
    Tsx,
    Json,
}

impl LoaderHint {
    /// Infers a hint from the extension of a path or URL, ignoring any query or fragment.
    pub fn from_extension(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(LoaderHint::Js),
            "jsx" => Some(LoaderHint::Jsx),
            "ts" | "mts" | "cts" => Some(LoaderHint::Ts),
            "tsx" => Some(LoaderHint::Tsx),
            "json" => Some(LoaderHint::Json),
            _ => None,
        }
    }

    /// Infers a hint from an HTTP `Content-Type` header value.
    ///
    /// Plain JavaScript content types return `None` so the engine keeps inferring
    /// from the module path.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "application/typescript" | "text/typescript" | "video/mp2t" => Some(LoaderHint::Ts),
            "text/tsx" => Some(LoaderHint::Tsx),
            "text/jsx" => Some(LoaderHint::Jsx),
            "application/json" | "text/json" => Some(LoaderHint::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub contents: String,
    pub loader: Option<LoaderHint>,
}

/// Selects which requests a callback sees.
#[derive(Debug, Clone)]
pub struct HookFilter {
    filter: Regex,
    namespace: Option<Namespace>,
}

impl HookFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            filter: Regex::new(pattern)?,
            namespace: None,
        })
    }

    pub fn in_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn matches(&self, path: &str, namespace: Namespace) -> bool {
        self.namespace.map_or(true, |ns| ns == namespace) && self.filter.is_match(path)
    }
}

pub type ResolveCallback = dyn Fn(&ResolveArgs) -> Result<Option<ResolveResult>> + Send + Sync;
pub type LoadCallback = dyn Fn(&LoadArgs) -> Result<Option<LoadResult>> + Send + Sync;

struct Hook<C: ?Sized> {
    plugin: String,
    filter: HookFilter,
    callback: Arc<C>,
}

impl<C: ?Sized> Clone for Hook<C> {
    fn clone(&self) -> Self {
        Self {
            plugin: self.plugin.clone(),
            filter: self.filter.clone(),
            callback: self.callback.clone(),
        }
    }
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Registers this plugin's callbacks.
    fn setup(&self, build: &mut PluginBuild) -> Result<()>;
}

/// The set of registered hooks for one build.
#[derive(Clone, Default)]
pub struct PluginBuild {
    current_plugin: String,
    plugin_names: Vec<String>,
    resolve_hooks: Vec<Hook<ResolveCallback>>,
    load_hooks: Vec<Hook<LoadCallback>>,
}

impl PluginBuild {
    /// Runs `setup` for every plugin, in order.
    pub fn from_plugins(plugins: &[Box<dyn Plugin>]) -> Result<Self> {
        let mut build = Self::default();
        for plugin in plugins {
            build.current_plugin = plugin.name().to_string();
            build.plugin_names.push(plugin.name().to_string());
            plugin.setup(&mut build)?;
        }
        build.current_plugin.clear();
        Ok(build)
    }

    pub fn on_resolve<F>(&mut self, filter: HookFilter, callback: F)
    where
        F: Fn(&ResolveArgs) -> Result<Option<ResolveResult>> + Send + Sync + 'static,
    {
        self.resolve_hooks.push(Hook {
            plugin: self.current_plugin.clone(),
            filter,
            callback: Arc::new(callback),
        });
    }

    pub fn on_load<F>(&mut self, filter: HookFilter, callback: F)
    where
        F: Fn(&LoadArgs) -> Result<Option<LoadResult>> + Send + Sync + 'static,
    {
        self.load_hooks.push(Hook {
            plugin: self.current_plugin.clone(),
            filter,
            callback: Arc::new(callback),
        });
    }

    pub fn plugin_names(&self) -> &[String] {
        &self.plugin_names
    }

    /// Dispatches a resolve request. `Ok(None)` means no hook claimed it.
    pub fn resolve(&self, args: &ResolveArgs) -> Result<Option<ResolveResult>> {
        for hook in &self.resolve_hooks {
            if !hook.filter.matches(&args.path, args.namespace) {
                continue;
            }
            if let Some(result) = (hook.callback)(args)? {
                debug!(
                    "[{}] resolved {} ({}) to {} ({})",
                    hook.plugin, args.path, args.namespace, result.path, result.namespace
                );
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    /// Dispatches a load request. `Ok(None)` means no hook claimed it.
    pub fn load(&self, args: &LoadArgs) -> Result<Option<LoadResult>> {
        for hook in &self.load_hooks {
            if !hook.filter.matches(&args.path, args.namespace) {
                continue;
            }
            if let Some(result) = (hook.callback)(args)? {
                debug!("[{}] loaded {} ({})", hook.plugin, args.path, args.namespace);
                return Ok(Some(result));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for PluginBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginBuild")
            .field("plugins", &self.plugin_names)
            .field("resolve_hooks", &self.resolve_hooks.len())
            .field("load_hooks", &self.load_hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BundleError;

    struct Tagger {
        name: &'static str,
        filter: &'static str,
        namespace: Option<Namespace>,
        claim: bool,
    }

    impl Plugin for Tagger {
        fn name(&self) -> &str {
            self.name
        }

        fn setup(&self, build: &mut PluginBuild) -> Result<()> {
            let mut filter = HookFilter::new(self.filter)?;
            if let Some(ns) = self.namespace {
                filter = filter.in_namespace(ns);
            }
            let name = self.name;
            let claim = self.claim;
            build.on_resolve(filter.clone(), move |args| {
                Ok(claim.then(|| ResolveResult {
                    path: format!("{name}:{}", args.path),
                    namespace: Namespace::Unset,
                }))
            });
            build.on_load(filter, move |args| {
                Ok(claim.then(|| LoadResult {
                    contents: format!("{name}:{}", args.path),
                    loader: None,
                }))
            });
            Ok(())
        }
    }

    fn request(path: &str, namespace: Namespace) -> ResolveArgs {
        ResolveArgs {
            path: path.to_string(),
            importer: String::new(),
            namespace,
            kind: ResolveKind::ImportStatement,
        }
    }

    #[test]
    fn test_first_registered_match_wins() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(Tagger { name: "a", filter: "^x$", namespace: None, claim: true }),
            Box::new(Tagger { name: "b", filter: ".*", namespace: None, claim: true }),
        ];
        let build = PluginBuild::from_plugins(&plugins).unwrap();
        assert_eq!(build.plugin_names(), ["a", "b"]);

        let result = build.resolve(&request("x", Namespace::File)).unwrap().unwrap();
        assert_eq!(result.path, "a:x");
        let result = build.resolve(&request("y", Namespace::File)).unwrap().unwrap();
        assert_eq!(result.path, "b:y");
    }

    #[test]
    fn test_declining_hook_falls_through() {
        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(Tagger { name: "a", filter: ".*", namespace: None, claim: false }),
            Box::new(Tagger { name: "b", filter: ".*", namespace: None, claim: true }),
        ];
        let build = PluginBuild::from_plugins(&plugins).unwrap();
        let result = build.resolve(&request("y", Namespace::File)).unwrap().unwrap();
        assert_eq!(result.path, "b:y");
    }

    #[test]
    fn test_namespace_filter() {
        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(Tagger {
            name: "remote",
            filter: ".*",
            namespace: Some(Namespace::Remote),
            claim: true,
        })];
        let build = PluginBuild::from_plugins(&plugins).unwrap();
        let load = |namespace| {
            build.load(&LoadArgs {
                path: "mod.js".to_string(),
                namespace,
            })
        };
        assert!(load(Namespace::File).unwrap().is_none());
        assert_eq!(load(Namespace::Remote).unwrap().unwrap().contents, "remote:mod.js");
    }

    #[test]
    fn test_hook_error_stops_dispatch() {
        let mut build = PluginBuild::default();
        build.on_load(HookFilter::new(".*").unwrap(), |_| {
            Err(BundleError::Engine("boom".to_string()))
        });
        build.on_load(HookFilter::new(".*").unwrap(), |_| {
            Ok(Some(LoadResult {
                contents: String::new(),
                loader: None,
            }))
        });
        let err = build
            .load(&LoadArgs {
                path: "a".to_string(),
                namespace: Namespace::File,
            })
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_invalid_filter() {
        assert!(matches!(
            HookFilter::new("("),
            Err(BundleError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_loader_hint_from_extension() {
        assert_eq!(LoaderHint::from_extension("app/main.tsx"), Some(LoaderHint::Tsx));
        assert_eq!(
            LoaderHint::from_extension("https://esm.sh/react@18/index.mjs?target=es2022"),
            Some(LoaderHint::Js)
        );
        assert_eq!(LoaderHint::from_extension("data.JSON"), Some(LoaderHint::Json));
        assert_eq!(LoaderHint::from_extension("https://esm.sh/react"), None);
        assert_eq!(LoaderHint::from_extension("https://esm.sh/v1.2/react"), None);
    }

    #[test]
    fn test_loader_hint_from_content_type() {
        assert_eq!(
            LoaderHint::from_content_type("application/typescript; charset=utf-8"),
            Some(LoaderHint::Ts)
        );
        assert_eq!(LoaderHint::from_content_type("application/javascript"), None);
        assert_eq!(LoaderHint::from_content_type("application/json"), Some(LoaderHint::Json));
    }

    #[test]
    fn test_namespace_wire_names() {
        for ns in [
            Namespace::File,
            Namespace::VirtualEnv,
            Namespace::Remote,
            Namespace::Unset,
        ] {
            assert_eq!(Namespace::from_wire(ns.as_str()), Some(ns));
        }
        assert_eq!(Namespace::from_wire(""), Some(Namespace::Unset));
        assert_eq!(Namespace::from_wire("https"), None);
    }
}
