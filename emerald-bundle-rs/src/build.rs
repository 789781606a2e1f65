//! The build orchestrator.

use crate::bundler::{
    BuildOptions, BuildResult, BundleEngine, BundleFormat, GraphBundleEngine, SourceMapMode,
    DEFAULT_EXTERNALS, DEFAULT_GLOBAL_NAME,
};
use crate::environment::{EnvPlugin, EnvironmentSnapshot};
use crate::error::{BundleError, Result};
use crate::esm::EsmPlugin;
use crate::import_map::{ImportMap, DEFAULT_REGISTRY_ORIGIN};
use crate::plugin::{Plugin, PluginBuild};
use crate::remote_loader::RemoteLoader;
use crate::resolver::RemoteResolver;
use crate::scaffold::{DefaultScaffold, Scaffold};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildConfig {
    pub app_dir: PathBuf,
    /// Entry file name inside `app_dir`
    pub entry: String,
    pub import_map: PathBuf,
    pub deno_config: PathBuf,
    pub outdir: PathBuf,
    /// Origin prefixed to bare remote paths
    pub registry: String,
    pub minify: bool,
    pub sourcemap: SourceMapMode,
    pub format: BundleFormat,
    /// Global variable an IIFE bundle is assigned to
    pub global_name: Option<String>,
    /// Imports left unbundled for the page to provide
    pub external: Vec<String>,
    /// When set, only these environment variables are exposed through `env`
    pub allow_env: Option<Vec<String>>,
    pub scaffold: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            app_dir: PathBuf::from("app"),
            entry: "main.tsx".to_string(),
            import_map: PathBuf::from("importmap.json"),
            deno_config: PathBuf::from("deno.json"),
            outdir: PathBuf::from("dist"),
            registry: DEFAULT_REGISTRY_ORIGIN.to_string(),
            minify: true,
            sourcemap: SourceMapMode::None,
            format: BundleFormat::Iife,
            global_name: Some(DEFAULT_GLOBAL_NAME.to_string()),
            external: DEFAULT_EXTERNALS.iter().map(|name| name.to_string()).collect(),
            allow_env: None,
            scaffold: true,
        }
    }
}

impl BuildConfig {
    pub fn entry_path(&self) -> PathBuf {
        self.app_dir.join(&self.entry)
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            entry_points: vec![self.entry_path()],
            outdir: self.outdir.clone(),
            format: self.format,
            global_name: self.global_name.clone(),
            external: self.external.clone(),
            sourcemap: self.sourcemap,
            minify_whitespace: self.minify,
            minify_identifiers: self.minify,
            minify_syntax: self.minify,
            write: true,
            allow_overwrite: true,
        }
    }
}

/// Runs one build: scaffolding, plugin registration and a single engine invocation.
pub struct Builder {
    config: BuildConfig,
    engine: Box<dyn BundleEngine>,
    scaffold: Box<dyn Scaffold>,
    environment: Option<EnvironmentSnapshot>,
}

impl Builder {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            engine: Box::new(GraphBundleEngine::new()),
            scaffold: Box::new(DefaultScaffold),
            environment: None,
        }
    }

    pub fn with_engine(mut self, engine: impl BundleEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn with_scaffold(mut self, scaffold: impl Scaffold + 'static) -> Self {
        self.scaffold = Box::new(scaffold);
        self
    }

    /// Uses `snapshot` instead of reading the process environment at build time.
    pub fn with_environment(mut self, snapshot: EnvironmentSnapshot) -> Self {
        self.environment = Some(snapshot);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn build(&self) -> Result<BuildResult> {
        let config = &self.config;
        if config.scaffold {
            self.scaffold.ensure_app(&config.app_dir, &config.entry)?;
            self.scaffold.ensure_import_map(&config.import_map)?;
            self.scaffold
                .ensure_deno_config(&config.deno_config, &config.import_map)?;
        }

        let mut snapshot = self
            .environment
            .clone()
            .unwrap_or_else(EnvironmentSnapshot::capture);
        if let Some(allow_env) = &config.allow_env {
            snapshot.retain_only(allow_env);
        }

        let import_map = ImportMap::load(&config.import_map)?;
        info!(
            "Loaded {} import map entries from {}",
            import_map.len(),
            config.import_map.display()
        );

        let plugins: Vec<Box<dyn Plugin>> = vec![
            Box::new(EnvPlugin::new(snapshot)),
            Box::new(EsmPlugin::new(
                RemoteResolver::new(Arc::new(import_map)),
                RemoteLoader::new(config.registry.as_str())?,
            )),
        ];
        let plugins = PluginBuild::from_plugins(&plugins)?;

        info!("Bundling {}...", config.entry_path().display());
        let result = self.engine.build(&config.build_options(), &plugins);
        for warning in &result.warnings {
            warn!("{warning}");
        }
        for err in &result.errors {
            error!("{err}");
        }
        if let Some(first) = result.errors.first() {
            return Err(BundleError::Engine(first.text.clone()));
        }

        info!("done");
        Ok(result)
    }
}

/// Builds with the default engine and scaffold.
pub fn build_app(config: BuildConfig) -> Result<BuildResult> {
    Builder::new(config).build()
}
