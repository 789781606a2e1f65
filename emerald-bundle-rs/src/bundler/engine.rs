//! The contract between the build orchestrator and a bundling engine.

use crate::plugin::PluginBuild;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Global variable an IIFE bundle is assigned to unless configured otherwise.
pub const DEFAULT_GLOBAL_NAME: &str = "Emerald";

/// Imports left for the page to provide unless configured otherwise.
pub const DEFAULT_EXTERNALS: &[&str] = &["Alpine"];

/// Output module format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    /// A single flattened ES module
    Esm,
    /// A classic script wrapped in an immediately invoked function
    #[default]
    Iife,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMapMode {
    #[default]
    None,
    /// Appended to the bundle as a base64 data URL
    Inline,
    /// Written next to the bundle as `<name>.js.map`
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub entry_points: Vec<PathBuf>,
    pub outdir: PathBuf,
    pub format: BundleFormat,
    /// `var` the IIFE result is assigned to. Ignored for [`BundleFormat::Esm`].
    pub global_name: Option<String>,
    /// Import specifiers that are neither resolved nor loaded and stay as imports
    pub external: Vec<String>,
    pub sourcemap: SourceMapMode,
    pub minify_whitespace: bool,
    pub minify_identifiers: bool,
    pub minify_syntax: bool,
    /// Write output files to `outdir`. When false they are only returned.
    pub write: bool,
    pub allow_overwrite: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            entry_points: Vec::new(),
            outdir: PathBuf::from("dist"),
            format: BundleFormat::default(),
            global_name: Some(DEFAULT_GLOBAL_NAME.to_string()),
            external: DEFAULT_EXTERNALS.iter().map(|name| name.to_string()).collect(),
            sourcemap: SourceMapMode::default(),
            minify_whitespace: true,
            minify_identifiers: true,
            minify_syntax: true,
            write: true,
            allow_overwrite: false,
        }
    }
}

/// A diagnostic reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub errors: Vec<Message>,
    pub warnings: Vec<Message>,
    pub output_files: Vec<OutputFile>,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A bundler that discovers modules through plugin hooks.
///
/// The engine owns graph traversal, transformation and output. It must call
/// [`PluginBuild::resolve`] for every entry point and import edge it discovers and
/// [`PluginBuild::load`] for every resolved module, and report failures as error
/// messages rather than panicking. Hooks may be invoked from several threads.
pub trait BundleEngine {
    fn build(&self, options: &BuildOptions, plugins: &PluginBuild) -> BuildResult;
}
