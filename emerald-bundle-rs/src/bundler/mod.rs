//! Bundling engine.
//!
//! [`BundleEngine`] is the seam between the build orchestrator and whatever turns an
//! entry point into an output file. [`GraphBundleEngine`] is the bundled implementation:
//!
//! 1. Entry points and import edges are resolved through the registered resolve hooks
//! 2. deno_graph discovers the module graph, loading every module through the load hooks
//! 3. Each module is transpiled (TypeScript/JSX stripped) and the graph is flattened by
//!    the swc bundler into one script per entry point. Imports named in
//!    [`BuildOptions::external`] are left in place and never loaded
//!
//! # Architecture
//!
//! - `engine`: Options, results and the [`BundleEngine`] trait
//! - `hooks`: Implements `deno_graph::source::{Resolver, Loader}` on top of [`PluginBuild`]
//! - `graph_engine`: Graph building and output writing
//! - `emit`: Core bundling logic using the swc bundler
//! - `bundle_hook`: Handles `import.meta` rewriting during bundling
//! - `text`: Utility functions for text processing
//!
//! [`PluginBuild`]: crate::plugin::PluginBuild

mod bundle_hook;
mod emit;
mod engine;
mod graph_engine;
mod hooks;
mod text;

pub use engine::{
    BuildOptions, BuildResult, BundleEngine, BundleFormat, Message, OutputFile, SourceMapMode,
    DEFAULT_EXTERNALS, DEFAULT_GLOBAL_NAME,
};
pub use graph_engine::GraphBundleEngine;
