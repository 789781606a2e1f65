use super::emit::{bundle_graph, EmitSettings};
use super::engine::{BuildOptions, BuildResult, BundleEngine, Message, OutputFile, SourceMapMode};
use super::hooks::{resolve_entry_point, HookLoader, HookResolver};
use super::text::is_js_identifier;
use crate::plugin::PluginBuild;
use deno_graph::{GraphKind, ModuleGraph, ModuleSpecifier};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// [`BundleEngine`] backed by deno_graph for module discovery and swc for bundling.
///
/// Minification is whitespace only. `minify_identifiers` and `minify_syntax` are
/// accepted but have no effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBundleEngine;

impl GraphBundleEngine {
    pub fn new() -> Self {
        Self
    }

    fn build_graph(
        &self,
        roots: Vec<ModuleSpecifier>,
        plugins: &PluginBuild,
        external: &[String],
        errors: &mut Vec<Message>,
    ) -> ModuleGraph {
        let resolver = HookResolver::new(plugins, external);
        let loader = HookLoader::new(plugins);
        let mut graph = ModuleGraph::new(GraphKind::CodeOnly);
        futures::executor::block_on(graph.build(
            roots,
            vec![],
            &loader,
            deno_graph::BuildOptions {
                resolver: Some(&resolver),
                ..Default::default()
            },
        ));
        errors.extend(resolver.take_errors());
        if let Err(err) = graph.valid() {
            errors.push(Message::new(err.to_string()));
        }
        graph
    }

    fn emit_entry(
        &self,
        graph: &ModuleGraph,
        entry: &Path,
        root: &ModuleSpecifier,
        options: &BuildOptions,
    ) -> Result<Vec<OutputFile>, Message> {
        let settings = EmitSettings {
            format: options.format,
            global_name: options.global_name.as_deref(),
            external: &options.external,
            sourcemap: options.sourcemap,
            minify: options.minify_whitespace,
        };
        let emit = bundle_graph(graph, root, &settings).map_err(|err| {
            Message::new(format!("Failed to bundle {}: {:#}", entry.display(), err))
        })?;

        let bundle_path = output_path(&options.outdir, entry);
        let mut code = emit.code;
        let mut outputs = Vec::new();
        if let Some(map) = emit.maybe_map {
            let map_path = bundle_path.with_extension("js.map");
            if let Some(map_name) = map_path.file_name() {
                code.push_str(&format!(
                    "\n//# sourceMappingURL={}",
                    map_name.to_string_lossy()
                ));
            }
            outputs.push(OutputFile {
                path: map_path,
                contents: map,
            });
        }
        outputs.insert(
            0,
            OutputFile {
                path: bundle_path,
                contents: code,
            },
        );
        Ok(outputs)
    }
}

impl BundleEngine for GraphBundleEngine {
    fn build(&self, options: &BuildOptions, plugins: &PluginBuild) -> BuildResult {
        let mut result = BuildResult::default();
        if options.entry_points.is_empty() {
            result.errors.push(Message::new("No entry points were given"));
            return result;
        }
        if options.minify_identifiers || options.minify_syntax {
            debug!("Identifier and syntax minification are not supported and will be skipped");
        }
        if let Some(global_name) = &options.global_name {
            if !is_js_identifier(global_name) {
                result.errors.push(Message::new(format!(
                    "Global name {global_name:?} is not a valid JavaScript identifier"
                )));
                return result;
            }
        }
        if options.sourcemap == SourceMapMode::External && !options.write {
            result.warnings.push(Message::new(
                "External source maps are returned but not referenced on disk",
            ));
        }

        let mut roots = Vec::new();
        for entry in &options.entry_points {
            match resolve_entry_point(plugins, entry) {
                Ok(root) => roots.push((entry.clone(), root)),
                Err(message) => result.errors.push(message),
            }
        }
        if !result.errors.is_empty() {
            return result;
        }

        let graph = self.build_graph(
            roots.iter().map(|(_, root)| root.clone()).collect(),
            plugins,
            &options.external,
            &mut result.errors,
        );
        if !result.errors.is_empty() {
            return result;
        }
        debug!("Module graph contains {} modules", graph.modules().count());

        for (entry, root) in &roots {
            match self.emit_entry(&graph, entry, root, options) {
                Ok(outputs) => result.output_files.extend(outputs),
                Err(message) => result.errors.push(message),
            }
        }

        if result.errors.is_empty() && options.write {
            if let Err(message) = write_outputs(&result.output_files, options.allow_overwrite) {
                result.errors.push(message);
            }
        }
        result
    }
}

fn output_path(outdir: &Path, entry: &Path) -> PathBuf {
    let stem = entry
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());
    outdir.join(format!("{stem}.js"))
}

fn write_outputs(outputs: &[OutputFile], allow_overwrite: bool) -> Result<(), Message> {
    for output in outputs {
        if !allow_overwrite && output.path.exists() {
            return Err(Message::new(format!(
                "Refusing to overwrite existing file {}",
                output.path.display()
            )));
        }
        if let Some(parent) = output.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Message::new(format!("Failed to create {}: {}", parent.display(), err))
            })?;
        }
        std::fs::write(&output.path, &output.contents).map_err(|err| {
            Message::new(format!("Failed to write {}: {}", output.path.display(), err))
        })?;
        info!("Wrote {}", output.path.display());
    }
    Ok(())
}
