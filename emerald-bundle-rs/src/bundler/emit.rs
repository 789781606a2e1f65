//! Core bundling logic using SWC bundler.
//!
//! Modules are taken from an already built deno_graph, stripped of TypeScript and JSX
//! with deno_ast, and flattened by the SWC bundler into one script per root.

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use base64::Engine;
use deno_ast::swc::ast::EsVersion;
use deno_ast::swc::bundler::{Bundler, Config as BundlerConfig, Load, ModuleData, Resolve};
use deno_ast::swc::codegen::text_writer::JsWriter;
use deno_ast::swc::codegen::{Config as CodegenConfig, Emitter};
use deno_ast::swc::common::comments::SingleThreadedComments;
use deno_ast::swc::common::source_map::DefaultSourceMapGenConfig;
use deno_ast::swc::common::sync::Lrc;
use deno_ast::swc::common::{FileName, Globals, SourceMap, GLOBALS};
use deno_ast::swc::loader::resolve::Resolution;
use deno_ast::swc::parser::lexer::Lexer;
use deno_ast::swc::parser::{EsSyntax, Parser, StringInput, Syntax};
use deno_ast::{MediaType, TranspileOptions};
use deno_graph::{Module, ModuleGraph, ModuleSpecifier};

use super::bundle_hook::BundleHook;
use super::engine::{BundleFormat, SourceMapMode};
use super::text::strip_bom;

impl From<BundleFormat> for deno_ast::swc::bundler::ModuleType {
    fn from(format: BundleFormat) -> Self {
        match format {
            BundleFormat::Esm => deno_ast::swc::bundler::ModuleType::Es,
            BundleFormat::Iife => deno_ast::swc::bundler::ModuleType::Iife,
        }
    }
}

pub(crate) struct EmitSettings<'a> {
    pub format: BundleFormat,
    /// Only applied to [`BundleFormat::Iife`]
    pub global_name: Option<&'a str>,
    pub external: &'a [String],
    pub sourcemap: SourceMapMode,
    pub minify: bool,
}

#[derive(Debug)]
pub(crate) struct BundleEmit {
    pub code: String,
    /// Only set for [`SourceMapMode::External`]
    pub maybe_map: Option<String>,
}

/// Bundles the part of `graph` reachable from `root` into a single script.
pub(crate) fn bundle_graph(
    graph: &ModuleGraph,
    root: &ModuleSpecifier,
    settings: &EmitSettings<'_>,
) -> Result<BundleEmit> {
    let globals = Globals::new();

    GLOBALS.set(&globals, || {
        let source_map = Lrc::new(SourceMap::default());

        let bundle_loader = GraphBundleLoader {
            graph,
            source_map: source_map.clone(),
            transpile_options: TranspileOptions::default(),
        };
        let bundle_resolver = GraphBundleResolver { graph };

        // The bundler matches externals against import sources as written.
        let external_modules: Vec<_> = settings
            .external
            .iter()
            .cloned()
            .chain(graph.modules().filter_map(|m| match m {
                Module::External(_) | Module::Node(_) | Module::Npm(_) => {
                    Some(m.specifier().to_string())
                }
                _ => None,
            }))
            .map(Into::into)
            .collect();

        let config = BundlerConfig {
            module: settings.format.into(),
            external_modules,
            ..Default::default()
        };

        let mut bundler = Bundler::new(
            &globals,
            source_map.clone(),
            bundle_loader,
            bundle_resolver,
            config,
            Box::new(BundleHook),
        );

        let mut entries = HashMap::new();
        entries.insert("bundle".to_string(), FileName::Url(root.clone()));

        let bundles = bundler.bundle(entries)?;
        let Some(bundle) = bundles.first() else {
            bail!("Bundler produced no output for {}", root);
        };

        let mut buf = Vec::new();
        let mut mappings = Vec::new();
        {
            let cfg = CodegenConfig::default()
                .with_minify(settings.minify)
                .with_target(EsVersion::Es2020)
                .with_omit_last_semi(false);

            let wants_map = settings.sourcemap != SourceMapMode::None;
            let mut emitter = Emitter {
                cfg,
                cm: source_map.clone(),
                comments: None,
                wr: Box::new(JsWriter::new(
                    source_map.clone(),
                    "\n",
                    &mut buf,
                    wants_map.then_some(&mut mappings),
                )),
            };

            emitter
                .emit_module(&bundle.module)
                .context("Unable to emit bundle")?;
        }

        let mut code = String::from_utf8(buf).context("Emitted code is not valid UTF-8")?;
        if let (BundleFormat::Iife, Some(global_name)) = (settings.format, settings.global_name) {
            code = format!("var {global_name} =\n{code}");
            for (_, position) in mappings.iter_mut() {
                position.line += 1;
            }
        }

        let mut maybe_map = None;
        if settings.sourcemap != SourceMapMode::None {
            let mut map_buf = Vec::new();
            source_map
                .build_source_map(&mappings, None, DefaultSourceMapGenConfig)
                .to_writer(&mut map_buf)
                .context("Unable to write source map")?;
            match settings.sourcemap {
                SourceMapMode::Inline => {
                    code.push_str("\n//# sourceMappingURL=data:application/json;base64,");
                    base64::prelude::BASE64_STANDARD.encode_string(&map_buf, &mut code);
                }
                _ => maybe_map = Some(String::from_utf8(map_buf)?),
            }
        }

        Ok(BundleEmit { code, maybe_map })
    })
}

/// SWC bundler Load trait implementation that loads modules from the graph.
struct GraphBundleLoader<'a> {
    graph: &'a ModuleGraph,
    source_map: Lrc<SourceMap>,
    transpile_options: TranspileOptions,
}

impl Load for GraphBundleLoader<'_> {
    fn load(&self, file: &FileName) -> Result<ModuleData> {
        let specifier = match file {
            FileName::Url(url) => url,
            _ => bail!("Unsupported file name: {:?}", file),
        };

        let module = self
            .graph
            .get(specifier)
            .ok_or_else(|| anyhow!("Module not found in graph: {}", specifier))?;

        let (source, media_type) = match module {
            Module::Js(m) => (m.source.text.as_ref(), m.media_type),
            Module::Json(_) => bail!(
                "JSON module {} must be served as JavaScript to be bundled",
                specifier
            ),
            Module::Wasm(_) => bail!("WebAssembly modules are not supported for bundling"),
            Module::Npm(_) => bail!("NPM modules are not supported for bundling"),
            Module::Node(_) => bail!("Node built-in modules are not supported for bundling"),
            Module::External(_) => bail!("External modules are not supported for bundling"),
        };

        let (source_file, swc_module) = transpile_module(
            specifier,
            source,
            media_type,
            &self.transpile_options,
            &self.source_map,
        )?;

        Ok(ModuleData {
            fm: source_file,
            module: swc_module,
            helpers: Default::default(),
        })
    }
}

/// SWC bundler Resolve trait implementation that resolves specifiers using the graph.
struct GraphBundleResolver<'a> {
    graph: &'a ModuleGraph,
}

impl Resolve for GraphBundleResolver<'_> {
    fn resolve(&self, base: &FileName, module_specifier: &str) -> Result<Resolution> {
        let base_specifier = match base {
            FileName::Url(url) => url,
            _ => bail!("Unsupported base file name: {:?}", base),
        };

        let resolved = self
            .graph
            .resolve_dependency(module_specifier, base_specifier, false)
            .ok_or_else(|| {
                anyhow!(
                    "Failed to resolve '{}' from '{}'",
                    module_specifier,
                    base_specifier
                )
            })?;

        Ok(Resolution {
            filename: FileName::Url(resolved.clone()),
            slug: None,
        })
    }
}

fn needs_transpile(media_type: MediaType) -> bool {
    matches!(
        media_type,
        MediaType::TypeScript
            | MediaType::Mts
            | MediaType::Cts
            | MediaType::Dts
            | MediaType::Dmts
            | MediaType::Dcts
            | MediaType::Jsx
            | MediaType::Tsx
    )
}

/// Strips TypeScript and JSX with deno_ast, then parses the plain JavaScript into SWC AST.
fn transpile_module(
    specifier: &ModuleSpecifier,
    source: &str,
    media_type: MediaType,
    transpile_options: &TranspileOptions,
    source_map: &Lrc<SourceMap>,
) -> Result<(Rc<deno_ast::swc::common::SourceFile>, deno_ast::swc::ast::Module)> {
    let source = strip_bom(source);

    let code = if needs_transpile(media_type) {
        let parsed = deno_ast::parse_module(deno_ast::ParseParams {
            specifier: specifier.clone(),
            text: source.into(),
            media_type,
            capture_tokens: false,
            scope_analysis: false,
            maybe_syntax: None,
        })?;
        parsed
            .transpile(
                transpile_options,
                &deno_ast::TranspileModuleOptions::default(),
                &deno_ast::EmitOptions {
                    source_map: deno_ast::SourceMapOption::None,
                    ..Default::default()
                },
            )
            .with_context(|| format!("Failed to transpile {}", specifier))?
            .into_source()
            .text
    } else {
        source.to_string()
    };

    let source_file = source_map.new_source_file(FileName::Url(specifier.clone()).into(), code);

    let comments = SingleThreadedComments::default();
    let input = StringInput::from(&*source_file);
    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::Es2020,
        input,
        Some(&comments),
    );
    let mut parser = Parser::new_from(lexer);

    let module = parser
        .parse_module()
        .map_err(|e| anyhow!("Parse error in {}: {:?}", specifier, e))?;

    Ok((Rc::new((*source_file).clone()), module))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpile_strips_types() {
        let specifier = ModuleSpecifier::parse("file:///app/main.ts").unwrap();
        let source_map = Lrc::new(SourceMap::default());
        let globals = Globals::new();
        GLOBALS.set(&globals, || {
            let (source_file, module) = transpile_module(
                &specifier,
                "\u{feff}const answer: number = 42;\nexport default answer;\n",
                MediaType::TypeScript,
                &TranspileOptions::default(),
                &source_map,
            )
            .unwrap();
            assert!(!source_file.src.contains(": number"));
            assert!(!source_file.src.starts_with('\u{feff}'));
            assert_eq!(module.body.len(), 2);
        });
    }

    #[test]
    fn test_plain_javascript_is_not_transpiled() {
        assert!(!needs_transpile(MediaType::JavaScript));
        assert!(!needs_transpile(MediaType::Mjs));
        assert!(needs_transpile(MediaType::Tsx));
    }
}
