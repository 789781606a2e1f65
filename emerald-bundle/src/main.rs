use clap::{Parser, ValueEnum};
use emerald_bundle_rs::bundler::{BundleFormat, SourceMapMode, DEFAULT_GLOBAL_NAME};
use emerald_bundle_rs::{BuildConfig, Builder};
use std::path::PathBuf;
use std::process::ExitCode;

/// emerald-bundle: Bundle a single-page application with an import map and remote ES modules
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the application entry file
    #[clap(long, default_value = "app")]
    pub app_dir: PathBuf,

    /// Entry file name inside the app directory
    #[clap(long, default_value = "main.tsx")]
    pub entry: String,

    /// Path to the import map
    #[clap(long, default_value = "importmap.json")]
    pub import_map: PathBuf,

    /// Path to the deno config, linked to the import map when missing
    #[clap(long, default_value = "deno.json")]
    pub deno_config: PathBuf,

    /// Output directory
    #[clap(short, long, default_value = "dist")]
    pub outdir: PathBuf,

    /// Origin used for remote paths that are not full URLs
    #[clap(long, default_value = "https://esm.sh")]
    pub registry: String,

    /// Keep whitespace in the output bundle. Minification only removes whitespace;
    /// identifiers are not renamed and syntax is not compressed.
    #[clap(long)]
    pub no_minify: bool,

    /// Source map output
    #[clap(long, value_enum, default_value_t = SourceMapArg::None)]
    pub sourcemap: SourceMapArg,

    /// Output module format
    #[clap(long, value_enum, default_value_t = FormatArg::Iife)]
    pub format: FormatArg,

    /// Global variable the iife bundle is assigned to
    #[clap(long, value_name = "NAME", default_value = DEFAULT_GLOBAL_NAME)]
    pub global_name: String,

    /// Leave this import unbundled for the page to provide. May be repeated.
    #[clap(long, value_name = "NAME", default_value = "Alpine")]
    pub external: Vec<String>,

    /// Only expose these environment variables through the `env` module. May be repeated.
    #[clap(long = "allow-env", value_name = "NAME")]
    pub allow_env: Vec<String>,

    /// Do not create missing app, import map or deno config files
    #[clap(long)]
    pub no_scaffold: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceMapArg {
    None,
    Inline,
    External,
}

impl From<SourceMapArg> for SourceMapMode {
    fn from(arg: SourceMapArg) -> Self {
        match arg {
            SourceMapArg::None => SourceMapMode::None,
            SourceMapArg::Inline => SourceMapMode::Inline,
            SourceMapArg::External => SourceMapMode::External,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Esm,
    Iife,
}

impl From<FormatArg> for BundleFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Esm => BundleFormat::Esm,
            FormatArg::Iife => BundleFormat::Iife,
        }
    }
}

impl From<Args> for BuildConfig {
    fn from(args: Args) -> Self {
        BuildConfig {
            app_dir: args.app_dir,
            entry: args.entry,
            import_map: args.import_map,
            deno_config: args.deno_config,
            outdir: args.outdir,
            registry: args.registry,
            minify: !args.no_minify,
            sourcemap: args.sourcemap.into(),
            format: args.format.into(),
            global_name: Some(args.global_name),
            external: args.external,
            allow_env: (!args.allow_env.is_empty()).then_some(args.allow_env),
            scaffold: !args.no_scaffold,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Args = Args::parse();

    match Builder::new(args.into()).build() {
        Ok(result) => {
            for file in &result.output_files {
                println!("Wrote {}", file.path.display());
            }
            println!("Build complete");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Build failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
