use crate::error::Result;
use crate::plugin::{HookFilter, Namespace, Plugin, PluginBuild};
use crate::remote_loader::RemoteLoader;
use crate::resolver::RemoteResolver;

/// Resolves every import through the import map and loads the remote namespace over HTTP.
#[derive(Debug, Clone)]
pub struct EsmPlugin {
    resolver: RemoteResolver,
    loader: RemoteLoader,
}

impl EsmPlugin {
    pub fn new(resolver: RemoteResolver, loader: RemoteLoader) -> Self {
        Self { resolver, loader }
    }
}

impl Plugin for EsmPlugin {
    fn name(&self) -> &str {
        "esm"
    }

    fn setup(&self, build: &mut PluginBuild) -> Result<()> {
        let resolver = self.resolver.clone();
        build.on_resolve(HookFilter::new(".*")?, move |args| {
            Ok(Some(resolver.resolve(args)))
        });

        let loader = self.loader.clone();
        build.on_load(
            HookFilter::new(".*")?.in_namespace(Namespace::Remote),
            move |args| loader.load(args).map(Some),
        );
        Ok(())
    }
}
