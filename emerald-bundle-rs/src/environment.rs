//! The `env` virtual module.
//!
//! Importing `env` from application code yields a JSON object with the process
//! environment as captured when the build started. Every captured variable ends up
//! in the client bundle, so callers that handle secrets should narrow the snapshot
//! with [`EnvironmentSnapshot::retain_only`].

use crate::error::Result;
use crate::plugin::{
    HookFilter, LoadResult, LoaderHint, Namespace, Plugin, PluginBuild, ResolveResult,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The reserved specifier for the environment module.
pub const ENV_SPECIFIER: &str = "env";

/// Environment variables captured once per build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvironmentSnapshot {
    /// Reads the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode cannot be represented in
    /// JSON and are skipped.
    pub fn capture() -> Self {
        let mut vars = BTreeMap::new();
        for (name, value) in std::env::vars_os() {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    vars.insert(name, value);
                }
                (name, _) => debug!("Skipping non-unicode environment variable {:?}", name),
            }
        }
        Self { vars }
    }

    /// Drops every variable not named in `allow_list`.
    pub fn retain_only<S: AsRef<str>>(&mut self, allow_list: &[S]) {
        self.vars
            .retain(|name, _| allow_list.iter().any(|allowed| allowed.as_ref() == name));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.vars)?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Serves [`ENV_SPECIFIER`] from an [`EnvironmentSnapshot`].
#[derive(Debug, Clone)]
pub struct EnvPlugin {
    snapshot: Arc<EnvironmentSnapshot>,
}

impl EnvPlugin {
    pub fn new(snapshot: EnvironmentSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }

    /// The module served for every load in the virtual namespace.
    pub fn module(&self) -> Result<LoadResult> {
        Ok(LoadResult {
            contents: self.snapshot.to_json()?,
            loader: Some(LoaderHint::Json),
        })
    }
}

impl Plugin for EnvPlugin {
    fn name(&self) -> &str {
        "env"
    }

    fn setup(&self, build: &mut PluginBuild) -> Result<()> {
        // Claim the reserved specifier before anything tries the filesystem.
        build.on_resolve(HookFilter::new(&format!("^{ENV_SPECIFIER}$"))?, |args| {
            Ok(Some(ResolveResult {
                path: args.path.clone(),
                namespace: Namespace::VirtualEnv,
            }))
        });

        let plugin = self.clone();
        build.on_load(
            HookFilter::new(".*")?.in_namespace(Namespace::VirtualEnv),
            move |_| plugin.module().map(Some),
        );
        Ok(())
    }
}
