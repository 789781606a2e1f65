//! Import map loading.
//!
//! An import map is a JSON document of the shape `{"imports": {"<specifier>": "<target>"}}`.
//! Lookups are exact matches on the specifier; trailing-slash prefix entries are not expanded.

use crate::error::{BundleError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_REGISTRY_ORIGIN: &str = "https://esm.sh";

/// Packages written to a freshly scaffolded import map.
const DEFAULT_PACKAGES: &[&str] = &["alpinejs", "react", "react-dom", "moment"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportMap {
    #[serde(default)]
    pub imports: BTreeMap<String, String>,
}

impl ImportMap {
    /// Reads and parses the import map at `path`.
    ///
    /// Read failures are returned as-is; writing a default document is the
    /// caller's decision.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BundleError::ImportMapRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| BundleError::ImportMapParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn lookup(&self, specifier: &str) -> Option<&str> {
        self.imports.get(specifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// The import map written when a project has none.
    pub fn default_document() -> Self {
        let imports = DEFAULT_PACKAGES
            .iter()
            .map(|name| (name.to_string(), format!("{DEFAULT_REGISTRY_ORIGIN}/{name}")))
            .collect();
        Self { imports }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ImportMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            imports: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
