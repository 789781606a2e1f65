use std::path::PathBuf;

/// Result type for emerald bundling operations.
pub type Result<T> = std::result::Result<T, BundleError>;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to read import map {}: {source}", path.display())]
    ImportMapRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse import map {}: {source}", path.display())]
    ImportMapParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize environment module: {0}")]
    Environment(#[from] serde_json::Error),

    #[error("Failed to fetch remote module {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Failed to construct HTTP client: {0}")]
    HttpClient(reqwest::Error),

    #[error("Remote module {url} responded with status {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("Failed to prepare {}: {source}", path.display())]
    Scaffold {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid hook filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error("Bundler error: {0}")]
    Engine(String),
}
