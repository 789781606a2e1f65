//! HTTP loading of remote ES modules.

use crate::error::{BundleError, Result};
use crate::paths::{clean_posix, is_http_url};
use crate::plugin::{LoadArgs, LoadResult, LoaderHint};
use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task;

static EMERALD_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

lazy_static! {
    static ref FETCH_TOKIO_RUNTIME: tokio::runtime::Runtime =
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to construct tokio runtime");
}

/// Fetches modules in the remote namespace.
///
/// Paths that are not already `http(s)://` URLs are taken to live under the registry
/// origin. Each load is a single blocking GET with the body buffered in memory; there
/// are no retries.
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    client: Client,
    registry_origin: String,
}

impl RemoteLoader {
    pub fn new(registry_origin: impl Into<String>) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(EMERALD_USER_AGENT)
            .build()
            .map_err(BundleError::HttpClient)?;
        Ok(Self {
            client,
            registry_origin: registry_origin.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn registry_origin(&self) -> &str {
        &self.registry_origin
    }

    /// The URL fetched for a resolved remote path.
    pub fn fetch_url(&self, path: &str) -> String {
        if is_http_url(path) {
            path.to_string()
        } else {
            format!("{}{}", self.registry_origin, clean_posix(&format!("/{path}")))
        }
    }

    pub fn load(&self, args: &LoadArgs) -> Result<LoadResult> {
        let url = self.fetch_url(&args.path);
        info!("Fetching {url}");

        let client = &self.client;
        let fetch = || FETCH_TOKIO_RUNTIME.block_on(fetch_module(client, &url));
        // block_in_place panics on a current-thread runtime.
        let (contents, content_type) = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                task::block_in_place(fetch)
            }
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(fetch)
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            }),
            Err(_) => fetch(),
        }?;
        debug!(
            "Fetched {} bytes from {} ({})",
            contents.len(),
            url,
            content_type.as_deref().unwrap_or("no content type")
        );

        Ok(LoadResult {
            contents,
            loader: content_type
                .as_deref()
                .and_then(LoaderHint::from_content_type),
        })
    }
}

async fn fetch_module(client: &Client, url: &str) -> Result<(String, Option<String>)> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| BundleError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(BundleError::FetchStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok().map(|c| c.to_string()));
    let contents = response
        .text()
        .await
        .map_err(|source| BundleError::Fetch {
            url: url.to_string(),
            source,
        })?;
    Ok((contents, content_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://esm.sh/react", "https://esm.sh/react")]
    #[case("http://127.0.0.1:8080/mod.js", "http://127.0.0.1:8080/mod.js")]
    #[case("react", "https://esm.sh/react")]
    #[case("/v135/react@18.2.0/es2022/react.mjs", "https://esm.sh/v135/react@18.2.0/es2022/react.mjs")]
    #[case("./vendor/../lib/x.js", "https://esm.sh/lib/x.js")]
    fn test_fetch_url(#[case] path: &str, #[case] expected: &str) {
        let loader = RemoteLoader::new("https://esm.sh/").unwrap();
        assert_eq!(loader.fetch_url(path), expected);
    }

    #[test]
    fn test_registry_origin_trailing_slash() {
        let loader = RemoteLoader::new("https://registry.example.com//").unwrap();
        assert_eq!(loader.registry_origin(), "https://registry.example.com");
    }
}
