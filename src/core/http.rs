use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::core::error::{InstallerError, InstallerResult};

const APP_USER_AGENT: &str = concat!("ServerPackInstaller/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// Read-only access to remote resources (pack API, loader metadata, artifacts).
///
/// Everything that talks to the network goes through this seam so the
/// installation pipeline can run against an in-memory source in tests.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Fetch the full body of `url`. Non-success statuses are errors.
    async fn get_bytes(&self, url: &str) -> InstallerResult<Vec<u8>>;

    /// Whether `url` answers a HEAD request with 200.
    async fn exists(&self, url: &str) -> bool;
}

/// Fetch `url` as UTF-8 text.
pub async fn get_text(remote: &dyn Remote, url: &str) -> InstallerResult<String> {
    let bytes = remote.get_bytes(url).await?;
    String::from_utf8(bytes)
        .map_err(|e| InstallerError::Other(format!("Response from {} is not UTF-8: {}", url, e)))
}

/// Fetch and deserialize a JSON document.
pub async fn get_json<T: DeserializeOwned>(remote: &dyn Remote, url: &str) -> InstallerResult<T> {
    let bytes = remote.get_bytes(url).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// `Remote` backed by a shared `reqwest::Client`.
pub struct HttpRemote {
    client: Client,
}

impl HttpRemote {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_default_client() -> InstallerResult<Self> {
        Ok(Self::new(build_http_client()?))
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn get_bytes(&self, url: &str) -> InstallerResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallerError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("GET {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => response.status().as_u16() == 200,
            Err(_) => false,
        }
    }
}
