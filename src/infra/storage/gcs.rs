//! Google Cloud Storage adapter over the JSON API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::storage::{ObjectStore, StorageError, validate_key};

pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://metadata.google.internal";

const METADATA_TOKEN_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/token";
/// Refresh cached tokens this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsOptions {
    pub bucket: String,
    pub endpoint: Url,
    /// Static bearer token; when absent the instance metadata server is asked.
    pub token: Option<String>,
    pub metadata_endpoint: Url,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug)]
enum TokenSource {
    Static(String),
    Metadata {
        endpoint: Url,
        cached: Mutex<Option<CachedToken>>,
    },
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

/// Objects stored in a single bucket; keys map one to one onto object names.
#[derive(Debug)]
pub struct GcsStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    token: TokenSource,
}

impl GcsStore {
    pub fn new(options: GcsOptions) -> Result<Self, StorageError> {
        let client = Client::builder()
            .user_agent(concat!("gazette/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| StorageError::remote(err.to_string()))?;

        let token = match options.token {
            Some(token) => TokenSource::Static(token),
            None => TokenSource::Metadata {
                endpoint: options.metadata_endpoint,
                cached: Mutex::new(None),
            },
        };

        Ok(Self {
            client,
            endpoint: options.endpoint,
            bucket: options.bucket,
            token,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::remote(format!("endpoint `{}` cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StorageError> {
        let token = self.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn access_token(&self) -> Result<String, StorageError> {
        let (endpoint, cached) = match &self.token {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata { endpoint, cached } => (endpoint, cached),
        };

        let mut cached = cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let url = endpoint
            .join(METADATA_TOKEN_PATH)
            .map_err(|err| StorageError::remote(format!("invalid metadata endpoint: {err}")))?;
        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(remote)?;
        let response = ensure_success("metadata token", response).await?;
        let token: MetadataToken = response.json().await.map_err(remote)?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!(
            target = "gazette::storage::gcs",
            expires_in = token.expires_in,
            "fetched access token from metadata server"
        );
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn backend(&self) -> &'static str {
        "gcs"
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let mut url = self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);

        let request = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(data);
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .map_err(remote)?;
        ensure_success(key, response).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        validate_key(key)?;
        let mut url = self.url(&["storage", "v1", "b", &self.bucket, "o", key])?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self
            .authorize(self.client.get(url))
            .await?
            .send()
            .await
            .map_err(remote)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                key: key.to_string(),
            });
        }
        let response = ensure_success(key, response).await?;
        response.bytes().await.map_err(remote)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(&["storage", "v1", "b", &self.bucket, "o"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(token) = page_token.as_deref() {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self
                .authorize(self.client.get(url))
                .await?
                .send()
                .await
                .map_err(remote)?;
            let response = ensure_success(prefix, response).await?;
            let page: ListPage = response.json().await.map_err(remote)?;

            keys.extend(page.items.into_iter().map(|item| item.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        keys.sort();
        Ok(keys)
    }
}

fn remote(err: reqwest::Error) -> StorageError {
    StorageError::remote(err.to_string())
}

async fn ensure_success(
    context: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::remote(format!(
        "`{context}`: status {status} body {body}"
    )))
}
