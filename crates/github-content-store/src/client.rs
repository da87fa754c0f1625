//! GitHub contents API client

use crate::error::{Result, StoreError};
use crate::remote::RemoteStore;
use crate::types::{GithubConfig, PutContentsRequest, PutContentsResponse};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("image-relay/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Blob store backed by a GitHub repository
pub struct GithubContentStore {
    client: Client,
    config: GithubConfig,
}

impl GithubContentStore {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Repository path of a key, e.g. `images/cat.png`
    pub fn object_path(&self, key: &str) -> String {
        let prefix = self.config.path_prefix.trim_matches('/');
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", prefix, key)
        }
    }

    fn contents_url(&self, key: &str) -> String {
        let path = self
            .object_path(key)
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.owner),
            urlencoding::encode(&self.config.repo),
            path
        )
    }

    /// Direct download URL, used when the API response omits one
    fn raw_url(&self, key: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.config.owner,
            self.config.repo,
            self.config.branch,
            self.object_path(key)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-GitHub-Api-Version", API_VERSION);
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteStore for GithubContentStore {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}?ref={}",
            self.contents_url(key),
            urlencoding::encode(&self.config.branch)
        );
        debug!(url = %url, "Fetching blob from GitHub");

        let response = self
            .authorize(self.client.get(&url))
            .header(ACCEPT, RAW_MEDIA_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), key, "Failed to fetch blob");
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                key: key.to_string(),
            });
        }

        let data = response.bytes().await?.to_vec();
        debug!(key, size = data.len(), "Fetched blob from GitHub");
        Ok(data)
    }

    async fn upload(&self, key: &str, data: &[u8]) -> Result<String> {
        let url = self.contents_url(key);
        let body = PutContentsRequest {
            message: format!("Upload {}", key),
            content: base64::engine::general_purpose::STANDARD.encode(data),
            branch: &self.config.branch,
        };
        debug!(url = %url, size = data.len(), "Uploading blob to GitHub");

        let response = self
            .authorize(self.client.put(&url))
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), key, "Failed to upload blob");
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                key: key.to_string(),
            });
        }

        let created: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let content = created
            .content
            .ok_or_else(|| StoreError::Decode("response has no content".to_string()))?;

        debug!(key, path = %content.path, "Uploaded blob to GitHub");
        Ok(content.download_url.unwrap_or_else(|| self.raw_url(key)))
    }
}
