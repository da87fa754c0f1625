//! GitHub contents API types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where blobs live and how to reach them
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository that holds the blobs
    pub path_prefix: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl GithubConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            owner: owner.into(),
            repo: repo.into(),
            branch: "main".to_string(),
            path_prefix: "images".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Serialize)]
pub struct PutContentsRequest<'a> {
    pub message: String,
    /// base64
    pub content: String,
    pub branch: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PutContentsResponse {
    pub content: Option<ContentFile>,
}

#[derive(Debug, Deserialize)]
pub struct ContentFile {
    pub path: String,
    pub download_url: Option<String>,
}
