use crate::error::{RelayError, Result};
use file_blob_cache::CacheConfig;
use github_content_store::GithubConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Relay configuration, read once at startup
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub cache_dir: PathBuf,
    /// Staging area for uploads in flight
    pub upload_dir: PathBuf,
    pub cache: CacheConfig,
    pub github: GithubConfig,
    /// Base URL this relay is reachable at; upload responses point here when set
    pub public_url: Option<String>,
    pub api_key: Option<String>,
    pub compress_command: Option<String>,
}

impl RelayConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parse configuration from any key/value source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: u64| {
            var(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        let defaults = CacheConfig::default();

        let port = var("PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3001);

        let cache_dir = var("CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cache/images"));

        let upload_dir = var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cache/uploads"));

        let cache = CacheConfig {
            expiry: Duration::from_secs(number("CACHE_EXPIRY_SECS", defaults.expiry.as_secs())),
            size_budget: number("MAX_CACHE_SIZE", defaults.size_budget),
            sweep_interval: Duration::from_secs(number(
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )),
        };

        let owner =
            var("GITHUB_OWNER").ok_or_else(|| RelayError::Config("GITHUB_OWNER is required".into()))?;
        let repo =
            var("GITHUB_REPO").ok_or_else(|| RelayError::Config("GITHUB_REPO is required".into()))?;

        let mut github = GithubConfig::new(owner, repo);
        if let Some(api_url) = var("GITHUB_API_URL") {
            github.api_url = validate_url("GITHUB_API_URL", &api_url)?;
        }
        if let Some(branch) = var("GITHUB_BRANCH") {
            github.branch = branch;
        }
        if let Some(prefix) = lookup("GITHUB_PATH_PREFIX") {
            github.path_prefix = prefix;
        }
        github.token = var("GITHUB_TOKEN");
        github.timeout = Duration::from_secs(number("FETCH_TIMEOUT_SECS", 30));

        let public_url = var("PUBLIC_URL")
            .map(|url| validate_url("PUBLIC_URL", &url))
            .transpose()?;

        Ok(Self {
            port,
            cache_dir,
            upload_dir,
            cache,
            github,
            public_url,
            api_key: var("API_KEY"),
            compress_command: var("COMPRESS_COMMAND"),
        })
    }
}

/// Check that a configured URL parses and strip any trailing slash
fn validate_url(name: &str, value: &str) -> Result<String> {
    url::Url::parse(value).map_err(|e| RelayError::Config(format!("{} is invalid: {}", name, e)))?;
    Ok(value.trim_end_matches('/').to_string())
}
