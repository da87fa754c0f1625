//! GitHub Content Store
//!
//! Treats a GitHub repository as object storage: blobs are committed as
//! files under a path prefix and read back through the contents API.

pub mod client;
pub mod error;
pub mod remote;
pub mod types;

pub use client::GithubContentStore;
pub use error::{Result, StoreError};
pub use remote::RemoteStore;
pub use types::GithubConfig;
