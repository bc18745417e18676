//! Account directory of the streaming platform.
//!
//! The directory resolves a login to the public metadata of an account.
//! Concrete adapters talk to Twitch Helix or serve a seeded in-memory set.
mod fake;
mod twitch;

pub use fake::*;
pub use twitch::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Errors raised while querying the directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The directory refused the login itself (malformed name).
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("directory returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("failed to parse directory response: {0}")]
    Parse(String),

    #[error("invalid directory URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing directory credential `{0}`")]
    Credentials(&'static str),
}

/// Public account metadata as exposed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Port to the external account directory.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Find an account by its login.
    ///
    /// An unknown login is `Ok(None)`, never an error.
    async fn lookup(&self, login: &str) -> Result<Option<DirectoryUser>>;
}
