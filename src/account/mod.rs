mod repository;
mod service;
mod validator;

pub use repository::*;
pub use service::*;
pub use validator::*;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::directory::DirectoryError;

pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors raised while resolving the age of an account.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("No user found with given name: {name}")]
    UserNotFound { name: String },

    /// Directory refused the name; the caller sent something unusable.
    #[error("{0}")]
    Application(String),

    #[error(transparent)]
    Directory(DirectoryError),
}

impl From<DirectoryError> for AccountError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Rejected { message, .. } => Self::Application(message),
            err => Self::Directory(err),
        }
    }
}

/// Streaming platform account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// How long an account has existed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccountAge {
    pub name: String,
    #[serde(serialize_with = "iso8601")]
    pub created_at: DateTime<Utc>,
    pub days_since_creation: u64,
}

/// `2011-11-20T00:00:00Z`, whole seconds with a `Z` suffix.
fn iso8601<S: Serializer>(
    date: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Secs, true))
}
