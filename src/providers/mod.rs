//! Upstream repository sources.
//!
//! A source enumerates the GitHub App installations visible to the service
//! and the repositories each installation grants access to.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repo::RepositoryRecord;

pub mod github;
pub mod memory;
pub mod pagination;

pub use github::GitHubSource;
pub use memory::MemorySource;

/* -------------------------------------------------------------------------- */
/*                                   Errors                                   */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {status} for {url}")]
    Status { status: u16, url: String },
    #[error("failed to sign App token: {0}")]
    Auth(#[from] jsonwebtoken::errors::Error),
    #[error("malformed upstream response: {0}")]
    Decode(String),
    #[error("unknown installation {0}")]
    UnknownInstallation(u64),
}

/* -------------------------------------------------------------------------- */
/*                                   Records                                  */
/* -------------------------------------------------------------------------- */

/// A GitHub App installation on an organization or user account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
    pub account_login: String,
}

/* -------------------------------------------------------------------------- */
/*                                   Source                                   */
/* -------------------------------------------------------------------------- */

/// Anything that can enumerate installations and their repositories.
///
/// Implementations must walk every page before returning; a failed page
/// fails the whole listing.
pub trait RepositorySource {
    fn list_installations(
        &self,
    ) -> impl Future<Output = Result<Vec<Installation>, FetchError>> + Send;

    fn list_repositories(
        &self,
        installation_id: u64,
    ) -> impl Future<Output = Result<Vec<RepositoryRecord>, FetchError>> + Send;
}

pub mod testing {
    pub use super::memory::testing::create_example_source;
    pub use super::memory::testing::example_translators;
}
