//! Wire shapes of the GitHub REST API and webhook payloads.
//!
//! Only the fields the service reads are declared; everything else is
//! ignored by serde.

use serde::Deserialize;

use crate::{providers::Installation, repo::RepositoryRecord};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GhAccount {
    #[serde(default)]
    pub login: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GhInstallation {
    pub id: u64,
    #[serde(default)]
    pub account: Option<GhAccount>,
}

impl From<GhInstallation> for Installation {
    fn from(value: GhInstallation) -> Self {
        Self {
            id: value.id,
            account_login: value.account.map(|a| a.login).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GhRepository {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub owner: Option<GhAccount>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub git_url: String,
}

impl GhRepository {
    /// The owner login, falling back to the `full_name` prefix for the
    /// trimmed repository objects found in installation payloads.
    fn owner_login(&self) -> String {
        match &self.owner {
            Some(owner) if !owner.login.is_empty() => owner.login.clone(),
            _ => self
                .full_name
                .split_once('/')
                .map(|(owner, _)| owner.to_string())
                .unwrap_or_default(),
        }
    }
}

impl From<GhRepository> for RepositoryRecord {
    fn from(value: GhRepository) -> Self {
        Self {
            owner_login: value.owner_login(),
            id: value.id,
            name: value.name,
            full_name: value.full_name,
            language: value.language,
            private: value.private,
            html_url: value.html_url,
            clone_url: value.clone_url,
            git_url: value.git_url,
        }
    }
}

/// Body of `GET /installation/repositories`.
#[derive(Debug, Deserialize)]
pub struct GhInstallationRepositories {
    #[serde(default)]
    pub repositories: Vec<GhRepository>,
}

/// Body of `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Deserialize)]
pub struct GhAccessToken {
    pub token: String,
}
