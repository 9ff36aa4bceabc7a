//! GitHub webhook verification and decoding.

use std::borrow::Cow;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::{
    providers::{
        Installation,
        github::payload::{GhInstallation, GhRepository},
    },
    repo::RepositoryRecord,
};

pub const EVENT_HEADER: &str = "X-GitHub-Event";
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Content type of deliveries configured for form encoding.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Event names GitHub still sends for old style integrations.
pub const DEPRECATED_EVENTS: [&str; 2] = [
    "integration_installation",
    "integration_installation_repositories",
];

#[derive(Debug, Error)]
pub enum HookError {
    #[error("missing X-Hub-Signature-256 header")]
    MissingSignature,
    #[error("payload signature mismatch")]
    BadSignature,
    #[error("bad webhook payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("form encoded delivery has no payload field")]
    MissingFormPayload,
}

/* -------------------------------------------------------------------------- */
/*                                   Events                                   */
/* -------------------------------------------------------------------------- */

/// The webhook events the service understands.
#[derive(Debug)]
pub enum HookEvent {
    /// The App was installed on, or removed from, an account.
    Installation {
        action: String,
        installation: Installation,
        repositories: Vec<RepositoryRecord>,
    },
    /// Repositories were added to or removed from an installation.
    InstallationRepositories {
        action: String,
        installation: Installation,
        added: Vec<RepositoryRecord>,
        removed: Vec<RepositoryRecord>,
    },
    /// A repository was created, renamed, transferred, deleted, etc.
    Repository {
        action: String,
        repository: RepositoryRecord,
    },
    Ping {
        zen: String,
    },
    Other(String),
}

#[derive(Deserialize)]
struct InstallationPayload {
    #[serde(default)]
    action: String,
    installation: GhInstallation,
    #[serde(default)]
    repositories: Vec<GhRepository>,
}

#[derive(Deserialize)]
struct InstallationRepositoriesPayload {
    #[serde(default)]
    action: String,
    installation: GhInstallation,
    #[serde(default)]
    repositories_added: Vec<GhRepository>,
    #[serde(default)]
    repositories_removed: Vec<GhRepository>,
}

#[derive(Deserialize)]
struct RepositoryPayload {
    #[serde(default)]
    action: String,
    repository: GhRepository,
}

#[derive(Deserialize)]
struct PingPayload {
    #[serde(default)]
    zen: String,
}

fn records(repos: Vec<GhRepository>) -> Vec<RepositoryRecord> {
    repos.into_iter().map(RepositoryRecord::from).collect()
}

impl HookEvent {
    /// Decodes `body` according to the `X-GitHub-Event` name.
    pub fn parse(event: &str, body: &[u8]) -> Result<Self, HookError> {
        Ok(match event {
            "installation" => {
                let p: InstallationPayload = serde_json::from_slice(body)?;
                Self::Installation {
                    action: p.action,
                    installation: p.installation.into(),
                    repositories: records(p.repositories),
                }
            }
            "installation_repositories" => {
                let p: InstallationRepositoriesPayload = serde_json::from_slice(body)?;
                Self::InstallationRepositories {
                    action: p.action,
                    installation: p.installation.into(),
                    added: records(p.repositories_added),
                    removed: records(p.repositories_removed),
                }
            }
            "repository" => {
                let p: RepositoryPayload = serde_json::from_slice(body)?;
                Self::Repository {
                    action: p.action,
                    repository: p.repository.into(),
                }
            }
            "ping" => {
                let p: PingPayload = serde_json::from_slice(body)?;
                Self::Ping { zen: p.zen }
            }
            other => Self::Other(other.to_string()),
        })
    }

    pub fn is_deprecated(event: &str) -> bool {
        DEPRECATED_EVENTS.contains(&event)
    }
}

/// The JSON document of a delivery. Form encoded deliveries carry it in
/// the `payload` field, everything else is taken as JSON.
pub fn payload_json<'b>(content_type: Option<&str>, body: &'b [u8]) -> Result<Cow<'b, [u8]>, HookError> {
    let is_form = content_type
        .and_then(|v| v.split(';').next())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));

    if !is_form {
        return Ok(Cow::Borrowed(body));
    }

    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| Cow::Owned(value.into_owned().into_bytes()))
        .ok_or(HookError::MissingFormPayload)
}

/* -------------------------------------------------------------------------- */
/*                                 Signatures                                 */
/* -------------------------------------------------------------------------- */

/// Checks a `sha256=<hex>` signature of `body` keyed with `secret`.
pub fn verify_signature(secret: &str, signature: Option<&str>, body: &[u8]) -> Result<(), HookError> {
    let signature = signature.ok_or(HookError::MissingSignature)?;
    let expected = signature
        .strip_prefix("sha256=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(HookError::BadSignature)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| HookError::BadSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| HookError::BadSignature)
}

/// Produces the signature header value GitHub would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, HookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| HookError::BadSignature)?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
