//! GitHub App backed repository source.
//!
//! App level endpoints are called with a short lived JWT signed by the
//! App's private key. Installation level endpoints need an installation
//! access token, which is minted fresh for every listing.

pub mod payload;

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::{
    Client, Method, RequestBuilder,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    conf::{ConfigError, ServerConfig},
    providers::{
        FetchError, Installation, RepositorySource,
        pagination::{PAGE_SIZE, Page, collect_pages, next_link},
    },
    repo::RepositoryRecord,
};

use payload::{GhAccessToken, GhInstallation, GhInstallationRepositories};

const ACCEPT_GITHUB: &str = "application/vnd.github+json";

/// Clock skew allowance for the `iat` claim.
const JWT_BACKDATE_SECS: i64 = 60;
/// GitHub rejects App tokens that live longer than ten minutes.
const JWT_LIFETIME_SECS: i64 = 9 * 60;

#[derive(Serialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

pub struct GitHubSource {
    client: Client,
    api_url: Url,
    integration_id: u64,
    key: EncodingKey,
}

impl GitHubSource {
    pub fn new(client: Client, api_url: Url, integration_id: u64, key: EncodingKey) -> Self {
        Self {
            client,
            api_url,
            integration_id,
            key,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let key = EncodingKey::from_rsa_pem(config.private_key()?.as_bytes())
            .map_err(ConfigError::InvalidPrivateKey)?;

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.upstream.timeout))
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self::new(
            client,
            config.api_url()?,
            config.upstream.integration_id,
            key,
        ))
    }

    /* ----------------------------- Credentials ---------------------------- */

    fn app_token(&self) -> Result<String, FetchError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AppClaims {
            iat: now - JWT_BACKDATE_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: self.integration_id.to_string(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.key,
        )?)
    }

    async fn installation_token(&self, installation_id: u64) -> Result<String, FetchError> {
        let url = self.endpoint(&format!("app/installations/{}/access_tokens", installation_id))?;
        let auth = format!("Bearer {}", self.app_token()?);

        let response = self.request(Method::POST, url.clone(), &auth).send().await?;
        let token: GhAccessToken = Self::decode(url, response).await?;

        debug!("Minted access token for installation {}", installation_id);
        Ok(token.token)
    }

    /* ------------------------------- Requests ----------------------------- */

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.api_url
            .join(path)
            .map_err(|e| FetchError::Decode(format!("bad endpoint {}: {}", path, e)))
    }

    /// First page of a list endpoint.
    fn list_endpoint(&self, path: &str) -> Result<Url, FetchError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("per_page", &PAGE_SIZE.to_string());
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, auth: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCEPT, ACCEPT_GITHUB)
            .header(AUTHORIZATION, auth)
    }

    async fn decode<T: DeserializeOwned>(
        url: Url,
        response: reqwest::Response,
    ) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
        auth: &str,
    ) -> Result<(T, Option<Url>), FetchError> {
        debug!("GET {}", url);
        let response = self.request(Method::GET, url.clone(), auth).send().await?;
        let next = next_link(response.headers());
        let body = Self::decode(url, response).await?;

        Ok((body, next))
    }
}

impl RepositorySource for GitHubSource {
    async fn list_installations(&self) -> Result<Vec<Installation>, FetchError> {
        let auth = format!("Bearer {}", self.app_token()?);
        let first = self.list_endpoint("app/installations")?;

        let installations = collect_pages(first, |url| {
            let auth = auth.as_str();
            async move {
                let (items, next): (Vec<GhInstallation>, _) = self.get_page(url, auth).await?;
                Ok(Page { items, next })
            }
        })
        .await?;

        let installations: Vec<Installation> = installations
            .into_iter()
            .map(Installation::from)
            .collect();

        info!("Found {} installations", installations.len());
        Ok(installations)
    }

    async fn list_repositories(
        &self,
        installation_id: u64,
    ) -> Result<Vec<RepositoryRecord>, FetchError> {
        let auth = format!("token {}", self.installation_token(installation_id).await?);
        let first = self.list_endpoint("installation/repositories")?;

        let repos = collect_pages(first, |url| {
            let auth = auth.as_str();
            async move {
                let (body, next): (GhInstallationRepositories, _) =
                    self.get_page(url, auth).await?;
                Ok(Page {
                    items: body.repositories,
                    next,
                })
            }
        })
        .await?;

        let repos: Vec<RepositoryRecord> = repos.into_iter().map(RepositoryRecord::from).collect();

        info!(
            "Found {} repositories for installation {}",
            repos.len(),
            installation_id
        );
        Ok(repos)
    }
}
