use std::collections::{HashMap, HashSet};

use crate::{
    providers::{
        FetchError, Installation, RepositorySource,
        pagination::{Page, collect_pages},
    },
    repo::RepositoryRecord,
};

/* -------------------------------------------------------------------------- */
/*                       Repository Source Implementation                     */
/* -------------------------------------------------------------------------- */

/// A fixed set of installations and repositories.
///
/// Listings are served in pages of `page_size` so callers walk the same
/// pagination path as against GitHub.
#[derive(Clone)]
pub struct MemorySource {
    installations: Vec<Installation>,
    repos: HashMap<u64, Vec<RepositoryRecord>>,
    failing: HashSet<u64>,
    page_size: usize,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            installations: Vec::new(),
            repos: HashMap::new(),
            failing: HashSet::new(),
            page_size: 2,
        }
    }

    pub fn with_installation(mut self, id: u64, account_login: &str) -> Self {
        self.installations.push(Installation {
            id,
            account_login: account_login.to_string(),
        });
        self.repos.entry(id).or_default();
        self
    }

    pub fn with_repository(mut self, installation_id: u64, record: RepositoryRecord) -> Self {
        self.repos.entry(installation_id).or_default().push(record);
        self
    }

    /// Makes the second page of this installation's repository listing fail.
    pub fn failing_on(mut self, installation_id: u64) -> Self {
        self.failing.insert(installation_id);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn page<T: Clone>(&self, items: &[T], index: usize) -> Page<T, usize> {
        let start = index * self.page_size;
        let end = (start + self.page_size).min(items.len());

        Page {
            items: items.get(start..end).unwrap_or_default().to_vec(),
            next: (end < items.len()).then_some(index + 1),
        }
    }
}

impl RepositorySource for MemorySource {
    async fn list_installations(&self) -> Result<Vec<Installation>, FetchError> {
        collect_pages(0, |index| {
            let page = self.page(&self.installations, index);
            async move { Ok(page) }
        })
        .await
    }

    async fn list_repositories(
        &self,
        installation_id: u64,
    ) -> Result<Vec<RepositoryRecord>, FetchError> {
        let repos = self
            .repos
            .get(&installation_id)
            .ok_or(FetchError::UnknownInstallation(installation_id))?;
        let failing = self.failing.contains(&installation_id);

        collect_pages(0, |index| {
            let page = self.page(repos, index);
            async move {
                if failing && index > 0 {
                    return Err(FetchError::Status {
                        status: 502,
                        url: format!("memory://installation/{}?page={}", installation_id, index),
                    });
                }
                Ok(page)
            }
        })
        .await
    }
}

/* -------------------------------------------------------------------------- */
/*                                Example Data                                */
/* -------------------------------------------------------------------------- */

pub mod testing {
    use crate::conf::TranslatorConfig;

    use super::*;

    pub const ACME_PREFIX: &str = "go.acme.example";
    pub const TEP_PREFIX: &str = "example.com";

    pub fn example_translators() -> Vec<TranslatorConfig> {
        vec![
            TranslatorConfig {
                prefix: ACME_PREFIX.to_string(),
                owners: vec!["acme".to_string()],
            },
            TranslatorConfig {
                prefix: TEP_PREFIX.to_string(),
                owners: vec!["tep".to_string()],
            },
        ]
    }

    pub fn go_repo(id: u64, owner: &str, name: &str) -> RepositoryRecord {
        RepositoryRecord {
            id,
            owner_login: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            language: Some("Go".to_string()),
            private: false,
            html_url: format!("https://github.com/{}/{}", owner, name),
            clone_url: format!("https://github.com/{}/{}.git", owner, name),
            git_url: format!("git://github.com/{}/{}.git", owner, name),
        }
    }

    /// Three installations: two configured owners and one stranger.
    ///
    /// `acme` owns `widget`, the private `one-two-buckle--my--shoe` and a
    /// Python repo; `tep` owns `foo` and `foo-bar`.
    pub fn create_example_source() -> MemorySource {
        let mut private = go_repo(2, "acme", "one-two-buckle--my--shoe");
        private.private = true;

        let mut python = go_repo(3, "acme", "scripts");
        python.language = Some("Python".to_string());

        MemorySource::new()
            .with_installation(10, "acme")
            .with_installation(20, "tep")
            .with_installation(30, "stranger")
            .with_repository(10, go_repo(1, "acme", "widget"))
            .with_repository(10, private)
            .with_repository(10, python)
            .with_repository(20, go_repo(4, "tep", "foo"))
            .with_repository(20, go_repo(5, "tep", "foo-bar"))
            .with_repository(30, go_repo(6, "stranger", "thing"))
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
