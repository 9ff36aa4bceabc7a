//! The translation registry: Go package paths to GitHub repositories.
//!
//! Both lookup tables sit behind one lock so that readers never observe a
//! half applied upsert or delete.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};
use tokio::sync::RwLock;

use crate::{
    conf::{ConfigError, TranslatorConfig},
    repo::{Repo, RepositoryRecord, clean_path},
};

#[derive(Default)]
struct Tables {
    /// Repository id -> descriptor
    by_id: HashMap<u64, Repo>,
    /// Package path -> repository id
    by_package: HashMap<String, u64>,
}

pub struct Registry {
    /// Repository owner -> package prefix
    owner_prefixes: HashMap<String, String>,
    prefixes: Vec<String>,
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new(translators: &[TranslatorConfig]) -> Result<Self, ConfigError> {
        let mut owner_prefixes: HashMap<String, String> = HashMap::new();
        let mut prefixes = BTreeSet::new();

        for t in translators {
            for owner in &t.owners {
                if let Some(first) = owner_prefixes.get(owner) {
                    return Err(ConfigError::ConflictingOwner {
                        owner: owner.clone(),
                        first: first.clone(),
                        second: t.prefix.clone(),
                    });
                }
                owner_prefixes.insert(owner.clone(), t.prefix.clone());
                prefixes.insert(t.prefix.clone());
            }
        }

        if owner_prefixes.is_empty() {
            return Err(ConfigError::NoTranslators);
        }

        Ok(Self {
            owner_prefixes,
            prefixes: prefixes.into_iter().collect(),
            tables: RwLock::new(Tables::default()),
        })
    }

    /// Every distinct configured prefix, sorted.
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn prefix_for(&self, owner: &str) -> Option<&str> {
        self.owner_prefixes.get(owner).map(String::as_str)
    }

    /* -------------------------------- Updates ------------------------------- */

    /// Applies a single repository notification.
    ///
    /// Replaying the same notification is harmless, and a delete followed by
    /// an add recreates the entry.
    pub async fn update_repo(&self, record: &RepositoryRecord, delete: bool) {
        if delete {
            self.delete(record.id).await;
            return;
        }

        match self.prefix_for(&record.owner_login) {
            Some(prefix) => self.accept(prefix, record).await,
            None => warn!("Repo owner not configured: {}", record.owner_login),
        }
    }

    /// Registers `record` under `prefix`, replacing any descriptor with the
    /// same id. Non-Go repositories are ignored.
    pub async fn accept(&self, prefix: &str, record: &RepositoryRecord) {
        if !record.is_target_language() {
            debug!("Rejecting non-go repo: {}", record.display_name());
            return;
        }

        let repo = Repo::new(prefix, record);
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        if let Some(old) = tables.by_id.get(&repo.id()) {
            if tables.by_package.get(old.package()) == Some(&repo.id()) {
                tables.by_package.remove(old.package());
            }
        }

        if let Some(other) = tables.by_package.get(repo.package()) {
            if *other != repo.id() {
                warn!(
                    "Package {} moves from repo id {} to {} ({})",
                    repo.package(),
                    other,
                    repo.id(),
                    record.display_name()
                );
            }
        }

        debug!("Registered {} -> {}", repo.package(), record.display_name());
        tables.by_package.insert(repo.package().to_string(), repo.id());
        tables.by_id.insert(repo.id(), repo);
    }

    pub async fn delete(&self, id: u64) {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(repo) = tables.by_id.remove(&id) else {
            return;
        };

        // A colliding repo may have taken the path over since
        if tables.by_package.get(repo.package()) == Some(&id) {
            tables.by_package.remove(repo.package());
        }

        info!("Deleted repo {}/{}", repo.owner(), repo.name());
    }

    /* -------------------------------- Queries ------------------------------- */

    /// Finds the repository whose package path is the longest registered
    /// prefix of `import_path`.
    ///
    /// A trailing major version segment (`v2`, `v3`, ...) is ignored, so
    /// `example.com/foo/v2/sub` resolves like `example.com/foo/sub`.
    pub async fn lookup(&self, import_path: &str) -> Option<Repo> {
        debug!("Lookup: {:?}", import_path);
        let tables = self.tables.read().await;

        let mut name = trim_version(&clean_path(import_path));
        while name != "." && name != "/" {
            if let Some(id) = tables.by_package.get(&name) {
                return tables.by_id.get(id).cloned();
            }
            name = trim_package(&name);
        }

        None
    }

    /// Snapshot of every registered package path and its repository.
    pub async fn enumerate(&self) -> Vec<(String, Repo)> {
        let tables = self.tables.read().await;

        tables
            .by_package
            .iter()
            .filter_map(|(package, id)| {
                tables
                    .by_id
                    .get(id)
                    .map(|repo| (package.clone(), repo.clone()))
            })
            .collect()
    }

    /// Number of repositories held, including any whose path was taken
    /// over by a colliding repository.
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of package paths that currently resolve.
    pub async fn package_count(&self) -> usize {
        self.tables.read().await.by_package.len()
    }

    /// Logs the entire table.
    pub async fn dump(&self) {
        let mut entries = self.enumerate().await;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        info!("Registry holds {} packages", entries.len());
        for (package, repo) in entries {
            info!("{:<45} {}", package, repo.clone_url());
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                               Path Utilities                               */
/* -------------------------------------------------------------------------- */

/// Drops a trailing `v<N>` segment, if there is one.
fn trim_version(name: &str) -> String {
    let (front, back) = split_last(name);

    match back.strip_prefix('v') {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            clean_path(front)
        }
        _ => name.to_string(),
    }
}

/// Drops the last segment.
fn trim_package(name: &str) -> String {
    clean_path(split_last(name).0)
}

fn split_last(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(i) => (&name[..i + 1], &name[i + 1..]),
        None => ("", name),
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn translators() -> Vec<TranslatorConfig> {
        vec![
            TranslatorConfig {
                prefix: "go.acme.example".to_string(),
                owners: vec!["acme".to_string(), "acme-labs".to_string()],
            },
            TranslatorConfig {
                prefix: "example.com".to_string(),
                owners: vec!["tep".to_string()],
            },
        ]
    }

    fn record(id: u64, owner: &str, name: &str) -> RepositoryRecord {
        RepositoryRecord {
            id,
            owner_login: owner.to_string(),
            name: name.to_string(),
            full_name: format!("{}/{}", owner, name),
            language: Some("Go".to_string()),
            private: false,
            html_url: format!("https://host/{}/{}", owner, name),
            clone_url: format!("https://host/{}/{}.git", owner, name),
            git_url: format!("git://host/{}/{}.git", owner, name),
        }
    }

    fn registry() -> Registry {
        Registry::new(&translators()).unwrap()
    }

    #[test]
    fn construct() {
        let r = registry();
        assert_eq!(r.prefixes(), &["example.com", "go.acme.example"]);
        assert_eq!(r.prefix_for("acme-labs"), Some("go.acme.example"));
        assert_eq!(r.prefix_for("nobody"), None);
    }

    #[test]
    fn construct_rejects_bad_config() {
        assert!(matches!(
            Registry::new(&[]),
            Err(ConfigError::NoTranslators)
        ));

        let empty_owners = vec![TranslatorConfig {
            prefix: "example.com".to_string(),
            owners: vec![],
        }];
        assert!(matches!(
            Registry::new(&empty_owners),
            Err(ConfigError::NoTranslators)
        ));

        let mut conflicting = translators();
        conflicting[1].owners.push("acme".to_string());
        match Registry::new(&conflicting) {
            Err(ConfigError::ConflictingOwner {
                owner,
                first,
                second,
            }) => {
                assert_eq!(owner, "acme");
                assert_eq!(first, "go.acme.example");
                assert_eq!(second, "example.com");
            }
            _ => panic!("expected conflicting owner error"),
        }
    }

    #[test]
    fn version_trimming() {
        assert_eq!(trim_version("example.com/foo/v2"), "example.com/foo");
        assert_eq!(trim_version("example.com/foo/v2x"), "example.com/foo/v2x");
        assert_eq!(trim_version("example.com/foo/v"), "example.com/foo/v");
        assert_eq!(trim_version("v3"), ".");
        assert_eq!(trim_package("example.com/foo/bar"), "example.com/foo");
        assert_eq!(trim_package("example.com"), ".");
    }

    #[tokio::test]
    async fn lookup_subpackages() {
        let r = registry();
        r.accept("example.com", &record(1, "tep", "one-two-buckle--my--shoe"))
            .await;

        for path in [
            "example.com/one/two/buckle-my-shoe",
            "example.com/one/two/buckle-my-shoe/v3",
            "example.com/one/two/buckle-my-shoe/subpkg",
            "example.com/one/two/buckle-my-shoe/subpkg/v3",
            "example.com/one/two/buckle-my-shoe/a/b/c/",
        ] {
            assert_eq!(r.lookup(path).await.map(|repo| repo.id()), Some(1), "{}", path);
        }

        assert!(r.lookup("example.com/one/two").await.is_none());
        assert!(r.lookup("example.com").await.is_none());
        assert!(r.lookup("").await.is_none());
        assert!(r.lookup("other.org/one/two/buckle-my-shoe").await.is_none());
    }

    #[tokio::test]
    async fn lookup_version_segment() {
        let r = registry();
        r.accept("example.com", &record(1, "tep", "foo")).await;

        let versioned = r.lookup("example.com/foo/v2/sub").await;
        let plain = r.lookup("example.com/foo/sub").await;
        assert_eq!(versioned, plain);
        assert!(versioned.is_some());

        // v2x is a directory, so the walk just continues up to the root
        assert_eq!(
            r.lookup("example.com/foo/v2x/sub").await.map(|repo| repo.id()),
            Some(1)
        );

        r.accept("example.com", &record(2, "tep", "foo-v2x")).await;
        assert_eq!(
            r.lookup("example.com/foo/v2x/sub").await.map(|repo| repo.id()),
            Some(2)
        );
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let r = registry();
        r.accept("example.com", &record(1, "tep", "foo")).await;
        r.accept("example.com", &record(2, "tep", "foo-bar")).await;

        assert_eq!(r.lookup("example.com/foo/baz").await.map(|x| x.id()), Some(1));
        assert_eq!(r.lookup("example.com/foo/bar/baz").await.map(|x| x.id()), Some(2));
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let r = registry();
        let rec = record(1, "acme", "widget");

        r.accept("go.acme.example", &rec).await;
        let once = r.enumerate().await;
        r.accept("go.acme.example", &rec).await;
        let twice = r.enumerate().await;

        assert_eq!(once, twice);
        assert_eq!(r.len().await, 1);
    }

    #[tokio::test]
    async fn upsert_replaces_old_path() {
        let r = registry();
        r.update_repo(&record(1, "acme", "widget"), false).await;
        r.update_repo(&record(1, "acme", "gadget"), false).await;

        assert!(r.lookup("go.acme.example/widget").await.is_none());
        assert_eq!(r.lookup("go.acme.example/gadget").await.map(|x| x.id()), Some(1));
        assert_eq!(r.enumerate().await.len(), 1);
    }

    #[tokio::test]
    async fn transfer_to_other_owner() {
        let r = registry();
        r.update_repo(&record(1, "acme", "widget"), false).await;
        r.update_repo(&record(1, "tep", "widget"), false).await;

        assert!(r.lookup("go.acme.example/widget").await.is_none());
        let repo = r.lookup("example.com/widget").await.unwrap();
        assert_eq!(repo.owner(), "tep");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let r = registry();
        r.delete(42).await;

        r.update_repo(&record(1, "acme", "widget"), false).await;
        r.delete(1).await;
        r.delete(1).await;

        assert!(r.is_empty().await);
        assert!(r.lookup("go.acme.example/widget").await.is_none());

        r.update_repo(&record(1, "acme", "widget"), false).await;
        assert!(r.lookup("go.acme.example/widget").await.is_some());
    }

    #[tokio::test]
    async fn rejects_unconfigured_and_non_go() {
        let r = registry();
        r.update_repo(&record(1, "stranger", "widget"), false).await;

        let mut rust = record(2, "acme", "crate");
        rust.language = Some("Rust".to_string());
        r.update_repo(&rust, false).await;

        let mut unknown = record(3, "acme", "docs");
        unknown.language = None;
        r.update_repo(&unknown, false).await;

        assert!(r.is_empty().await);
        assert!(r.enumerate().await.is_empty());
    }

    #[tokio::test]
    async fn language_change_keeps_previous_entry() {
        let r = registry();
        r.update_repo(&record(1, "acme", "widget"), false).await;

        let mut changed = record(1, "acme", "widget");
        changed.language = Some("Rust".to_string());
        r.update_repo(&changed, false).await;

        assert!(r.lookup("go.acme.example/widget").await.is_some());
    }

    #[tokio::test]
    async fn collisions_overwrite() {
        let r = registry();
        r.update_repo(&record(1, "acme", "a-b"), false).await;
        r.update_repo(&record(2, "acme-labs", "a-b"), false).await;

        assert_eq!(r.lookup("go.acme.example/a/b").await.map(|x| x.id()), Some(2));
        assert_eq!(r.len().await, 2);
        assert_eq!(r.package_count().await, 1);

        // Deleting the loser must not remove the winner's path
        r.delete(1).await;
        assert_eq!(r.lookup("go.acme.example/a/b").await.map(|x| x.id()), Some(2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_partial_renames() {
        let r = std::sync::Arc::new(registry());
        let before = record(1, "acme", "a");
        let after = record(1, "acme", "b");
        r.accept("go.acme.example", &before).await;

        let writer = {
            let r = r.clone();
            tokio::spawn(async move {
                for i in 0..10_000 {
                    let rec = if i % 2 == 0 { &after } else { &before };
                    r.accept("go.acme.example", rec).await;
                }
            })
        };

        let mut observed = 0;
        loop {
            let entries = r.enumerate().await;
            assert_eq!(entries.len(), 1);
            let (package, repo) = &entries[0];
            assert_eq!(package, repo.package());

            for path in ["go.acme.example/a/sub", "go.acme.example/b/sub"] {
                if let Some(repo) = r.lookup(path).await {
                    assert!(path.starts_with(repo.package()), "{} -> {}", path, repo.package());
                }
            }

            assert_eq!(r.len().await, 1);
            observed += 1;

            if writer.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
        assert!(observed > 0);
        assert_eq!(r.package_count().await, 1);
        assert!(r.lookup("go.acme.example/a").await.is_some());
        assert!(r.lookup("go.acme.example/b").await.is_none());
    }

    #[tokio::test]
    async fn end_to_end() {
        let r = Registry::new(&[TranslatorConfig {
            prefix: "go.acme.example".to_string(),
            owners: vec!["acme".to_string()],
        }])
        .unwrap();

        let widget = RepositoryRecord {
            id: 1,
            owner_login: "acme".to_string(),
            name: "widget".to_string(),
            language: Some("Go".to_string()),
            private: false,
            clone_url: "https://host/acme/widget.git".to_string(),
            ..Default::default()
        };

        r.update_repo(&widget, false).await;
        let repo = r.lookup("go.acme.example/widget/v1/internal").await.unwrap();
        assert_eq!(repo.id(), 1);
        assert_eq!(repo.clone_url(), "https://host/acme/widget.git");

        r.update_repo(&widget, true).await;
        assert!(r.lookup("go.acme.example/widget/v1/internal").await.is_none());
    }
}
