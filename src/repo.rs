//! Repository descriptors and the package path translation.

use serde::{Deserialize, Serialize};

/* -------------------------------- Constants ------------------------------- */

/// Only repositories whose primary language is this get registered.
pub const TARGET_LANGUAGE: &str = "Go";

/// Stand-in for an escaped `--` while single hyphens become separators.
const HYPHEN_PLACEHOLDER: char = '\u{0}';

/* -------------------------------------------------------------------------- */
/*                              Upstream Records                              */
/* -------------------------------------------------------------------------- */

/// A repository as reported by the upstream provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: u64,
    pub owner_login: String,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
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

impl RepositoryRecord {
    pub fn is_target_language(&self) -> bool {
        self.language.as_deref() == Some(TARGET_LANGUAGE)
    }

    pub fn display_name(&self) -> String {
        match self.full_name.is_empty() {
            true => format!("{}/{}", self.owner_login, self.name),
            false => self.full_name.clone(),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Descriptor                                 */
/* -------------------------------------------------------------------------- */

/// An accepted repository along with everything needed to answer go-get.
///
/// Descriptors are never modified once built. A renamed or transferred
/// repository gets a brand new descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repo {
    id: u64,
    owner: String,
    name: String,
    package: String,
    private: bool,
    html_url: String,
    public_url: String,
    private_url: String,
}

impl Repo {
    pub fn new(prefix: &str, record: &RepositoryRecord) -> Self {
        Self {
            id: record.id,
            owner: record.owner_login.clone(),
            name: record.name.clone(),
            package: package_path(prefix, &record.name),
            private: record.private,
            html_url: record.html_url.clone(),
            public_url: record.clone_url.clone(),
            private_url: record.git_url.replacen("git://", "ssh://git@", 1),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Go package path of the repository root.
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn html_url(&self) -> &str {
        &self.html_url
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn private_url(&self) -> &str {
        &self.private_url
    }

    /// The URL `go get` should clone from.
    pub fn clone_url(&self) -> &str {
        match self.private {
            true => &self.private_url,
            false => &self.public_url,
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                              Path Translation                              */
/* -------------------------------------------------------------------------- */

/// Translates a repository name into a package path under `prefix`.
///
/// Single hyphens become path separators and doubled hyphens collapse into
/// a literal hyphen, so `one-two-buckle--my--shoe` under `example.com`
/// becomes `example.com/one/two/buckle-my-shoe`.
pub fn package_path(prefix: &str, name: &str) -> String {
    let translated = name
        .replace("--", &HYPHEN_PLACEHOLDER.to_string())
        .replace('-', "/")
        .replace(HYPHEN_PLACEHOLDER, "-");

    clean_path(&format!("{}/{}", prefix, translated))
}

/// Lexically cleans a slash separated path.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment, and
/// an empty result becomes `.`. A leading slash is kept.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
