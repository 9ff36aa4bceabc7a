//! Resolves `go get` vanity import paths to GitHub repositories.
//!
//! Repositories are discovered through GitHub App installations at startup
//! and kept current through webhooks. Each configured account maps to a
//! package prefix, and repository names translate into package paths under
//! that prefix (`one-two-buckle--my--shoe` becomes `one/two/buckle-my-shoe`).

pub mod conf;
pub mod discovery;
pub mod hooks;
pub mod providers;
pub mod registry;
pub mod repo;
pub mod routes;
pub mod templates;

pub use registry::Registry;
pub use repo::{Repo, RepositoryRecord};
