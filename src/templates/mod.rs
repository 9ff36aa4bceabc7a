use log::{error, info};
use minijinja::Environment;
use serde::Serialize;

use crate::repo::Repo;

pub const TEMPLATE_GOGET: &str = "goget.jinja";
pub const TEMPLATE_INDEX: &str = "index.jinja";

#[derive(Serialize)]
pub struct TemplateServerContext {
    pub name: String,
    pub hostname: Option<String>,
    pub prefixes: Vec<String>,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct TemplateRepoContext {
    pub package: String,
    pub clone_url: String,
    pub html_url: String,
}

impl From<&Repo> for TemplateRepoContext {
    fn from(repo: &Repo) -> Self {
        Self {
            package: repo.package().to_string(),
            clone_url: repo.clone_url().to_string(),
            html_url: repo.html_url().to_string(),
        }
    }
}

fn checked_add_template<'a>(env: &mut Environment<'a>, entry: &'a str, data: &'a str) {
    match env.add_template(entry, data) {
        Ok(_) => {
            info!("Added template {}", entry)
        }
        Err(e) => {
            error!("Error adding template for \"{}\": {}", entry, e)
        }
    }
}

pub fn templates_from_builtin<'a>() -> Environment<'a> {
    let mut env = Environment::new();

    checked_add_template(&mut env, TEMPLATE_GOGET, include_str!("goget.jinja"));
    checked_add_template(&mut env, TEMPLATE_INDEX, include_str!("index.jinja"));

    env
}

#[cfg(test)]
mod tests {
    use minijinja::context;

    use super::*;
    use crate::repo::RepositoryRecord;

    #[test]
    fn render_goget() {
        let record = RepositoryRecord {
            id: 1,
            owner_login: "acme".to_string(),
            name: "widget".to_string(),
            language: Some("Go".to_string()),
            html_url: "https://github.com/acme/widget".to_string(),
            clone_url: "https://github.com/acme/widget.git".to_string(),
            ..Default::default()
        };
        let repo = Repo::new("go.acme.example", &record);

        let env = templates_from_builtin();
        let body = env
            .get_template(TEMPLATE_GOGET)
            .unwrap()
            .render(context! { repo => TemplateRepoContext::from(&repo) })
            .unwrap();

        assert!(body.contains(
            r#"<meta name="go-import" content="go.acme.example/widget git https://github.com/acme/widget.git">"#
        ));
        assert!(body.contains(
            "https://github.com/acme/widget/blob/master{/dir}/{file}#L{line}"
        ));
    }
}
