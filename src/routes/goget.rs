//! go-get meta tag responses.

use actix_web::{HttpRequest, HttpResponse, http::header::ContentType, web};
use log::{debug, error, info};
use minijinja::context;
use serde::Deserialize;

use crate::{
    providers::RepositorySource,
    repo::clean_path,
    routes::RouteSharedData,
    templates::{TEMPLATE_GOGET, TemplateRepoContext},
};

#[derive(Deserialize)]
struct GoGetQuery {
    #[serde(rename = "go-get")]
    go_get: Option<String>,
}

/// Whether the request carries `?go-get=1`.
pub fn is_goget_request(req: &HttpRequest) -> bool {
    web::Query::<GoGetQuery>::from_query(req.query_string())
        .map(|q| q.go_get.as_deref() == Some("1"))
        .unwrap_or(false)
}

/// Joins the request host (without port) and path into an import path.
pub fn import_path(host: &str, path: &str) -> String {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    };

    clean_path(&format!("{}/{}", host, path))
}

/// Renders the go-import and go-source tags for the repository owning the
/// requested path. Nothing is rendered when no repository matches.
pub async fn resolve_import<'a, S: RepositorySource>(
    data: &web::Data<RouteSharedData<'a, S>>,
    req: &HttpRequest,
) -> HttpResponse {
    let path = {
        let conn = req.connection_info();
        debug!("GOGET: host={:?} uri={:?}", conn.host(), req.path());
        import_path(conn.host(), req.path())
    };

    let Some(repo) = data.registry.lookup(&path).await else {
        info!("No repository for {}", path);
        return HttpResponse::NotFound().finish();
    };

    let rendered = data.jinja.get_template(TEMPLATE_GOGET).and_then(|tp| {
        tp.render(context! {
            repo => TemplateRepoContext::from(&repo),
        })
    });

    match rendered {
        Ok(body) => {
            info!("Resolved {} -> {}", path, repo.clone_url());
            HttpResponse::Ok()
                .content_type(ContentType::html())
                .body(body)
        }
        Err(e) => {
            error!("Failed to render go-get template for {}: {}", path, e);
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn import_paths() {
        assert_eq!(
            import_path("go.acme.example", "/widget/v2/sub"),
            "go.acme.example/widget/v2/sub"
        );
        assert_eq!(import_path("go.acme.example:8080", "/widget/"), "go.acme.example/widget");
        assert_eq!(import_path("go.acme.example", "/"), "go.acme.example");
    }

    #[test]
    fn goget_query() {
        let req = TestRequest::get().uri("/widget?go-get=1").to_http_request();
        assert!(is_goget_request(&req));

        let req = TestRequest::get().uri("/widget?foo=bar&go-get=1").to_http_request();
        assert!(is_goget_request(&req));

        let req = TestRequest::get().uri("/widget?go-get=0").to_http_request();
        assert!(!is_goget_request(&req));

        let req = TestRequest::get().uri("/widget").to_http_request();
        assert!(!is_goget_request(&req));
    }
}
