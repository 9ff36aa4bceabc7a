use actix_web::{HttpRequest, HttpResponse, Responder, http::header::ContentType, web};
use log::{debug, error};
use minijinja::context;

use crate::{
    providers::RepositorySource,
    routes::{
        RouteSharedData,
        goget::{is_goget_request, resolve_import},
    },
    templates::TEMPLATE_INDEX,
};

/// Catch-all GET handler: go-get lookups on any path, the index on `/`.
pub async fn get_index<'a, S: RepositorySource>(
    data: web::Data<RouteSharedData<'a, S>>,
    req: HttpRequest,
) -> impl Responder {
    if is_goget_request(&req) {
        return resolve_import(&data, &req).await;
    }

    if req.path() != "/" && req.path() != "/index" {
        debug!("Not a go-get request: {}", req.uri());
        return HttpResponse::NotFound().finish();
    }

    debug!("Index requested");
    let packages = data.registry.package_count().await;
    let server = data
        .config
        .template_server_context(data.registry.prefixes().to_vec());

    let rendered = data.jinja.get_template(TEMPLATE_INDEX).and_then(|tp| {
        tp.render(context! {
            server => server,
            packages => packages,
        })
    });

    match rendered {
        Ok(body) => HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(body),
        Err(e) => {
            error!("Failed to render index: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
