use std::sync::Arc;

use actix_web::{
    HttpResponse,
    web::{self, ServiceConfig},
};
use minijinja::Environment;

use crate::{conf::ServerConfig, providers::RepositorySource, registry::Registry};

pub mod goget;
pub mod hook;
pub mod server;

/// This serves as state for the Actix server.
pub struct RouteSharedData<'a, S: RepositorySource> {
    pub registry: Arc<Registry>,
    /// Used to list repositories of installations that appear after startup.
    pub source: Arc<S>,
    pub config: ServerConfig,
    pub jinja: Environment<'a>,
}

/* -------------------------------------------------------------------------- */
/*                                Registration                                */
/* -------------------------------------------------------------------------- */

/// Register default routes for the server to an Actix configuration.
fn register_routes_to_config<'a, S: RepositorySource + Send + Sync + 'static>(
    config: &'a mut ServiceConfig,
) -> &'a mut ServiceConfig {
    config
        .service(
            web::resource("/hook")
                .route(web::post().to(hook::receive_hook::<S>))
                .default_service(web::to(HttpResponse::MethodNotAllowed)),
        )
        .route("/{tail:.*}", web::get().to(server::get_index::<S>))
}

pub fn setup_service_config<'a, S: RepositorySource + Send + Sync + 'static>(
    web_config: &'a mut ServiceConfig,
    server_config: &'a ServerConfig,
    registry: Arc<Registry>,
    source: Arc<S>,
    templates: Option<Environment<'static>>,
) -> &'a mut ServiceConfig {
    web_config.app_data(web::Data::new(RouteSharedData {
        registry,
        source,
        jinja: match templates {
            Some(v) => v,
            None => crate::templates::templates_from_builtin(),
        },
        config: server_config.clone(),
    }));
    web_config.configure(|f| {
        register_routes_to_config::<S>(f);
    });

    web_config
}
