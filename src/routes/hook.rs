//! GitHub webhook receiver.

use actix_web::{
    HttpRequest, HttpResponse, ResponseError,
    http::{StatusCode, header::CONTENT_TYPE},
    web,
};
use log::{debug, error, info, warn};

use crate::{
    discovery::discover_installation,
    hooks::{DELIVERY_HEADER, EVENT_HEADER, HookError, HookEvent, SIGNATURE_HEADER, payload_json, verify_signature},
    providers::RepositorySource,
    routes::RouteSharedData,
};

impl ResponseError for HookError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

fn header<'r>(req: &'r HttpRequest, name: &str) -> Option<&'r str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

pub async fn receive_hook<'a, S: RepositorySource>(
    data: web::Data<RouteSharedData<'a, S>>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, HookError> {
    let event = header(&req, EVENT_HEADER).unwrap_or_default();

    if HookEvent::is_deprecated(event) {
        debug!("Skipping deprecated event: {}", event);
        return Ok(HttpResponse::Ok().finish());
    }

    info!(
        "Received event: {} (delivery {})",
        event,
        header(&req, DELIVERY_HEADER).unwrap_or("-")
    );

    if let Some(secret) = &data.config.upstream.hook_secret {
        if let Err(e) = verify_signature(secret, header(&req, SIGNATURE_HEADER), &body) {
            error!("Failed payload validation: {}", e);
            return Err(e);
        }
    }

    let event = payload_json(header(&req, CONTENT_TYPE.as_str()), &body)
        .and_then(|payload| HookEvent::parse(event, &payload))
        .map_err(|e| {
            error!("{}", e);
            e
        })?;

    apply_event(&data, event).await;

    Ok(HttpResponse::Ok().finish())
}

/// Feeds a decoded event into the registry.
pub async fn apply_event<'a, S: RepositorySource>(
    data: &RouteSharedData<'a, S>,
    event: HookEvent,
) {
    match event {
        HookEvent::Installation {
            action,
            installation,
            repositories,
        } => {
            info!(
                "InstallationEvent: installation={} account={:?} action={:?}",
                installation.id, installation.account_login, action
            );
            for repo in &repositories {
                info!("    REPO: id={} {}", repo.id, repo.display_name());
            }

            match action.as_str() {
                "created" => {
                    if let Err(e) =
                        discover_installation(data.source.as_ref(), &data.registry, &installation)
                            .await
                    {
                        error!("Failed to discover installation {}: {}", installation.id, e);
                    }
                }
                "deleted" => {
                    for repo in &repositories {
                        data.registry.delete(repo.id).await;
                    }
                }
                _ => {}
            }
        }

        HookEvent::InstallationRepositories {
            action,
            installation,
            added,
            removed,
        } => {
            info!(
                "InstallationRepositoriesEvent: installation={} action={:?}",
                installation.id, action
            );
            for repo in &added {
                info!("    ADD: id={} {}", repo.id, repo.display_name());
            }
            for repo in &removed {
                info!("    REM: id={} {}", repo.id, repo.display_name());
                data.registry.delete(repo.id).await;
            }

            // Installation payloads trim repositories down to names, so the
            // full records (language included) have to be listed again.
            if !added.is_empty() {
                if let Err(e) =
                    discover_installation(data.source.as_ref(), &data.registry, &installation).await
                {
                    error!("Failed to refresh installation {}: {}", installation.id, e);
                }
            }
        }

        HookEvent::Repository { action, repository } => {
            debug!(
                "RepositoryEvent: repo={:?} id={} action={:?}",
                repository.display_name(),
                repository.id,
                action
            );
            data.registry
                .update_repo(&repository, action == "deleted")
                .await;
        }

        HookEvent::Ping { zen } => {
            info!("Ping: {}", zen);
        }

        HookEvent::Other(name) => {
            warn!("Unhandled event: {:?}", name);
        }
    }
}
