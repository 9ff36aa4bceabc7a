use std::{str::FromStr, sync::Arc, time::Duration};

use actix_web::{App, HttpServer, middleware::Compress};
use clap::{Command, arg, crate_authors, crate_description, crate_name, crate_version};
use fern::colors::{Color, ColoredLevelConfig};
use gogetter::{
    conf::{ConfigError, ServerConfig, environment},
    discovery::{discover, spawn_refresh},
    providers::GitHubSource,
    registry::Registry,
    routes::setup_service_config,
};
use log::{LevelFilter, error, info, warn};
use tokio::sync::watch;

fn setup_logger(level: LevelFilter, config: &ServerConfig) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let colors = ColoredLevelConfig::new()
                .info(Color::BrightGreen)
                .error(Color::BrightRed)
                .warn(Color::BrightYellow);
            out.finish(format_args!(
                "[{}] [{}] {}",
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(path) = &config.general.log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}

fn load_config(path: Option<&String>) -> Result<ServerConfig, ConfigError> {
    let config = ServerConfig::load(path.map(String::as_str), environment())?;
    config.validate()?;
    Ok(config)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cmd = Command::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!(","))
        .about(crate_description!())
        .arg(arg!(-c --config <FILE> "Path to a config file").required(false))
        .arg(arg!(-l --log_level <LEVEL> "Sets the logging level").required(false))
        .get_matches();

    let config = match load_config(cmd.get_one::<String>("config")) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to load server configuration: {}", e);
            std::process::exit(1);
        }
    };

    let level = cmd
        .get_one::<String>("log_level")
        .and_then(|v| LevelFilter::from_str(v).ok())
        .unwrap_or(LevelFilter::Info);

    if let Err(e) = setup_logger(level, &config) {
        eprintln!("Failed to set up logging: {}", e);
    }

    let registry = match Registry::new(&config.translators) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            error!("Failed to build registry: {}", e);
            std::process::exit(1);
        }
    };

    let source = match GitHubSource::from_config(&config) {
        Ok(v) => Arc::new(v),
        Err(e) => {
            error!("Failed to set up GitHub client: {}", e);
            std::process::exit(1);
        }
    };

    if config.upstream.hook_secret.is_none() {
        warn!("No hook secret configured; webhook payloads will not be verified");
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    // Ctrl-C during the initial pass aborts it instead of waiting on GitHub
    let initial_shutdown = shutdown_tx.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = initial_shutdown.send(true);
        }
    });

    if let Err(e) = discover(source.as_ref(), &registry, &mut shutdown_rx).await {
        error!("Discovery failed: {}", e);
        std::process::exit(1);
    }
    ctrl_c.abort();

    registry.dump().await;

    let refresh = config.upstream.refresh_interval.map(|secs| {
        info!("Rediscovering every {} seconds", secs);
        spawn_refresh(
            source.clone(),
            registry.clone(),
            Duration::from_secs(secs),
            shutdown_tx.subscribe(),
        )
    });

    let bind = (config.general.bind.clone(), config.general.port);
    info!("HTTP Server Ready: {}:{}", bind.0, bind.1);

    let server_config = config.clone();
    let result = HttpServer::new(move || {
        let registry = registry.clone();
        let source = source.clone();
        let config = server_config.clone();
        App::new().wrap(Compress::default()).configure(move |f| {
            setup_service_config(f, &config, registry, source, None);
        })
    })
    .bind(bind)?
    .run()
    .await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = refresh {
        let _ = handle.await;
    }

    result
}
