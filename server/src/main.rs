use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use shared::config::load_config;
use shared::{ApiCode, LiveConfig};

use server::cache::MemoryCache;
use server::database::create::{init_schema, open_pool};
use server::handlers::http::routes::{build_router, Router};
use server::handlers::http::utils::api_return;
use server::service::sms::DisabledSms;
use server::AppState;

#[derive(Parser, Debug)]
#[command(about = "Account API server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the listen address from the config, e.g. 0.0.0.0:1337.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let app_config = load_config(&args.config)?;
    let addr = args.bind.unwrap_or_else(|| app_config.server.addr());
    let max_connections = app_config.server.max_connections as u32;

    // Resolved once; SIGHUP reloads deliberately do not rotate the secret,
    // since that would log every user out.
    let secret: Arc<str> = app_config
        .auth
        .resolved_secret()
        .context("no signing secret configured")?
        .into();

    let db = open_pool(&app_config.database.path, max_connections).await?;
    init_schema(&db).await?;

    let state = AppState {
        db,
        cache: Arc::new(MemoryCache::new()),
        config: LiveConfig::new(app_config),
        secret,
        sms: Arc::new(DisabledSms),
    };

    run_startup_checks(&state).await?;

    let router = Arc::new(build_router());
    spawn_reload_task(state.config.clone(), args.config.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Accept failed: {}", e);
                continue;
            }
        };
        debug!("Connection from {}", peer);

        let io = TokioIo::new(stream);
        let state = state.clone();
        let router = router.clone();
        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                let router = router.clone();
                async move { handle(req, state, router).await }
            });
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service)
                .await
            {
                debug!("Error serving connection: {:?}", err);
            }
        });
    }
}

/// Top-level request entry: route, and turn any escaped error into the
/// uniform envelope so a handler bug never drops the connection.
async fn handle(
    req: Request<hyper::body::Incoming>,
    state: AppState,
    router: Arc<Router>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match router.route(req, state).await {
        Ok(res) => Ok(res),
        Err(e) => {
            error!("Unhandled error on {} {}: {:#}", method, path, e);
            Ok(
                api_return(ApiCode::Err, Some("internal server error"), None)
                    .unwrap_or_else(|_| {
                        Response::new(Full::new(Bytes::from_static(b"")).boxed())
                    }),
            )
        }
    }
}

/// Fail fast if either backing store is broken, instead of serving
/// errors to the first real user.
async fn run_startup_checks(state: &AppState) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .context("database probe failed")?;

    let probe_key = "startup_probe";
    state
        .cache
        .set(probe_key, "ok", None)
        .await
        .context("cache write probe failed")?;
    let read = state.cache.get(probe_key).await?;
    anyhow::ensure!(read.as_deref() == Some("ok"), "cache read probe failed");
    state.cache.delete(probe_key).await?;

    info!("Startup checks passed");
    Ok(())
}

/// Reload the config on SIGHUP.  A config that fails to load or validate
/// is rejected and the server keeps running on the old one.
#[cfg(unix)]
fn spawn_reload_task(config: LiveConfig, path: String) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hup = match signal(SignalKind::hangup()) {
            Ok(sig) => sig,
            Err(e) => {
                warn!("Config reload disabled, SIGHUP handler failed: {}", e);
                return;
            }
        };
        while hup.recv().await.is_some() {
            match load_config(&path) {
                Ok(new) => {
                    config.reload(new).await;
                    info!("Configuration reloaded from {}", path);
                }
                Err(e) => warn!("Configuration reload rejected: {}", e),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_task(_config: LiveConfig, _path: String) {}
