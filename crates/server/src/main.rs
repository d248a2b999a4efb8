use std::{any::Any, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use clap::Parser;
use control::{
    EventRouter, KeyCapture, LineKeySource, ParameterController, SharedControlState,
    SpawnedContext, Supervisor, SupervisorExit,
};
use mixer::{EngineBackend, SimulatedEngine};
use shared::{
    domain::EngineVariant,
    error::{ApiError, ErrorCode},
    protocol::{ErrorResponse, GetTargetResponse, SetTargetResponse},
};
use tokio::{net::TcpListener, sync::watch};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::{get_target, get_target_route, set_target, set_target_route, ApiContext};
use app_state::AppState;
use config::{load_settings, EngineBackendKind, KeySourceKind, Settings};

/// Drives a mixing engine from media keys and a small HTTP control API.
#[derive(Parser, Debug)]
#[command(name = "mixkeys")]
struct Cli {
    /// Settings file; defaults to ./mixkeys.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind_addr: Option<String>,
    /// Engine to drive; `simulated` is the only one in this build.
    #[arg(long)]
    engine_backend: Option<String>,
    /// `strip` or `bus`.
    #[arg(long)]
    target_kind: Option<String>,
    #[arg(long)]
    target_index: Option<u32>,
    /// Gain change per key press, in dB.
    #[arg(long)]
    gain_step: Option<f64>,
    /// `basic`, `banana` or `potato`.
    #[arg(long)]
    engine_variant: Option<String>,
    /// `stdin` or `none`.
    #[arg(long)]
    key_source: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.bind_addr {
            settings.bind_addr = v.clone();
        }
        if let Some(v) = &self.engine_backend {
            settings.engine_backend = v.clone();
        }
        if let Some(v) = &self.target_kind {
            settings.target_kind = v.clone();
        }
        if let Some(v) = self.target_index {
            settings.target_index = v;
        }
        if let Some(v) = self.gain_step {
            settings.gain_step = v;
        }
        if let Some(v) = &self.engine_variant {
            settings.engine_variant = v.clone();
        }
        if let Some(v) = &self.key_source {
            settings.key_source = v.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    cli.apply(&mut settings);
    let config = settings.resolve()?;
    info!(
        backend = %config.engine_backend,
        variant = %config.engine_variant,
        initial = %config.initial_target,
        gain_step = config.gain_step,
        key_source = %config.key_source,
        "starting mixkeys"
    );

    let engine = open_backend(config.engine_backend, config.engine_variant);
    let state = Arc::new(SharedControlState::new(config.initial_target));
    let (stop, stop_rx) = watch::channel(false);
    let stop = Arc::new(stop);

    let app = build_router(Arc::new(AppState {
        api: ApiContext::new(Arc::clone(&state)),
    }));
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| {
            format!(
                "failed to bind control api on {}; is the port already in use?",
                config.bind_addr
            )
        })?;
    info!(addr = %config.bind_addr, "control api listening");
    let api = tokio::spawn(serve_api(listener, app, stop_rx.clone()));

    let mut supervisor = Supervisor::new(engine, Arc::clone(&state), config.supervisor)
        .monitor_api(SpawnedContext::new("control api", api));
    if config.key_source == KeySourceKind::Stdin {
        let router = EventRouter::new(
            Arc::clone(&state),
            ParameterController::new(config.tuning),
            config.gain_step,
        );
        let capture = KeyCapture::spawn(LineKeySource::stdin(), router)
            .context("failed to start key capture")?;
        info!("reading media keys from stdin");
        supervisor = supervisor.with_key_capture(capture);
    }

    let signal_stop = Arc::clone(&stop);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                let _ = signal_stop.send(true);
            }
            Err(err) => error!(%err, "cannot listen for ctrl-c"),
        }
    });

    let exit = supervisor.run(stop_rx).await;
    let _ = stop.send(true);
    match exit {
        SupervisorExit::Shutdown => {
            info!("shutdown complete");
            Ok(())
        }
        SupervisorExit::ContextDied(name) => anyhow::bail!("{name} stopped unexpectedly"),
    }
}

fn open_backend(kind: EngineBackendKind, variant: EngineVariant) -> Arc<dyn EngineBackend> {
    match kind {
        EngineBackendKind::Simulated => {
            warn!(%variant, "using the simulated engine; no real mixer will be controlled");
            Arc::new(SimulatedEngine::new(variant))
        }
    }
}

async fn serve_api(
    listener: TcpListener,
    app: Router,
    mut stop: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|stopped| *stopped).await;
        })
        .await;
    if let Err(err) = &result {
        error!(%err, "control api failed");
    }
    result
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(set_target_route(), get(http_set_target))
        .route(get_target_route(), get(http_get_target))
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_set_target(
    State(state): State<Arc<AppState>>,
    Path((kind, index)): Path<(String, String)>,
) -> Result<Json<SetTargetResponse>, (StatusCode, Json<ErrorResponse>)> {
    set_target(&state.api, &kind, &index)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn http_get_target(State(state): State<Arc<AppState>>) -> Json<GetTargetResponse> {
    Json(get_target(&state.api).await)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err.into()))
}

fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("control request handler panicked");
    error_response(ApiError::internal("internal error")).into_response()
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
