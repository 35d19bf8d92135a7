mod auth;
mod performance;

use std::{future::IntoFuture, net::SocketAddr};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  http::{HeaderValue, Method, header},
  routing::{get, post},
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

fn cors(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
  let layer = CorsLayer::new()
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

  Ok(match origin {
    Some(origin) => layer
      .allow_origin(
        HeaderValue::from_str(origin).context("Invalid FRONTEND_URL")?,
      )
      .allow_credentials(true),
    None => layer.allow_origin(Any),
  })
}

pub fn router(app: Arc<AppState>) -> anyhow::Result<Router> {
  let cors = cors(app.config.cors_origin.as_deref())?;

  Ok(
    Router::new()
      .route("/health", get(health))
      .route("/api/auth/register", post(auth::register))
      .route("/api/auth/login", post(auth::login))
      .route("/api/auth/users", get(auth::users))
      .route("/api/auth/users/{id}", get(auth::profile).put(auth::update))
      .route("/api/performance/add", post(performance::add))
      .route("/api/performance/user/{user_id}", get(performance::sessions))
      .route(
        "/api/performance/improvement/{user_id}",
        get(performance::improvement),
      )
      .layer(DefaultBodyLimit::max(app.config.body_limit))
      .layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors),
      )
      .with_state(app),
  )
}

async fn health() -> &'static str {
  "OK"
}

pub async fn serve(app: Arc<AppState>) -> anyhow::Result<()> {
  let config = &app.config;

  let governor_conf = Arc::new(
    GovernorConfigBuilder::default()
      .per_second(config.rate_limit.per_second)
      .burst_size(config.rate_limit.burst)
      .finish()
      .context("Failed to build rate limiter config")?,
  );
  let limiter = governor_conf.limiter().clone();

  let router = router(app.clone())?
    .layer(GovernorLayer::new(governor_conf))
    .into_make_service_with_connect_info::<SocketAddr>();

  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .with_context(|| format!("Failed to bind {addr}"))?;
  info!("HTTP server listening on {addr}");

  let limiter = async {
    loop {
      time::sleep(Duration::from_secs(60)).await;
      limiter.retain_recent();
    }
  };

  let server = async {
    let serve = axum::serve(listener, router);
    let result = if config.graceful_shutdown {
      serve.with_graceful_shutdown(shutdown_signal()).await
    } else {
      tokio::select! {
        result = serve.into_future() => result,
        _ = shutdown_signal() => Ok(()),
      }
    };
    result.context("Axum server error")
  };

  tokio::select! {
    result = server => {
      match &result {
        Ok(()) => info!("Server stopped gracefully"),
        Err(err) => error!("Server stopped with error: {err}"),
      }
      result
    }
    _ = limiter => {
      error!("Rate limiter cleaner stopped unexpectedly!");
      Ok(())
    }
  }
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(err) = signal::ctrl_c().await {
      error!("Failed to listen for Ctrl+C: {err}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut stream) => {
        stream.recv().await;
      }
      Err(err) => {
        error!("Failed to listen for SIGTERM: {err}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!("Shutdown signal received");
}
