//! Service entry point: load configuration, build the provider pipelines,
//! bind a listener, and serve until a shutdown signal arrives.

use std::net::SocketAddr;

use anyhow::Context;
use mediascrape_gateway::config::GatewayConfigBuilder;
use mediascrape_gateway::server::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = GatewayConfigBuilder::new().apply_env_overrides().build();
    let addr: SocketAddr = format!("{}:{}", config.host(), config.port())
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host(), config.port()))?;

    tracing::info!(event = "ServiceStartup", %addr, auth_enabled = config.auth_token().is_some(), "starting gateway");

    let (state, browser_pool) = mediascrape_gateway::build_app_state(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server loop exited with an error")?;

    tracing::info!(event = "ServiceShutdown", "closing browser contexts");
    browser_pool.shutdown().await;

    Ok(())
}

/// Resolves on Ctrl-C (or, on Unix, SIGTERM too) so the graceful-shutdown
/// path always runs, closing browser contexts cleanly instead of leaking
/// the underlying OS processes.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("installing a SIGTERM handler should not fail");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
