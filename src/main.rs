#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use fanout_server::config::Config;
use fanout_server::{AppBuilder, telemetry};
use std::net::SocketAddr;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    fanout_server::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_server");
    let (listener, app_router, shutdown_tx, shutdown_rx) = async {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        fanout_server::spawn_signal_handler(shutdown_tx.clone());

        // The registry lives exactly as long as this process; clients re-register after a restart.
        let services = AppBuilder::new(config.clone()).build()?;
        let app_router = fanout_server::api::app_router(&config, services);

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(address = %addr, "listening");
        tracing::info!("Health check: http://{addr}/health");

        Ok::<_, anyhow::Error>((listener, app_router, shutdown_tx, shutdown_rx))
    }
    .instrument(boot_span)
    .await?;

    let mut server_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app_router).with_graceful_shutdown(async move {
        let _ = server_rx.wait_for(|&s| s).await;
    });

    tokio::select! {
        res = server => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Server error");
            }
        }
        () = async {
            let mut rx = shutdown_rx.clone();
            let _ = rx.wait_for(|&s| s).await;
            tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)).await;
        } => {
            tracing::warn!("Timeout waiting for in-flight requests to finish.");
        }
    }

    let _ = shutdown_tx.send(true);
    telemetry_guard.shutdown();
    Ok(())
}
