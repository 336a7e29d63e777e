use std::sync::Arc;

use ari_client::AriClient;
use callgen::config::{load_asterisk_config, load_calls_config};
use callgen::driver::CallDriver;
use callgen::udp_sink;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SOUNDS_DIR: &str = "sounds";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let asterisk = load_asterisk_config().expect("failed to load configs/asterisk.ini");
    let calls = load_calls_config().expect("failed to load configs/calls.ini");

    info!(host = asterisk.host, port = asterisk.port, app = asterisk.app, "connecting to asterisk ari");
    let client = AriClient::connect(&asterisk.host, asterisk.port, &asterisk.username, &asterisk.secret, &asterisk.app);

    let shutdown = CancellationToken::new();
    let udp_handle = tokio::spawn(udp_sink::run(shutdown.clone()));

    let driver = CallDriver::new(client.clone(), calls, SOUNDS_DIR.to_owned(), shutdown.clone());
    let origination_handle = tokio::spawn(driver.clone().run_origination_loop());

    shutdown_signal().await;
    info!("shutting down");
    shutdown.cancel();

    let _ = origination_handle.await;
    let _ = udp_handle.await;
    client.close().await;

    print_stats(&driver);
    Ok(())
}

fn print_stats(driver: &Arc<CallDriver>) {
    println!("sent_calls:\t{}", driver.stats().sent_calls.load(std::sync::atomic::Ordering::SeqCst));
    for (name, value) in driver.stats().snapshot() {
        println!("{name}:\t{value}");
    }
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful
/// shutdown — identical race to the one this workspace's HTTP server uses.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
