//! LED Ring HTTP Control Server
//!
//! Drives the three-strip ring face and accepts pattern changes from any
//! device on the LAN.
//!
//! ## Architecture
//! - **Render thread** (std::thread): owns the frame buffer, ticks the
//!   active pattern, commits frames
//! - **HTTP server** (tokio/axum): reads and switches the pattern
//! - **Connectivity task** (tokio): shows the connecting indicator while
//!   the network is down
//!
//! The only state they share is the `ModeController`.
//!
//! ## Usage
//! ```sh
//! ./target/release/led-ring-rs --port 8080 --probe-addr 1.1.1.1:53
//! ```

use clap::Parser;
use led_ring_rs::frame::TracingSink;
use led_ring_rs::mode::ModeController;
use led_ring_rs::network::Connectivity;
use led_ring_rs::render::render_loop;
use led_ring_rs::server::{self, AppState};
use led_ring_rs::{is_running, setup_signal_handler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// LED Ring HTTP Control Server
#[derive(Parser)]
#[command(name = "led-ring-rs")]
#[command(about = "HTTP control server for a three-strip LED ring clock")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,

    /// host:port to connect to when checking the network. Without it the
    /// network is assumed up.
    #[arg(long)]
    probe_addr: Option<String>,

    /// Seconds between connectivity checks while the network is up
    #[arg(long, default_value = "60")]
    probe_interval_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false) // Disable ANSI color codes for systemd/journald
        .compact()
        .init();

    tracing::info!("LED Ring HTTP Server v{}", env!("CARGO_PKG_VERSION"));

    let running = setup_signal_handler()?;

    // Starts on the connecting indicator; the connectivity task releases it.
    let modes = Arc::new(ModeController::default());

    let render_modes = modes.clone();
    let render_running = running.clone();
    // Host build: frames are logged. A board build passes a `StripSink`
    // wrapping its strip drivers instead.
    let render_handle = std::thread::spawn(move || {
        render_loop(render_modes, TracingSink::new(), render_running);
    });

    let connectivity = Connectivity::new(
        args.probe_addr,
        Duration::from_secs(args.probe_interval_secs),
    );
    tokio::spawn(connectivity.run(modes.clone(), running.clone()));

    let app = server::create_router(AppState { modes });

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API Documentation: http://localhost:{}/docs", args.port);
    tracing::info!("Try: curl http://localhost:{}/api/v1/pattern", args.port);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_stop(running.clone()))
        .await;

    // Stop the render thread even if the server failed.
    running.store(false, Ordering::SeqCst);
    if render_handle.join().is_err() {
        tracing::error!("Render thread panicked");
    }

    served?;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn wait_for_stop(running: Arc<AtomicBool>) {
    while is_running(&running) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tracing::info!("Shutdown requested");
}
