//! Connectivity watchdog: shows the connecting indicator while the network
//! is down.
//!
//! While the probe fails the mode is forced to WIFI once a second, so the
//! display keeps saying "connecting" even if someone picks a pattern in the
//! meantime. Once the probe succeeds the indicator is released to OFF and
//! the link is re-checked at a slower interval.

use crate::mode::{Mode, ModeController};
use crate::{Error, Result, is_running};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::net::TcpStream;

/// How often to retry while the network is down.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);
/// How long a single probe may take.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Open a TCP connection to `addr` and drop it.
pub async fn probe(addr: &str, timeout: Duration) -> Result<()> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(Error::Probe(format!("{addr}: {e}"))),
        Err(_) => Err(Error::Probe(format!("{addr}: no answer within {timeout:?}"))),
    }
}

/// Watches the network and drives the WIFI indicator.
#[derive(Clone, Debug)]
pub struct Connectivity {
    /// `host:port` to probe; `None` treats the network as always up
    probe_addr: Option<String>,
    /// Re-check period once the link is healthy
    healthy_interval: Duration,
}

impl Connectivity {
    pub fn new(probe_addr: Option<String>, healthy_interval: Duration) -> Self {
        Self {
            probe_addr,
            healthy_interval,
        }
    }

    pub async fn is_up(&self) -> bool {
        let Some(addr) = &self.probe_addr else {
            return true;
        };
        match probe(addr, PROBE_TIMEOUT).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("{}", e);
                false
            }
        }
    }

    /// Probe once, update the mode, and return how long to wait before
    /// the next check.
    pub async fn check_once(&self, modes: &ModeController) -> Duration {
        if self.is_up().await {
            if modes.release_wifi() {
                tracing::info!("Network up, leaving connecting indicator");
            }
            self.healthy_interval
        } else {
            tracing::info!("Waiting for network...");
            modes.set(Mode::Wifi);
            RETRY_INTERVAL
        }
    }

    /// Keep checking until `running` goes false.
    pub async fn run(self, modes: Arc<ModeController>, running: Arc<AtomicBool>) {
        match &self.probe_addr {
            Some(addr) => tracing::info!("Probing {} for connectivity", addr),
            None => tracing::info!("No probe address, assuming network is up"),
        }
        while is_running(&running) {
            let wait = self.check_once(&modes).await;
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    async fn open_port() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    async fn closed_port() -> String {
        let (listener, addr) = open_port().await;
        drop(listener);
        addr
    }

    #[tokio::test]
    async fn probe_succeeds_against_listener() {
        let (_listener, addr) = open_port().await;
        probe(&addr, PROBE_TIMEOUT).await.unwrap();
    }

    #[tokio::test]
    async fn probe_fails_against_closed_port() {
        let addr = closed_port().await;
        let err = probe(&addr, PROBE_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[tokio::test]
    async fn no_probe_address_releases_wifi_immediately() {
        let modes = ModeController::default();
        let net = Connectivity::new(None, Duration::from_secs(60));
        let wait = net.check_once(&modes).await;
        assert_eq!(modes.current(), Mode::Off);
        assert_eq!(wait, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn healthy_network_leaves_chosen_pattern_alone() {
        let (_listener, addr) = open_port().await;
        let modes = ModeController::new(Mode::Flower);
        let net = Connectivity::new(Some(addr), Duration::from_secs(5));
        net.check_once(&modes).await;
        assert_eq!(modes.current(), Mode::Flower);
    }

    #[tokio::test]
    async fn lost_network_forces_wifi_indicator() {
        let addr = closed_port().await;
        let modes = ModeController::new(Mode::Sweep);
        let net = Connectivity::new(Some(addr), Duration::from_secs(60));
        let wait = net.check_once(&modes).await;
        assert_eq!(modes.current(), Mode::Wifi);
        assert_eq!(wait, RETRY_INTERVAL);
    }

    #[tokio::test]
    async fn run_exits_when_stopped() {
        let modes = Arc::new(ModeController::default());
        let running = Arc::new(AtomicBool::new(false));
        Connectivity::new(None, Duration::from_secs(60))
            .run(modes.clone(), running)
            .await;
        assert_eq!(modes.current(), Mode::Wifi);
    }
}
