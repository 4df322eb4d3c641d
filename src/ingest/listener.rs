//! UDP telemetry listener
//!
//! Receives one message per datagram on a dedicated thread, decodes it and
//! hands the event to a callback. Malformed datagrams are logged and dropped.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::ListenerConfig;
use crate::error::{ReplayError, Result};
use crate::protocol::parse_payload;
use crate::types::TelemetryEvent;

const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Counters maintained by the receive loop
#[derive(Debug, Default)]
pub struct ListenerStats {
    received: AtomicU64,
    dropped: AtomicU64,
}

impl ListenerStats {
    /// Datagrams decoded and delivered
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Datagrams that failed to decode
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Handle to a running listener thread.
///
/// Dropping the handle shuts the thread down.
#[derive(Debug)]
pub struct UdpListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    stats: Arc<ListenerStats>,
    handle: Option<JoinHandle<()>>,
}

impl UdpListener {
    /// Bind the socket and start the receive thread.
    ///
    /// `on_event` runs on the listener thread for every decoded datagram.
    pub fn bind<F>(config: &ListenerConfig, on_event: F) -> Result<Self>
    where
        F: FnMut(TelemetryEvent) + Send + 'static,
    {
        let addr = config.socket_addr()?;
        let socket = UdpSocket::bind(addr).map_err(|e| {
            ReplayError::Listener(format!("Failed to bind UDP socket on {}: {}", addr, e))
        })?;
        socket.set_read_timeout(Some(config.poll_interval()))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(ListenerStats::default());
        let max_packet_size = config.max_packet_size.max(1);

        let handle = {
            let running = running.clone();
            let stats = stats.clone();
            std::thread::Builder::new()
                .name("udp-listener".to_string())
                .spawn(move || {
                    receive_loop(socket, max_packet_size, running, stats, on_event)
                })
                .map_err(|e| {
                    ReplayError::Listener(format!("Failed to spawn listener thread: {}", e))
                })?
        };

        tracing::info!("UDP listener started on {}", local_addr);
        Ok(Self {
            local_addr,
            running,
            stats,
            handle: Some(handle),
        })
    }

    /// Address the socket is bound to (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &ListenerStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the receive thread and wait for it to exit
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("UDP listener thread panicked");
            }
            tracing::info!("UDP listener on {} stopped", self.local_addr);
        }
    }
}

impl Drop for UdpListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn receive_loop<F>(
    socket: UdpSocket,
    max_packet_size: usize,
    running: Arc<AtomicBool>,
    stats: Arc<ListenerStats>,
    mut on_event: F,
) where
    F: FnMut(TelemetryEvent),
{
    let mut buf = vec![0u8; max_packet_size];

    while running.load(Ordering::SeqCst) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue;
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!("UDP receive failed: {}", e);
                std::thread::sleep(ERROR_BACKOFF);
                continue;
            }
        };

        let message = String::from_utf8_lossy(&buf[..len]);
        match parse_payload(&message) {
            Ok(event) => {
                stats.received.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Received {} from {}", event.kind(), from);
                on_event(event);
            }
            Err(e) => {
                stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropping malformed datagram from {}: {} ({:?})", from, e, message);
            }
        }
    }
}
