//! OSC receive loop
//!
//! Each listener owns one bound socket and one dedicated thread. Messages
//! are dispatched inline on that thread, so once [`OscListener::stop`]
//! returns the thread has been joined and no further audio side effects can
//! happen.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::NetworkError;
use crate::network::udp::create_socket;
use crate::osc::decode_datagram;

/// Pause after a hard receive error so a persistently failing socket
/// does not spin the thread
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Snapshot of listener counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub datagrams: u64,
    pub messages: u64,
    pub handled: u64,
    pub unmatched: u64,
    pub rejected: u64,
    pub failed: u64,
    pub decode_errors: u64,
}

#[derive(Default)]
struct Counters {
    datagrams: AtomicU64,
    messages: AtomicU64,
    handled: AtomicU64,
    unmatched: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
    decode_errors: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &DispatchOutcome) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            DispatchOutcome::Handled(_) => &self.handled,
            DispatchOutcome::Unmatched => &self.unmatched,
            DispatchOutcome::Rejected(_) => &self.rejected,
            DispatchOutcome::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ListenerStats {
        ListenerStats {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// A running OSC listener bound to one UDP port
pub struct OscListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    thread_handle: Option<JoinHandle<()>>,
}

impl OscListener {
    /// Bind `addr` and start the receive thread.
    ///
    /// Binding happens on the caller's thread so a busy port is reported
    /// synchronously.
    pub fn bind(
        addr: SocketAddr,
        config: &NetworkConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, NetworkError> {
        let socket = create_socket(addr, config)?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| NetworkError::BindFailed { addr, source })?;

        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let loop_running = running.clone();
        let loop_counters = counters.clone();
        let handle = thread::Builder::new()
            .name(format!("osc-listener-{}", local_addr.port()))
            .spawn(move || receive_loop(socket, dispatcher, loop_running, loop_counters))
            .map_err(|e| NetworkError::SpawnFailed(e.to_string()))?;

        info!("OSC listener bound on udp://{}", local_addr);

        Ok(Self {
            local_addr,
            running,
            counters,
            thread_handle: Some(handle),
        })
    }

    /// Stop receiving and wait for the thread to exit. The socket is closed
    /// by the time this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("OSC listener thread on {} panicked", self.local_addr);
            }
            info!("OSC listener on udp://{} stopped", self.local_addr);
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some() && self.running.load(Ordering::SeqCst)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn stats(&self) -> ListenerStats {
        self.counters.snapshot()
    }
}

impl Drop for OscListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(
    socket: UdpSocket,
    dispatcher: Arc<Dispatcher>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::Relaxed) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                if let Some(delay) = receive_backoff(&e) {
                    warn!("OSC receive error: {}", e);
                    thread::sleep(delay);
                }
                continue;
            }
        };
        counters.datagrams.fetch_add(1, Ordering::Relaxed);

        let messages = match decode_datagram(&buf[..len]) {
            Ok(messages) => messages,
            Err(e) => {
                counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Dropped {} byte datagram from {}: {}", len, src, e);
                continue;
            }
        };

        for message in &messages {
            debug!("OSC from {}: {}", src, message);
            let outcome = dispatcher.dispatch(message);
            counters.record(&outcome);
        }
    }
}

/// How long to wait before the next receive after `e`. `None` for
/// timeouts and for the ICMP port-unreachable resets Windows reports on
/// UDP sockets.
fn receive_backoff(e: &std::io::Error) -> Option<Duration> {
    match e.kind() {
        ErrorKind::WouldBlock
        | ErrorKind::TimedOut
        | ErrorKind::Interrupted
        | ErrorKind::ConnectionReset => None,
        _ => Some(RECEIVE_ERROR_BACKOFF),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioCall, MockAudio};
    use rosc::{encoder, OscMessage, OscPacket, OscType};
    use std::io;
    use std::time::Instant;

    fn send(to: SocketAddr, addr: &str, args: Vec<OscType>) {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        });
        let bytes = encoder::encode(&packet).unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&bytes, to).unwrap();
    }

    fn wait_until(mut pred: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if pred() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        pred()
    }

    #[test]
    fn test_listener_dispatches_and_counts() {
        let audio = Arc::new(MockAudio::new());
        let dispatcher = Arc::new(Dispatcher::new(audio.clone()));
        let mut listener = OscListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            &NetworkConfig::default(),
            dispatcher,
        )
        .unwrap();
        let to = listener.local_addr();

        send(to, "/master/volume", vec![OscType::Int(50)]);
        let calls = audio.wait_for_calls(1, Duration::from_secs(2));
        assert_eq!(calls, vec![AudioCall::MasterVolume(0.5)]);

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(b"garbage", to).unwrap();
        assert!(wait_until(|| listener.stats().decode_errors == 1));

        listener.stop();
        assert!(!listener.is_running());
        let stats = listener.stats();
        assert_eq!(stats.datagrams, 2);
        assert_eq!(stats.handled, 1);
    }

    #[test]
    fn test_receive_backoff() {
        for kind in [ErrorKind::WouldBlock, ErrorKind::TimedOut, ErrorKind::ConnectionReset] {
            assert_eq!(receive_backoff(&io::Error::from(kind)), None, "{kind:?}");
        }
        assert_eq!(
            receive_backoff(&io::Error::from(ErrorKind::PermissionDenied)),
            Some(RECEIVE_ERROR_BACKOFF)
        );
        assert!(RECEIVE_ERROR_BACKOFF >= Duration::from_millis(10));
    }
}
