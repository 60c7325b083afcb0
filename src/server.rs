//! Server lifecycle
//!
//! [`ServerController`] is the one object outside collaborators (a tray icon,
//! a settings window, the CLI) hold. It owns the [`ServerState`] and
//! serializes start/stop so at most one socket is ever bound.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::audio::AudioControl;
use crate::config::NetworkConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::network::{ListenerStats, OscListener};

/// Listener state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    /// Listening on the given (bound) port
    Running(u16),
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Stopped => write!(f, "stopped"),
            ServerState::Running(port) => write!(f, "running on UDP port {}", port),
        }
    }
}

/// State plus traffic counters, for status displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStatus {
    pub state: ServerState,
    pub stats: Option<ListenerStats>,
}

struct Active {
    /// Port passed to `start`, which may be 0
    requested_port: u16,
    listener: OscListener,
}

struct Inner {
    active: Option<Active>,
    last_port: u16,
}

/// Start/stop controller for the OSC listener
pub struct ServerController {
    config: NetworkConfig,
    dispatcher: Arc<Dispatcher>,
    inner: Mutex<Inner>,
}

impl ServerController {
    pub fn new(config: NetworkConfig, audio: Arc<dyn AudioControl>) -> Self {
        Self::with_dispatcher(config, Arc::new(Dispatcher::new(audio)))
    }

    pub fn with_dispatcher(config: NetworkConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let last_port = config.port;
        Self {
            config,
            dispatcher,
            inner: Mutex::new(Inner {
                active: None,
                last_port,
            }),
        }
    }

    /// Start listening on `port`.
    ///
    /// A no-op when already running on that port, whether it was requested
    /// explicitly or assigned by the OS for port 0. When running on another
    /// port the current listener is fully stopped before the new port is
    /// bound. A bind failure is returned and leaves the server stopped.
    pub fn start(&self, port: u16) -> Result<ServerState> {
        let mut inner = self.inner.lock();

        if let Some(active) = &inner.active {
            if active.requested_port == port || active.listener.port() == port {
                debug!("Start on port {} ignored, already running", port);
                return Ok(ServerState::Running(active.listener.port()));
            }
            info!(
                "Moving OSC listener from port {} to {}",
                active.listener.port(),
                port
            );
        }
        if let Some(mut previous) = inner.active.take() {
            previous.listener.stop();
        }

        let listener = OscListener::bind(
            self.config.socket_addr(port),
            &self.config,
            self.dispatcher.clone(),
        )?;
        inner.last_port = port;
        let state = ServerState::Running(listener.port());
        inner.active = Some(Active {
            requested_port: port,
            listener,
        });
        Ok(state)
    }

    /// Start on the configured port
    pub fn start_default(&self) -> Result<ServerState> {
        self.start(self.config.port)
    }

    /// Stop listening. Returns once the receive thread has exited; a no-op
    /// when already stopped.
    pub fn stop(&self) -> ServerState {
        let mut inner = self.inner.lock();
        if let Some(mut active) = inner.active.take() {
            active.listener.stop();
        }
        ServerState::Stopped
    }

    /// Stop, then start again on the most recently bound requested port
    pub fn restart(&self) -> Result<ServerState> {
        let port = {
            let mut inner = self.inner.lock();
            if let Some(mut active) = inner.active.take() {
                active.listener.stop();
            }
            inner.last_port
        };
        self.start(port)
    }

    pub fn state(&self) -> ServerState {
        match &self.inner.lock().active {
            Some(active) => ServerState::Running(active.listener.port()),
            None => ServerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    pub fn status(&self) -> ServerStatus {
        let inner = self.inner.lock();
        match &inner.active {
            Some(active) => ServerStatus {
                state: ServerState::Running(active.listener.port()),
                stats: Some(active.listener.stats()),
            },
            None => ServerStatus {
                state: ServerState::Stopped,
                stats: None,
            },
        }
    }
}

impl Drop for ServerController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockAudio;
    use rosc::{encoder, OscMessage, OscPacket};
    use std::net::{Ipv4Addr, UdpSocket};
    use std::time::{Duration, Instant};

    fn controller() -> ServerController {
        let config = NetworkConfig {
            bind_address: Ipv4Addr::LOCALHOST.into(),
            read_timeout_ms: 50,
            ..Default::default()
        };
        ServerController::new(config, Arc::new(MockAudio::new()))
    }

    fn ping(port: u16) {
        let packet = OscPacket::Message(OscMessage {
            addr: "/ping".to_string(),
            args: vec![],
        });
        let bytes = encoder::encode(&packet).unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&bytes, ("127.0.0.1", port)).unwrap();
    }

    fn messages_seen(server: &ServerController, count: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if server.status().stats.map(|s| s.messages) == Some(count) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_initial_state_is_stopped() {
        let server = controller();
        assert_eq!(server.state(), ServerState::Stopped);
        assert_eq!(server.stop(), ServerState::Stopped);
        assert_eq!(server.status().stats, None);
    }

    #[test]
    fn test_ephemeral_port_start_twice_is_noop() {
        let server = controller();
        let first = server.start(0).unwrap();
        let second = server.start(0).unwrap();
        assert_eq!(first, second);
        assert!(matches!(first, ServerState::Running(port) if port != 0));
    }

    #[test]
    fn test_bind_failure_leaves_stopped() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = controller();
        let err = server.start(port).unwrap_err();
        assert!(err.is_bind_error());
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[test]
    fn test_restart_keeps_port() {
        let server = controller();
        let ServerState::Running(port) = server.start(0).unwrap() else {
            panic!("not running");
        };
        server.stop();

        // Explicit port so the restart targets the same one
        server.start(port).unwrap();
        assert_eq!(server.restart().unwrap(), ServerState::Running(port));
        assert_eq!(server.state().to_string(), format!("running on UDP port {}", port));
    }

    #[test]
    fn test_start_on_assigned_port_keeps_listener() {
        let server = controller();
        let ServerState::Running(port) = server.start(0).unwrap() else {
            panic!("not running");
        };
        ping(port);
        assert!(messages_seen(&server, 1));

        // Same socket as before: the counters survive
        assert_eq!(server.start(port).unwrap(), ServerState::Running(port));
        assert_eq!(server.status().stats.map(|s| s.messages), Some(1));
    }

    #[test]
    fn test_failed_start_does_not_change_restart_port() {
        let server = controller();
        let ServerState::Running(port) = server.start(0).unwrap() else {
            panic!("not running");
        };
        server.stop();
        server.start(port).unwrap();
        server.stop();

        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let busy = taken.local_addr().unwrap().port();
        assert!(server.start(busy).unwrap_err().is_bind_error());

        assert_eq!(server.restart().unwrap(), ServerState::Running(port));
    }
}
