//! UDP socket setup

use std::net::{SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::warn;

use crate::config::NetworkConfig;
use crate::error::NetworkError;

/// Create a bound UDP socket with the configured read timeout.
///
/// The read timeout bounds how long the receive loop can block, which in
/// turn bounds how long a stop request waits for the loop to exit.
pub fn create_socket(addr: SocketAddr, config: &NetworkConfig) -> Result<UdpSocket, NetworkError> {
    let bind_failed = |source: std::io::Error| NetworkError::BindFailed { addr, source };

    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_failed)?;

    if let Some(size) = config.recv_buffer_size {
        if let Err(e) = socket.set_recv_buffer_size(size) {
            warn!("Could not set receive buffer to {} bytes: {}", size, e);
        }
    }

    socket.bind(&addr.into()).map_err(bind_failed)?;
    socket
        .set_read_timeout(Some(config.read_timeout()))
        .map_err(bind_failed)?;

    Ok(socket.into())
}
