//! Network subsystem for the OSC UDP listener

pub mod listener;
pub mod udp;

pub use listener::{ListenerStats, OscListener};
pub use udp::create_socket;
