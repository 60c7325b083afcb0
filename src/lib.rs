//! # OSC Volume Bridge
//!
//! Remote control of Windows system audio over OSC (Open Sound Control).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────┐   UDP datagram    ┌──────────────────────────────────────┐
//! │  OSC client   │ ────────────────▶ │  OscListener (network::listener)     │
//! │ (fader, app)  │   one-way only    │  socket thread: recv → decode        │
//! └───────────────┘                   └──────────────────┬───────────────────┘
//!                                                        │ InboundMessage
//!                                                        ▼
//!                                     ┌──────────────────────────────────────┐
//!                                     │  Dispatcher (dispatch)               │
//!                                     │  RouteTable: exact, then wildcard    │
//!                                     │  failure boundary + one log line     │
//!                                     └──────────────────┬───────────────────┘
//!                                                        │ normalize::*
//!                                                        ▼
//!                                     ┌──────────────────────────────────────┐
//!                                     │  AudioControl (audio)                │
//!                                     │  per-call ThreadScope (COM)          │
//!                                     │  endpoint volume / session volume    │
//!                                     └──────────────────────────────────────┘
//!
//!   ServerController (server) owns start/stop/restart of the listener and
//!   is the only handle GUI/tray collaborators need.
//! ```
//!
//! ## Protocol
//!
//! | Address              | Arguments          | Effect                        |
//! |----------------------|--------------------|-------------------------------|
//! | `/ping`              | any                | logged liveness check         |
//! | `/master/volume`     | volume             | default output volume         |
//! | `/master/mute`       | flag               | default output mute           |
//! | `/mic/volume`        | volume             | default input volume          |
//! | `/mic/mute`          | flag               | default input mute            |
//! | `/app/volume`        | process, volume    | volume of a process' sessions |
//! | `/app/volume/<name>` | volume             | same, name from the address   |
//!
//! Volumes above 1.0 are percentages (`50` and `0.5` are equivalent).

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod network;
pub mod normalize;
pub mod osc;
pub mod server;

pub use error::{Error, Result};
pub use server::{ServerController, ServerState, ServerStatus};

/// Application-wide constants
pub mod constants {
    /// Default UDP port for OSC control
    pub const DEFAULT_OSC_PORT: u16 = 9001;

    /// Default socket read timeout in milliseconds
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 200;

    /// Receive buffer size; larger datagrams are truncated and fail to decode
    pub const MAX_DATAGRAM_SIZE: usize = rosc::decoder::MTU;
}
