//! OSC wire handling
//!
//! Decodes UDP datagrams into [`InboundMessage`]s whose arguments are
//! carried as the loosely typed [`OscValue`] variant.

pub mod decode;
pub mod value;

pub use decode::{decode_datagram, InboundMessage};
pub use value::OscValue;
