//! Datagram decoding
//!
//! One datagram normally carries one OSC message. Bundles are flattened
//! depth-first into their messages; timetags are ignored and everything is
//! applied immediately.

use std::fmt;

use rosc::{decoder, OscPacket};

use super::value::OscValue;
use crate::error::NetworkError;

/// A decoded OSC message ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub address: String,
    pub args: Vec<OscValue>,
}

impl InboundMessage {
    pub fn new(address: impl Into<String>, args: Vec<OscValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.address)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, "]")
    }
}

/// Decode a UDP datagram into the messages it carries
pub fn decode_datagram(datagram: &[u8]) -> Result<Vec<InboundMessage>, NetworkError> {
    let (_, packet) = decoder::decode_udp(datagram)
        .map_err(|e| NetworkError::InvalidPacket(format!("{:?}", e)))?;

    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

fn flatten(packet: OscPacket, out: &mut Vec<InboundMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(InboundMessage {
            address: msg.addr,
            args: msg.args.into_iter().map(OscValue::from).collect(),
        }),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{encoder, OscBundle, OscMessage, OscTime, OscType};

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[test]
    fn test_decode_single_message() {
        let bytes = encoder::encode(&message(
            "/app/volume",
            vec![OscType::String("firefox".into()), OscType::Int(72)],
        ))
        .unwrap();

        let decoded = decode_datagram(&bytes).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].address, "/app/volume");
        assert_eq!(
            decoded[0].args,
            vec![OscValue::Str("firefox".into()), OscValue::Int(72)]
        );
    }

    #[test]
    fn test_decode_nested_bundle_in_order() {
        let inner = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![message("/master/mute", vec![OscType::Bool(true)])],
        });
        let outer = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![message("/ping", vec![]), inner],
        });
        let bytes = encoder::encode(&outer).unwrap();

        let decoded = decode_datagram(&bytes).unwrap();
        let addresses: Vec<_> = decoded.iter().map(|m| m.address.as_str()).collect();
        assert_eq!(addresses, vec!["/ping", "/master/mute"]);
    }

    #[test]
    fn test_garbage_is_invalid_packet() {
        let result = decode_datagram(b"not osc at all");
        assert!(matches!(result, Err(NetworkError::InvalidPacket(_))));
    }

    #[test]
    fn test_display_lists_args() {
        let msg = InboundMessage::new("/master/volume", vec![OscValue::Float(0.5)]);
        assert_eq!(msg.to_string(), "/master/volume [0.5]");
    }
}
