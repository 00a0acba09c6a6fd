//! UDP wire format
//!
//! ```text
//! offset  field           type
//! 0       message type    u8     1 = TTL, 2 = Text
//! 1..9    client seconds  f64    little-endian
//! 9       line (TTL)      u8     0-based
//! 10      state (TTL)     u8     nonzero = asserted
//! 9..11   length (Text)   u16    network byte order
//! 11..    text (Text)     UTF-8  `length` bytes
//! ```
//!
//! Every accepted datagram is answered with an 8-byte acknowledgement holding
//! the local receipt time in seconds (f64, little-endian).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::{SoftEvent, SoftPayload};

/// Message type byte for TTL messages
pub const MSG_TTL: u8 = 1;
/// Message type byte for text messages
pub const MSG_TEXT: u8 = 2;
/// Size of a TTL message
pub const TTL_MESSAGE_LEN: usize = 11;
/// Size of a text message header (type + seconds + length)
pub const TEXT_HEADER_LEN: usize = 11;
/// Size of the acknowledgement reply
pub const ACK_LEN: usize = 8;
/// Largest text payload the length field can describe
pub const MAX_TEXT_LEN: usize = u16::MAX as usize;

/// Datagram decode failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Zero-length datagram
    #[error("empty datagram")]
    Empty,

    /// First byte is not a known message type
    #[error("unrecognized message type {0}")]
    UnknownMessageType(u8),

    /// Datagram shorter than its layout requires
    #[error("truncated {kind} message: need {needed} bytes, got {got}")]
    Truncated {
        kind: &'static str,
        needed: usize,
        got: usize,
    },

    /// Text payload is not UTF-8
    #[error("text payload is not valid utf-8")]
    InvalidText,

    /// Client timestamp is NaN or infinite
    #[error("client time {0} is not finite")]
    NonFiniteTime(f64),
}

impl DecodeError {
    /// Short reason label (for metrics)
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::UnknownMessageType(_) => "unknown_type",
            Self::Truncated { .. } => "truncated",
            Self::InvalidText => "invalid_text",
            Self::NonFiniteTime(_) => "non_finite_time",
        }
    }
}

/// Message encode failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Text does not fit the u16 length field
    #[error("text payload of {len} bytes exceeds the u16 length field")]
    TextTooLong { len: usize },
}

/// Decode one datagram into a soft event
///
/// Never reads past `datagram.len()`. Bytes after the declared message are
/// ignored.
pub fn decode(datagram: &[u8]) -> Result<SoftEvent, DecodeError> {
    let Some(&message_type) = datagram.first() else {
        return Err(DecodeError::Empty);
    };

    match message_type {
        MSG_TTL => decode_ttl(datagram),
        MSG_TEXT => decode_text(datagram),
        other => Err(DecodeError::UnknownMessageType(other)),
    }
}

fn decode_ttl(datagram: &[u8]) -> Result<SoftEvent, DecodeError> {
    if datagram.len() < TTL_MESSAGE_LEN {
        return Err(DecodeError::Truncated {
            kind: "ttl",
            needed: TTL_MESSAGE_LEN,
            got: datagram.len(),
        });
    }

    let mut buf = &datagram[1..TTL_MESSAGE_LEN];
    let client_seconds = finite(buf.get_f64_le())?;
    let line = buf.get_u8();
    let state = buf.get_u8() != 0;

    Ok(SoftEvent::ttl(client_seconds, line, state))
}

fn decode_text(datagram: &[u8]) -> Result<SoftEvent, DecodeError> {
    if datagram.len() < TEXT_HEADER_LEN {
        return Err(DecodeError::Truncated {
            kind: "text",
            needed: TEXT_HEADER_LEN,
            got: datagram.len(),
        });
    }

    let mut buf = &datagram[1..];
    let client_seconds = finite(buf.get_f64_le())?;
    let text_len = buf.get_u16() as usize;

    if buf.remaining() < text_len {
        return Err(DecodeError::Truncated {
            kind: "text",
            needed: TEXT_HEADER_LEN + text_len,
            got: datagram.len(),
        });
    }

    let text = std::str::from_utf8(&buf[..text_len]).map_err(|_| DecodeError::InvalidText)?;

    Ok(SoftEvent::text(client_seconds, text))
}

fn finite(client_seconds: f64) -> Result<f64, DecodeError> {
    if client_seconds.is_finite() {
        Ok(client_seconds)
    } else {
        Err(DecodeError::NonFiniteTime(client_seconds))
    }
}

/// Encode a TTL message
pub fn encode_ttl(client_seconds: f64, line: u8, state: bool) -> Bytes {
    let mut buf = BytesMut::with_capacity(TTL_MESSAGE_LEN);
    buf.put_u8(MSG_TTL);
    buf.put_f64_le(client_seconds);
    buf.put_u8(line);
    buf.put_u8(u8::from(state));
    buf.freeze()
}

/// Encode a text message
pub fn encode_text(client_seconds: f64, text: &str) -> Result<Bytes, EncodeError> {
    let len = u16::try_from(text.len()).map_err(|_| EncodeError::TextTooLong { len: text.len() })?;

    let mut buf = BytesMut::with_capacity(TEXT_HEADER_LEN + text.len());
    buf.put_u8(MSG_TEXT);
    buf.put_f64_le(client_seconds);
    buf.put_u16(len);
    buf.put_slice(text.as_bytes());
    Ok(buf.freeze())
}

/// Encode a soft event in its wire layout (receipt time is not transmitted)
pub fn encode(event: &SoftEvent) -> Result<Bytes, EncodeError> {
    match &event.payload {
        SoftPayload::Ttl { line, state } => Ok(encode_ttl(event.client_seconds, *line, *state)),
        SoftPayload::Text(text) => encode_text(event.client_seconds, text),
    }
}

/// Encode the acknowledgement reply
pub fn encode_ack(receipt_seconds: f64) -> [u8; ACK_LEN] {
    receipt_seconds.to_le_bytes()
}

/// Decode an acknowledgement reply
pub fn decode_ack(reply: &[u8]) -> Result<f64, DecodeError> {
    if reply.len() < ACK_LEN {
        return Err(DecodeError::Truncated {
            kind: "ack",
            needed: ACK_LEN,
            got: reply.len(),
        });
    }
    let mut buf = &reply[..ACK_LEN];
    Ok(buf.get_f64_le())
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn finite_seconds() -> impl Strategy<Value = f64> {
        any::<f64>().prop_filter("finite client time", |s| s.is_finite())
    }

    fn non_finite_seconds() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY)
        ]
    }

    fn any_text() -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<char>(), 0..2048).prop_map(String::from_iter)
    }

    proptest! {
        #[test]
        fn prop_ttl_round_trip(seconds in finite_seconds(), line in any::<u8>(), state in any::<bool>()) {
            let event = decode(&encode_ttl(seconds, line, state)).unwrap();
            prop_assert_eq!(event.client_seconds.to_bits(), seconds.to_bits());
            prop_assert_eq!(event.payload, SoftPayload::Ttl { line, state });
        }

        #[test]
        fn prop_text_round_trip(seconds in finite_seconds(), text in any_text()) {
            prop_assume!(text.len() <= MAX_TEXT_LEN);
            let bytes = encode_text(seconds, &text).unwrap();
            prop_assert_eq!(bytes.len(), TEXT_HEADER_LEN + text.len());

            let event = decode(&bytes).unwrap();
            prop_assert_eq!(event.client_seconds.to_bits(), seconds.to_bits());
            prop_assert_eq!(event.payload, SoftPayload::Text(text));
        }

        #[test]
        fn prop_non_finite_time_never_decodes(seconds in non_finite_seconds(), line in any::<u8>()) {
            let result = decode(&encode_ttl(seconds, line, true));
            prop_assert!(matches!(result, Err(DecodeError::NonFiniteTime(_))));
        }

        #[test]
        fn prop_arbitrary_bytes_never_panic(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode(&raw);
            let _ = decode_ack(&raw);
        }
    }
}
