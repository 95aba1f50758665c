//! Wire protocol spoken with the simulation server
//!
//! The server sends one JSON text message per simulation step:
//!
//! ```json
//! { "time": 0.125, "positions": [[0.0, 1.5, -2.0], ...], "simulator_id": 140230 }
//! ```
//!
//! The client answers with plain-text control tokens: `ok` after every decoded
//! frame to request the next one, and `close` once before hanging up.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Frame, Position};
use crate::{Result, StreamError};

/// Plain-text control messages sent to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlToken {
    /// Acknowledge a frame and request the next one
    Ack,
    /// Announce that the client is closing the session
    Close,
}

impl ControlToken {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlToken::Ack => "ok",
            ControlToken::Close => "close",
        }
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON shape of a frame message
#[derive(Debug, Serialize, Deserialize)]
struct FrameMessage {
    time: f64,
    positions: Vec<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    simulator_id: Option<u64>,
}

/// Decode one server message into a frame
///
/// Fails with [`StreamError::Protocol`] when the message is not JSON, when
/// `time` or `positions` is missing, or when a position is not an `[x, y, z]`
/// triple of numbers.
pub fn decode_frame(text: &str) -> Result<Frame> {
    let message: FrameMessage = serde_json::from_str(text)?;
    if !message.time.is_finite() {
        return Err(StreamError::protocol_error(format!("time is not finite: {}", message.time)));
    }
    Ok(Frame {
        time: message.time,
        positions: message.positions,
        simulator_id: message.simulator_id,
    })
}

/// Encode a frame the way the server does
pub fn encode_frame(frame: &Frame) -> Result<String> {
    let message = FrameMessage {
        time: frame.time,
        positions: frame.positions.clone(),
        simulator_id: frame.simulator_id,
    };
    Ok(serde_json::to_string(&message)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_message() {
        let frame = decode_frame(
            r#"{"time": 0.1, "positions": [[1.0, 2.0, 3.0], [4, 5, 6]], "simulator_id": 140230}"#,
        )
        .unwrap();
        assert_eq!(frame.time, 0.1);
        assert_eq!(frame.positions, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(frame.simulator_id, Some(140230));
    }

    #[test]
    fn simulator_id_is_optional() {
        let frame = decode_frame(r#"{"time": 0.0, "positions": [[0, 0, 0]]}"#).unwrap();
        assert_eq!(frame.simulator_id, None);
        assert_eq!(frame.particle_count(), 1);
    }

    #[test]
    fn malformed_messages_are_protocol_errors() {
        let cases = [
            "not json",
            r#"{"positions": [[0, 0, 0]]}"#,
            r#"{"time": 0.0}"#,
            r#"{"time": "soon", "positions": []}"#,
            r#"{"time": 0.0, "positions": [[0, 0]]}"#,
            r#"{"time": 0.0, "positions": [[0, 0, 0, 0]]}"#,
            r#"{"time": 0.0, "positions": [["a", 0, 0]]}"#,
        ];
        for case in cases {
            let err = decode_frame(case).unwrap_err();
            assert!(matches!(err, StreamError::Protocol { .. }), "{case} gave {err:?}");
        }
    }

    #[test]
    fn encode_matches_server_shape() {
        let frame = Frame::new(0.5, vec![[1.0, 0.0, -1.0]]);
        let text = encode_frame(&frame).unwrap();
        assert_eq!(text, r#"{"time":0.5,"positions":[[1.0,0.0,-1.0]]}"#);
        assert_eq!(decode_frame(&text).unwrap(), frame);
    }

    #[test]
    fn simulator_id_survives_encoding() {
        let frame = Frame::new(0.25, vec![[0.0, 0.0, 0.0]]).with_simulator_id(1000);
        let text = encode_frame(&frame).unwrap();
        assert!(text.contains(r#""simulator_id":1000"#), "{text}");
        assert_eq!(decode_frame(&text).unwrap().simulator_id, Some(1000));
    }

    #[test]
    fn control_tokens_are_plain_text() {
        assert_eq!(ControlToken::Ack.to_string(), "ok");
        assert_eq!(ControlToken::Close.to_string(), "close");
    }
}
