//! JSON text-frame codec for command envelopes.
//!
//! Wire format: one UTF-8 JSON object per websocket text frame, no length
//! prefix, no batching.

use crate::error::{WatchError, WatchResult};
use crate::messages::{Command, Envelope};

/// Largest text frame either side will accept.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Encode a command into a text frame.
pub fn encode(cmd: &Command) -> WatchResult<String> {
    Ok(serde_json::to_string(&Envelope::from(cmd))?)
}

/// Parse a text frame into a raw envelope without interpreting `type`.
pub fn decode_envelope(frame: &str) -> WatchResult<Envelope> {
    if frame.len() > MAX_FRAME_LEN {
        return Err(WatchError::MalformedMessage(format!(
            "frame too large: {} bytes (max {MAX_FRAME_LEN})",
            frame.len()
        )));
    }
    serde_json::from_str(frame).map_err(|e| WatchError::MalformedMessage(e.to_string()))
}

/// Parse a text frame into a typed command.
pub fn decode(frame: &str) -> WatchResult<Command> {
    Command::try_from(decode_envelope(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::VideoAction;

    #[test]
    fn encode_play_matches_wire_shape() {
        let frame = encode(&Command::play("dQw4w9WgXcQ", 42.0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "PLAY", "videoId": "dQw4w9WgXcQ", "currentTime": 42.0})
        );
    }

    #[test]
    fn encode_chat_has_no_video_fields() {
        let frame = encode(&Command::chat("alice", "hi")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "CHAT", "sender": "alice", "message": "hi"})
        );
    }

    #[test]
    fn decode_integer_time() {
        let cmd = decode(r#"{"type":"SEEK","videoId":"abc","currentTime":90}"#).unwrap();
        match cmd {
            Command::Video(v) => {
                assert_eq!(v.action, VideoAction::Seek);
                assert_eq!(v.video_id, "abc");
                assert_eq!(v.current_time, 90.0);
            }
            other => panic!("expected video command, got {other:?}"),
        }
    }

    #[test]
    fn decode_ignores_unknown_fields_and_nulls() {
        let cmd = decode(r#"{"type":"PAUSE","videoId":null,"currentTime":3.5,"extra":[1,2]}"#)
            .unwrap();
        assert_eq!(cmd, Command::pause("", 3.5));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode("not json").unwrap_err().is_malformed());
        assert!(decode(r#"{"videoId":"abc"}"#).unwrap_err().is_malformed());
        assert!(decode(r#"{"type":"REWIND"}"#).unwrap_err().is_malformed());
        assert!(decode(r#"{"type":42}"#).unwrap_err().is_malformed());
    }

    #[test]
    fn decode_tolerates_mistyped_unrelated_fields() {
        let chat = decode(r#"{"type":"CHAT","sender":"a","message":"b","currentTime":"x"}"#)
            .unwrap();
        assert_eq!(chat, Command::chat("a", "b"));

        let play = decode(r#"{"type":"PLAY","videoId":"dQw4w9WgXcQ","currentTime":1,"sender":42}"#)
            .unwrap();
        assert_eq!(play, Command::play("dQw4w9WgXcQ", 1.0));
    }

    #[test]
    fn mistyped_fields_read_as_absent() {
        let cmd = decode(r#"{"type":"PLAY","videoId":7,"currentTime":"soon"}"#).unwrap();
        assert_eq!(cmd, Command::play("", 0.0));

        let err = decode(r#"{"type":"CHAT","sender":["a"],"message":"hi"}"#).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let frame = format!(
            r#"{{"type":"CHAT","sender":"a","message":"{}"}}"#,
            "x".repeat(MAX_FRAME_LEN)
        );
        assert!(decode(&frame).is_err());
    }
}
