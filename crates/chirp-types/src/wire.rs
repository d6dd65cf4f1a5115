//! Line codec shared by server and client.
//!
//! One message per line: the payload is UTF-8 JSON, base64-encoded so it
//! can never contain a raw newline. Responses are newline-terminated by
//! the writer; the trailing newline is not part of the encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a message for the wire. The caller appends the newline.
pub fn encode<T: Serialize>(message: &T) -> Result<String, WireError> {
    Ok(B64.encode(serde_json::to_vec(message)?))
}

/// Decode one received line. Tolerates the trailing newline left in
/// place by line-oriented readers.
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, WireError> {
    let bytes = B64.decode(line.trim_end())?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Reply;
    use serde_json::{Value, json};

    #[test]
    fn encode_decode_round_trip() {
        let reply = Reply::ok(json!({"auth_token": "abc"}));
        let line = encode(&reply).unwrap();
        assert!(!line.contains('\n'));

        let decoded: Reply = decode(&line).unwrap();
        assert_eq!(decoded.code, 200);
        assert_eq!(decoded.data, json!({"auth_token": "abc"}));
    }

    #[test]
    fn trailing_newline_is_tolerated() {
        let line = encode(&json!({"type": "signup"})).unwrap() + "\n";
        let decoded: Value = decode(&line).unwrap();
        assert_eq!(decoded["type"], "signup");
    }

    #[test]
    fn garbage_base64_is_an_error() {
        assert!(decode::<Value>("not//valid==b64!").is_err());
    }

    #[test]
    fn non_json_payload_is_an_error() {
        let line = B64.encode(b"definitely not json");
        assert!(decode::<Value>(&line).is_err());
    }
}
