use hyper::body::Bytes;
use serde_json::Value;

/// The JSON capability the adapters are given by their caller.
/// Keeps the adapters independent of how the bytes are produced or parsed.
pub trait JsonCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Value, serde_json::Error>;

    fn encode(&self, value: &Value) -> Result<Bytes, serde_json::Error>;
}

/// Compact `serde_json` encoding with no extra whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonCodec;

impl JsonCodec for SerdeJsonCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    fn encode(&self, value: &Value) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(value).map(Bytes::from)
    }
}

/// Renders a payload for the logs: as text if it's UTF-8 or as hex otherwise.
pub(crate) fn printable(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(v) => v.to_owned(),
        Err(_) => format!("(non-UTF-8, hex) {}", hex::encode(payload)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_without_whitespace() {
        let bytes = SerdeJsonCodec.encode(&json!({"a": [1, 2]})).unwrap();
        assert_eq!(bytes.as_ref(), br#"{"a":[1,2]}"#);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(SerdeJsonCodec.decode(b"{\"a\":").is_err());
    }

    #[test]
    fn printable_falls_back_to_hex() {
        assert_eq!(printable(b"abc"), "abc");
        assert_eq!(printable(&[0xff, 0x00]), "(non-UTF-8, hex) ff00");
    }
}
