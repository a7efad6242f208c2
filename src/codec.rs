//! Decoding of stored payloads, selected by the flags memcached hands back.

use std::io::Read;

use enum_primitive::FromPrimitive;
use flate2::read::ZlibDecoder;

use crate::constants::Encoding;
use crate::errors::{ErrorKind, Result};

/// Application value every codec decodes into.
pub use serde_json::Value;

pub fn decode(raw: &[u8], flags: u32) -> Result<Value> {
    match Encoding::from_u32(flags) {
        Some(Encoding::Compressed) => {
            let mut inflated = Vec::with_capacity(raw.len() * 2);
            ZlibDecoder::new(raw).read_to_end(&mut inflated)?;
            deserialize(&inflated)
        }
        Some(Encoding::Serialized) => deserialize(raw),
        Some(Encoding::MsgPack) => Ok(rmp_serde::from_slice(raw)?),
        None => {
            debug!("No codec registered for flags {}", flags);
            bail!(ErrorKind::UnsupportedEncoding(flags))
        }
    }
}

// Payloads that are not a JSON document are plain text written by other
// clients and come back as a string.
fn deserialize(raw: &[u8]) -> Result<Value> {
    match serde_json::from_slice(raw) {
        Ok(value) => Ok(value),
        Err(ref e) if e.is_syntax() || e.is_eof() => {
            Ok(Value::String(String::from_utf8(raw.to_vec())?))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use serde_json::json;

    use super::*;
    use crate::errors::Error;

    #[test]
    fn serialized() {
        assert_eq!(decode(b"hello", 4).unwrap(), json!("hello"));
        assert_eq!(decode(b"\"hello\"", 4).unwrap(), json!("hello"));
        assert_eq!(
            decode(br#"{"name":"Testing","age":8}"#, 4).unwrap(),
            json!({"name": "Testing", "age": 8})
        );
        assert_eq!(decode(b"false", 4).unwrap(), json!(false));
        assert_eq!(decode(b"", 4).unwrap(), json!(""));
    }

    #[test]
    fn serialized_rejects_binary() {
        match decode(&[0xff, 0xfe, 0x00], 4) {
            Err(Error(ErrorKind::Utf8(_), _)) => {}
            r => panic!("Expected Utf8 error, got {:?}", r),
        }
    }

    #[test]
    fn compressed() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"[1,2,3]"#).unwrap();
        let raw = encoder.finish().unwrap();
        assert_eq!(decode(&raw, 0).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn compressed_garbage() {
        match decode(b"not zlib at all", 0) {
            Err(Error(ErrorKind::Io(_), _)) => {}
            r => panic!("Expected Io error, got {:?}", r),
        }
    }

    #[test]
    fn msgpack() {
        let value = json!({"name": "Testing", "tags": ["a", "b"], "registered": true});
        let raw = rmp_serde::to_vec(&value).unwrap();
        assert_eq!(decode(&raw, 5).unwrap(), value);
    }

    #[test]
    fn unsupported() {
        for flags in &[1, 2, 3, 99] {
            match decode(b"abc", *flags) {
                Err(Error(ErrorKind::UnsupportedEncoding(f), _)) => assert_eq!(f, *flags),
                r => panic!("Expected UnsupportedEncoding, got {:?}", r),
            }
        }
    }
}
