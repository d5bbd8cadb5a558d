//! Binary layout of a single [`Val`]
//!
//! # Format
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ Tag (1 byte) │ Payload                                      │
//! └──────────────┴──────────────────────────────────────────────┘
//!
//! Null                     no payload
//! Boolean, Byte            1 byte
//! Short                    2 bytes big-endian
//! Int, Float               4 bytes big-endian
//! Long, Double             8 bytes big-endian
//! Date, Duration           8 bytes big-endian milliseconds
//! String, Error            UTF-8, length implied by the slice
//! Binary                   raw bytes, length implied by the slice
//! ```

use byteorder::{BigEndian, ReadBytesExt};
use planb_core::{Error, Result, Val, ValType};

/// Append `[tag][payload]`
pub fn encode(val: &Val, buf: &mut Vec<u8>) {
    buf.push(val.val_type().tag());
    encode_payload(val, buf);
}

/// Append the payload only
pub fn encode_payload(val: &Val, buf: &mut Vec<u8>) {
    match val {
        Val::Null => {}
        Val::Boolean(v) => buf.push(u8::from(*v)),
        Val::Byte(v) => buf.push(*v as u8),
        Val::Short(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Val::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Val::Long(v) | Val::Date(v) | Val::Duration(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Val::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Val::Double(v) => buf.extend_from_slice(&v.to_be_bytes()),
        Val::String(s) | Val::Error(s) => buf.extend_from_slice(s.as_bytes()),
        Val::Binary(b) => buf.extend_from_slice(b),
    }
}

/// Append `[prefix][tag][payload][suffix]`
///
/// Lets key encoders wrap a value with a discriminator and terminator
/// without an intermediate copy.
pub fn encode_composite(prefix: &[u8], val: &Val, suffix: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(prefix);
    encode(val, buf);
    buf.extend_from_slice(suffix);
}

/// Number of bytes [`encode`] writes for `val`
pub fn encoded_len(val: &Val) -> usize {
    1 + match val {
        Val::String(s) | Val::Error(s) => s.len(),
        Val::Binary(b) => b.len(),
        other => other.val_type().fixed_width().unwrap_or(0),
    }
}

/// Decode `[tag][payload]`
pub fn decode(bytes: &[u8]) -> Result<Val> {
    let kind = decode_type(bytes)?;
    decode_payload(kind, &bytes[1..])
}

/// Read the kind from the leading tag
pub fn decode_type(bytes: &[u8]) -> Result<ValType> {
    let tag = *bytes
        .first()
        .ok_or_else(|| Error::corruption("empty value"))?;
    ValType::from_tag(tag).ok_or_else(|| Error::corruption(format!("unknown value tag {tag}")))
}

/// Decode a payload of a known kind
pub fn decode_payload(kind: ValType, payload: &[u8]) -> Result<Val> {
    if let Some(width) = kind.fixed_width() {
        if payload.len() != width {
            return Err(Error::corruption(format!(
                "{kind} payload is {} bytes, expected {width}",
                payload.len()
            )));
        }
    }
    let mut cursor = payload;
    let val = match kind {
        ValType::Null => Val::Null,
        ValType::Boolean => Val::Boolean(payload[0] != 0),
        ValType::Byte => Val::Byte(cursor.read_i8().map_err(short_read)?),
        ValType::Short => Val::Short(cursor.read_i16::<BigEndian>().map_err(short_read)?),
        ValType::Int => Val::Int(cursor.read_i32::<BigEndian>().map_err(short_read)?),
        ValType::Long => Val::Long(cursor.read_i64::<BigEndian>().map_err(short_read)?),
        ValType::Float => Val::Float(cursor.read_f32::<BigEndian>().map_err(short_read)?),
        ValType::Double => Val::Double(cursor.read_f64::<BigEndian>().map_err(short_read)?),
        ValType::Date => Val::Date(cursor.read_i64::<BigEndian>().map_err(short_read)?),
        ValType::Duration => Val::Duration(cursor.read_i64::<BigEndian>().map_err(short_read)?),
        ValType::String => Val::String(utf8(payload)?),
        ValType::Error => Val::Error(utf8(payload)?),
        ValType::Binary => Val::Binary(payload.to_vec()),
    };
    Ok(val)
}

fn utf8(payload: &[u8]) -> Result<String> {
    String::from_utf8(payload.to_vec()).map_err(|e| Error::corruption(format!("invalid UTF-8: {e}")))
}

fn short_read(e: std::io::Error) -> Error {
    Error::corruption(format!("truncated value: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(val: Val) -> Val {
        let mut buf = Vec::new();
        encode(&val, &mut buf);
        assert_eq!(buf.len(), encoded_len(&val));
        decode(&buf).unwrap()
    }

    #[test]
    fn test_roundtrip_every_kind() {
        let samples = vec![
            Val::Null,
            Val::Boolean(true),
            Val::Boolean(false),
            Val::Byte(-5),
            Val::Short(i16::MIN),
            Val::Int(i32::MAX),
            Val::Long(-1),
            Val::Float(1.25),
            Val::Double(-0.5),
            Val::Date(1_700_000_000_000),
            Val::Duration(90_000),
            Val::String("héllo".to_string()),
            Val::Error("boom".to_string()),
            Val::Binary(vec![0, 1, 2, 0xFF]),
            Val::String(String::new()),
        ];
        for val in samples {
            assert_eq!(roundtrip(val.clone()), val);
        }
    }

    #[test]
    fn test_layout() {
        let mut buf = Vec::new();
        encode(&Val::Int(1), &mut buf);
        assert_eq!(buf, vec![ValType::Int.tag(), 0, 0, 0, 1]);

        buf.clear();
        encode(&Val::String("ab".into()), &mut buf);
        assert_eq!(buf, vec![ValType::String.tag(), b'a', b'b']);
    }

    #[test]
    fn test_composite() {
        let mut buf = vec![9];
        encode_composite(&[0xAA], &Val::Byte(1), &[0xBB, 0xCC], &mut buf);
        assert_eq!(buf, vec![9, 0xAA, ValType::Byte.tag(), 1, 0xBB, 0xCC]);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(decode(&[]), Err(Error::Corruption(_))));
        assert!(matches!(decode(&[200]), Err(Error::Corruption(_))));
        assert!(matches!(
            decode(&[ValType::Long.tag(), 1, 2]),
            Err(Error::Corruption(_))
        ));
        assert!(matches!(
            decode(&[ValType::String.tag(), 0xFF, 0xFE]),
            Err(Error::Corruption(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_long_roundtrip(v in any::<i64>()) {
            prop_assert_eq!(roundtrip(Val::Long(v)), Val::Long(v));
        }

        #[test]
        fn prop_string_roundtrip(s in ".*") {
            prop_assert_eq!(roundtrip(Val::String(s.clone())), Val::String(s));
        }

        #[test]
        fn prop_binary_roundtrip(b in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(roundtrip(Val::Binary(b.clone())), Val::Binary(b));
        }

        #[test]
        fn prop_double_roundtrip_bits(v in any::<f64>()) {
            match roundtrip(Val::Double(v)) {
                Val::Double(out) => prop_assert_eq!(out.to_bits(), v.to_bits()),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
