//! Temporal key codecs
//!
//! A stored key is `[name encoding][time encoding]`. The time is fixed width
//! per store, and every name encoding is prefix-free: no encoded name is a
//! proper prefix of another. All versions of a name are therefore contiguous
//! and sorted by time, and a backward scan from `[name][t]` meets the latest
//! version at or before `t` first.
//!
//! # Name encodings
//!
//! | Encoding           | Layout                                          |
//! |--------------------|-------------------------------------------------|
//! | boolean … double   | order-preserving big-endian, fixed width        |
//! | string             | UTF-8, `0x00` terminator                        |
//! | uid lookup         | 4-byte id                                       |
//! | hash lookup        | 4- or 8-byte id                                 |
//! | variable           | `[0][tag][payload][0x00 if variable length]`,   |
//! |                    | `[1][uid id]` or `[2][hash id]`                 |
//!
//! Dictionary-backed names store the value-codec encoding of the name, so the
//! name's kind survives a round trip.

use crate::codec::time::TimeCodec;
use crate::codec::value;
use crate::env::Txn;
use crate::lookup::{decode_id, Dictionary, HashLookup, UidLookup, UID_WIDTH};
use crate::schema::{EncodingType, TemporalPrecision};
use crate::writer::WriteContext;
use planb_core::{Error, Key, Limits, Result, Timestamp, Val, ValType, VARIABLE_INLINE_THRESHOLD};

/// Variable encoding discriminator: value inlined
pub const VARIABLE_DIRECT: u8 = 0;
/// Variable encoding discriminator: UID dictionary id
pub const VARIABLE_UID: u8 = 1;
/// Variable encoding discriminator: hash dictionary id
pub const VARIABLE_HASH: u8 = 2;

const STRING_TERMINATOR: u8 = 0x00;

/// Encoding of the name part of a key
pub trait NameCodec: Send + Sync {
    /// Append the encoding of `name`, assigning dictionary ids as needed
    fn encode(&self, ctx: &mut WriteContext<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<()>;

    /// Append the encoding of a stored `name`
    ///
    /// Returns `false` when the name was never stored. Never assigns ids.
    fn find(&self, txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool>;

    /// Decode the name at the front of `bytes`; returns it and its length
    fn decode(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<(Val, usize)>;

    /// Encoding implemented by this codec
    fn encoding(&self) -> EncodingType;
}

/// Room left for the name once the time suffix is accounted for
#[derive(Debug, Clone, Copy)]
struct NameBounds {
    max_key_length: usize,
    time_width: usize,
}

impl NameBounds {
    fn check(&self, name_len: usize) -> Result<()> {
        let actual = name_len + self.time_width;
        if actual > self.max_key_length {
            return Err(Error::KeyTooLong {
                actual,
                max: self.max_key_length,
            });
        }
        Ok(())
    }
}

/// Build the name codec for `encoding`
pub fn name_codec(
    encoding: EncodingType,
    dictionary: &Dictionary,
    limits: Limits,
    time_width: usize,
) -> Box<dyn NameCodec> {
    let bounds = NameBounds {
        max_key_length: limits.max_key_length,
        time_width,
    };
    if let Some(kind) = encoding.fixed_val_type() {
        return Box::new(FixedName { encoding, kind });
    }
    match encoding {
        EncodingType::UidLookup => Box::new(UidName {
            uid: dictionary.uid.clone(),
            bounds,
        }),
        EncodingType::HashLookup => Box::new(HashName {
            hash: dictionary.hash.clone(),
            bounds,
        }),
        EncodingType::Variable => Box::new(VariableName {
            uid: dictionary.uid.clone(),
            hash: dictionary.hash.clone(),
            bounds,
        }),
        _ => Box::new(StringName { bounds }),
    }
}

// ============================================================================
// Fixed scalars
// ============================================================================

struct FixedName {
    encoding: EncodingType,
    kind: ValType,
}

impl FixedName {
    fn write(&self, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        let coerced = name.coerce(self.kind)?;
        write_ordered(&coerced, buf);
        Ok(())
    }
}

impl NameCodec for FixedName {
    fn encode(&self, _ctx: &mut WriteContext<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        self.write(name, buf)
    }

    fn find(&self, _txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool> {
        self.write(name, buf)?;
        Ok(true)
    }

    fn decode(&self, _txn: Txn<'_>, bytes: &[u8]) -> Result<(Val, usize)> {
        let width = self.kind.fixed_width().unwrap_or(0);
        let field = bytes
            .get(..width)
            .ok_or_else(|| Error::corruption(format!("{} key shorter than {width}", self.kind)))?;
        Ok((read_ordered(self.kind, field)?, width))
    }

    fn encoding(&self) -> EncodingType {
        self.encoding
    }
}

const SIGN_8: u8 = 0x80;
const SIGN_16: u16 = 0x8000;
const SIGN_32: u32 = 0x8000_0000;
const SIGN_64: u64 = 0x8000_0000_0000_0000;

/// Big-endian encoding whose byte order matches numeric order
pub fn write_ordered(val: &Val, buf: &mut Vec<u8>) {
    match val {
        Val::Boolean(v) => buf.push(u8::from(*v)),
        Val::Byte(v) => buf.push(*v as u8 ^ SIGN_8),
        Val::Short(v) => buf.extend_from_slice(&(*v as u16 ^ SIGN_16).to_be_bytes()),
        Val::Int(v) => buf.extend_from_slice(&(*v as u32 ^ SIGN_32).to_be_bytes()),
        Val::Long(v) => buf.extend_from_slice(&(*v as u64 ^ SIGN_64).to_be_bytes()),
        Val::Float(v) => {
            let bits = v.to_bits();
            let ordered = if bits & SIGN_32 != 0 { !bits } else { bits ^ SIGN_32 };
            buf.extend_from_slice(&ordered.to_be_bytes());
        }
        Val::Double(v) => {
            let bits = v.to_bits();
            let ordered = if bits & SIGN_64 != 0 { !bits } else { bits ^ SIGN_64 };
            buf.extend_from_slice(&ordered.to_be_bytes());
        }
        other => value::encode_payload(other, buf),
    }
}

/// Inverse of [`write_ordered`]; `bytes` must be exactly the kind's width
pub fn read_ordered(kind: ValType, bytes: &[u8]) -> Result<Val> {
    let truncated = || Error::corruption(format!("{kind} key field of {} bytes", bytes.len()));
    let val = match kind {
        ValType::Boolean => Val::Boolean(*bytes.first().ok_or_else(truncated)? != 0),
        ValType::Byte => Val::Byte((*bytes.first().ok_or_else(truncated)? ^ SIGN_8) as i8),
        ValType::Short => {
            let raw: [u8; 2] = bytes.try_into().map_err(|_| truncated())?;
            Val::Short((u16::from_be_bytes(raw) ^ SIGN_16) as i16)
        }
        ValType::Int => {
            let raw: [u8; 4] = bytes.try_into().map_err(|_| truncated())?;
            Val::Int((u32::from_be_bytes(raw) ^ SIGN_32) as i32)
        }
        ValType::Long => {
            let raw: [u8; 8] = bytes.try_into().map_err(|_| truncated())?;
            Val::Long((u64::from_be_bytes(raw) ^ SIGN_64) as i64)
        }
        ValType::Float => {
            let raw: [u8; 4] = bytes.try_into().map_err(|_| truncated())?;
            let ordered = u32::from_be_bytes(raw);
            let bits = if ordered & SIGN_32 != 0 { ordered ^ SIGN_32 } else { !ordered };
            Val::Float(f32::from_bits(bits))
        }
        ValType::Double => {
            let raw: [u8; 8] = bytes.try_into().map_err(|_| truncated())?;
            let ordered = u64::from_be_bytes(raw);
            let bits = if ordered & SIGN_64 != 0 { ordered ^ SIGN_64 } else { !ordered };
            Val::Double(f64::from_bits(bits))
        }
        other => value::decode_payload(other, bytes)?,
    };
    Ok(val)
}

// ============================================================================
// Terminated strings
// ============================================================================

struct StringName {
    bounds: NameBounds,
}

impl StringName {
    fn write(&self, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        let text = match name {
            Val::String(s) | Val::Error(s) => s.clone(),
            other => match other.coerce(ValType::String)? {
                Val::String(s) => s,
                coerced => return Err(Error::encoding(ValType::String, coerced)),
            },
        };
        if text.as_bytes().contains(&STRING_TERMINATOR) {
            return Err(Error::encoding("string without NUL characters", text.escape_debug()));
        }
        self.bounds.check(text.len() + 1)?;
        buf.extend_from_slice(text.as_bytes());
        buf.push(STRING_TERMINATOR);
        Ok(())
    }
}

impl NameCodec for StringName {
    fn encode(&self, _ctx: &mut WriteContext<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        self.write(name, buf)
    }

    fn find(&self, _txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool> {
        self.write(name, buf)?;
        Ok(true)
    }

    fn decode(&self, _txn: Txn<'_>, bytes: &[u8]) -> Result<(Val, usize)> {
        let end = terminator(bytes)?;
        let name = value::decode_payload(ValType::String, &bytes[..end])?;
        Ok((name, end + 1))
    }

    fn encoding(&self) -> EncodingType {
        EncodingType::String
    }
}

fn terminator(bytes: &[u8]) -> Result<usize> {
    bytes
        .iter()
        .position(|b| *b == STRING_TERMINATOR)
        .ok_or_else(|| Error::corruption("unterminated key name"))
}

// ============================================================================
// Dictionary ids
// ============================================================================

fn dictionary_content(name: &Val) -> Vec<u8> {
    let mut content = Vec::with_capacity(value::encoded_len(name));
    value::encode(name, &mut content);
    content
}

struct UidName {
    uid: UidLookup,
    bounds: NameBounds,
}

impl NameCodec for UidName {
    fn encode(&self, ctx: &mut WriteContext<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        self.bounds.check(UID_WIDTH)?;
        let id = self.uid.put(ctx, &dictionary_content(name))?;
        buf.extend_from_slice(&id.to_be_bytes());
        Ok(())
    }

    fn find(&self, txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool> {
        match self.uid.find(txn, &dictionary_content(name))? {
            Some(id) => {
                buf.extend_from_slice(&id.to_be_bytes());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn decode(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<(Val, usize)> {
        let id = decode_id(bytes)?;
        let content = self.uid.get(txn, id)?;
        Ok((value::decode(&content)?, UID_WIDTH))
    }

    fn encoding(&self) -> EncodingType {
        EncodingType::UidLookup
    }
}

struct HashName {
    hash: HashLookup,
    bounds: NameBounds,
}

impl NameCodec for HashName {
    fn encode(&self, ctx: &mut WriteContext<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        self.bounds.check(self.hash.width())?;
        let id = self.hash.put(ctx, &dictionary_content(name))?;
        self.hash.write_id(id, buf);
        Ok(())
    }

    fn find(&self, txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool> {
        match self.hash.find(txn, &dictionary_content(name))? {
            Some(id) => {
                self.hash.write_id(id, buf);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn decode(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<(Val, usize)> {
        let id = self.hash.read_id(bytes)?;
        let content = self.hash.get(txn, id)?;
        Ok((value::decode(&content)?, self.hash.width()))
    }

    fn encoding(&self) -> EncodingType {
        EncodingType::HashLookup
    }
}

// ============================================================================
// Variable
// ============================================================================

struct VariableName {
    uid: UidLookup,
    hash: HashLookup,
    bounds: NameBounds,
}

/// How a variable name is stored
enum VariableForm {
    Direct { terminated: bool },
    Uid(Vec<u8>),
    Hash(Vec<u8>),
}

impl VariableName {
    fn form(&self, name: &Val) -> VariableForm {
        if value::encoded_len(name) <= VARIABLE_INLINE_THRESHOLD {
            let kind = name.val_type();
            if kind.fixed_width().is_some() {
                return VariableForm::Direct { terminated: false };
            }
            let payload_has_nul = match name {
                Val::String(s) | Val::Error(s) => s.as_bytes().contains(&STRING_TERMINATOR),
                Val::Binary(b) => b.contains(&STRING_TERMINATOR),
                _ => false,
            };
            if !payload_has_nul {
                return VariableForm::Direct { terminated: true };
            }
        }
        let content = dictionary_content(name);
        if self.uid.prefers(&content) {
            VariableForm::Uid(content)
        } else {
            VariableForm::Hash(content)
        }
    }

    fn write_direct(&self, name: &Val, terminated: bool, buf: &mut Vec<u8>) -> Result<()> {
        let suffix: &[u8] = if terminated { &[STRING_TERMINATOR] } else { &[] };
        self.bounds
            .check(1 + value::encoded_len(name) + suffix.len())?;
        value::encode_composite(&[VARIABLE_DIRECT], name, suffix, buf);
        Ok(())
    }
}

impl NameCodec for VariableName {
    fn encode(&self, ctx: &mut WriteContext<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<()> {
        match self.form(name) {
            VariableForm::Direct { terminated } => self.write_direct(name, terminated, buf),
            VariableForm::Uid(content) => {
                self.bounds.check(1 + UID_WIDTH)?;
                let id = self.uid.put(ctx, &content)?;
                buf.push(VARIABLE_UID);
                buf.extend_from_slice(&id.to_be_bytes());
                Ok(())
            }
            VariableForm::Hash(content) => {
                self.bounds.check(1 + self.hash.width())?;
                let id = self.hash.put(ctx, &content)?;
                buf.push(VARIABLE_HASH);
                self.hash.write_id(id, buf);
                Ok(())
            }
        }
    }

    fn find(&self, txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool> {
        match self.form(name) {
            VariableForm::Direct { terminated } => {
                self.write_direct(name, terminated, buf)?;
                Ok(true)
            }
            VariableForm::Uid(content) => match self.uid.find(txn, &content)? {
                Some(id) => {
                    buf.push(VARIABLE_UID);
                    buf.extend_from_slice(&id.to_be_bytes());
                    Ok(true)
                }
                None => Ok(false),
            },
            VariableForm::Hash(content) => match self.hash.find(txn, &content)? {
                Some(id) => {
                    buf.push(VARIABLE_HASH);
                    self.hash.write_id(id, buf);
                    Ok(true)
                }
                None => Ok(false),
            },
        }
    }

    fn decode(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<(Val, usize)> {
        let (&form, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::corruption("empty variable key"))?;
        match form {
            VARIABLE_DIRECT => {
                let kind = value::decode_type(rest)?;
                let body = &rest[1..];
                match kind.fixed_width() {
                    Some(width) => {
                        let payload = body.get(..width).ok_or_else(|| {
                            Error::corruption(format!("{kind} key payload shorter than {width}"))
                        })?;
                        Ok((value::decode_payload(kind, payload)?, 2 + width))
                    }
                    None => {
                        let end = terminator(body)?;
                        Ok((value::decode_payload(kind, &body[..end])?, 2 + end + 1))
                    }
                }
            }
            VARIABLE_UID => {
                let id = decode_id(rest)?;
                let content = self.uid.get(txn, id)?;
                Ok((value::decode(&content)?, 1 + UID_WIDTH))
            }
            VARIABLE_HASH => {
                let id = self.hash.read_id(rest)?;
                let content = self.hash.get(txn, id)?;
                Ok((value::decode(&content)?, 1 + self.hash.width()))
            }
            other => Err(Error::corruption(format!(
                "unknown variable key form {other}"
            ))),
        }
    }

    fn encoding(&self) -> EncodingType {
        EncodingType::Variable
    }
}

// ============================================================================
// Full keys
// ============================================================================

/// `[name][time]` codec for one store schema
pub struct KeyCodec {
    name: Box<dyn NameCodec>,
    time: TimeCodec,
    limits: Limits,
}

impl KeyCodec {
    /// Codec for keys named with `encoding` at `precision`
    pub fn new(
        encoding: EncodingType,
        dictionary: &Dictionary,
        precision: TemporalPrecision,
        limits: Limits,
    ) -> Self {
        let time = TimeCodec::new(precision);
        KeyCodec {
            name: name_codec(encoding, dictionary, limits, time.width()),
            time,
            limits,
        }
    }

    /// Name encoding
    pub fn encoding(&self) -> EncodingType {
        self.name.encoding()
    }

    /// Time codec of the suffix
    pub fn time(&self) -> &TimeCodec {
        &self.time
    }

    /// Encode `key` into `buf`, assigning dictionary ids as needed
    ///
    /// Time range and key length are checked before any dictionary write.
    pub fn encode(&self, ctx: &mut WriteContext<'_>, key: &Key, buf: &mut Vec<u8>) -> Result<()> {
        buf.clear();
        let count = self.time.count(key.effective_time)?;
        self.name.encode(ctx, &key.name, buf)?;
        self.time.write_count(count, buf);
        self.limits.validate_key_length(buf.len())
    }

    /// Encode the name of a stored key into `buf`; `false` if it was never stored
    pub fn encode_name(&self, txn: Txn<'_>, name: &Val, buf: &mut Vec<u8>) -> Result<bool> {
        buf.clear();
        self.name.find(txn, name, buf)
    }

    /// Encode a stored key into `buf`; `false` if its name was never stored
    pub fn encode_existing(&self, txn: Txn<'_>, key: &Key, buf: &mut Vec<u8>) -> Result<bool> {
        let count = self.time.count(key.effective_time)?;
        if !self.encode_name(txn, &key.name, buf)? {
            return Ok(false);
        }
        self.time.write_count(count, buf);
        Ok(true)
    }

    /// Name part of an encoded key
    pub fn name_bytes<'k>(&self, bytes: &'k [u8]) -> Result<&'k [u8]> {
        bytes
            .len()
            .checked_sub(self.time.width())
            .map(|end| &bytes[..end])
            .ok_or_else(|| Error::corruption(format!("key of {} bytes", bytes.len())))
    }

    /// Effective time of an encoded key
    pub fn decode_time(&self, bytes: &[u8]) -> Result<Timestamp> {
        let name_len = self.name_bytes(bytes)?.len();
        self.time.decode(&bytes[name_len..])
    }

    /// Decode an encoded key
    pub fn decode(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<Key> {
        let (name, used) = self.name.decode(txn, bytes)?;
        let time = self.time.decode(&bytes[used.min(bytes.len())..])?;
        Ok(Key::new(name, time))
    }
}
