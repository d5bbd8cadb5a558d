//! Value half of a state record
//!
//! | Encoding         | Stored bytes                                  |
//! |------------------|-----------------------------------------------|
//! | boolean … double | `[tag][payload]`, value coerced to the kind   |
//! | string           | `[tag][payload]`, non-text coerced to string  |
//! | uid lookup       | `[tag][uid id]`, dictionary holds the payload |
//! | hash lookup      | `[tag][hash id]`, dictionary holds the payload|
//! | variable         | `[0][tag][payload]` up to 32 bytes,           |
//! |                  | `[1][tag][uid id]` or `[2][tag][hash id]`     |
//!
//! Null is always stored as its bare tag. The kind of a stored value is
//! readable without touching the dictionaries.

use crate::codec::value;
use crate::env::Txn;
use crate::lookup::{decode_id, Dictionary, UID_WIDTH};
use crate::schema::EncodingType;
use crate::writer::WriteContext;
use planb_core::{Error, Result, Val, ValType, VARIABLE_INLINE_THRESHOLD};

const DIRECT: u8 = 0;
const UID: u8 = 1;
const HASH: u8 = 2;

/// Codec for stored values of one store schema
#[derive(Debug, Clone)]
pub struct ValueCodec {
    encoding: EncodingType,
    dictionary: Dictionary,
}

impl ValueCodec {
    /// Codec storing values with `encoding`
    pub fn new(encoding: EncodingType, dictionary: &Dictionary) -> Self {
        ValueCodec {
            encoding,
            dictionary: dictionary.clone(),
        }
    }

    /// Value encoding
    pub fn encoding(&self) -> EncodingType {
        self.encoding
    }

    /// Encode `val` into `buf`, assigning dictionary ids as needed
    pub fn encode(&self, ctx: &mut WriteContext<'_>, val: &Val, buf: &mut Vec<u8>) -> Result<()> {
        buf.clear();
        if let Some(kind) = self.encoding.fixed_val_type() {
            let coerced = if val.is_null() { Val::Null } else { val.coerce(kind)? };
            value::encode(&coerced, buf);
            return Ok(());
        }
        match self.encoding {
            EncodingType::String => match val {
                Val::Null | Val::String(_) | Val::Error(_) => value::encode(val, buf),
                other => value::encode(&other.coerce(ValType::String)?, buf),
            },
            EncodingType::UidLookup => {
                buf.push(val.val_type().tag());
                if !val.is_null() {
                    let id = self.dictionary.uid.put(ctx, &payload(val))?;
                    buf.extend_from_slice(&id.to_be_bytes());
                }
            }
            EncodingType::HashLookup => {
                buf.push(val.val_type().tag());
                if !val.is_null() {
                    let id = self.dictionary.hash.put(ctx, &payload(val))?;
                    self.dictionary.hash.write_id(id, buf);
                }
            }
            _ => {
                if value::encoded_len(val) <= VARIABLE_INLINE_THRESHOLD {
                    value::encode_composite(&[DIRECT], val, &[], buf);
                    return Ok(());
                }
                let content = payload(val);
                if self.dictionary.uid.prefers(&content) {
                    let id = self.dictionary.uid.put(ctx, &content)?;
                    buf.extend_from_slice(&[UID, val.val_type().tag()]);
                    buf.extend_from_slice(&id.to_be_bytes());
                } else {
                    let id = self.dictionary.hash.put(ctx, &content)?;
                    buf.extend_from_slice(&[HASH, val.val_type().tag()]);
                    self.dictionary.hash.write_id(id, buf);
                }
            }
        }
        Ok(())
    }

    /// Whether a stored value refers to a dictionary entry
    pub fn references_dictionary(&self, bytes: &[u8]) -> bool {
        match self.encoding {
            EncodingType::UidLookup | EncodingType::HashLookup => bytes.len() > 1,
            EncodingType::Variable => bytes.first() != Some(&DIRECT),
            _ => false,
        }
    }

    /// Kind of a stored value
    pub fn decode_type(&self, bytes: &[u8]) -> Result<ValType> {
        match self.encoding {
            EncodingType::Variable => value::decode_type(bytes.get(1..).unwrap_or_default()),
            _ => value::decode_type(bytes),
        }
    }

    /// Decode a stored value
    pub fn decode(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<Val> {
        match self.encoding {
            EncodingType::UidLookup => self.decode_uid(txn, bytes),
            EncodingType::HashLookup => self.decode_hash(txn, bytes),
            EncodingType::Variable => {
                let (&form, rest) = bytes
                    .split_first()
                    .ok_or_else(|| Error::corruption("empty value"))?;
                match form {
                    DIRECT => value::decode(rest),
                    UID => self.decode_uid(txn, rest),
                    HASH => self.decode_hash(txn, rest),
                    other => Err(Error::corruption(format!("unknown value form {other}"))),
                }
            }
            _ => value::decode(bytes),
        }
    }

    fn decode_uid(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<Val> {
        let kind = value::decode_type(bytes)?;
        if kind == ValType::Null {
            return Ok(Val::Null);
        }
        let id_bytes = &bytes[1..];
        if id_bytes.len() != UID_WIDTH {
            return Err(Error::corruption(format!("uid of {} bytes", id_bytes.len())));
        }
        let content = self.dictionary.uid.get(txn, decode_id(id_bytes)?)?;
        value::decode_payload(kind, &content)
    }

    fn decode_hash(&self, txn: Txn<'_>, bytes: &[u8]) -> Result<Val> {
        let kind = value::decode_type(bytes)?;
        if kind == ValType::Null {
            return Ok(Val::Null);
        }
        let id = self.dictionary.hash.read_id(&bytes[1..])?;
        let content = self.dictionary.hash.get(txn, id)?;
        value::decode_payload(kind, &content)
    }
}

fn payload(val: &Val) -> Vec<u8> {
    let mut content = Vec::new();
    value::encode_payload(val, &mut content);
    content
}
