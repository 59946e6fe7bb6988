// SPDX-License-Identifier: MIT
//! Deterministic ("canonical") CBOR encoding.
//!
//! Two peers that build the same logical value always produce the same
//! bytes: definite lengths only, the shortest integer-length encoding that
//! fits, map keys sorted by their own encoded bytes, and no duplicate
//! keys. This is used to canonicalize a message's payload before hashing
//! or deduplicating it — the ordinary envelope codec in [`crate::wire`]
//! does not require this, since `serde_cbor` need not agree byte-for-byte
//! across versions for that path to work.

/// A CBOR value restricted to the canonical subset this module emits and
/// accepts: no tags, no indefinite-length items, no bignums, and 64-bit
/// floats only.
#[derive(Debug, Clone, PartialEq)]
pub enum CborValue {
    /// The CBOR null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer in the i64 range.
    Integer(i64),
    /// A 64-bit float.
    Float(f64),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A UTF-8 text string.
    Text(String),
    /// An array of values.
    Array(Vec<CborValue>),
    /// A map, stored pre-sorted by the encoded bytes of its keys.
    Map(Vec<(CborValue, CborValue)>),
}

impl CborValue {
    /// Build a canonical map: sorts `pairs` by each key's encoded bytes and
    /// rejects duplicate keys.
    pub fn map(mut pairs: Vec<(Self, Self)>) -> Result<Self, CanonError> {
        pairs.sort_by(|(ka, _), (kb, _)| encode_value(ka).cmp(&encode_value(kb)));
        for window in pairs.windows(2) {
            if encode_value(&window[0].0) == encode_value(&window[1].0) {
                return Err(CanonError::MapKeyDuplicate);
            }
        }
        Ok(Self::Map(pairs))
    }
}

/// Errors raised while decoding canonical CBOR.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CanonError {
    /// The input ended before a complete value was read.
    #[error("unexpected end of input")]
    Incomplete,
    /// Extra bytes followed a complete top-level value.
    #[error("{0} trailing byte(s) after a complete value")]
    Trailing(usize),
    /// A CBOR tag (major type 6) was present; this wire never uses them.
    #[error("CBOR tags are not accepted on this wire")]
    Tag,
    /// An indefinite-length item (additional info 31) was present.
    #[error("indefinite-length items are not accepted on this wire")]
    Indefinite,
    /// An integer or length was not encoded in its shortest form.
    #[error("integer was not encoded in its shortest form")]
    NonCanonicalInt,
    /// A float used a width other than 8 bytes.
    #[error("floats must be encoded as 8-byte values on this wire")]
    NonCanonicalFloat,
    /// A map's keys were not in ascending byte order.
    #[error("map keys were not in canonical sort order")]
    MapKeyOrder,
    /// A map contained the same key twice.
    #[error("map contained a duplicate key")]
    MapKeyDuplicate,
    /// The input was not well-formed CBOR at all.
    #[error("malformed CBOR: {0}")]
    Decode(String),
}

/// Encode a value to its canonical byte representation.
#[must_use]
pub fn encode_value(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out
}

/// Decode a canonical byte representation back into a value, rejecting
/// anything that was not produced by [`encode_value`].
pub fn decode_value(bytes: &[u8]) -> Result<CborValue, CanonError> {
    let mut cursor = 0usize;
    let value = read_value(bytes, &mut cursor)?;
    if cursor != bytes.len() {
        return Err(CanonError::Trailing(bytes.len() - cursor));
    }
    Ok(value)
}

fn write_head(major: u8, arg: u64, out: &mut Vec<u8>) {
    let major_bits = major << 5;
    if arg < 24 {
        #[allow(clippy::cast_possible_truncation)]
        out.push(major_bits | arg as u8);
    } else if arg <= u64::from(u8::MAX) {
        out.push(major_bits | 24);
        #[allow(clippy::cast_possible_truncation)]
        out.push(arg as u8);
    } else if arg <= u64::from(u16::MAX) {
        out.push(major_bits | 25);
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(arg as u16).to_be_bytes());
    } else if arg <= u64::from(u32::MAX) {
        out.push(major_bits | 26);
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(arg as u32).to_be_bytes());
    } else {
        out.push(major_bits | 27);
        out.extend_from_slice(&arg.to_be_bytes());
    }
}

fn write_value(value: &CborValue, out: &mut Vec<u8>) {
    match value {
        CborValue::Null => out.push(0xf6),
        CborValue::Bool(false) => out.push(0xf4),
        CborValue::Bool(true) => out.push(0xf5),
        CborValue::Integer(n) if *n >= 0 => write_head(0, *n as u64, out),
        CborValue::Integer(n) => write_head(1, (-1 - *n) as u64, out),
        CborValue::Float(x) => {
            out.push(0xfb);
            out.extend_from_slice(&x.to_bits().to_be_bytes());
        }
        CborValue::Bytes(bytes) => {
            write_head(2, bytes.len() as u64, out);
            out.extend_from_slice(bytes);
        }
        CborValue::Text(text) => {
            write_head(3, text.len() as u64, out);
            out.extend_from_slice(text.as_bytes());
        }
        CborValue::Array(items) => {
            write_head(4, items.len() as u64, out);
            for item in items {
                write_value(item, out);
            }
        }
        CborValue::Map(pairs) => {
            write_head(5, pairs.len() as u64, out);
            for (key, val) in pairs {
                write_value(key, out);
                write_value(val, out);
            }
        }
    }
}

fn read_head(bytes: &[u8], cursor: &mut usize) -> Result<(u8, u64), CanonError> {
    let first = *bytes.get(*cursor).ok_or(CanonError::Incomplete)?;
    *cursor += 1;
    let major = first >> 5;
    let info = first & 0x1f;
    let arg = match info {
        0..=23 => u64::from(info),
        24 => {
            let v = *bytes.get(*cursor).ok_or(CanonError::Incomplete)?;
            *cursor += 1;
            if v < 24 {
                return Err(CanonError::NonCanonicalInt);
            }
            u64::from(v)
        }
        25 => {
            let slice: [u8; 2] = bytes
                .get(*cursor..*cursor + 2)
                .ok_or(CanonError::Incomplete)?
                .try_into()
                .map_err(|_| CanonError::Incomplete)?;
            *cursor += 2;
            let v = u16::from_be_bytes(slice);
            if v <= u16::from(u8::MAX) {
                return Err(CanonError::NonCanonicalInt);
            }
            u64::from(v)
        }
        26 => {
            let slice: [u8; 4] = bytes
                .get(*cursor..*cursor + 4)
                .ok_or(CanonError::Incomplete)?
                .try_into()
                .map_err(|_| CanonError::Incomplete)?;
            *cursor += 4;
            let v = u32::from_be_bytes(slice);
            if v <= u32::from(u16::MAX) {
                return Err(CanonError::NonCanonicalInt);
            }
            u64::from(v)
        }
        27 => {
            let slice: [u8; 8] = bytes
                .get(*cursor..*cursor + 8)
                .ok_or(CanonError::Incomplete)?
                .try_into()
                .map_err(|_| CanonError::Incomplete)?;
            *cursor += 8;
            let v = u64::from_be_bytes(slice);
            if v <= u64::from(u32::MAX) {
                return Err(CanonError::NonCanonicalInt);
            }
            v
        }
        31 => return Err(CanonError::Indefinite),
        _ => return Err(CanonError::Decode(format!("unsupported additional info {info}"))),
    };
    Ok((major, arg))
}

fn read_value(bytes: &[u8], cursor: &mut usize) -> Result<CborValue, CanonError> {
    let start = *cursor;
    let first = *bytes.get(*cursor).ok_or(CanonError::Incomplete)?;

    // Simple values (major type 7) don't share the generic length-argument
    // shape, so handle them before falling into read_head.
    if first >> 5 == 7 {
        *cursor += 1;
        return match first & 0x1f {
            20 => Ok(CborValue::Bool(false)),
            21 => Ok(CborValue::Bool(true)),
            22 => Ok(CborValue::Null),
            27 => {
                let slice: [u8; 8] = bytes
                    .get(*cursor..*cursor + 8)
                    .ok_or(CanonError::Incomplete)?
                    .try_into()
                    .map_err(|_| CanonError::Incomplete)?;
                *cursor += 8;
                Ok(CborValue::Float(f64::from_bits(u64::from_be_bytes(slice))))
            }
            25 | 26 => Err(CanonError::NonCanonicalFloat),
            31 => Err(CanonError::Indefinite),
            other => Err(CanonError::Decode(format!("unsupported simple value {other}"))),
        };
    }

    *cursor = start;
    let (major, arg) = read_head(bytes, cursor)?;
    #[allow(clippy::cast_possible_truncation)]
    match major {
        0 => Ok(CborValue::Integer(arg as i64)),
        1 => Ok(CborValue::Integer(-1 - arg as i64)),
        2 => {
            let len = arg as usize;
            let data = bytes
                .get(*cursor..*cursor + len)
                .ok_or(CanonError::Incomplete)?
                .to_vec();
            *cursor += len;
            Ok(CborValue::Bytes(data))
        }
        3 => {
            let len = arg as usize;
            let data = bytes
                .get(*cursor..*cursor + len)
                .ok_or(CanonError::Incomplete)?;
            let text = std::str::from_utf8(data)
                .map_err(|e| CanonError::Decode(e.to_string()))?
                .to_string();
            *cursor += len;
            Ok(CborValue::Text(text))
        }
        4 => {
            let count = arg as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(bytes, cursor)?);
            }
            Ok(CborValue::Array(items))
        }
        5 => {
            let count = arg as usize;
            let mut pairs = Vec::with_capacity(count);
            for _ in 0..count {
                let key = read_value(bytes, cursor)?;
                let val = read_value(bytes, cursor)?;
                pairs.push((key, val));
            }
            for window in pairs.windows(2) {
                let a = encode_value(&window[0].0);
                let b = encode_value(&window[1].0);
                if a == b {
                    return Err(CanonError::MapKeyDuplicate);
                }
                if a > b {
                    return Err(CanonError::MapKeyOrder);
                }
            }
            Ok(CborValue::Map(pairs))
        }
        6 => Err(CanonError::Tag),
        other => Err(CanonError::Decode(format!("unsupported major type {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── 1. scalar round trip ─────────────────────────────────────────────

    #[test]
    fn scalar_round_trip() {
        for value in [
            CborValue::Null,
            CborValue::Bool(true),
            CborValue::Integer(-1234),
            CborValue::Integer(1_000_000),
            CborValue::Float(core::f64::consts::PI),
            CborValue::Bytes(vec![1, 2, 3]),
            CborValue::Text("hello".to_string()),
        ] {
            let bytes = encode_value(&value);
            assert_eq!(decode_value(&bytes).unwrap(), value);
        }
    }

    // ── 2. map keys are sorted on encode ─────────────────────────────────

    #[test]
    fn map_keys_sorted_on_encode() {
        let map = CborValue::map(vec![
            (CborValue::Text("b".into()), CborValue::Integer(2)),
            (CborValue::Text("a".into()), CborValue::Integer(1)),
        ])
        .unwrap();
        let CborValue::Map(pairs) = &map else {
            unreachable!()
        };
        assert_eq!(pairs[0].0, CborValue::Text("a".into()));
        assert_eq!(pairs[1].0, CborValue::Text("b".into()));
    }

    // ── 3. duplicate map keys rejected at construction ───────────────────

    #[test]
    fn duplicate_keys_rejected_at_construction() {
        let err = CborValue::map(vec![
            (CborValue::Text("a".into()), CborValue::Integer(1)),
            (CborValue::Text("a".into()), CborValue::Integer(2)),
        ])
        .unwrap_err();
        assert_eq!(err, CanonError::MapKeyDuplicate);
    }

    // ── 4. out-of-order map keys rejected on decode ──────────────────────

    #[test]
    fn out_of_order_map_rejected_on_decode() {
        let mut bytes = Vec::new();
        write_head(5, 2, &mut bytes);
        write_value(&CborValue::Text("b".into()), &mut bytes);
        write_value(&CborValue::Integer(2), &mut bytes);
        write_value(&CborValue::Text("a".into()), &mut bytes);
        write_value(&CborValue::Integer(1), &mut bytes);
        assert_eq!(decode_value(&bytes).unwrap_err(), CanonError::MapKeyOrder);
    }

    // ── 5. non-shortest integer encoding rejected ────────────────────────

    #[test]
    fn non_shortest_integer_rejected() {
        // Encodes the value 1 using the 1-byte-follows form (additional
        // info 24), which is longer than necessary.
        let bytes = vec![0x18, 0x01];
        assert_eq!(decode_value(&bytes).unwrap_err(), CanonError::NonCanonicalInt);
    }

    // ── 6. tags and indefinite lengths rejected ──────────────────────────

    #[test]
    fn tags_rejected() {
        let bytes = vec![0xc0, 0x00];
        assert_eq!(decode_value(&bytes).unwrap_err(), CanonError::Tag);
    }

    #[test]
    fn indefinite_length_rejected() {
        let bytes = vec![0x9f];
        assert_eq!(decode_value(&bytes).unwrap_err(), CanonError::Indefinite);
    }

    // ── 7. trailing bytes rejected ────────────────────────────────────────

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = encode_value(&CborValue::Integer(1));
        bytes.push(0xff);
        assert_eq!(decode_value(&bytes).unwrap_err(), CanonError::Trailing(1));
    }

    // ── 8. nested array/map round trip ───────────────────────────────────

    #[test]
    fn nested_round_trip() {
        let value = CborValue::Array(vec![
            CborValue::map(vec![(CborValue::Text("k".into()), CborValue::Integer(1))]).unwrap(),
            CborValue::Bool(false),
        ]);
        let bytes = encode_value(&value);
        assert_eq!(decode_value(&bytes).unwrap(), value);
    }
}
