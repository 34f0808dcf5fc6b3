//! Binary Codec Primitives
//!
//! Big-endian, length-prefixed encoding shared by every wire message.
//! Decoding is streaming-safe: the two failure modes are distinguishable so
//! a stream reader can tell "wait for more bytes" apart from "the peer is
//! broken".
//!
//! Encodings:
//! - `u8`/`u16`/`u32`: fixed width, big-endian.
//! - `String`: u8 length, then that many raw UTF-8 bytes (max 255).
//! - `Vec<T>`: u32 length, then the elements back to back.
//! - `BTreeMap<K, V>`: u32 length, then key/value pairs. Decoding accepts
//!   any key order; encoding iterates sorted keys so the produced bytes are
//!   reproducible.
//! - Tagged enums: u8 discriminant, then the variant payload.

use std::collections::BTreeMap;

use thiserror::Error;

/// Maximum encoded length of a protocol string, dictated by the u8 prefix.
pub const MAX_STRING_LEN: usize = 255;

/// Why a decode attempt did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before the value is complete. More bytes from the
    /// same stream may still complete it.
    #[error("value is incomplete, more bytes required")]
    Incomplete,

    /// The bytes can never form a valid value (unknown discriminant,
    /// malformed string payload). The stream is unrecoverable.
    #[error("bytes do not form a valid value")]
    Invalid,
}

/// Cursor over a byte buffer that tracks how much has been consumed.
///
/// Consumption only advances through successful reads, so after a failed
/// decode the caller can simply drop the reader and retry later with a
/// longer buffer.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Wrap a buffer for decoding.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Incomplete);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Serialize a value into a byte sink.
pub trait Encode {
    /// Append this value's wire form to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

/// Deserialize a value from a byte cursor.
pub trait Decode: Sized {
    /// Read one value, advancing the reader past exactly its bytes.
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError>;
}

/// Encode a value into a fresh buffer.
pub fn encode_to_vec<T: Encode>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.encode(&mut out);
    out
}

/// Decode one value from the front of `buf`, returning it together with the
/// number of bytes it occupied.
pub fn decode_prefix<T: Decode>(buf: &[u8]) -> Result<(T, usize), DecodeError> {
    let mut reader = Reader::new(buf);
    let value = T::decode(&mut reader)?;
    Ok((value, reader.consumed()))
}

/// Decode a datagram that must contain exactly one value. Trailing bytes
/// make the whole datagram invalid.
pub fn decode_datagram<T: Decode>(buf: &[u8]) -> Result<T, DecodeError> {
    let (value, consumed) = decode_prefix::<T>(buf)?;
    if consumed != buf.len() {
        return Err(DecodeError::Invalid);
    }
    Ok(value)
}

impl Encode for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decode for u8 {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(r.take(1)?[0])
    }
}

impl Encode for u16 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl Decode for u16 {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let bytes = r.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

impl Encode for u32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }
}

impl Decode for u32 {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let bytes = r.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl Encode for String {
    /// Callers keep strings within [`MAX_STRING_LEN`]; the length prefix is
    /// a single byte.
    fn encode(&self, out: &mut Vec<u8>) {
        debug_assert!(self.len() <= MAX_STRING_LEN);
        out.push(self.len() as u8);
        out.extend_from_slice(self.as_bytes());
    }
}

impl Decode for String {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = u8::decode(r)? as usize;
        let bytes = r.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::Invalid)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.len() as u32).encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = u32::decode(r)?;
        // Grow as elements actually arrive; the length prefix alone is not
        // trusted for allocation.
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(T::decode(r)?);
        }
        Ok(items)
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.len() as u32).encode(out);
        for (key, value) in self {
            key.encode(out);
            value.encode(out);
        }
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = u32::decode(r)?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::decode(r)?;
            let value = V::decode(r)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
