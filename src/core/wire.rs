//! # Binary Wire Primitives
//!
//! Encode/decode engine for the compact binary schema shared by the handshake
//! and the discovery/identify protocols.
//!
//! All length, count, and offset fields are little-endian `u32`. The primitives
//! are:
//!
//! - **Fixed array**: exactly N raw bytes, no prefix.
//! - **Fixvec** (byte string): 4-byte item count, then the bytes.
//! - **Dynvec** (vector of variable-size items): 4-byte item count, one 4-byte
//!   offset per item (relative to the vector start), then the item payloads.
//! - **Table**: 4-byte total size, one 4-byte offset per declared field
//!   (relative to the table start, non-decreasing), then field payloads in
//!   declaration order.
//! - **Union**: 4-byte discriminant (0-based index into a closed variant
//!   list), then the chosen variant's encoding.
//! - **Option**: absent encodes as a zero-length payload.
//!
//! Encoding is total. Decoding is zero-copy (readers slice a shared [`Bytes`]
//! buffer) and every dereference is bounds-checked: truncated input, offsets
//! outside the buffer, inconsistent counts, and out-of-range discriminants all
//! surface as a typed [`CodecError`] naming the offending field, never a panic
//! or out-of-bounds access.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;

/// Build a fixvec: 4-byte LE count followed by the raw bytes.
pub fn build_fixvec(data: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + data.len());
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.freeze()
}

/// Build a dynvec: count, per-item offsets, then item payloads.
pub fn build_dynvec(items: &[Bytes]) -> Bytes {
    let header = 4 + 4 * items.len();
    let body: usize = items.iter().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(header + body);
    buf.put_u32_le(items.len() as u32);
    let mut offset = header;
    for item in items {
        buf.put_u32_le(offset as u32);
        offset += item.len();
    }
    for item in items {
        buf.put_slice(item);
    }
    buf.freeze()
}

/// Build a table: total size, per-field offsets, then field payloads in
/// declaration order.
pub fn build_table(fields: &[Bytes]) -> Bytes {
    let header = 4 + 4 * fields.len();
    let total = header + fields.iter().map(Bytes::len).sum::<usize>();
    let mut buf = BytesMut::with_capacity(total);
    buf.put_u32_le(total as u32);
    let mut offset = header;
    for field in fields {
        buf.put_u32_le(offset as u32);
        offset += field.len();
    }
    for field in fields {
        buf.put_slice(field);
    }
    buf.freeze()
}

/// Build a union: 4-byte discriminant followed by the variant payload.
pub fn build_union(discriminant: u32, payload: &Bytes) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + payload.len());
    buf.put_u32_le(discriminant);
    buf.put_slice(payload);
    buf.freeze()
}

/// Build an option: absent is a zero-length payload, present is the item
/// encoding unchanged.
pub fn build_option(item: Option<Bytes>) -> Bytes {
    item.unwrap_or_else(Bytes::new)
}

/// Bounds-checked, zero-copy reader over one encoded value.
///
/// Carries the field name it was extracted from so that every failure is
/// attributable. Slicing a child value shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct Reader {
    buf: Bytes,
    field: &'static str,
}

impl Reader {
    pub fn new(buf: Bytes, field: &'static str) -> Self {
        Reader { buf, field }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The field this reader is attributed to in errors.
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// The underlying bytes, shared without copying.
    pub fn bytes(&self) -> Bytes {
        self.buf.clone()
    }

    fn need(&self, end: usize) -> Result<(), CodecError> {
        if self.buf.len() < end {
            return Err(CodecError::Truncated {
                field: self.field,
                needed: end,
                have: self.buf.len(),
            });
        }
        Ok(())
    }

    fn slice(&self, start: usize, end: usize, field: &'static str) -> Result<Reader, CodecError> {
        if start > end || end > self.buf.len() {
            return Err(CodecError::BadOffset {
                field,
                offset: end.max(start),
                len: self.buf.len(),
            });
        }
        Ok(Reader {
            buf: self.buf.slice(start..end),
            field,
        })
    }

    pub fn u32_le(&self, at: usize) -> Result<u32, CodecError> {
        self.need(at + 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buf[at..at + 4]);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn u16_le(&self, at: usize) -> Result<u16, CodecError> {
        self.need(at + 2)?;
        let mut raw = [0u8; 2];
        raw.copy_from_slice(&self.buf[at..at + 2]);
        Ok(u16::from_le_bytes(raw))
    }

    pub fn byte(&self, at: usize) -> Result<u8, CodecError> {
        self.need(at + 1)?;
        Ok(self.buf[at])
    }

    /// Decode a fixed array: the buffer must be exactly `n` bytes.
    pub fn fixed(&self, n: usize) -> Result<Bytes, CodecError> {
        if self.buf.len() < n {
            return Err(CodecError::Truncated {
                field: self.field,
                needed: n,
                have: self.buf.len(),
            });
        }
        if self.buf.len() > n {
            return Err(CodecError::CountMismatch {
                field: self.field,
                declared: n,
                actual: self.buf.len(),
            });
        }
        Ok(self.buf.clone())
    }

    /// Decode a fixvec: count then exactly that many bytes.
    pub fn fixvec(&self) -> Result<Bytes, CodecError> {
        let count = self.u32_le(0)? as usize;
        self.need(4 + count)?;
        if self.buf.len() != 4 + count {
            return Err(CodecError::CountMismatch {
                field: self.field,
                declared: count,
                actual: self.buf.len() - 4,
            });
        }
        Ok(self.buf.slice(4..))
    }

    /// Decode a fixvec holding ASCII/UTF-8 text.
    pub fn fixvec_str(&self) -> Result<String, CodecError> {
        let raw = self.fixvec()?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field: self.field })
    }

    /// Decode a dynvec into per-item readers.
    ///
    /// The declared count must match the offset table, the first offset must
    /// land exactly after the header, and offsets must be non-decreasing and
    /// within bounds.
    pub fn dynvec(&self) -> Result<Vec<Reader>, CodecError> {
        let count = self.u32_le(0)? as usize;
        // Bound the count before the header arithmetic so a forged count
        // cannot overflow `usize` on 32-bit targets.
        if count > self.buf.len().saturating_sub(4) / 4 {
            return Err(CodecError::Truncated {
                field: self.field,
                needed: count.saturating_mul(4).saturating_add(4),
                have: self.buf.len(),
            });
        }
        let header = 4 + 4 * count;
        if count == 0 {
            if self.buf.len() != 4 {
                return Err(CodecError::CountMismatch {
                    field: self.field,
                    declared: 0,
                    actual: self.buf.len() - 4,
                });
            }
            return Ok(Vec::new());
        }

        let mut offsets = Vec::with_capacity(count + 1);
        for i in 0..count {
            offsets.push(self.u32_le(4 + 4 * i)? as usize);
        }
        offsets.push(self.buf.len());

        if offsets[0] != header {
            return Err(CodecError::BadOffset {
                field: self.field,
                offset: offsets[0],
                len: self.buf.len(),
            });
        }

        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            if offsets[i] > offsets[i + 1] {
                return Err(CodecError::BadOffset {
                    field: self.field,
                    offset: offsets[i],
                    len: self.buf.len(),
                });
            }
            items.push(self.slice(offsets[i], offsets[i + 1], self.field)?);
        }
        Ok(items)
    }

    /// Decode a table into one reader per declared field.
    ///
    /// The self-declared total size must match the buffer, and the offset
    /// header is validated the same way as a dynvec's.
    pub fn table(&self, fields: &'static [&'static str]) -> Result<Vec<Reader>, CodecError> {
        let total = self.u32_le(0)? as usize;
        if total != self.buf.len() {
            return Err(CodecError::CountMismatch {
                field: self.field,
                declared: total,
                actual: self.buf.len(),
            });
        }
        let count = fields.len();
        let header = 4 + 4 * count;
        self.need(header)?;

        let mut offsets = Vec::with_capacity(count + 1);
        for i in 0..count {
            offsets.push(self.u32_le(4 + 4 * i)? as usize);
        }
        offsets.push(self.buf.len());

        if count > 0 && offsets[0] != header {
            return Err(CodecError::BadOffset {
                field: self.field,
                offset: offsets[0],
                len: self.buf.len(),
            });
        }

        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            if offsets[i] > offsets[i + 1] {
                return Err(CodecError::BadOffset {
                    field: fields[i],
                    offset: offsets[i],
                    len: self.buf.len(),
                });
            }
            out.push(self.slice(offsets[i], offsets[i + 1], fields[i])?);
        }
        Ok(out)
    }

    /// Decode a union: discriminant plus variant payload. Discriminants at or
    /// beyond `variants` are a hard decode error, never coerced.
    pub fn union(&self, variants: usize) -> Result<(u32, Reader), CodecError> {
        let discriminant = self.u32_le(0)?;
        if discriminant as usize >= variants {
            return Err(CodecError::UnknownDiscriminant {
                field: self.field,
                value: discriminant,
                variants,
            });
        }
        Ok((discriminant, self.skip(4)))
    }

    /// Decode an option: a zero-length payload is absent.
    pub fn option(&self) -> Option<Reader> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.clone())
        }
    }

    fn skip(&self, n: usize) -> Reader {
        Reader {
            buf: self.buf.slice(n.min(self.buf.len())..),
            field: self.field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixvec_roundtrip() {
        let encoded = build_fixvec(b"hello");
        let decoded = Reader::new(encoded, "test").fixvec().unwrap();
        assert_eq!(&decoded[..], b"hello");

        let empty = build_fixvec(b"");
        assert!(Reader::new(empty, "test").fixvec().unwrap().is_empty());
    }

    #[test]
    fn fixvec_truncated() {
        let mut encoded = build_fixvec(b"hello").to_vec();
        encoded.truncate(6);
        let err = Reader::new(Bytes::from(encoded), "test")
            .fixvec()
            .unwrap_err();
        assert!(matches!(err, CodecError::Truncated { field: "test", .. }));
    }

    #[test]
    fn fixvec_trailing_bytes_rejected() {
        let mut encoded = build_fixvec(b"hi").to_vec();
        encoded.push(0xFF);
        let err = Reader::new(Bytes::from(encoded), "test")
            .fixvec()
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::CountMismatch {
                declared: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn dynvec_roundtrip() {
        let items = vec![
            build_fixvec(b"a"),
            build_fixvec(b""),
            build_fixvec(b"longer item"),
        ];
        let encoded = build_dynvec(&items);
        let decoded = Reader::new(encoded, "test").dynvec().unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(&decoded[0].fixvec().unwrap()[..], b"a");
        assert_eq!(&decoded[1].fixvec().unwrap()[..], b"");
        assert_eq!(&decoded[2].fixvec().unwrap()[..], b"longer item");
    }

    #[test]
    fn dynvec_empty() {
        let encoded = build_dynvec(&[]);
        assert_eq!(encoded.len(), 4);
        assert!(Reader::new(encoded, "test").dynvec().unwrap().is_empty());
    }

    #[test]
    fn dynvec_forged_count_rejected_before_allocation() {
        // A count near u32::MAX must fail the bounds check up front, not
        // overflow the header arithmetic or reserve a huge offset table.
        let mut encoded = u32::MAX.to_le_bytes().to_vec();
        encoded.extend_from_slice(&[0u8; 16]);
        let err = Reader::new(Bytes::from(encoded), "test")
            .dynvec()
            .unwrap_err();
        assert!(matches!(err, CodecError::Truncated { field: "test", .. }));
    }

    #[test]
    fn dynvec_offset_out_of_bounds() {
        let mut encoded = build_dynvec(&[build_fixvec(b"abc")]).to_vec();
        // Point the single item offset past the end of the buffer.
        encoded[4..8].copy_from_slice(&1000u32.to_le_bytes());
        let err = Reader::new(Bytes::from(encoded), "test")
            .dynvec()
            .unwrap_err();
        assert!(matches!(err, CodecError::BadOffset { .. }));
    }

    #[test]
    fn table_roundtrip() {
        const FIELDS: &[&str] = &["alpha", "beta"];
        let encoded = build_table(&[build_fixvec(b"one"), build_fixvec(b"two!")]);
        let fields = Reader::new(encoded, "test").table(FIELDS).unwrap();
        assert_eq!(fields[0].field(), "alpha");
        assert_eq!(&fields[0].fixvec().unwrap()[..], b"one");
        assert_eq!(&fields[1].fixvec().unwrap()[..], b"two!");
    }

    #[test]
    fn table_total_size_mismatch() {
        const FIELDS: &[&str] = &["alpha"];
        let mut encoded = build_table(&[build_fixvec(b"one")]).to_vec();
        encoded.pop();
        let err = Reader::new(Bytes::from(encoded), "test")
            .table(FIELDS)
            .unwrap_err();
        assert!(matches!(err, CodecError::CountMismatch { .. }));
    }

    #[test]
    fn table_non_monotonic_offsets() {
        const FIELDS: &[&str] = &["alpha", "beta"];
        let mut encoded = build_table(&[build_fixvec(b"one"), build_fixvec(b"two")]).to_vec();
        // Swap the two field offsets so they decrease.
        let first = encoded[4..8].to_vec();
        let second = encoded[8..12].to_vec();
        encoded[4..8].copy_from_slice(&second);
        encoded[8..12].copy_from_slice(&first);
        let err = Reader::new(Bytes::from(encoded), "test")
            .table(FIELDS)
            .unwrap_err();
        assert!(matches!(err, CodecError::BadOffset { .. }));
    }

    #[test]
    fn union_roundtrip() {
        let encoded = build_union(1, &build_fixvec(b"payload"));
        let (disc, payload) = Reader::new(encoded, "test").union(2).unwrap();
        assert_eq!(disc, 1);
        assert_eq!(&payload.fixvec().unwrap()[..], b"payload");
    }

    #[test]
    fn union_unknown_discriminant() {
        let encoded = build_union(7, &build_fixvec(b"x"));
        let err = Reader::new(encoded, "test").union(2).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownDiscriminant {
                field: "test",
                value: 7,
                variants: 2,
            }
        );
    }

    #[test]
    fn option_roundtrip() {
        let absent = build_option(None);
        assert!(Reader::new(absent, "test").option().is_none());

        let present = build_option(Some(build_fixvec(b"here")));
        let inner = Reader::new(present, "test").option().unwrap();
        assert_eq!(&inner.fixvec().unwrap()[..], b"here");
    }

    #[test]
    fn fixed_size_enforced() {
        let buf = Bytes::from_static(&[1, 2, 3, 4]);
        assert_eq!(Reader::new(buf.clone(), "test").fixed(4).unwrap(), buf);
        assert!(matches!(
            Reader::new(buf.clone(), "test").fixed(8).unwrap_err(),
            CodecError::Truncated { .. }
        ));
        assert!(matches!(
            Reader::new(buf, "test").fixed(2).unwrap_err(),
            CodecError::CountMismatch { .. }
        ));
    }
}
