//! Fixed-width big-endian field encoders for composite index keys.
//!
//! Each field type writes exactly its declared width so that concatenation
//! preserves two invariants: **LexSort** (numeric order matches byte order)
//! and **PrefixNesting** (a partial key is always a byte-prefix of every
//! full key it should match). Signed fields (`created_at`) flip their sign
//! bit before encoding so `i64::MIN` sorts before `0` sorts before
//! `i64::MAX` as unsigned bytes.

use relay_core::event::{EventKind, Timestamp};
use relay_core::id::{IdHash, IdentHash, PubHash, Serial};

/// A growable key buffer; fields are appended in family-declared order.
#[derive(Debug, Default, Clone)]
pub struct KeyBuilder(Vec<u8>);

impl KeyBuilder {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_prefix(prefix: &[u8; 3]) -> Self {
        let mut b = Self(Vec::with_capacity(3));
        b.0.extend_from_slice(prefix);
        b
    }

    pub fn push_u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    pub fn push_u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn push_timestamp(mut self, v: Timestamp) -> Self {
        self.0.extend_from_slice(&flip_sign(v.0).to_be_bytes());
        self
    }

    pub fn push_hash8(mut self, v: [u8; 8]) -> Self {
        self.0.extend_from_slice(&v);
        self
    }

    pub fn push_id32(mut self, v: [u8; 32]) -> Self {
        self.0.extend_from_slice(&v);
        self
    }

    /// Writes the low 40 bits of a serial, big-endian.
    pub fn push_serial(mut self, v: Serial) -> Self {
        let bytes = v.0.to_be_bytes();
        self.0.extend_from_slice(&bytes[3..8]);
        self
    }

    pub fn push_kind(self, v: EventKind) -> Self {
        self.push_u16(v.0)
    }

    pub fn push_pubhash(self, v: PubHash) -> Self {
        self.push_hash8(v.0)
    }

    pub fn push_idhash(self, v: IdHash) -> Self {
        self.push_hash8(v.0)
    }

    pub fn push_identhash(self, v: IdentHash) -> Self {
        self.push_hash8(v.0)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Maps `i64` onto a `u64` space that preserves signed ordering when
/// compared as unsigned big-endian bytes.
pub fn flip_sign(v: i64) -> u64 {
    (v as u64) ^ (1u64 << 63)
}

pub fn unflip_sign(v: u64) -> i64 {
    (v ^ (1u64 << 63)) as i64
}

/// Reads fixed-width fields out of a decoded key buffer in declared order.
/// Family decoders call these after stripping the 3-byte prefix.
pub struct KeyReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

#[derive(Debug, snafu::Snafu, Clone, Copy, PartialEq, Eq)]
#[snafu(display("index key too short to decode a field"))]
pub struct KeyTooShort;

impl<'a> KeyReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], KeyTooShort> {
        let end = self.pos + n;
        let slice = self.buf.get(self.pos..end).ok_or(KeyTooShort)?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, KeyTooShort> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, KeyTooShort> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn read_kind(&mut self) -> Result<EventKind, KeyTooShort> {
        Ok(EventKind(self.read_u16()?))
    }

    pub fn read_timestamp(&mut self) -> Result<Timestamp, KeyTooShort> {
        let raw = u64::from_be_bytes(self.take(8)?.try_into().unwrap());
        Ok(Timestamp(unflip_sign(raw)))
    }

    pub fn read_hash8(&mut self) -> Result<[u8; 8], KeyTooShort> {
        Ok(self.take(8)?.try_into().unwrap())
    }

    pub fn read_pubhash(&mut self) -> Result<PubHash, KeyTooShort> {
        Ok(PubHash(self.read_hash8()?))
    }

    pub fn read_idhash(&mut self) -> Result<IdHash, KeyTooShort> {
        Ok(IdHash(self.read_hash8()?))
    }

    pub fn read_identhash(&mut self) -> Result<IdentHash, KeyTooShort> {
        Ok(IdentHash(self.read_hash8()?))
    }

    pub fn read_id32(&mut self) -> Result<[u8; 32], KeyTooShort> {
        Ok(self.take(32)?.try_into().unwrap())
    }

    /// Reads the trailing 5-byte serial, zero-extended to `u64`.
    pub fn read_serial(&mut self) -> Result<Serial, KeyTooShort> {
        let raw = self.take(5)?;
        let mut full = [0u8; 8];
        full[3..8].copy_from_slice(raw);
        Ok(Serial(u64::from_be_bytes(full)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lexsort_timestamp(a in proptest::num::i64::ANY, b in proptest::num::i64::ANY) {
            let ea = flip_sign(a).to_be_bytes();
            let eb = flip_sign(b).to_be_bytes();
            prop_assert_eq!(a < b, ea < eb);
        }

        #[test]
        fn lexsort_serial(a in 0u64..Serial::MAX.0, b in 0u64..Serial::MAX.0) {
            let ea = KeyBuilder::new().push_serial(Serial(a)).into_bytes();
            let eb = KeyBuilder::new().push_serial(Serial(b)).into_bytes();
            prop_assert_eq!(a < b, ea < eb);
        }

        #[test]
        fn lexsort_kind(a in proptest::num::u16::ANY, b in proptest::num::u16::ANY) {
            let ea = KeyBuilder::new().push_u16(a).into_bytes();
            let eb = KeyBuilder::new().push_u16(b).into_bytes();
            prop_assert_eq!(a < b, ea < eb);
        }
    }

    #[test]
    fn timestamp_round_trips() {
        for v in [i64::MIN, -1, 0, 1, i64::MAX] {
            let bytes = KeyBuilder::new().push_timestamp(Timestamp(v)).into_bytes();
            let mut reader = KeyReader::new(&bytes);
            assert_eq!(reader.read_timestamp().unwrap(), Timestamp(v));
        }
    }

    #[test]
    fn serial_round_trips() {
        let s = Serial::new(0x12_3456_789a);
        let bytes = KeyBuilder::new().push_serial(s).into_bytes();
        assert_eq!(bytes.len(), 5);
        let mut reader = KeyReader::new(&bytes);
        assert_eq!(reader.read_serial().unwrap(), s);
    }
}
