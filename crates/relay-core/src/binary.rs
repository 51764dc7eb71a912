//! On-disk encoding for the event blob stored behind the `evt` family.
//!
//! Grounded on `rostra-core::bincode::STD_BINCODE_CONFIG`: big-endian,
//! varint, size-limited, so a corrupt length prefix can't trigger an
//! unbounded allocation.

use bincode::config::{self, Limit};

pub const STANDARD_LIMIT_16M: usize = 0x0100_0000;
pub const STD_BINCODE_CONFIG: config::Configuration<config::BigEndian, config::Varint, Limit<STANDARD_LIMIT_16M>> =
    config::standard()
        .with_limit::<STANDARD_LIMIT_16M>()
        .with_big_endian()
        .with_variable_int_encoding();

#[derive(Debug, snafu::Snafu)]
pub enum EncodeError {
    #[snafu(transparent)]
    Bincode { source: bincode::error::EncodeError },
}

#[derive(Debug, snafu::Snafu)]
pub enum DecodeError {
    #[snafu(transparent)]
    Bincode { source: bincode::error::DecodeError },
}

pub fn encode_to_vec<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, EncodeError> {
    Ok(bincode::encode_to_vec(value, STD_BINCODE_CONFIG)?)
}

pub fn decode_from_slice<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T, DecodeError> {
    let (value, _len) = bincode::decode_from_slice(bytes, STD_BINCODE_CONFIG)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, EventKind, Tags, Timestamp};
    use crate::id::{EventId, PubKey, Signature};

    #[test]
    fn event_round_trips_through_binary() {
        let event = Event {
            id: EventId([1u8; 32]),
            pubkey: PubKey([2u8; 32]),
            created_at: Timestamp(123),
            kind: EventKind(1),
            tags: Tags::default(),
            content: "hello".to_string(),
            sig: Signature([3u8; 64]),
        };
        let bytes = encode_to_vec(&event).unwrap();
        let decoded: Event = decode_from_slice(&bytes).unwrap();
        assert_eq!(decoded, event);
    }
}
