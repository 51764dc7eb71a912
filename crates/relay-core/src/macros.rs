/// Defines a fixed-size byte-array newtype with hex `Display`/`FromStr`,
/// ordering, and (optionally) `bincode` derives.
///
/// Grounded on `rostra-core`'s `array_type_define*!` family: one macro per
/// concern (bytes, ordering, text encoding) so callers opt into exactly what
/// a given identifier type needs.
#[macro_export]
macro_rules! array_type {
    (
        $(#[$outer:meta])*
        struct $t:ident, $n:literal
    ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
        pub struct $t(pub [u8; $n]);

        impl $t {
            pub const ZERO: Self = Self([0u8; $n]);
            pub const MAX: Self = Self([0xffu8; $n]);

            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }

            pub fn from_bytes(bytes: [u8; $n]) -> Self {
                Self(bytes)
            }

            pub fn to_bytes(self) -> [u8; $n] {
                self.0
            }
        }

        impl From<[u8; $n]> for $t {
            fn from(bytes: [u8; $n]) -> Self {
                Self(bytes)
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                data_encoding::HEXLOWER.encode_write(&self.0, f)
            }
        }

        impl std::fmt::Debug for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($t), "({})"), self)
            }
        }

        impl std::str::FromStr for $t {
            type Err = $crate::id::HexParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                use snafu::OptionExt as _;

                let bytes = data_encoding::HEXLOWER_PERMISSIVE
                    .decode(s.as_bytes())
                    .map_err(|_| $crate::id::HexParseError::InvalidHex)?;
                let arr: [u8; $n] = bytes
                    .try_into()
                    .ok()
                    .context($crate::id::InvalidLengthSnafu)?;
                Ok(Self(arr))
            }
        }
    };
}
