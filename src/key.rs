use std::borrow::Cow;
use std::convert::Infallible;
use std::string::FromUtf8Error;

use crate::AnyError;

/// A type that can be converted into a `memcmp`-compatible sequence of bytes.
///
/// The byte representation must sort identically to the type's `Ord`
/// implementation, which is what keeps a view's index ordered the same way as
/// its native key type.
pub trait Key<'k>: Clone + Send + Sync + std::fmt::Debug + Sized {
    /// The error type that can be produced by either serialization or
    /// deserialization.
    type Error: AnyError;

    /// Converts `self` into a `Cow<[u8]>` containing bytes that are able to be
    /// compared via `memcmp` in a way that is compatible with the type's own
    /// `Ord` implementation.
    fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error>;

    /// Converts a previously encoded sequence of bytes back to the key type.
    fn from_big_endian_bytes(bytes: &'k [u8]) -> Result<Self, Self::Error>;
}

/// The bytes being decoded are not the correct length for the key type.
#[derive(thiserror::Error, Debug)]
#[error("the stored bytes are not the correct length for this key type")]
pub struct IncorrectByteLength;

impl<'k> Key<'k> for () {
    type Error = Infallible;

    fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error> {
        Ok(Cow::default())
    }

    fn from_big_endian_bytes(_bytes: &'k [u8]) -> Result<Self, Self::Error> {
        Ok(())
    }
}

impl<'k> Key<'k> for bool {
    type Error = Infallible;

    fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error> {
        Ok(Cow::Owned(vec![u8::from(*self)]))
    }

    fn from_big_endian_bytes(bytes: &'k [u8]) -> Result<Self, Self::Error> {
        Ok(!matches!(bytes, [] | [0]))
    }
}

impl<'k> Key<'k> for String {
    type Error = FromUtf8Error;

    fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }

    fn from_big_endian_bytes(bytes: &'k [u8]) -> Result<Self, Self::Error> {
        Self::from_utf8(bytes.to_vec())
    }
}

impl<'k> Key<'k> for Cow<'k, str> {
    type Error = std::str::Utf8Error;

    fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error> {
        Ok(Cow::Borrowed(self.as_bytes()))
    }

    fn from_big_endian_bytes(bytes: &'k [u8]) -> Result<Self, Self::Error> {
        std::str::from_utf8(bytes).map(Cow::Borrowed)
    }
}

impl<'k> Key<'k> for Vec<u8> {
    type Error = Infallible;

    fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error> {
        Ok(Cow::Borrowed(self))
    }

    fn from_big_endian_bytes(bytes: &'k [u8]) -> Result<Self, Self::Error> {
        Ok(bytes.to_vec())
    }
}

macro_rules! impl_key_for_unsigned {
    ($type:ty) => {
        impl<'k> Key<'k> for $type {
            type Error = IncorrectByteLength;

            fn as_big_endian_bytes(&'k self) -> Result<Cow<'k, [u8]>, Self::Error> {
                Ok(Cow::Owned(self.to_be_bytes().to_vec()))
            }

            fn from_big_endian_bytes(bytes: &'k [u8]) -> Result<Self, Self::Error> {
                Ok(<$type>::from_be_bytes(
                    bytes.try_into().map_err(|_| IncorrectByteLength)?,
                ))
            }
        }
    };
}

impl_key_for_unsigned!(u8);
impl_key_for_unsigned!(u16);
impl_key_for_unsigned!(u32);
impl_key_for_unsigned!(u64);
impl_key_for_unsigned!(u128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_key_encoding_sorts() {
        let mut encoded = [270_u32, 3, 1_000_000, 0]
            .iter()
            .map(|value| value.as_big_endian_bytes().unwrap().to_vec())
            .collect::<Vec<_>>();
        encoded.sort();
        let decoded = encoded
            .iter()
            .map(|bytes| u32::from_big_endian_bytes(bytes).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(decoded, vec![0, 3, 270, 1_000_000]);
    }

    #[test]
    fn string_key_encoding_round_trips() {
        let original = String::from("ihf-2204");
        let encoded = original.as_big_endian_bytes().unwrap();
        assert_eq!(
            String::from_big_endian_bytes(&encoded).unwrap(),
            "ihf-2204"
        );
    }

    #[test]
    fn incorrect_length_is_an_error() {
        u64::from_big_endian_bytes(&[1, 2, 3]).unwrap_err();
    }
}
