//! Payload codec applied to distributed tier values.

use std::fmt::Debug;

use crate::error::Result;

/// Transforms serialized entries on their way to and from the distributed tier.
///
/// `decompress(compress(x))` must yield `x`. Failures should be reported as
/// [`CacheError::Codec`](crate::error::CacheError::Codec).
pub trait Codec: Send + Sync + Debug {
    fn compress(&self, raw: Vec<u8>) -> Result<Vec<u8>>;
    fn decompress(&self, stored: Vec<u8>) -> Result<Vec<u8>>;
}

/// Stores payloads as-is (plain JSON text).
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn compress(&self, raw: Vec<u8>) -> Result<Vec<u8>> {
        Ok(raw)
    }

    fn decompress(&self, stored: Vec<u8>) -> Result<Vec<u8>> {
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_codec_passes_bytes_through() {
        let codec = IdentityCodec;
        let raw = br#"{"value":1}"#.to_vec();

        let stored = codec.compress(raw.clone()).unwrap();
        assert_eq!(stored, raw);
        assert_eq!(codec.decompress(stored).unwrap(), raw);
    }
}
