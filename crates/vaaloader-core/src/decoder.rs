//! The `MessageDecoder` trait workers decode line payloads through.
//!
//! The trait is object-safe so a decoder can be shared across worker tasks as
//! `Arc<dyn MessageDecoder>`.

use crate::error::DecodeError;
use crate::vaa::Vaa;

/// Turns the hex-decoded bytes of one input line into a `Vaa`.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; every worker holds the same
/// instance and decodes concurrently without locking.
pub trait MessageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vaa, DecodeError>;
}

/// Blanket impl so closures can stand in for a decoder (handy in tests).
impl<F> MessageDecoder for F
where
    F: Fn(&[u8]) -> Result<Vaa, DecodeError> + Send + Sync,
{
    fn decode(&self, bytes: &[u8]) -> Result<Vaa, DecodeError> {
        self(bytes)
    }
}

/// Decoder for v1 VAAs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaaDecoder;

impl MessageDecoder for VaaDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vaa, DecodeError> {
        Vaa::parse(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn decoder_is_object_safe() {
        let decoder: Arc<dyn MessageDecoder> = Arc::new(VaaDecoder);
        assert!(decoder.decode(&[]).is_err());
    }

    #[test]
    fn closure_decoder() {
        let decoder = |_: &[u8]| -> Result<Vaa, DecodeError> {
            Err(DecodeError::UnsupportedVersion(9))
        };
        assert_eq!(
            decoder.decode(&[1, 2, 3]).unwrap_err(),
            DecodeError::UnsupportedVersion(9)
        );
    }
}
