//! Error types for arbor-crypto

use thiserror::Error;

/// Errors from the cryptographic primitives
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Errors from encoding or decoding wire frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload does not fit in one frame for these addresses
    #[error("Payload too large: {size} bytes (max {max})")]
    CapacityExceeded { size: usize, max: usize },

    /// The frame was not produced by a member of this network with this key,
    /// or was altered in transit
    #[error("Frame failed authentication")]
    AuthenticationFailed,

    #[error("Invalid frame size: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_error_display() {
        let err = CryptoError::EncryptionFailed("bad buffer".to_string());
        assert!(format!("{}", err).contains("Encryption failed"));
        assert!(format!("{}", err).contains("bad buffer"));

        let err = CryptoError::InvalidKey("wrong length".to_string());
        assert!(format!("{}", err).contains("Invalid key"));
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::CapacityExceeded { size: 300, max: 205 };
        let msg = format!("{}", err);
        assert!(msg.contains("300"));
        assert!(msg.contains("205"));

        let err = CodecError::FrameSize {
            expected: 250,
            actual: 12,
        };
        assert!(format!("{}", err).contains("250"));

        // Authentication failures carry no detail
        assert_eq!(
            format!("{}", CodecError::AuthenticationFailed),
            "Frame failed authentication"
        );
    }

    #[test]
    fn test_crypto_into_codec() {
        let err: CodecError = CryptoError::DecryptionFailed.into();
        assert!(matches!(err, CodecError::Crypto(CryptoError::DecryptionFailed)));
    }
}
