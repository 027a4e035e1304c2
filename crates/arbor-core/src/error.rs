//! Error types shared across the Arbor crates

use thiserror::Error;

/// Errors related to tree addresses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Address too deep: {depth} components (max {max})")]
    TooDeep { depth: usize, max: usize },
}

/// Errors related to link-layer identities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Invalid hardware address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid hardware address length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Errors related to the link transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transmit failed: {0}")]
    TransmitFailed(String),

    #[error("Peer not registered: {0}")]
    PeerNotRegistered(String),

    #[error("Peer registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Link closed")]
    LinkClosed,
}

/// Top-level error type for core operations
#[derive(Debug, Error)]
pub enum ArborError {
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias for Arbor core operations
pub type ArborResult<T> = Result<T, ArborError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_error_display() {
        let err = AddressError::TooDeep { depth: 16, max: 15 };
        let msg = format!("{}", err);
        assert!(msg.contains("16"));
        assert!(msg.contains("15"));
    }

    #[test]
    fn test_identity_error_display() {
        let err = IdentityError::InvalidFormat("zz:zz".to_string());
        assert!(format!("{}", err).contains("zz:zz"));

        let err = IdentityError::InvalidLength {
            expected: 6,
            actual: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains('6'));
        assert!(msg.contains('4'));
    }

    #[test]
    fn test_transport_error_display() {
        assert!(
            format!("{}", TransportError::TransmitFailed("radio busy".into()))
                .contains("radio busy")
        );
        assert!(format!("{}", TransportError::LinkClosed).contains("closed"));
    }

    #[test]
    fn test_core_error_from() {
        let err: ArborError = AddressError::TooDeep { depth: 20, max: 15 }.into();
        assert!(matches!(err, ArborError::Address(_)));
        assert!(format!("{}", err).contains("Address error"));

        let err: ArborError = TransportError::LinkClosed.into();
        assert!(matches!(err, ArborError::Transport(TransportError::LinkClosed)));
    }
}
