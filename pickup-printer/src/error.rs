//! Error types for the printer control layer

use thiserror::Error;

/// Errors raised by a connected printer device
///
/// Nothing outside this crate ever observes one of these: the service handle
/// absorbs them at the guarded-call boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Remote call or transport failed mid-operation
    #[error("Transport fault: {0}")]
    Transport(String),

    /// The connected service does not implement this capability
    #[error("Unsupported capability: {0}")]
    Unsupported(&'static str),

    /// IO error while talking to the device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Whether the failure means the capability is missing, as opposed to a
    /// broken transport
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DeviceError::Unsupported(_))
    }
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors raised by a connection primitive (bind / unbind / probe)
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The service refused the bind request
    #[error("Bind failed: {0}")]
    Bind(String),

    /// Releasing the service failed
    #[error("Unbind failed: {0}")]
    Unbind(String),

    /// Hardware probe failed
    #[error("Probe failed: {0}")]
    Probe(String),

    /// IO error while connecting
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for the service
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid connector configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for connection primitives
pub type ConnectResult<T> = Result<T, ConnectError>;

/// Errors raised while building a pickup document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReceiptError {
    /// Parcel weight below zero
    #[error("Negative weight for parcel to {destination}: {weight}")]
    NegativeWeight { destination: String, weight: String },

    /// Parcel weights add up past what a decimal can hold
    #[error("Total weight of {parcels} parcels overflows")]
    WeightOverflow { parcels: usize },
}

/// A high-level style call was rejected; the raw encoder path must be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsupported;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_classification() {
        assert!(DeviceError::Unsupported("set_style").is_unsupported());
        assert!(!DeviceError::Transport("broken pipe".into()).is_unsupported());
    }

    #[test]
    fn test_error_messages() {
        let err = ConnectError::Bind("service missing".into());
        assert_eq!(err.to_string(), "Bind failed: service missing");

        let err = ReceiptError::NegativeWeight {
            destination: "Tehran".into(),
            weight: "-1".into(),
        };
        assert_eq!(err.to_string(), "Negative weight for parcel to Tehran: -1");
    }

    #[test]
    fn test_io_errors_convert() {
        let io = || std::io::Error::from(std::io::ErrorKind::BrokenPipe);
        assert!(matches!(DeviceError::from(io()), DeviceError::Io(_)));
        assert!(!DeviceError::from(io()).is_unsupported());
        assert!(matches!(ConnectError::from(io()), ConnectError::Io(_)));
    }
}
