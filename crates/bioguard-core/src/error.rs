//! Error types for bioguard-core.
//!
//! # Taxonomy
//!
//! Every failure is caught at the boundary of the operation that raised it
//! and mapped onto one of four outcomes:
//!
//! | Outcome | Variant(s) | Surfaced as |
//! |---------|------------|-------------|
//! | Capability unavailable | [`Error::CapabilityUnavailable`] | alert, connect aborted |
//! | Discovery failure | [`Error::DiscoveryFailed`] | status text, control re-enabled |
//! | Decode warning | [`Error::Decode`] | log only, payload dropped |
//! | Read failure | any error from a poll read | log only, next tick unaffected |
//!
//! Nothing is retried automatically.

use std::time::Duration;

use thiserror::Error;

use bioguard_types::DecodeWarning;

/// Errors that can occur when talking to the analyzer.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The platform has no usable Bluetooth capability.
    #[error("Bluetooth is not available: {0}")]
    CapabilityUnavailable(String),

    /// No peripheral with the expected name was found.
    #[error("Device '{name}' not found after scanning for {duration:?}")]
    DeviceNotFound {
        /// Advertised name that was searched for.
        name: String,
        /// How long the scan ran.
        duration: Duration,
    },

    /// The peripheral does not expose the expected primary service.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The service UUID that was not found.
        uuid: String,
    },

    /// The service does not expose the expected characteristic.
    #[error("Characteristic not found: {uuid} (in service {service})")]
    CharacteristicNotFound {
        /// The characteristic UUID that was not found.
        uuid: String,
        /// The service that was searched.
        service: String,
    },

    /// Operation attempted while not connected.
    #[error("Not connected to device")]
    NotConnected,

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// A step of the connect sequence failed.
    #[error("Discovery failed while {step}: {source}")]
    DiscoveryFailed {
        /// The step that failed.
        step: ConnectStep,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// A payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeWarning),

    /// Failure reported by a peripheral backend outside btleplug.
    #[error("Peripheral error: {0}")]
    Peripheral(String),

    /// The session manager was asked to do something its state forbids.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Steps of the connect sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStep {
    /// Scanning for the named peripheral.
    RequestDevice,
    /// Registering the session-lost watcher.
    WatchDisconnect,
    /// Establishing the connection.
    Connect,
    /// Looking up the primary service.
    PrimaryService,
    /// Looking up the reading characteristic.
    Characteristic,
    /// Enabling notifications.
    StartNotifications,
    /// Routing notifications to the decoder.
    Subscribe,
}

impl std::fmt::Display for ConnectStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RequestDevice => write!(f, "requesting device"),
            Self::WatchDisconnect => write!(f, "watching for disconnects"),
            Self::Connect => write!(f, "connecting"),
            Self::PrimaryService => write!(f, "looking up primary service"),
            Self::Characteristic => write!(f, "looking up characteristic"),
            Self::StartNotifications => write!(f, "starting notifications"),
            Self::Subscribe => write!(f, "subscribing to notifications"),
        }
    }
}

impl Error {
    /// Create a capability error.
    pub fn capability_unavailable(message: impl Into<String>) -> Self {
        Self::CapabilityUnavailable(message.into())
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Wrap a failure as a discovery failure at `step`.
    pub fn discovery(step: ConnectStep, source: Error) -> Self {
        Self::DiscoveryFailed {
            step,
            source: Box::new(source),
        }
    }

    /// Create a peripheral backend error.
    pub fn peripheral(message: impl Into<String>) -> Self {
        Self::Peripheral(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this is a missing-capability error.
    pub fn is_capability_unavailable(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable(_))
    }

    /// Whether this is a failure of the connect sequence.
    pub fn is_discovery_failure(&self) -> bool {
        matches!(self, Self::DiscoveryFailed { .. })
    }

    /// The connect step that failed, for discovery failures.
    pub fn failed_step(&self) -> Option<ConnectStep> {
        match self {
            Self::DiscoveryFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Human-readable reason, without the step wrapper.
    pub fn reason(&self) -> String {
        match self {
            Self::DiscoveryFailed { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias using bioguard-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::ServiceNotFound {
            uuid: "12345678-1234-1234-1234-123456789abc".to_string(),
        };
        assert!(err.to_string().contains("12345678"));

        let err = Error::timeout("read characteristic", Duration::from_secs(10));
        assert!(err.to_string().contains("read characteristic"));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_discovery_failure_wraps_step() {
        let err = Error::discovery(ConnectStep::PrimaryService, Error::peripheral("gatt error"));
        assert!(err.is_discovery_failure());
        assert_eq!(err.failed_step(), Some(ConnectStep::PrimaryService));
        assert_eq!(err.reason(), "Peripheral error: gatt error");
        assert!(err.to_string().contains("looking up primary service"));
    }

    #[test]
    fn test_capability_classification() {
        let err = Error::capability_unavailable("no adapter");
        assert!(err.is_capability_unavailable());
        assert!(!err.is_discovery_failure());
        assert_eq!(err.failed_step(), None);
        assert_eq!(err.reason(), err.to_string());
    }

    #[test]
    fn test_decode_warning_conversion() {
        let warning = bioguard_types::Reading::parse("garbage").unwrap_err();
        let err: Error = warning.into();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().contains("garbage"));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
