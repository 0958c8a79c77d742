//! Error Module - FRC Error Types
//!
//! Defines the error types returned by the fallible surfaces of FRC.
//!
//! `retain` and `release` never return errors: under their contract they
//! cannot fail, and heap corruption detected in debug mode is a diagnostic
//! abort (see [`crate::debug::Violation`]). Everything around them that
//! validates caller input does return errors:
//!
//! ## Construction Errors
//! - `OutOfMemory` - Allocator could not supply storage
//! - `InvalidLayout` - Capacity / pointer-count combination is impossible
//!
//! ## Access Errors
//! - `InvalidPointer` - Null where an object is required
//! - `BoundsCheckFailed` - Slot index outside the pointer region
//! - `ListFull` - Push into a list with no free slot
//! - `InvalidUtf8` - String payload is not valid UTF-8
//!
//! ## Configuration Errors
//! - `Configuration` - Invalid [`crate::RcConfig`]

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for all FRC operations
///
/// # Examples
///
/// ```rust
/// use frc::FrcError;
///
/// fn handle_error(err: FrcError) {
///     match err {
///         FrcError::OutOfMemory { requested } => {
///             eprintln!("OOM: requested {} bytes", requested);
///         }
///         _ => eprintln!("Other error: {}", err),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum FrcError {
    /// Out of memory
    ///
    /// **When returned:** The allocator returned no storage for a new object.
    ///
    /// **Recovery strategy:** Release unreachable objects and retry, or abort.
    #[error("Out of memory: requested {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Invalid object layout
    ///
    /// **When returned:** Negative capacity or pointer count, a pointer region
    /// larger than the payload, or a capacity above `max_capacity`.
    ///
    /// **Recovery strategy:** Fix the constructor requesting the layout.
    #[error("Invalid object layout: {0}")]
    InvalidLayout(String),

    /// Invalid pointer address
    ///
    /// **When returned:** Null passed where a live object is required.
    #[error("Invalid pointer address: {address:#x}")]
    InvalidPointer { address: usize },

    /// Bounds check failed
    ///
    /// **When returned:** Slot index >= pointer count, or list index >= length.
    #[error("Bounds check failed: index {index} out of bounds for length {length}")]
    BoundsCheckFailed { index: usize, length: usize },

    /// List has no free slot
    ///
    /// **When returned:** `list_push` on a list whose length equals its slot count.
    #[error("List is full: all {capacity} slots in use")]
    ListFull { capacity: usize },

    /// String payload is not UTF-8
    #[error("Invalid UTF-8 in string object: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Configuration error
    ///
    /// **When returned:** [`crate::RcConfig::validate`] rejected the configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl FrcError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrcError::OutOfMemory { .. } | FrcError::ListFull { .. })
    }

    /// Check if this error indicates a bug in the caller
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            FrcError::InvalidLayout(_)
                | FrcError::BoundsCheckFailed { .. }
                | FrcError::InvalidPointer { .. }
        )
    }
}

/// Result type alias for FRC operations
pub type Result<T> = std::result::Result<T, FrcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FrcError::OutOfMemory { requested: 64 };
        assert_eq!(err.to_string(), "Out of memory: requested 64 bytes");

        let err = FrcError::BoundsCheckFailed { index: 3, length: 2 };
        assert_eq!(
            err.to_string(),
            "Bounds check failed: index 3 out of bounds for length 2"
        );

        let err = FrcError::InvalidPointer { address: 0 };
        assert_eq!(err.to_string(), "Invalid pointer address: 0x0");
    }

    #[test]
    fn test_error_classification() {
        assert!(FrcError::OutOfMemory { requested: 1 }.is_recoverable());
        assert!(FrcError::ListFull { capacity: 4 }.is_recoverable());
        assert!(!FrcError::InvalidLayout("x".into()).is_recoverable());

        assert!(FrcError::InvalidLayout("x".into()).is_bug());
        assert!(FrcError::InvalidPointer { address: 0 }.is_bug());
        assert!(!FrcError::OutOfMemory { requested: 1 }.is_bug());
    }

    #[test]
    fn test_from_config_error() {
        let err: FrcError = ConfigError::InvalidCapacity("zero".into()).into();
        assert!(matches!(err, FrcError::Configuration(_)));
    }
}
