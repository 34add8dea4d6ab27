//! # Firmware Status Codes
//!
//! One error taxonomy for the whole firmware. Components propagate these
//! with `?`; at the outermost boundary callers that want a raw status log
//! the signed code from [`Error::code`].

use core::fmt;

// ============================================================================
// Error Taxonomy
// ============================================================================

/// Firmware-wide error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Absent or out-of-range argument, detected before any hardware access.
    InvalidArgument,
    /// Duplicate registration of an identity that must be unique.
    AlreadyExists,
    /// A lookup found nothing.
    NotFound,
    /// No device behind the given topology handle.
    NoDevice,
    /// The adapter does not provide this operation.
    NotImplemented,
    /// A bounded wait expired without the expected observation.
    TimedOut,
    /// A component was used before its one-time initialization.
    NotInitialized,
}

impl Error {
    /// Signed status code reported across the firmware boundary.
    pub const fn code(self) -> i32 {
        match self {
            Self::InvalidArgument => -1,
            Self::NotImplemented => -2,
            Self::TimedOut => -3,
            Self::NotFound => -4,
            Self::NoDevice => -5,
            Self::AlreadyExists => -6,
            Self::NotInitialized => -7,
        }
    }

    /// Short name for diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::AlreadyExists => "already exists",
            Self::NotFound => "not found",
            Self::NoDevice => "no device",
            Self::NotImplemented => "not implemented",
            Self::TimedOut => "timed out",
            Self::NotInitialized => "not initialized",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Firmware result alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_negative_and_distinct() {
        let all = [
            Error::InvalidArgument,
            Error::AlreadyExists,
            Error::NotFound,
            Error::NoDevice,
            Error::NotImplemented,
            Error::TimedOut,
            Error::NotInitialized,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(a.code() < 0);
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
