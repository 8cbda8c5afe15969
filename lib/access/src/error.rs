//! Error types for the access crate.

use std::fmt;

/// Errors from user directory lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The backing store could not be queried.
    LookupFailed { reason: String },
    /// A stored user record could not be decoded.
    CorruptRecord { user_id: String, reason: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookupFailed { reason } => {
                write!(f, "user directory lookup failed: {reason}")
            }
            Self::CorruptRecord { user_id, reason } => {
                write!(f, "user record {user_id} is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_failed_display() {
        let err = DirectoryError::LookupFailed {
            reason: "pool timed out".to_string(),
        };
        assert!(err.to_string().contains("lookup failed"));
        assert!(err.to_string().contains("pool timed out"));
    }

    #[test]
    fn corrupt_record_display() {
        let err = DirectoryError::CorruptRecord {
            user_id: "usr_1".to_string(),
            reason: "unknown role 'Intern'".to_string(),
        };
        assert!(err.to_string().contains("usr_1"));
        assert!(err.to_string().contains("Intern"));
    }
}
