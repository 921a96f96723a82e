//! Error types for EventIO decoding.

use thiserror::Error;

/// Errors that can occur while decoding an EventIO stream.
///
/// Most variants describe a problem confined to a single block: the stream
/// driver skips that block and carries on. [`EventIoError::is_recoverable`]
/// tells the two kinds apart.
#[derive(Error, Debug)]
pub enum EventIoError {
    /// The byte source could not supply the requested bytes.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The block declares a version newer than the decoder understands.
    #[error("Unsupported version {version} for block type {type_id} (max supported: {max})")]
    UnsupportedVersion { type_id: u16, version: u32, max: u32 },

    /// A nested sub-record (profile, extra parameters, ...) failed to decode.
    #[error("Malformed {record}: {reason}")]
    MalformedSubRecord { record: &'static str, reason: String },

    /// A top-level record body failed validation.
    #[error("Invalid {record}: {reason}")]
    InvalidRecord { record: &'static str, reason: String },

    /// A read would cross the declared end of the current block.
    #[error("Block truncated: {needed} bytes needed, {remaining} remaining")]
    Truncated { needed: u64, remaining: u64 },

    /// Header fields are inconsistent with the framing rules.
    #[error("Invalid block header: {0}")]
    InvalidHeader(String),

    /// A nested item of a different type was found where one was required.
    #[error("Expected block type {expected}, found {found}")]
    UnexpectedType { expected: u16, found: u16 },

    /// Items are nested deeper than the format allows.
    #[error("Item nesting level {level} exceeds the maximum")]
    NestingTooDeep { level: usize },

    /// A nested item claims to extend past the end of its parent.
    #[error("Item of type {type_id} ends at {end}, beyond its parent end {parent_end}")]
    ItemOverrun {
        type_id: u16,
        end: u64,
        parent_end: u64,
    },

    /// The decoder consumed more bytes than the block declared.
    #[error("Alignment inconsistency: cursor at {position}, past block end {end}")]
    AlignmentInconsistency { position: u64, end: u64 },

    /// Strict synchronisation found something other than a sync marker.
    #[error("Synchronisation lost at byte offset {position}")]
    SyncLost { position: u64 },
}

impl EventIoError {
    /// Returns `true` if decoding can continue with the next block.
    ///
    /// IO failures, alignment inconsistencies and lost synchronisation leave
    /// the cursor position untrustworthy, so the stream must stop.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::AlignmentInconsistency { .. } | Self::SyncLost { .. }
        )
    }

    pub(crate) fn malformed(record: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedSubRecord {
            record,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(record: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            record,
            reason: reason.into(),
        }
    }
}

/// A convenience `Result` alias using [`EventIoError`].
pub type Result<T> = std::result::Result<T, EventIoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_recoverable_classification() {
        let eof = EventIoError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(!eof.is_recoverable());
        assert!(!EventIoError::AlignmentInconsistency { position: 10, end: 8 }.is_recoverable());
        assert!(!EventIoError::SyncLost { position: 0 }.is_recoverable());

        assert!(EventIoError::UnsupportedVersion {
            type_id: 2020,
            version: 3,
            max: 2
        }
        .is_recoverable());
        assert!(EventIoError::malformed("shower profile", "negative step count").is_recoverable());
        assert!(EventIoError::Truncated {
            needed: 8,
            remaining: 4
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = EventIoError::UnsupportedVersion {
            type_id: 2020,
            version: 3,
            max: 2,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported version 3 for block type 2020 (max supported: 2)"
        );
    }
}
