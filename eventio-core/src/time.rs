//! Time fields stored as seconds since the Unix epoch plus nanoseconds.

use crate::cursor::ByteCursor;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::io::Read;

/// Encoded width of an [`HTime`] field.
pub const HTIME_WIDTH: u64 = 8;

/// Breakdown of an instant into seconds since 1970-01-01T00:00:00Z and
/// nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HTime {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl HTime {
    /// Reads two 32-bit fields: seconds, then nanoseconds.
    pub fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Self> {
        let seconds = i64::from(cursor.read_i32()?);
        let nanoseconds = i64::from(cursor.read_i32()?);
        Ok(Self {
            seconds,
            nanoseconds,
        })
    }

    /// Converts to a UTC timestamp.
    ///
    /// Returns `None` when the nanoseconds are outside `0..1_000_000_000`
    /// or the instant is out of range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let nanos = u32::try_from(self.nanoseconds).ok()?;
        if nanos >= 1_000_000_000 {
            return None;
        }
        DateTime::<Utc>::from_timestamp(self.seconds, nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ByteOrder;

    #[test]
    fn test_read_time() {
        let mut bytes = 12345i32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&67890i32.to_be_bytes());
        let mut cursor = ByteCursor::with_order(bytes.as_slice(), ByteOrder::BigEndian);

        let time = HTime::read(&mut cursor).unwrap();
        assert_eq!(time.seconds, 12345);
        assert_eq!(time.nanoseconds, 67890);
        assert_eq!(cursor.position(), HTIME_WIDTH);
    }

    #[test]
    fn test_to_datetime() {
        let time = HTime {
            seconds: 12345,
            nanoseconds: 67890,
        };
        let dt = time.to_datetime().unwrap();
        assert_eq!(
            dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
            "1970-01-01T03:25:45.000067890Z"
        );
        assert_eq!(dt.timestamp(), 12345);
        assert_eq!(dt.timestamp_subsec_nanos(), 67890);
    }

    #[test]
    fn test_invalid_nanoseconds() {
        let time = HTime {
            seconds: 0,
            nanoseconds: -1,
        };
        assert!(time.to_datetime().is_none());
        assert_eq!(HTime::default().to_datetime().unwrap().timestamp(), 0);
    }
}
