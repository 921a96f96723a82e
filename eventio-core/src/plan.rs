//! Version plans: ordered field tables gated by a minimum block version.
//!
//! A record layout that grows with the block version is described as a slice
//! of [`VersionedField`] entries. Entries whose `since` exceeds the block
//! version are skipped and leave the target's default value in place.

use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::header::BlockHeader;
use log::trace;
use std::io::Read;

/// Reads one field from the cursor into the record under construction.
pub type FieldReader<T, R> = fn(&mut T, &mut ByteCursor<R>) -> Result<()>;

/// One entry of a version plan.
pub struct VersionedField<T, R> {
    /// Field name, used in trace output.
    pub name: &'static str,
    /// First block version carrying the field.
    pub since: u32,
    /// Encoded width in bytes.
    pub width: u64,
    /// Reader storing the field into the target.
    pub read: FieldReader<T, R>,
}

impl<T, R> VersionedField<T, R> {
    pub fn new(name: &'static str, since: u32, width: u64, read: FieldReader<T, R>) -> Self {
        Self {
            name,
            since,
            width,
            read,
        }
    }

    /// Returns `true` if blocks of `version` carry this field.
    pub fn active_in(&self, version: u32) -> bool {
        version >= self.since
    }
}

/// Builds a [`VersionedField`] whose reader is a single assignment.
///
/// `R` must name the reader type parameter at the call site.
macro_rules! plan_field {
    ($target:ty, $name:literal, since $since:literal, width $width:expr, |$record:ident, $cursor:ident| $read:expr) => {
        $crate::plan::VersionedField::new(
            $name,
            $since,
            $width,
            |$record: &mut $target, $cursor: &mut $crate::cursor::ByteCursor<R>| {
                $read;
                Ok(())
            },
        )
    };
}
pub(crate) use plan_field;

/// Total encoded width of the entries active in `version`.
pub fn plan_width<T, R>(plan: &[VersionedField<T, R>], version: u32) -> u64 {
    plan.iter()
        .filter(|field| field.active_in(version))
        .map(|field| field.width)
        .sum()
}

/// Applies `plan` to `target` for a block of the given version.
///
/// The active width is checked against the bytes left in the block before
/// anything is read, so a short block fails with
/// [`crate::EventIoError::Truncated`] and no field is half-populated.
pub fn apply_plan<T, R: Read>(
    target: &mut T,
    plan: &[VersionedField<T, R>],
    version: u32,
    cursor: &mut ByteCursor<R>,
    header: &BlockHeader,
) -> Result<()> {
    header.ensure_remaining(cursor, plan_width(plan, version))?;
    for field in plan.iter().filter(|field| field.active_in(version)) {
        trace!("Reading {} at offset {}", field.name, cursor.position());
        (field.read)(target, cursor)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventIoError;
    use crate::test_support::{block, BodyWriter, ItemSpec};
    use crate::types::{ByteOrder, SyncPolicy};

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        a: i32,
        b: Option<f32>,
        c: i16,
    }

    fn sample_plan<R: Read>() -> [VersionedField<Sample, R>; 3] {
        [
            VersionedField::new("a", 0, 4, |s: &mut Sample, c: &mut ByteCursor<R>| {
                s.a = c.read_i32()?;
                Ok(())
            }),
            VersionedField::new("b", 1, 4, |s: &mut Sample, c: &mut ByteCursor<R>| {
                s.b = Some(c.read_f32()?);
                Ok(())
            }),
            VersionedField::new("c", 2, 2, |s: &mut Sample, c: &mut ByteCursor<R>| {
                s.c = c.read_i16()?;
                Ok(())
            }),
        ]
    }

    fn decode(version: u32, body: &[u8]) -> (Result<Sample>, u64) {
        let bytes = block(&ItemSpec::new(ByteOrder::BigEndian, 1, version, 0), body);
        let mut cursor = ByteCursor::new(bytes.as_slice());
        let header = BlockHeader::find_next(&mut cursor, SyncPolicy::Resync)
            .unwrap()
            .unwrap();
        let mut sample = Sample::default();
        let result = apply_plan(&mut sample, &sample_plan(), version, &mut cursor, &header)
            .map(|()| sample);
        (result, cursor.consumed_since(header.body_start()))
    }

    #[test]
    fn test_plan_width() {
        let plan = sample_plan::<&[u8]>();
        assert_eq!(plan_width(&plan, 0), 4);
        assert_eq!(plan_width(&plan, 1), 8);
        assert_eq!(plan_width(&plan, 7), 10);
    }

    #[test]
    fn test_fields_below_threshold_keep_defaults() {
        let body = BodyWriter::new(ByteOrder::BigEndian)
            .i32(42)
            .f32(2.5)
            .i16(3)
            .finish();

        let (sample, consumed) = decode(0, &body);
        assert_eq!(
            sample.unwrap(),
            Sample {
                a: 42,
                b: None,
                c: 0
            }
        );
        assert_eq!(consumed, 4);

        let (sample, consumed) = decode(1, &body);
        assert_eq!(
            sample.unwrap(),
            Sample {
                a: 42,
                b: Some(2.5),
                c: 0
            }
        );
        assert_eq!(consumed, 8);

        let (sample, consumed) = decode(2, &body);
        assert_eq!(
            sample.unwrap(),
            Sample {
                a: 42,
                b: Some(2.5),
                c: 3
            }
        );
        assert_eq!(consumed, 10);
    }

    #[test]
    fn test_short_block_reads_nothing() {
        let body = BodyWriter::new(ByteOrder::BigEndian).i32(42).i16(1).finish();
        let (result, consumed) = decode(1, &body);
        assert!(matches!(
            result,
            Err(EventIoError::Truncated {
                needed: 8,
                remaining: 6
            })
        ));
        assert_eq!(consumed, 0);
    }
}
