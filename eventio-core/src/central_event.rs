//! Central trigger event blocks (type 2009).

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::plan::{apply_plan, plan_field, VersionedField};
use crate::time::{HTime, HTIME_WIDTH};
use crate::types::{ReaderConfig, TYPE_CENTRAL_EVENT};
use log::{error, trace};
use std::io::Read;

/// Newest central event version this decoder understands.
pub const MAX_CENTRAL_EVENT_VERSION: u32 = 2;

/// Trigger types distinguished per telescope (majority, analog sum, digital sum).
pub const MAX_TEL_TRIGGERS: usize = 3;

/// Time recorded for trigger types that did not fire.
pub const NO_TRIGGER_TIME: f32 = 9999.0;

/// Trigger information of one telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct TelescopeTrigger {
    pub tel_id: i16,
    /// Trigger time relative to the central trigger [ns].
    pub time: f32,
    /// Bit `n` set when trigger type `n` fired.
    pub type_mask: u32,
    /// Trigger time per type, [`NO_TRIGGER_TIME`] where the type did not fire.
    pub time_by_type: [f32; MAX_TEL_TRIGGERS],
}

/// Central trigger data of one array event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CentralEvent {
    /// Global event count, taken from the block identification.
    pub glob_count: i32,
    pub cpu_time: HTime,
    pub gps_time: HTime,
    pub teltrg_pattern: i32,
    pub teldata_pattern: i32,
    /// Triggered telescopes in stream order. Empty before version 1.
    pub triggered: Vec<TelescopeTrigger>,
    /// Telescopes with data. Empty before version 1.
    pub teldata_list: Vec<i16>,
}

fn central_event_plan<R: Read>() -> [VersionedField<CentralEvent, R>; 4] {
    [
        plan_field!(CentralEvent, "cpu_time", since 0, width HTIME_WIDTH, |e, c| e.cpu_time = HTime::read(c)?),
        plan_field!(CentralEvent, "gps_time", since 0, width HTIME_WIDTH, |e, c| e.gps_time = HTime::read(c)?),
        plan_field!(CentralEvent, "teltrg_pattern", since 0, width 4, |e, c| e.teltrg_pattern = c.read_i32()?),
        plan_field!(CentralEvent, "teldata_pattern", since 0, width 4, |e, c| e.teldata_pattern = c.read_i32()?),
    ]
}

/// Decodes the body of a central trigger event block.
pub fn decode_central_event<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
) -> Result<CentralEvent> {
    if header.version > MAX_CENTRAL_EVENT_VERSION {
        error!("Unsupported central event version {}", header.version);
        header.align_end(cursor)?;
        return Err(EventIoError::UnsupportedVersion {
            type_id: TYPE_CENTRAL_EVENT,
            version: header.version,
            max: MAX_CENTRAL_EVENT_VERSION,
        });
    }

    let body = read_central_event_body(header, cursor, config);
    header.conclude(cursor, body)
}

fn read_central_event_body<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
) -> Result<CentralEvent> {
    let mut event = CentralEvent {
        glob_count: header.identification,
        ..Default::default()
    };
    apply_plan(&mut event, &central_event_plan(), header.version, cursor, header)?;
    if header.version < 1 {
        return Ok(event);
    }

    let num_triggered = read_telescope_count(header, cursor, config, "triggered telescopes")?;
    header.ensure_remaining(cursor, num_triggered as u64 * 6)?;
    let tel_ids = cursor.read_i16_vec(num_triggered)?;
    let times = cursor.read_f32_vec(num_triggered)?;

    let num_data = read_telescope_count(header, cursor, config, "telescopes with data")?;
    header.ensure_remaining(cursor, num_data as u64 * 2)?;
    event.teldata_list = cursor.read_i16_vec(num_data)?;

    let masks = if header.version >= 2 {
        let mut masks = Vec::with_capacity(num_triggered);
        for _ in 0..num_triggered {
            let mask = header.read_count(cursor)?;
            let mask = u32::try_from(mask).map_err(|_| {
                EventIoError::invalid(
                    "central event",
                    format!("trigger type mask {:#x} wider than 32 bits", mask),
                )
            })?;
            masks.push(mask);
        }
        masks
    } else {
        // Older data only knows the majority trigger.
        vec![1; num_triggered]
    };

    event.triggered.reserve(num_triggered);
    for ((tel_id, time), type_mask) in tel_ids.into_iter().zip(times).zip(masks) {
        let fired = |n: usize| type_mask & (1 << n) != 0;
        let mut time_by_type = [NO_TRIGGER_TIME; MAX_TEL_TRIGGERS];
        for (n, slot) in time_by_type.iter_mut().enumerate() {
            if fired(n) {
                *slot = time;
            }
        }
        let num_fired = (0..MAX_TEL_TRIGGERS).filter(|&n| fired(n)).count();
        if header.version >= 2 && num_fired > 1 {
            header.ensure_remaining(cursor, num_fired as u64 * 4)?;
            for (n, slot) in time_by_type.iter_mut().enumerate() {
                if fired(n) {
                    *slot = cursor.read_f32()?;
                }
            }
        }
        event.triggered.push(TelescopeTrigger {
            tel_id,
            time,
            type_mask,
            time_by_type,
        });
    }

    trace!(
        "Central event {}: {} triggered, {} with data",
        event.glob_count,
        event.triggered.len(),
        event.teldata_list.len()
    );
    Ok(event)
}

fn read_telescope_count<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
    config: &ReaderConfig,
    what: &str,
) -> Result<usize> {
    header.ensure_remaining(cursor, 2)?;
    let count = cursor.read_i16()?;
    usize::try_from(count)
        .ok()
        .filter(|&n| n <= config.max_telescopes)
        .ok_or_else(|| {
            error!(
                "Invalid number of {} {} in central event {}",
                what, count, header.identification
            );
            EventIoError::invalid(
                "central event",
                format!("{} {} outside 0..={}", what, count, config.max_telescopes),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{block, BodyWriter, ItemSpec};
    use crate::types::{ByteOrder, SyncPolicy};

    fn common(order: ByteOrder) -> BodyWriter {
        BodyWriter::new(order)
            .i32(12345)
            .i32(67890)
            .i32(12346)
            .i32(0)
            .i32(0b11)
            .i32(0b01)
    }

    fn decode(version: u32, body: &[u8]) -> (Result<CentralEvent>, u64, u64) {
        let bytes = block(
            &ItemSpec::new(ByteOrder::BigEndian, TYPE_CENTRAL_EVENT, version, 77),
            body,
        );
        let mut cursor = ByteCursor::new(bytes.as_slice());
        let header = BlockHeader::find_next(&mut cursor, SyncPolicy::Resync)
            .unwrap()
            .unwrap();
        let result = decode_central_event(&header, &mut cursor, &ReaderConfig::default());
        (result, cursor.position(), header.end_position())
    }

    #[test]
    fn test_version_0_has_no_telescope_lists() {
        let body = common(ByteOrder::BigEndian).finish();
        let (event, position, end) = decode(0, &body);
        let event = event.unwrap();
        assert_eq!(event.glob_count, 77);
        assert_eq!(event.cpu_time.seconds, 12345);
        assert_eq!(event.cpu_time.nanoseconds, 67890);
        assert_eq!(event.gps_time.seconds, 12346);
        assert_eq!(event.teltrg_pattern, 0b11);
        assert!(event.triggered.is_empty());
        assert!(event.teldata_list.is_empty());
        assert_eq!(position, end);
    }

    #[test]
    fn test_version_1_majority_trigger_only() {
        let body = common(ByteOrder::BigEndian)
            .i16(2)
            .i16(1)
            .i16(2)
            .f32(10.0)
            .f32(12.5)
            .i16(1)
            .i16(1)
            .finish();
        let (event, position, end) = decode(1, &body);
        let event = event.unwrap();
        assert_eq!(event.triggered.len(), 2);
        let second = &event.triggered[1];
        assert_eq!(second.tel_id, 2);
        assert_eq!(second.type_mask, 1);
        assert_eq!(second.time_by_type, [12.5, NO_TRIGGER_TIME, NO_TRIGGER_TIME]);
        assert_eq!(event.teldata_list, vec![1]);
        assert_eq!(position, end);
    }

    #[test]
    fn test_version_2_times_by_type() {
        let body = common(ByteOrder::BigEndian)
            .i16(2)
            .i16(3)
            .i16(4)
            .f32(10.0)
            .f32(20.0)
            .i16(0)
            .small_count(0b010)
            .small_count(0b101)
            .f32(21.0)
            .f32(23.0)
            .finish();
        let (event, position, end) = decode(2, &body);
        let event = event.unwrap();

        let first = &event.triggered[0];
        assert_eq!(first.type_mask, 0b010);
        assert_eq!(first.time_by_type, [NO_TRIGGER_TIME, 10.0, NO_TRIGGER_TIME]);

        let second = &event.triggered[1];
        assert_eq!(second.time_by_type, [21.0, NO_TRIGGER_TIME, 23.0]);
        assert_eq!(position, end);
    }

    #[test]
    fn test_mask_cut_at_block_end() {
        let mut body = common(ByteOrder::BigEndian)
            .i16(1)
            .i16(5)
            .f32(10.0)
            .i16(0)
            .finish();
        // Mask encoding announcing two more bytes than the block holds.
        body.push(0xC0);
        let mut bytes = block(
            &ItemSpec::new(ByteOrder::BigEndian, TYPE_CENTRAL_EVENT, 2, 1),
            &body,
        );
        bytes.extend(block(
            &ItemSpec::new(ByteOrder::BigEndian, TYPE_CENTRAL_EVENT, 0, 2),
            &common(ByteOrder::BigEndian).finish(),
        ));

        let config = ReaderConfig::default();
        let mut cursor = ByteCursor::new(bytes.as_slice());
        let header = BlockHeader::find_next(&mut cursor, SyncPolicy::Strict)
            .unwrap()
            .unwrap();
        let err = decode_central_event(&header, &mut cursor, &config).unwrap_err();
        assert!(matches!(err, EventIoError::Truncated { needed: 2, .. }));
        assert_eq!(cursor.position(), header.end_position());

        let next = BlockHeader::find_next(&mut cursor, SyncPolicy::Strict)
            .unwrap()
            .unwrap();
        let event = decode_central_event(&next, &mut cursor, &config).unwrap();
        assert_eq!(event.glob_count, 2);
    }

    #[test]
    fn test_mask_wider_than_32_bits() {
        let body = common(ByteOrder::BigEndian)
            .i16(1)
            .i16(5)
            .f32(10.0)
            .i16(0)
            .raw(&[0xF8, 0x01, 0x00, 0x00, 0x00, 0x00])
            .finish();
        let (result, position, end) = decode(2, &body);
        assert!(matches!(
            result,
            Err(EventIoError::InvalidRecord {
                record: "central event",
                ..
            })
        ));
        assert_eq!(position, end);
    }

    #[test]
    fn test_too_many_telescopes() {
        let body = common(ByteOrder::BigEndian).i16(17).raw(&[0u8; 64]).finish();
        let (result, position, end) = decode(1, &body);
        assert!(matches!(
            result,
            Err(EventIoError::InvalidRecord {
                record: "central event",
                ..
            })
        ));
        assert_eq!(position, end);
    }
}
