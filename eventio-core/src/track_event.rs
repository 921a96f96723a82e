//! Tracking event blocks (types 2100 and up, one per telescope).
//!
//! The telescope appears twice: in the block type (see
//! [`track_event_telescope`]) and in the identification, whose bits 8 and 9
//! flag which pointing pairs follow:
//!
//! ```text
//! ident bits 0-7 | 24-29   telescope id (low | high part)
//! ident bit 8              raw azimuth, altitude present
//! ident bit 9              corrected azimuth, altitude present
//! ```

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::types::track_event_telescope;
use log::{error, trace};
use std::io::Read;

/// Newest tracking event version this decoder understands.
pub const MAX_TRACK_EVENT_VERSION: u32 = 0;

const RAW_KNOWN_BIT: i32 = 0x100;
const CORRECTED_KNOWN_BIT: i32 = 0x200;
const TEL_ID_LOW_MASK: i32 = 0xFF;
const TEL_ID_HIGH_MASK: i32 = 0x3F00_0000;

/// Telescope pointing direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointing {
    /// Azimuth [rad from N towards E].
    pub azimuth: f32,
    /// Altitude [rad].
    pub altitude: f32,
}

impl Pointing {
    fn read<R: Read>(cursor: &mut ByteCursor<R>) -> Result<Self> {
        Ok(Self {
            azimuth: cursor.read_f32()?,
            altitude: cursor.read_f32()?,
        })
    }
}

/// Interpolated tracking position of one telescope for one event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackEvent {
    pub tel_id: i16,
    /// Raw drive position, when known.
    pub raw: Option<Pointing>,
    /// Position corrected for pointing errors, when known.
    pub corrected: Option<Pointing>,
}

/// Telescope id carried in a tracking event identification.
fn ident_telescope(identification: i32) -> i16 {
    let id = (identification & TEL_ID_LOW_MASK) | ((identification & TEL_ID_HIGH_MASK) >> 16);
    // At most 14 bits survive the masks.
    id as i16
}

/// Decodes the body of a tracking event block.
///
/// The telescope encoded in the block type must match the one in the
/// identification.
pub fn decode_track_event<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
) -> Result<TrackEvent> {
    if header.version > MAX_TRACK_EVENT_VERSION {
        error!("Unsupported tracking event version {}", header.version);
        header.align_end(cursor)?;
        return Err(EventIoError::UnsupportedVersion {
            type_id: header.type_id,
            version: header.version,
            max: MAX_TRACK_EVENT_VERSION,
        });
    }

    let body = read_track_event_body(header, cursor);
    header.conclude(cursor, body)
}

fn read_track_event_body<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
) -> Result<TrackEvent> {
    let tel_id = track_event_telescope(header.type_id).ok_or_else(|| {
        EventIoError::invalid(
            "tracking event",
            format!("block type {} is not a tracking event", header.type_id),
        )
    })?;
    let ident_tel_id = ident_telescope(header.identification);
    if ident_tel_id != tel_id {
        return Err(EventIoError::invalid(
            "tracking event",
            format!(
                "block type names telescope {}, identification names {}",
                tel_id, ident_tel_id
            ),
        ));
    }

    let raw_known = header.identification & RAW_KNOWN_BIT != 0;
    let corrected_known = header.identification & CORRECTED_KNOWN_BIT != 0;
    let pairs = u64::from(raw_known) + u64::from(corrected_known);
    header.ensure_remaining(cursor, pairs * 8)?;

    let raw = if raw_known {
        Some(Pointing::read(cursor)?)
    } else {
        None
    };
    let corrected = if corrected_known {
        Some(Pointing::read(cursor)?)
    } else {
        None
    };

    trace!(
        "Tracking event for telescope {}: raw {:?}, corrected {:?}",
        tel_id,
        raw,
        corrected
    );
    Ok(TrackEvent {
        tel_id,
        raw,
        corrected,
    })
}
