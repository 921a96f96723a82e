//! Pixel list blocks (type 2027).
//!
//! The identification combines the list kind and the telescope as
//! `code * 1000000 + telescope`. Version 0 stores an i16 count and i16
//! pixel ids, version 1 stores both as signed variable-length counts.

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::header::BlockHeader;
use crate::types::TYPE_PIXEL_LIST;
use log::{error, trace};
use std::io::Read;

/// Newest pixel list version this decoder understands.
pub const MAX_PIXEL_LIST_VERSION: u32 = 1;

/// Largest pixel count accepted in one list.
pub const H_MAX_PIX: usize = 4095;

const CODE_DIVISOR: i32 = 1_000_000;

/// A list of camera pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelList {
    /// List kind: 0 for triggered pixels, 1 for pixels selected for the image.
    pub code: i32,
    pub tel_id: i32,
    pub pixels: Vec<i32>,
}

/// Decodes the body of a pixel list block.
pub fn decode_pixel_list<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
) -> Result<PixelList> {
    if header.version > MAX_PIXEL_LIST_VERSION {
        error!("Unsupported pixel list version {}", header.version);
        header.align_end(cursor)?;
        return Err(EventIoError::UnsupportedVersion {
            type_id: TYPE_PIXEL_LIST,
            version: header.version,
            max: MAX_PIXEL_LIST_VERSION,
        });
    }

    let body = read_pixel_list_body(header, cursor);
    header.conclude(cursor, body)
}

fn read_pixel_list_body<R: Read>(
    header: &BlockHeader,
    cursor: &mut ByteCursor<R>,
) -> Result<PixelList> {
    let mut list = PixelList {
        code: header.identification / CODE_DIVISOR,
        tel_id: header.identification % CODE_DIVISOR,
        pixels: Vec::new(),
    };

    let declared = if header.version < 1 {
        header.ensure_remaining(cursor, 2)?;
        i64::from(cursor.read_i16()?)
    } else {
        header.read_scount(cursor)?
    };
    let count = usize::try_from(declared)
        .ok()
        .filter(|&n| n <= H_MAX_PIX)
        .ok_or_else(|| {
            error!(
                "Pixel list of telescope {} declares {} pixels",
                list.tel_id, declared
            );
            EventIoError::invalid(
                "pixel list",
                format!("pixel count {} outside 0..={}", declared, H_MAX_PIX),
            )
        })?;

    if header.version < 1 {
        header.ensure_remaining(cursor, count as u64 * 2)?;
        list.pixels = cursor
            .read_i16_vec(count)?
            .into_iter()
            .map(i32::from)
            .collect();
    } else {
        list.pixels.reserve(count);
        for _ in 0..count {
            let pixel = header.read_scount(cursor)?;
            let pixel = i32::try_from(pixel).map_err(|_| {
                EventIoError::invalid("pixel list", format!("pixel id {} out of range", pixel))
            })?;
            list.pixels.push(pixel);
        }
    }

    trace!(
        "Pixel list code {} for telescope {}: {} pixels",
        list.code,
        list.tel_id,
        list.pixels.len()
    );
    Ok(list)
}
