//! Block framing: sync marker search, header fields and end-of-block alignment.
//!
//! Every top-level block starts with a 4-byte sync marker followed by three
//! 32-bit header words (four with the extension flag):
//!
//! ```text
//! [4 bytes] sync marker 0xD41F8A37, byte pattern gives the byte order
//! [4 bytes] type word   bits 0-15 type | 16 user | 17 extension | 20-31 version
//! [4 bytes] identification
//! [4 bytes] length word bits 0-29 length | 30 only sub-items | 31 reserved (0)
//! [4 bytes] extension   bits 0-11 extend the length above bit 30 (optional)
//! ```
//!
//! Nested items use the same header without the sync marker.

use crate::cursor::ByteCursor;
use crate::error::{EventIoError, Result};
use crate::types::{type_name, ByteOrder, SyncPolicy};
use log::{error, trace, warn};
use std::io::{self, Read};

/// Sync marker as read in big-endian order.
pub const SYNC_MARKER: u32 = 0xD41F_8A37;

/// Sync marker as seen when the block is little-endian.
const SYNC_MARKER_REVERSED: u32 = 0x378A_1FD4;

/// Maximum item nesting depth.
pub const MAX_ITEM_LEVEL: usize = 20;

/// Size of the three mandatory header words.
const HEADER_WORDS_SIZE: u64 = 12;

const TYPE_MASK: u32 = 0x0000_FFFF;
const USER_FLAG_BIT: u32 = 0x0001_0000;
const EXTENSION_BIT: u32 = 0x0002_0000;
const VERSION_SHIFT: u32 = 20;
const VERSION_MASK: u32 = 0x0FFF;

const LENGTH_MASK: u32 = 0x3FFF_FFFF;
const ONLY_SUB_OBJECTS_BIT: u32 = 0x4000_0000;
const RESERVED_BIT: u32 = 0x8000_0000;
const EXTENSION_LENGTH_MASK: u32 = 0x0FFF;

/// Frame metadata of one block or nested item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Record kind.
    pub type_id: u16,
    /// Layout version of the body.
    pub version: u32,
    /// Free bit available to writers.
    pub user_flag: bool,
    /// Whether the extended length word was present.
    pub has_extension: bool,
    /// Opaque correlation id, e.g. a shower or event number.
    pub identification: i32,
    /// Byte count of the body as declared by the writer.
    pub declared_length: u64,
    /// Set when the body holds only nested items.
    pub only_sub_objects: bool,
    /// Nesting depth, 0 for top-level blocks.
    pub level: usize,
    /// Byte order of the body.
    pub byte_order: ByteOrder,
    start: u64,
    body_start: u64,
}

impl BlockHeader {
    /// Locates the next top-level block and reads its header.
    ///
    /// Returns `Ok(None)` when the stream holds no further sync marker. The
    /// cursor's byte order is switched to the order of the found block.
    pub fn find_next<R: Read>(
        cursor: &mut ByteCursor<R>,
        policy: SyncPolicy,
    ) -> Result<Option<Self>> {
        let Some((marker_position, order)) = find_sync_marker(cursor, policy)? else {
            return Ok(None);
        };
        cursor.set_byte_order(order);
        let header = Self::read_fields(cursor, 0, marker_position, None)?;
        trace!(
            "Block type {} ({}) v{} id {} at offset {}: {} bytes, {:?}",
            header.type_id,
            type_name(header.type_id).unwrap_or("unknown"),
            header.version,
            header.identification,
            marker_position,
            header.declared_length,
            order
        );
        Ok(Some(header))
    }

    /// Reads the header of an item nested in `parent`.
    ///
    /// The item must fit inside the parent's declared body.
    pub fn read_nested<R: Read>(cursor: &mut ByteCursor<R>, parent: &BlockHeader) -> Result<Self> {
        let level = parent.level + 1;
        if level >= MAX_ITEM_LEVEL {
            return Err(EventIoError::NestingTooDeep { level });
        }
        parent.ensure_remaining(cursor, HEADER_WORDS_SIZE)?;

        let start = cursor.position();
        let header = Self::read_fields(cursor, level, start, Some(parent))?;
        if header.end_position() > parent.end_position() {
            return Err(EventIoError::ItemOverrun {
                type_id: header.type_id,
                end: header.end_position(),
                parent_end: parent.end_position(),
            });
        }
        Ok(header)
    }

    /// Reads a nested item header and checks that it has the expected type.
    pub fn read_nested_of_type<R: Read>(
        cursor: &mut ByteCursor<R>,
        parent: &BlockHeader,
        expected: u16,
    ) -> Result<Self> {
        let header = Self::read_nested(cursor, parent)?;
        if header.type_id != expected {
            return Err(EventIoError::UnexpectedType {
                expected,
                found: header.type_id,
            });
        }
        Ok(header)
    }

    /// Reads the header words. A nested item's extension word must lie
    /// within `parent`.
    fn read_fields<R: Read>(
        cursor: &mut ByteCursor<R>,
        level: usize,
        start: u64,
        parent: Option<&BlockHeader>,
    ) -> Result<Self> {
        let type_word = cursor.read_u32()?;
        let identification = cursor.read_i32()?;
        let length_word = cursor.read_u32()?;

        let type_id = (type_word & TYPE_MASK) as u16;
        if length_word & RESERVED_BIT != 0 {
            return Err(EventIoError::InvalidHeader(format!(
                "reserved length bit set in block of type {}",
                type_id
            )));
        }

        let has_extension = type_word & EXTENSION_BIT != 0;
        let mut declared_length = u64::from(length_word & LENGTH_MASK);
        if has_extension {
            if let Some(parent) = parent {
                parent.ensure_remaining(cursor, 4)?;
            }
            let extension = cursor.read_u32()?;
            declared_length |= u64::from(extension & EXTENSION_LENGTH_MASK) << 30;
        }

        Ok(Self {
            type_id,
            version: (type_word >> VERSION_SHIFT) & VERSION_MASK,
            user_flag: type_word & USER_FLAG_BIT != 0,
            has_extension,
            identification,
            declared_length,
            only_sub_objects: length_word & ONLY_SUB_OBJECTS_BIT != 0,
            level,
            byte_order: cursor.byte_order(),
            start,
            body_start: cursor.position(),
        })
    }

    /// Position of the sync marker, or of the header words for nested items.
    pub fn start_position(&self) -> u64 {
        self.start
    }

    /// Position of the first body byte.
    pub fn body_start(&self) -> u64 {
        self.body_start
    }

    /// Position just past the declared body.
    pub fn end_position(&self) -> u64 {
        self.body_start + self.declared_length
    }

    /// Body bytes left between the cursor and the declared end.
    pub fn remaining<R>(&self, cursor: &ByteCursor<R>) -> u64 {
        self.end_position().saturating_sub(cursor.position())
    }

    /// Fails with [`EventIoError::Truncated`] unless `needed` body bytes remain.
    pub fn ensure_remaining<R>(&self, cursor: &ByteCursor<R>, needed: u64) -> Result<()> {
        let remaining = self.remaining(cursor);
        if needed > remaining {
            return Err(EventIoError::Truncated { needed, remaining });
        }
        Ok(())
    }

    /// Reads a variable-length count that must end within the block.
    pub fn read_count<R: Read>(&self, cursor: &mut ByteCursor<R>) -> Result<u64> {
        cursor.read_count_within(self.remaining(cursor))
    }

    /// Reads a signed variable-length count that must end within the block.
    pub fn read_scount<R: Read>(&self, cursor: &mut ByteCursor<R>) -> Result<i64> {
        cursor.read_scount_within(self.remaining(cursor))
    }

    /// Reads a length-prefixed string that must end within the block.
    pub fn read_string<R: Read>(&self, cursor: &mut ByteCursor<R>) -> Result<String> {
        cursor.read_string_within(self.remaining(cursor))
    }

    /// Moves the cursor to the declared end of this block.
    ///
    /// Unread body bytes are skipped. A cursor already past the end means the
    /// decoder read more than the block holds and fails with
    /// [`EventIoError::AlignmentInconsistency`]. An unreachable end fails
    /// with an IO error.
    pub fn align_end<R: Read>(&self, cursor: &mut ByteCursor<R>) -> Result<()> {
        let end = self.end_position();
        let position = cursor.position();
        if position > end {
            error!(
                "Decoder for block type {} read {} bytes past its declared end",
                self.type_id,
                position - end
            );
            return Err(EventIoError::AlignmentInconsistency { position, end });
        }
        if position < end {
            trace!(
                "Skipping {} unread bytes of block type {}",
                end - position,
                self.type_id
            );
            cursor.skip(end - position)?;
        }
        Ok(())
    }

    /// Finishes a block given the outcome of decoding its body.
    ///
    /// Successful and recoverable outcomes are followed by [`Self::align_end`],
    /// so the next block can be read either way. Fatal errors pass through
    /// without touching the cursor.
    pub fn conclude<T, R: Read>(&self, cursor: &mut ByteCursor<R>, body: Result<T>) -> Result<T> {
        match body {
            Ok(value) => self.align_end(cursor).map(|()| value),
            Err(err) if err.is_recoverable() => {
                self.align_end(cursor)?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// Scans for the next sync marker.
///
/// Returns the marker position and the byte order it encodes, or `None` at
/// the end of the stream.
fn find_sync_marker<R: Read>(
    cursor: &mut ByteCursor<R>,
    policy: SyncPolicy,
) -> Result<Option<(u64, ByteOrder)>> {
    let origin = cursor.position();
    let mut window: u32 = 0;
    let mut scanned: u64 = 0;

    loop {
        let byte = match cursor.read_u8() {
            Ok(byte) => byte,
            Err(EventIoError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                if scanned > 0 {
                    warn!(
                        "{} trailing bytes at offset {} hold no sync marker",
                        scanned, origin
                    );
                }
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        scanned += 1;
        window = (window << 8) | u32::from(byte);
        if scanned < 4 {
            continue;
        }

        let order = match window {
            SYNC_MARKER => Some(ByteOrder::BigEndian),
            SYNC_MARKER_REVERSED => Some(ByteOrder::LittleEndian),
            _ => None,
        };
        if let Some(order) = order {
            let marker_position = cursor.position() - 4;
            if scanned > 4 {
                warn!(
                    "Skipped {} bytes before sync marker at offset {}",
                    scanned - 4,
                    marker_position
                );
            }
            return Ok(Some((marker_position, order)));
        }
        if policy == SyncPolicy::Strict {
            return Err(EventIoError::SyncLost { position: origin });
        }
    }
}
