//! Builders for synthetic EventIO bytes.
//!
//! Shared by the unit tests and, through `tests/common`, the integration
//! tests, so paths go through the parent module.

use super::header::SYNC_MARKER;
use super::ByteOrder;

/// Accumulates body fields in a given byte order.
pub(crate) struct BodyWriter {
    order: ByteOrder,
    bytes: Vec<u8>,
}

impl BodyWriter {
    pub(crate) fn new(order: ByteOrder) -> Self {
        Self {
            order,
            bytes: Vec::new(),
        }
    }

    pub(crate) fn i16(mut self, value: i16) -> Self {
        let b = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.bytes.extend_from_slice(&b);
        self
    }

    pub(crate) fn i32(mut self, value: i32) -> Self {
        let b = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.bytes.extend_from_slice(&b);
        self
    }

    pub(crate) fn f32(mut self, value: f32) -> Self {
        let b = match self.order {
            ByteOrder::BigEndian => value.to_be_bytes(),
            ByteOrder::LittleEndian => value.to_le_bytes(),
        };
        self.bytes.extend_from_slice(&b);
        self
    }

    /// Writes a count below 128, which encodes as a single byte.
    pub(crate) fn small_count(mut self, value: u8) -> Self {
        assert!(value < 0x80);
        self.bytes.push(value);
        self
    }

    pub(crate) fn string(self, value: &str) -> Self {
        self.i16(value.len() as i16).raw(value.as_bytes())
    }

    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Header fields of a synthetic item.
pub(crate) struct ItemSpec {
    pub order: ByteOrder,
    pub type_id: u16,
    pub version: u32,
    pub ident: i32,
}

impl ItemSpec {
    pub(crate) fn new(order: ByteOrder, type_id: u16, version: u32, ident: i32) -> Self {
        Self {
            order,
            type_id,
            version,
            ident,
        }
    }
}

/// Encodes a nested item: header without sync marker, then the body.
pub(crate) fn nested_item(spec: &ItemSpec, body: &[u8]) -> Vec<u8> {
    let type_word = u32::from(spec.type_id) | (spec.version << 20);
    BodyWriter::new(spec.order)
        .i32(type_word as i32)
        .i32(spec.ident)
        .i32(body.len() as i32)
        .raw(body)
        .finish()
}

/// Encodes a top-level block: sync marker, header, body.
pub(crate) fn block(spec: &ItemSpec, body: &[u8]) -> Vec<u8> {
    let mut bytes = match spec.order {
        ByteOrder::BigEndian => SYNC_MARKER.to_be_bytes().to_vec(),
        ByteOrder::LittleEndian => SYNC_MARKER.to_le_bytes().to_vec(),
    };
    bytes.extend_from_slice(&nested_item(spec, body));
    bytes
}
