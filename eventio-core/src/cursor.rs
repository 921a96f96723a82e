//! Byte-order-aware primitive reads over a sequential byte source.
//!
//! [`ByteCursor`] is the only component that advances the stream position.
//! Headers and record decoders borrow it for the duration of one block.

use crate::error::{EventIoError, Result};
use crate::types::ByteOrder;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::{self, Read};

/// Reads one primitive in the active byte order and advances the position.
macro_rules! read_ordered {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $read:ident, $width:expr) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            let value = match self.order {
                ByteOrder::BigEndian => self.inner.$read::<BigEndian>()?,
                ByteOrder::LittleEndian => self.inner.$read::<LittleEndian>()?,
            };
            self.position += $width;
            Ok(value)
        }
    };
}

/// A forward-only cursor over an EventIO byte stream.
///
/// The position counts bytes consumed since the cursor was created, which is
/// the origin all block offsets are measured from.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
    order: ByteOrder,
    position: u64,
}

impl<R> ByteCursor<R> {
    /// Creates a cursor reading big-endian values.
    pub fn new(inner: R) -> Self {
        Self::with_order(inner, ByteOrder::BigEndian)
    }

    /// Creates a cursor with an explicit initial byte order.
    pub fn with_order(inner: R, order: ByteOrder) -> Self {
        Self {
            inner,
            order,
            position: 0,
        }
    }

    /// Returns the active byte order.
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    /// Sets the byte order for all subsequent multi-byte reads.
    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Number of bytes consumed since the cursor was created.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of bytes consumed since `origin`, a previously seen position.
    pub fn consumed_since(&self, origin: u64) -> u64 {
        self.position.saturating_sub(origin)
    }

    /// Consumes the cursor and returns the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteCursor<R> {
    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        let value = self.inner.read_u8()?;
        self.position += 1;
        Ok(value)
    }

    read_ordered!(
        /// Reads a signed 16-bit integer.
        read_i16, i16, read_i16, 2
    );
    read_ordered!(
        /// Reads an unsigned 16-bit integer.
        read_u16, u16, read_u16, 2
    );
    read_ordered!(
        /// Reads a signed 32-bit integer.
        read_i32, i32, read_i32, 4
    );
    read_ordered!(
        /// Reads an unsigned 32-bit integer.
        read_u32, u32, read_u32, 4
    );
    read_ordered!(
        /// Reads an IEEE 754 single precision float.
        read_f32, f32, read_f32, 4
    );

    /// Reads exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner.read_exact(&mut buf)?;
        self.position += n as u64;
        Ok(buf)
    }

    /// Reads `n` signed 16-bit integers.
    pub fn read_i16_vec(&mut self, n: usize) -> Result<Vec<i16>> {
        (0..n).map(|_| self.read_i16()).collect()
    }

    /// Reads `n` signed 32-bit integers.
    pub fn read_i32_vec(&mut self, n: usize) -> Result<Vec<i32>> {
        (0..n).map(|_| self.read_i32()).collect()
    }

    /// Reads `n` single precision floats.
    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>> {
        (0..n).map(|_| self.read_f32()).collect()
    }

    /// Reads an unsigned variable-length count.
    ///
    /// The number of leading one bits in the first byte gives the number of
    /// bytes that follow. The remaining bits of the first byte are the most
    /// significant part of the value. Byte order does not apply.
    pub fn read_count(&mut self) -> Result<u64> {
        self.read_count_within(u64::MAX)
    }

    /// Reads an unsigned variable-length count that must fit in `limit` bytes.
    ///
    /// Fails with [`EventIoError::Truncated`] before reading past the limit,
    /// so only the first byte is consumed when the encoding is too long.
    pub fn read_count_within(&mut self, limit: u64) -> Result<u64> {
        if limit == 0 {
            return Err(EventIoError::Truncated {
                needed: 1,
                remaining: 0,
            });
        }
        let first = self.read_u8()?;
        let extra = first.leading_ones();
        if u64::from(extra) > limit - 1 {
            return Err(EventIoError::Truncated {
                needed: u64::from(extra),
                remaining: limit - 1,
            });
        }
        let mut value = u64::from(first) & 0xFFu64.checked_shr(extra + 1).unwrap_or(0);
        for _ in 0..extra {
            value = (value << 8) | u64::from(self.read_u8()?);
        }
        Ok(value)
    }

    /// Reads a signed variable-length count.
    ///
    /// The least significant bit of the unsigned encoding carries the sign.
    pub fn read_scount(&mut self) -> Result<i64> {
        self.read_scount_within(u64::MAX)
    }

    /// Reads a signed variable-length count that must fit in `limit` bytes.
    pub fn read_scount_within(&mut self, limit: u64) -> Result<i64> {
        let raw = self.read_count_within(limit)?;
        let magnitude = (raw >> 1) as i64;
        if raw & 1 == 1 {
            Ok(-magnitude - 1)
        } else {
            Ok(magnitude)
        }
    }

    /// Reads a string prefixed by its 16-bit length.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn read_string(&mut self) -> Result<String> {
        self.read_string_within(u64::MAX)
    }

    /// Reads a length-prefixed string that must fit in `limit` bytes,
    /// prefix included.
    pub fn read_string_within(&mut self, limit: u64) -> Result<String> {
        if limit < 2 {
            return Err(EventIoError::Truncated {
                needed: 2,
                remaining: limit,
            });
        }
        let len = self.read_u16()?;
        if u64::from(len) > limit - 2 {
            return Err(EventIoError::Truncated {
                needed: u64::from(len),
                remaining: limit - 2,
            });
        }
        let bytes = self.read_bytes(usize::from(len))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Discards exactly `n` bytes.
    ///
    /// Fails with an `UnexpectedEof` IO error when the source ends first.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let copied = io::copy(&mut (&mut self.inner).take(n), &mut io::sink())?;
        self.position += copied;
        if copied < n {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("wanted to skip {} bytes, source ended after {}", n, copied),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(bytes: &[u8], order: ByteOrder) -> ByteCursor<&[u8]> {
        ByteCursor::with_order(bytes, order)
    }

    #[test]
    fn test_read_i16_both_orders() {
        let value: i16 = -2;
        let be = value.to_be_bytes();
        let le = value.to_le_bytes();
        assert_eq!(cursor(&be, ByteOrder::BigEndian).read_i16().unwrap(), -2);
        assert_eq!(cursor(&le, ByteOrder::LittleEndian).read_i16().unwrap(), -2);
    }

    #[test]
    fn test_read_i32_both_orders() {
        let value = 0xAABB_CCDDu32 as i32;
        let be = value.to_be_bytes();
        let mut c = cursor(&be, ByteOrder::BigEndian);
        assert_eq!(c.read_i32().unwrap(), value);
        assert_eq!(c.position(), 4);

        let le = value.to_le_bytes();
        let mut c = cursor(&le, ByteOrder::LittleEndian);
        assert_eq!(c.read_i32().unwrap(), value);
    }

    #[test]
    fn test_read_f32_both_orders() {
        let value = 1.171539f32;
        assert_eq!(
            cursor(&value.to_be_bytes(), ByteOrder::BigEndian)
                .read_f32()
                .unwrap(),
            value
        );
        assert_eq!(
            cursor(&value.to_le_bytes(), ByteOrder::LittleEndian)
                .read_f32()
                .unwrap(),
            value
        );
    }

    #[test]
    fn test_order_switch_applies_to_later_reads() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7i32.to_be_bytes());
        bytes.extend_from_slice(&7i32.to_le_bytes());
        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        assert_eq!(c.read_i32().unwrap(), 7);
        c.set_byte_order(ByteOrder::LittleEndian);
        assert_eq!(c.read_i32().unwrap(), 7);
        assert_eq!(c.position(), 8);
    }

    #[test]
    fn test_read_bytes_and_consumed_since() {
        let bytes = [1u8, 2, 3, 4, 5];
        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        c.read_u8().unwrap();
        let origin = c.position();
        assert_eq!(c.read_bytes(3).unwrap(), vec![2, 3, 4]);
        assert_eq!(c.consumed_since(origin), 3);
    }

    #[test]
    fn test_short_source_is_io_failure() {
        let bytes = [0u8, 1, 2];
        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        let err = c.read_i32().unwrap_err();
        assert!(matches!(err, EventIoError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert!(!err.is_recoverable());

        let mut empty = cursor(&[], ByteOrder::BigEndian);
        assert!(matches!(empty.read_u8(), Err(EventIoError::Io(_))));
    }

    #[test]
    fn test_read_count_encodings() {
        // Encodings produced by the reference writer.
        let cases: &[(&[u8], u64)] = &[
            (&[0x7F], 0x7F),
            (&[0x80, 0x81], 0x81),
            (&[0xC0, 0x78, 0x81], 0x7881),
            (&[0xE0, 0xFF, 0x78, 0x81], 0xFF7881),
            (&[0xEF, 0xFF, 0x78, 0x81], 0xFFF7881),
            (&[0xF0, 0x3F, 0xFF, 0x78, 0x81], 0x3FFF7881),
            (&[0xF0, 0x5D, 0x59, 0x12, 0x81], 0x5D591281),
            (
                &[0xFF, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
                0x0102030405060708,
            ),
        ];
        for (bytes, expected) in cases {
            let mut c = cursor(bytes, ByteOrder::LittleEndian);
            assert_eq!(c.read_count().unwrap(), *expected, "bytes {:02X?}", bytes);
            assert_eq!(c.position(), bytes.len() as u64);
        }
    }

    #[test]
    fn test_read_scount() {
        let mut c = cursor(&[0x00, 0x01, 0x04, 0x05], ByteOrder::BigEndian);
        assert_eq!(c.read_scount().unwrap(), 0);
        assert_eq!(c.read_scount().unwrap(), -1);
        assert_eq!(c.read_scount().unwrap(), 2);
        assert_eq!(c.read_scount().unwrap(), -3);
    }

    #[test]
    fn test_read_string() {
        let text = "This is a test for reading string value.";
        let mut bytes = (text.len() as u16).to_le_bytes().to_vec();
        bytes.extend_from_slice(text.as_bytes());
        let mut c = cursor(&bytes, ByteOrder::LittleEndian);
        assert_eq!(c.read_string().unwrap(), text);
        assert_eq!(c.position(), bytes.len() as u64);
    }

    #[test]
    fn test_count_within_limit() {
        // Two extra bytes announced, only one available.
        let mut c = cursor(&[0xC0, 0x78, 0x81], ByteOrder::BigEndian);
        assert!(matches!(
            c.read_count_within(2),
            Err(EventIoError::Truncated {
                needed: 2,
                remaining: 1
            })
        ));
        assert_eq!(c.position(), 1);

        let mut c = cursor(&[0xC0, 0x78, 0x81], ByteOrder::BigEndian);
        assert_eq!(c.read_count_within(3).unwrap(), 0x7881);

        let mut c = cursor(&[0x05], ByteOrder::BigEndian);
        assert!(matches!(
            c.read_scount_within(0),
            Err(EventIoError::Truncated { needed: 1, .. })
        ));
        assert_eq!(c.position(), 0);
        assert_eq!(c.read_scount_within(1).unwrap(), -3);
    }

    #[test]
    fn test_string_within_limit() {
        let mut bytes = 5u16.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"Crab!");
        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        assert!(matches!(
            c.read_string_within(6),
            Err(EventIoError::Truncated {
                needed: 5,
                remaining: 4
            })
        ));
        assert_eq!(c.position(), 2);

        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        assert!(matches!(
            c.read_string_within(1),
            Err(EventIoError::Truncated { needed: 2, .. })
        ));
        assert_eq!(c.read_string_within(7).unwrap(), "Crab!");
    }

    #[test]
    fn test_vector_reads() {
        let values = [1.5f32, -30.25, 100.0];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        assert_eq!(c.read_f32_vec(3).unwrap(), values.to_vec());

        let shorts = [0x1FFFi16, 0x2222, -5];
        let bytes: Vec<u8> = shorts.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut c = cursor(&bytes, ByteOrder::LittleEndian);
        assert_eq!(c.read_i16_vec(3).unwrap(), shorts.to_vec());
    }

    #[test]
    fn test_skip() {
        let bytes = [1u8, 2, 3, 4];
        let mut c = cursor(&bytes, ByteOrder::BigEndian);
        c.skip(2).unwrap();
        assert_eq!(c.position(), 2);
        assert_eq!(c.read_u8().unwrap(), 3);

        let err = c.skip(5).unwrap_err();
        assert!(matches!(err, EventIoError::Io(_)));
        assert_eq!(c.position(), 4);
    }
}
