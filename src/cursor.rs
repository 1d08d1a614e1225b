//! Bit-granular read and write cursors
//!
//! Sensor layouts mix whole-byte fields with fields that occupy a fraction of
//! a byte, so the cursors track a bit offset rather than a byte offset. Bits
//! are consumed MSB-first and multi-byte integers are big-endian.

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Bit width of a `len`-byte integer, which must be 1 to 8 bytes
pub(crate) fn byte_width(len: usize) -> Result<u32> {
    match len {
        1..=8 => Ok(len as u32 * 8),
        _ => Err(Error::InvalidLayout {
            field: "cursor",
            reason: "integer width must be 1 to 8 bytes",
        }),
    }
}

/// Cursor for reading a borrowed buffer with bit-offset tracking
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    buf: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitCursor<'a> {
    /// Create a cursor at the start of `buf`
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    /// Current position in whole bytes (rounded down)
    #[inline]
    pub fn position(&self) -> usize {
        self.bit_pos / 8
    }

    /// Current position in bits
    #[inline]
    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Check if the cursor sits on a byte boundary
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Unread bits
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.buf.len() * 8 - self.bit_pos
    }

    /// Unread whole bytes
    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining_bits() / 8
    }

    /// Check if cursor is at end
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.bit_pos >= self.buf.len() * 8
    }

    /// Read `n` bits (at most 64) as an unsigned integer
    pub fn get_bits(&mut self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(Error::InvalidLayout {
                field: "cursor",
                reason: "read wider than 64 bits",
            });
        }
        let n = n as usize;
        if n > self.remaining_bits() {
            return Err(Error::eof(n.div_ceil(8), self.remaining()));
        }

        let mut value = 0u64;
        let mut left = n;
        while left > 0 {
            let byte = self.buf[self.bit_pos / 8];
            let avail = 8 - self.bit_pos % 8;
            let take = avail.min(left);
            let chunk = (byte >> (avail - take)) & (((1u16 << take) - 1) as u8);
            value = (value << take) | chunk as u64;
            self.bit_pos += take;
            left -= take;
        }

        Ok(value)
    }

    /// Read a big-endian unsigned integer of `len` bytes (1 to 8)
    #[inline]
    pub fn get_uint(&mut self, len: usize) -> Result<u64> {
        self.get_bits(byte_width(len)?)
    }

    /// Read a u8 value
    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_bits(8)? as u8)
    }

    /// Read a u16 value (big-endian)
    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(self.get_bits(16)? as u16)
    }

    /// Read a u32 value (big-endian)
    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(self.get_bits(32)? as u32)
    }

    /// Read a u64 value (big-endian)
    #[inline]
    pub fn get_u64(&mut self) -> Result<u64> {
        self.get_bits(64)
    }

    /// Read raw bytes from a byte-aligned position
    ///
    /// Returns a zero-copy slice into the original buffer. A read starting
    /// mid-byte fails with `Misaligned { field: "cursor" }`; field decoders
    /// check alignment first and report the field name instead.
    #[inline]
    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if !self.is_aligned() {
            return Err(Error::Misaligned { field: "cursor" });
        }
        let start = self.position();
        if len > self.buf.len() - start {
            return Err(Error::eof(len, self.buf.len() - start));
        }
        self.bit_pos += len * 8;
        Ok(&self.buf[start..start + len])
    }

    /// Take every remaining byte from a byte-aligned position
    #[inline]
    pub fn rest(&mut self) -> Result<&'a [u8]> {
        let len = self.remaining();
        self.get_bytes(len)
    }

    /// Skip whole bytes
    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::eof(n, self.remaining()));
        }
        self.bit_pos += n * 8;
        Ok(())
    }

    /// Bytes already consumed, from the start of the buffer
    #[inline]
    pub fn consumed(&self) -> &'a [u8] {
        &self.buf[..self.position()]
    }
}

/// Growable writer mirroring [`BitCursor`]
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    /// Create an empty writer
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with reserved capacity in bytes
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            bit_pos: 0,
        }
    }

    /// Check if the writer sits on a byte boundary
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    /// Bits written so far
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_pos
    }

    /// Bytes written so far, counting a partial byte
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write the low `n` bits of `value`, MSB first
    ///
    /// Higher bits are discarded; callers range-check beforehand. Widths
    /// past 64 bits are zero-extended.
    pub fn put_bits(&mut self, value: u64, n: u32) {
        let mut n = n as usize;
        while n > 64 {
            let pad = (n - 64).min(64);
            self.put_bits(0, pad as u32);
            n -= pad;
        }
        let value = if n < 64 { value & ((1u64 << n) - 1) } else { value };

        let mut left = n;
        while left > 0 {
            let offset = self.bit_pos % 8;
            if offset == 0 {
                self.buf.push(0);
            }
            let avail = 8 - offset;
            let take = avail.min(left);
            let chunk = ((value >> (left - take)) & ((1u64 << take) - 1)) as u8;
            if let Some(last) = self.buf.last_mut() {
                *last |= chunk << (avail - take);
            }
            self.bit_pos += take;
            left -= take;
        }
    }

    /// Write a big-endian unsigned integer of `len` bytes
    ///
    /// Fails with `ValueOutOfRange` when `value` does not fit.
    #[inline]
    pub fn put_uint(&mut self, field: &'static str, value: u64, len: usize) -> Result<()> {
        let bits = byte_width(len)?;
        if bits < 64 && value >> bits != 0 {
            return Err(Error::ValueOutOfRange { field });
        }
        self.put_bits(value, bits);
        Ok(())
    }

    /// Write a u8 value
    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.put_bits(value as u64, 8);
    }

    /// Write a u16 value (big-endian)
    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.put_bits(value as u64, 16);
    }

    /// Write a u32 value (big-endian)
    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.put_bits(value as u64, 32);
    }

    /// Write a u64 value (big-endian)
    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.put_bits(value, 64);
    }

    /// Write raw bytes
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        if self.is_aligned() {
            self.buf.extend_from_slice(bytes);
            self.bit_pos += bytes.len() * 8;
        } else {
            for &byte in bytes {
                self.put_bits(byte as u64, 8);
            }
        }
    }

    /// Get a slice of the encoded data
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Finish writing, zero-padding any partial byte
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_byte_reads() {
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut cursor = BitCursor::new(&data);

        assert_eq!(cursor.remaining(), 8);
        assert_eq!(cursor.get_u16().unwrap(), 0x0102); // big-endian
        cursor.skip(2).unwrap();
        assert_eq!(cursor.get_bytes(1).unwrap(), &[5]);
        assert_eq!(cursor.get_uint(3).unwrap(), 0x06_0708);
        assert!(cursor.is_at_end());
        assert_eq!(cursor.consumed(), &data[..]);
    }

    #[test]
    fn test_cursor_sub_byte_reads() {
        // 1 | 101 | 1001 -> 0xD9, then 0b10 | 000001 -> 0x81
        let data = [0xd9, 0x81];
        let mut cursor = BitCursor::new(&data);

        assert_eq!(cursor.get_bits(1).unwrap(), 1);
        assert_eq!(cursor.get_bits(3).unwrap(), 5);
        assert!(!cursor.is_aligned());
        assert_eq!(cursor.get_bits(4).unwrap(), 9);
        assert!(cursor.is_aligned());
        assert_eq!(cursor.get_bits(2).unwrap(), 2);
        assert_eq!(cursor.get_bits(6).unwrap(), 1);
    }

    #[test]
    fn test_cursor_straddles_bytes() {
        let data = [0x0f, 0xf0];
        let mut cursor = BitCursor::new(&data);
        cursor.get_bits(4).unwrap();
        assert_eq!(cursor.get_bits(8).unwrap(), 0xff);
        assert_eq!(cursor.remaining_bits(), 4);
    }

    #[test]
    fn test_cursor_underrun() {
        let data = [0xaa, 0xbb];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.get_u32(), Err(Error::eof(4, 2)));
        // Failed reads do not advance
        assert_eq!(cursor.get_u16().unwrap(), 0xaabb);
        assert_eq!(cursor.get_bits(1), Err(Error::eof(1, 0)));
        assert_eq!(cursor.skip(1), Err(Error::eof(1, 0)));
    }

    #[test]
    fn test_cursor_misaligned_bytes() {
        let data = [0xff, 0x00];
        let mut cursor = BitCursor::new(&data);
        cursor.get_bits(3).unwrap();
        assert_eq!(cursor.get_bytes(1), Err(Error::Misaligned { field: "cursor" }));
    }

    #[test]
    fn test_cursor_rejects_wide_reads() {
        let data = [0xff; 16];
        let mut cursor = BitCursor::new(&data);
        assert!(matches!(cursor.get_bits(65), Err(Error::InvalidLayout { .. })));
        assert!(matches!(cursor.get_uint(9), Err(Error::InvalidLayout { .. })));
        assert!(matches!(cursor.get_uint(0), Err(Error::InvalidLayout { .. })));
        // Nothing consumed by the rejected reads
        assert_eq!(cursor.get_bits(64).unwrap(), u64::MAX);
    }

    #[test]
    fn test_writer_zero_extends_wide_fields() {
        let mut writer = BitWriter::new();
        writer.put_bits(0x0102, 72);
        assert_eq!(writer.into_bytes(), [0, 0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert!(matches!(
            BitWriter::new().put_uint("seq", 1, 9),
            Err(Error::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_writer_packs_msb_first() {
        let mut writer = BitWriter::new();
        writer.put_bits(1, 1);
        writer.put_bits(5, 3);
        writer.put_bits(9, 4);
        writer.put_u16(0xbeef);
        assert_eq!(writer.as_slice(), &[0xd9, 0xbe, 0xef]);
    }

    #[test]
    fn test_writer_unaligned_bytes_and_padding() {
        let mut writer = BitWriter::with_capacity(4);
        writer.put_bits(0b1010, 4);
        writer.put_bytes(&[0xff]);
        assert_eq!(writer.bit_len(), 12);
        assert_eq!(writer.into_bytes(), [0xaf, 0xf0]);
    }

    #[test]
    fn test_writer_put_uint_range() {
        let mut writer = BitWriter::new();
        writer.put_uint("seq", 0xff_ffff, 3).unwrap();
        assert_eq!(
            writer.put_uint("seq", 0x100_0000, 3),
            Err(Error::ValueOutOfRange { field: "seq" })
        );
        writer.put_uint("wide", u64::MAX, 8).unwrap();
        assert_eq!(writer.len(), 11);
    }
}
