//! Frame envelope: start byte, type/version, length, payload, CRC-8, end byte
//!
//! ```text
//! +------+---------------------+--------+-----------+--------+------+
//! | 0xAA | type:4 | version:4  | len u8 | payload   | crc8   | 0x55 |
//! +------+---------------------+--------+-----------+--------+------+
//! ```
//!
//! The CRC covers the payload only. Payloads longer than 255 bytes are split
//! across frames by the caller; [`FrameScanner`] walks a buffer holding
//! several frames back to back.

use alloc::vec::Vec;

use crate::crc::crc8;
use crate::error::{Error, Result};
use crate::{END_BYTE, FRAME_OVERHEAD, MAX_PAYLOAD_LEN, START_BYTE};

/// Frame header fields (the bytes before the payload)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// Packet type (high nibble)
    pub packet_type: u8,
    /// Protocol version (low nibble)
    pub version: u8,
    /// Payload length in bytes
    pub len: u8,
}

impl FrameHeader {
    /// Header size in bytes, start byte included
    pub const SIZE: usize = 3;

    /// Create a new frame header
    #[inline]
    pub fn new(packet_type: u8, version: u8, len: u8) -> Self {
        Self {
            packet_type,
            version,
            len,
        }
    }

    /// Split a packed type/version byte and length byte
    #[inline]
    pub fn unpack(type_version: u8, len: u8) -> Self {
        Self::new(type_version >> 4, type_version & 0x0f, len)
    }

    /// Packed type/version byte
    #[inline]
    pub fn type_version(&self) -> u8 {
        (self.packet_type << 4) | (self.version & 0x0f)
    }

    /// Validate that type and version fit their nibbles
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.packet_type > 0x0f {
            return Err(Error::ValueOutOfRange {
                field: "packet_type",
            });
        }
        if self.version > 0x0f {
            return Err(Error::ValueOutOfRange { field: "version" });
        }
        Ok(())
    }

    /// Encode header to bytes
    #[inline]
    pub fn encode(&self, buf: &mut [u8]) -> Result<()> {
        self.validate()?;
        if buf.len() < Self::SIZE {
            return Err(Error::ShortBuffer {
                needed: Self::SIZE,
                available: buf.len(),
            });
        }

        buf[0] = START_BYTE;
        buf[1] = self.type_version();
        buf[2] = self.len;
        Ok(())
    }

    /// Calculate total frame size including header and trailer
    #[inline]
    pub fn total_size(&self) -> usize {
        FRAME_OVERHEAD + self.len as usize
    }
}

/// A validated frame borrowing its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// Header fields
    pub header: FrameHeader,
    /// Payload bytes
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wrap a payload for encoding
    #[inline]
    pub fn new(packet_type: u8, version: u8, payload: &'a [u8]) -> Result<Self> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        let header = FrameHeader::new(packet_type, version, payload.len() as u8);
        header.validate()?;
        Ok(Self { header, payload })
    }

    /// Decode and validate a complete frame
    ///
    /// Checks run in a fixed order: start byte, end byte, version (when
    /// `expected_version` is given), declared length, CRC.
    pub fn decode(buf: &'a [u8], expected_version: Option<u8>) -> Result<Self> {
        if buf.len() < FRAME_OVERHEAD {
            return Err(Error::eof(FRAME_OVERHEAD, buf.len()));
        }

        if buf[0] != START_BYTE {
            return Err(Error::InvalidStartByte(buf[0]));
        }

        let last = buf[buf.len() - 1];
        if last != END_BYTE {
            return Err(Error::InvalidEndByte(last));
        }

        let header = FrameHeader::unpack(buf[1], buf[2]);
        if let Some(expected) = expected_version {
            if header.version != expected {
                return Err(Error::VersionMismatch {
                    expected,
                    got: header.version,
                });
            }
        }

        let actual = buf.len() - FRAME_OVERHEAD;
        if header.len as usize != actual {
            return Err(Error::InvalidLength {
                declared: header.len as usize,
                actual,
            });
        }

        let payload = &buf[FrameHeader::SIZE..buf.len() - 2];
        let expected = buf[buf.len() - 2];
        let computed = crc8(payload);
        if computed != expected {
            return Err(Error::InvalidCrc { expected, computed });
        }

        Ok(Self { header, payload })
    }

    /// Encoded size of this frame
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.header.total_size()
    }

    /// Encode into a caller-provided buffer, returning the frame size
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        let total = self.encoded_len();
        if buf.len() < total {
            return Err(Error::ShortBuffer {
                needed: total,
                available: buf.len(),
            });
        }

        self.header.encode(buf)?;
        let body_end = FrameHeader::SIZE + self.payload.len();
        buf[FrameHeader::SIZE..body_end].copy_from_slice(self.payload);
        buf[body_end] = crc8(self.payload);
        buf[body_end + 1] = END_BYTE;

        Ok(total)
    }

    /// Encode into a new buffer
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = alloc::vec![0u8; self.encoded_len()];
        self.encode_into(&mut buf)?;
        Ok(buf)
    }
}

/// Wrap `payload` in a frame
#[inline]
pub fn encode(payload: &[u8], packet_type: u8, version: u8) -> Result<Vec<u8>> {
    Frame::new(packet_type, version, payload)?.to_bytes()
}

/// Validate a frame and return its payload
#[inline]
pub fn decode(frame: &[u8], expected_version: Option<u8>) -> Result<&[u8]> {
    Frame::decode(frame, expected_version).map(|frame| frame.payload)
}

/// Walks a buffer holding frames back to back
///
/// Bytes before a start byte are skipped. Each item carries the offset of
/// the start byte it was decoded from. After a failed frame the scan resumes
/// one byte past that start byte, so callers that keep iterating
/// resynchronise on the next start byte.
#[derive(Debug, Clone)]
pub struct FrameScanner<'a> {
    buf: &'a [u8],
    pos: usize,
    expected_version: Option<u8>,
}

impl<'a> FrameScanner<'a> {
    /// Scan `buf` for frames
    #[inline]
    pub fn new(buf: &'a [u8], expected_version: Option<u8>) -> Self {
        Self {
            buf,
            pos: 0,
            expected_version,
        }
    }

    /// Position of the next byte to scan
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for FrameScanner<'a> {
    type Item = (usize, Result<Frame<'a>>);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.buf.get(self.pos..)?;
        let start = self.pos + rest.iter().position(|&b| b == START_BYTE)?;

        let header = match self.buf.get(start + 1..start + FrameHeader::SIZE) {
            Some(&[type_version, len]) => FrameHeader::unpack(type_version, len),
            _ => {
                self.pos = self.buf.len();
                return Some((start, Err(Error::eof(FRAME_OVERHEAD, self.buf.len() - start))));
            }
        };

        let end = start + header.total_size();
        let Some(candidate) = self.buf.get(start..end) else {
            self.pos = start + 1;
            return Some((start, Err(Error::eof(end - start, self.buf.len() - start))));
        };

        match Frame::decode(candidate, self.expected_version) {
            Ok(frame) => {
                self.pos = end;
                Some((start, Ok(frame)))
            }
            Err(err) => {
                self.pos = start + 1;
                Some((start, Err(err)))
            }
        }
    }
}
