//! Waggle packet: the outer, node-to-node envelope
//!
//! ```text
//! protocol_version u8 | flags u8 | body_length u32 | timestamp u32 |
//! major_type u8 | minor_type u8 | sender_id u64 | sender_sub_id u16 |
//! receiver_id u64 | receiver_sub_id u16 | send_sequence u24 |
//! response_sequence u24 | token u16 | header_crc u16 | body | body_crc u32
//! ```
//!
//! The header and body carry separate checksums so a damaged header is
//! reported before the body is read.

use alloc::vec::Vec;

use crate::crc::{crc16, crc32};
use crate::cursor::{BitCursor, BitWriter};
use crate::error::{Error, Result, Section};

/// Largest value of the 24-bit sequence fields
pub const SEQUENCE_MASK: u32 = 0xff_ffff;

/// Fixed header of a waggle packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Packet protocol version
    pub protocol_version: u8,
    /// Flag bits
    pub flags: u8,
    /// Unix timestamp
    pub timestamp: u32,
    /// Message major type
    pub major_type: u8,
    /// Message minor type
    pub minor_type: u8,
    /// Sending node
    pub sender_id: u64,
    /// Component on the sending node
    pub sender_sub_id: u16,
    /// Receiving node
    pub receiver_id: u64,
    /// Component on the receiving node
    pub receiver_sub_id: u16,
    /// Sender's sequence number, 24 bits
    pub send_sequence: u32,
    /// Sequence number this packet answers, 24 bits
    pub response_sequence: u32,
    /// Session token
    pub token: u16,
}

impl PacketHeader {
    /// Header bytes covered by the header CRC
    pub const SIZE: usize = 40;
}

/// Outer envelope layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WagglePacket {
    /// Packet header; its body length is taken from `body`
    pub header: PacketHeader,
    /// Usually one datagram
    pub body: Vec<u8>,
}

impl WagglePacket {
    /// Bytes this packet takes on the wire
    #[inline]
    pub fn encoded_len(&self) -> usize {
        PacketHeader::SIZE + 2 + self.body.len() + 4
    }

    /// Append this packet to `writer`
    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        let body_length = u32::try_from(self.body.len()).map_err(|_| Error::PayloadTooLarge {
            len: self.body.len(),
            max: u32::MAX as usize,
        })?;
        let h = &self.header;

        let start = writer.len();
        writer.put_u8(h.protocol_version);
        writer.put_u8(h.flags);
        writer.put_u32(body_length);
        writer.put_u32(h.timestamp);
        writer.put_u8(h.major_type);
        writer.put_u8(h.minor_type);
        writer.put_u64(h.sender_id);
        writer.put_u16(h.sender_sub_id);
        writer.put_u64(h.receiver_id);
        writer.put_u16(h.receiver_sub_id);
        writer.put_uint("send_sequence", h.send_sequence.into(), 3)?;
        writer.put_uint("response_sequence", h.response_sequence.into(), 3)?;
        writer.put_u16(h.token);
        let header_crc = crc16(&writer.as_slice()[start..]);
        writer.put_u16(header_crc);

        writer.put_bytes(&self.body);
        writer.put_u32(crc32(&self.body));
        Ok(())
    }

    /// Read one packet at the cursor
    pub fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let start = cursor.position();
        let protocol_version = cursor.get_u8()?;
        let flags = cursor.get_u8()?;
        let body_length = cursor.get_u32()? as usize;
        let header = PacketHeader {
            protocol_version,
            flags,
            timestamp: cursor.get_u32()?,
            major_type: cursor.get_u8()?,
            minor_type: cursor.get_u8()?,
            sender_id: cursor.get_u64()?,
            sender_sub_id: cursor.get_u16()?,
            receiver_id: cursor.get_u64()?,
            receiver_sub_id: cursor.get_u16()?,
            send_sequence: cursor.get_uint(3)? as u32,
            response_sequence: cursor.get_uint(3)? as u32,
            token: cursor.get_u16()?,
        };

        let computed = crc16(&cursor.consumed()[start..]);
        let expected = cursor.get_u16()?;
        if expected != computed {
            return Err(Error::ChecksumMismatch {
                section: Section::PacketHeader,
                expected: expected.into(),
                computed: computed.into(),
            });
        }

        let body = cursor.get_bytes(body_length)?;
        let computed = crc32(body);
        let expected = cursor.get_u32()?;
        if expected != computed {
            return Err(Error::ChecksumMismatch {
                section: Section::PacketBody,
                expected,
                computed,
            });
        }

        Ok(Self {
            header,
            body: body.to_vec(),
        })
    }
}

/// Encode one waggle packet
pub fn pack_packet(packet: &WagglePacket) -> Result<Vec<u8>> {
    let mut writer = BitWriter::with_capacity(packet.encoded_len());
    packet.write(&mut writer)?;
    Ok(writer.into_bytes())
}

/// Decode the waggle packet at the start of `buf`
pub fn unpack_packet(buf: &[u8]) -> Result<WagglePacket> {
    WagglePacket::read(&mut BitCursor::new(buf))
}
