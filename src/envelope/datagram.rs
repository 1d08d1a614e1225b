//! Datagram: a plugin's batch of sensorgrams
//!
//! ```text
//! body_length u24 | protocol_version u8 | timestamp u32 | packet_sequence u16 |
//! packet_type u8 | plugin_id u16 | plugin_major u8 | plugin_minor u8 |
//! plugin_patch u8 | plugin_instance u8 | plugin_run_id u16 | body | crc16 u16
//! ```

use alloc::vec::Vec;

use crate::crc::crc16;
use crate::cursor::{BitCursor, BitWriter};
use crate::error::{Error, Result, Section};

use super::read_all;

/// Identity of the plugin that produced a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PluginId {
    /// Plugin id
    pub id: u16,
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
    /// Instance on the node
    pub instance: u8,
    /// Run id, advanced each time the plugin restarts
    pub run_id: u16,
}

/// Middle envelope layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Datagram {
    /// Datagram protocol version
    pub protocol_version: u8,
    /// Unix timestamp
    pub timestamp: u32,
    /// Per-sender packet sequence
    pub packet_sequence: u16,
    /// Packet type
    pub packet_type: u8,
    /// Producing plugin
    pub plugin: PluginId,
    /// Concatenated sensorgrams
    pub body: Vec<u8>,
}

impl Datagram {
    /// Header bytes before the body
    pub const HEADER_SIZE: usize = 19;

    /// Largest body the 24-bit length field can describe
    pub const MAX_BODY_LEN: usize = 0xff_ffff;

    /// Bytes this datagram takes on the wire
    #[inline]
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.body.len() + 2
    }

    /// Append this datagram to `writer`
    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        if self.body.len() > Self::MAX_BODY_LEN {
            return Err(Error::PayloadTooLarge {
                len: self.body.len(),
                max: Self::MAX_BODY_LEN,
            });
        }
        let start = writer.len();
        writer.put_uint("body_length", self.body.len() as u64, 3)?;
        writer.put_u8(self.protocol_version);
        writer.put_u32(self.timestamp);
        writer.put_u16(self.packet_sequence);
        writer.put_u8(self.packet_type);
        writer.put_u16(self.plugin.id);
        writer.put_u8(self.plugin.major);
        writer.put_u8(self.plugin.minor);
        writer.put_u8(self.plugin.patch);
        writer.put_u8(self.plugin.instance);
        writer.put_u16(self.plugin.run_id);
        writer.put_bytes(&self.body);
        let crc = crc16(&writer.as_slice()[start..]);
        writer.put_u16(crc);
        Ok(())
    }

    /// Read one datagram at the cursor
    pub fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let start = cursor.position();
        let body_length = cursor.get_uint(3)? as usize;
        let protocol_version = cursor.get_u8()?;
        let timestamp = cursor.get_u32()?;
        let packet_sequence = cursor.get_u16()?;
        let packet_type = cursor.get_u8()?;
        let plugin = PluginId {
            id: cursor.get_u16()?,
            major: cursor.get_u8()?,
            minor: cursor.get_u8()?,
            patch: cursor.get_u8()?,
            instance: cursor.get_u8()?,
            run_id: cursor.get_u16()?,
        };
        let body = cursor.get_bytes(body_length)?.to_vec();

        let computed = crc16(&cursor.consumed()[start..]);
        let expected = cursor.get_u16()?;
        if expected != computed {
            return Err(Error::ChecksumMismatch {
                section: Section::Datagram,
                expected: expected.into(),
                computed: computed.into(),
            });
        }

        Ok(Self {
            protocol_version,
            timestamp,
            packet_sequence,
            packet_type,
            plugin,
            body,
        })
    }
}

/// Encode one datagram
pub fn pack_datagram(datagram: &Datagram) -> Result<Vec<u8>> {
    let mut writer = BitWriter::with_capacity(datagram.encoded_len());
    datagram.write(&mut writer)?;
    Ok(writer.into_bytes())
}

/// Decode the datagram at the start of `buf`
pub fn unpack_datagram(buf: &[u8]) -> Result<Datagram> {
    Datagram::read(&mut BitCursor::new(buf))
}

/// Encode datagrams back to back
pub fn pack_datagrams(datagrams: &[Datagram]) -> Result<Vec<u8>> {
    let mut writer = BitWriter::with_capacity(datagrams.iter().map(Datagram::encoded_len).sum());
    for datagram in datagrams {
        datagram.write(&mut writer)?;
    }
    Ok(writer.into_bytes())
}

/// Decode back-to-back datagrams until the buffer runs out
pub fn unpack_datagrams(buf: &[u8]) -> Result<Vec<Datagram>> {
    read_all(buf, Datagram::read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use hex_literal::hex;

    fn sample() -> Datagram {
        Datagram {
            protocol_version: 2,
            timestamp: 1_500_000_000,
            packet_sequence: 0xfffe,
            packet_type: 1,
            plugin: PluginId {
                id: 37,
                major: 1,
                minor: 2,
                patch: 3,
                instance: 0,
                run_id: 0x1234,
            },
            body: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_layout() {
        let bytes = pack_datagram(&sample()).unwrap();
        assert_eq!(bytes.len(), 25);
        assert_eq!(
            &bytes[..23],
            hex!("000004 02 59682f00 fffe 01 0025 01 02 03 00 1234 01020304")
        );
        assert_eq!(
            u16::from_be_bytes([bytes[23], bytes[24]]),
            crc16(&bytes[..23])
        );
        assert_eq!(unpack_datagram(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = pack_datagram(&sample()).unwrap();
        bytes[4] ^= 0x01;
        assert!(matches!(
            unpack_datagram(&bytes),
            Err(Error::ChecksumMismatch {
                section: Section::Datagram,
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_is_eof() {
        let bytes = pack_datagram(&sample()).unwrap();
        assert!(unpack_datagram(&bytes[..bytes.len() - 1])
            .unwrap_err()
            .is_eof());
        assert!(unpack_datagram(&bytes[..5]).unwrap_err().is_eof());
    }

    #[test]
    fn test_batch() {
        let other = Datagram {
            packet_sequence: 0xffff,
            body: vec![],
            ..sample()
        };
        let mut bytes = pack_datagrams(&[sample(), other.clone()]).unwrap();
        bytes.extend_from_slice(&hex!("0000"));
        assert_eq!(unpack_datagrams(&bytes).unwrap(), vec![sample(), other]);
    }
}
