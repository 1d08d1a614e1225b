//! Sensorgram: one sensor parameter reading
//!
//! ```text
//! body_length u16 | sensor_id u16 | sensor_instance u8 | parameter_id u8 |
//! timestamp u32 | body | crc8 u8
//! ```
//!
//! The CRC-8 covers everything before it.

use alloc::vec::Vec;

use crate::crc::crc8;
use crate::cursor::{BitCursor, BitWriter};
use crate::error::{Error, Result, Section};

use super::read_all;

/// Innermost envelope layer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sensorgram {
    /// Sensor id
    pub sensor_id: u16,
    /// Instance of the sensor on the node
    pub sensor_instance: u8,
    /// Parameter of the sensor this reading is for
    pub parameter_id: u8,
    /// Unix timestamp
    pub timestamp: u32,
    /// Opaque reading
    pub body: Vec<u8>,
}

impl Sensorgram {
    /// Header bytes before the body
    pub const HEADER_SIZE: usize = 10;

    /// Largest body the length field can describe
    pub const MAX_BODY_LEN: usize = u16::MAX as usize;

    /// Bytes this sensorgram takes on the wire
    #[inline]
    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.body.len() + 1
    }

    /// Append this sensorgram to `writer`
    pub fn write(&self, writer: &mut BitWriter) -> Result<()> {
        if self.body.len() > Self::MAX_BODY_LEN {
            return Err(Error::PayloadTooLarge {
                len: self.body.len(),
                max: Self::MAX_BODY_LEN,
            });
        }
        let start = writer.len();
        writer.put_u16(self.body.len() as u16);
        writer.put_u16(self.sensor_id);
        writer.put_u8(self.sensor_instance);
        writer.put_u8(self.parameter_id);
        writer.put_u32(self.timestamp);
        writer.put_bytes(&self.body);
        let crc = crc8(&writer.as_slice()[start..]);
        writer.put_u8(crc);
        Ok(())
    }

    /// Read one sensorgram at the cursor
    pub fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let start = cursor.position();
        let body_length = cursor.get_u16()? as usize;
        let sensor_id = cursor.get_u16()?;
        let sensor_instance = cursor.get_u8()?;
        let parameter_id = cursor.get_u8()?;
        let timestamp = cursor.get_u32()?;
        let body = cursor.get_bytes(body_length)?.to_vec();

        let computed = crc8(&cursor.consumed()[start..]);
        let expected = cursor.get_u8()?;
        if expected != computed {
            return Err(Error::ChecksumMismatch {
                section: Section::Sensorgram,
                expected: expected.into(),
                computed: computed.into(),
            });
        }

        Ok(Self {
            sensor_id,
            sensor_instance,
            parameter_id,
            timestamp,
            body,
        })
    }
}

/// Encode one sensorgram
pub fn pack_sensorgram(sensorgram: &Sensorgram) -> Result<Vec<u8>> {
    let mut writer = BitWriter::with_capacity(sensorgram.encoded_len());
    sensorgram.write(&mut writer)?;
    Ok(writer.into_bytes())
}

/// Decode the sensorgram at the start of `buf`
pub fn unpack_sensorgram(buf: &[u8]) -> Result<Sensorgram> {
    Sensorgram::read(&mut BitCursor::new(buf))
}

/// Encode sensorgrams back to back
pub fn pack_sensorgrams(sensorgrams: &[Sensorgram]) -> Result<Vec<u8>> {
    let mut writer =
        BitWriter::with_capacity(sensorgrams.iter().map(Sensorgram::encoded_len).sum());
    for sensorgram in sensorgrams {
        sensorgram.write(&mut writer)?;
    }
    Ok(writer.into_bytes())
}

/// Decode back-to-back sensorgrams until the buffer runs out
pub fn unpack_sensorgrams(buf: &[u8]) -> Result<Vec<Sensorgram>> {
    read_all(buf, Sensorgram::read)
}
