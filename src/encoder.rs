//! Sensor frame encoder
//!
//! The mirror of the decoder: named values are packed per the spec table,
//! wrapped in sub-packets, and cut into frames at sub-packet boundaries so
//! no payload exceeds [`MAX_PAYLOAD_LEN`].

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::field::{encode_fields, Value};
use crate::frame;
use crate::protocol::Protocol;
use crate::subpacket::{merge, HeaderStyle, SubPacket};
use crate::MAX_PAYLOAD_LEN;

/// Values of one sensor to encode
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    /// Sensor id
    pub sensor_id: u8,
    /// Valid flag written to the sub-packet header
    pub valid: bool,
    /// Field values keyed by field name
    pub values: BTreeMap<String, Value>,
}

impl SensorRecord {
    /// Empty, valid record for `sensor_id`
    #[inline]
    pub fn new(sensor_id: u8) -> Self {
        Self {
            sensor_id,
            valid: true,
            values: BTreeMap::new(),
        }
    }

    /// Add a field value
    #[inline]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Mark the record invalid
    #[inline]
    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }
}

/// Encodes sensor records for one protocol generation
#[derive(Debug, Clone, Copy)]
pub struct SensorEncoder {
    protocol: Protocol,
    packet_type: u8,
}

impl SensorEncoder {
    /// Create an encoder writing packet type 0
    #[inline]
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            packet_type: 0,
        }
    }

    /// Set the packet type nibble of emitted frames
    #[inline]
    pub fn with_packet_type(mut self, packet_type: u8) -> Self {
        self.packet_type = packet_type;
        self
    }

    /// Protocol generation
    #[inline]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Encode the body of one record
    ///
    /// Bodies of inline-length sensors start with a placeholder length byte
    /// that [`merge`] fills in.
    pub fn encode_record(&self, record: &SensorRecord) -> Result<(Vec<u8>, HeaderStyle)> {
        let table = self.protocol.table();
        let entry = table
            .lookup(record.sensor_id)
            .ok_or(Error::UnknownSensorId(record.sensor_id))?;

        let fields = encode_fields(entry.fields, &record.values, table.signed_encoding())?;
        let body = match entry.header {
            HeaderStyle::Standard => fields,
            HeaderStyle::Inline => {
                let mut body = Vec::with_capacity(fields.len() + 1);
                body.push(0);
                body.extend_from_slice(&fields);
                body
            }
        };
        Ok((body, entry.header))
    }

    /// Encode one record as a complete sub-packet
    pub fn encode_subpacket(&self, record: &SensorRecord) -> Result<Vec<u8>> {
        let (body, style) = self.encode_record(record)?;
        let packet = SubPacket {
            sensor_id: record.sensor_id,
            valid: record.valid,
            body: &body,
            style,
        };
        merge(&[packet])
    }

    /// Encode records into payloads of at most [`MAX_PAYLOAD_LEN`] bytes
    ///
    /// Sub-packets are never split across payloads; records keep their order.
    pub fn encode_payloads(&self, records: &[SensorRecord]) -> Result<Vec<Vec<u8>>> {
        let mut payloads = Vec::new();
        let mut current = Vec::new();

        for record in records {
            let packet = self.encode_subpacket(record)?;
            if current.len() + packet.len() > MAX_PAYLOAD_LEN {
                payloads.push(core::mem::take(&mut current));
            }
            current.extend_from_slice(&packet);
        }
        if !current.is_empty() {
            payloads.push(current);
        }

        Ok(payloads)
    }

    /// Encode records into frames, one per payload
    pub fn encode_frames(&self, records: &[SensorRecord]) -> Result<Vec<Vec<u8>>> {
        let version = self.protocol.frame_version();
        self.encode_payloads(records)?
            .iter()
            .map(|payload| frame::encode(payload, self.packet_type, version))
            .collect()
    }

    /// Encode records into back-to-back frames
    pub fn encode_stream(&self, records: &[SensorRecord]) -> Result<Vec<u8>> {
        Ok(self.encode_frames(records)?.concat())
    }
}
