//! Sensor frame decoder
//!
//! Decoding runs frame → sub-packets → fields → readings. Frame envelope
//! failures abort the call; everything below the frame is best-effort and
//! recorded as [`Issue`]s next to whatever decoded cleanly.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use tracing::{debug, trace, warn};

use crate::convert::{Conversions, ConvertedFields, NoConversions, RawFields};
use crate::error::{Error, Result};
use crate::field::{decode_fields, Value};
use crate::frame::{self, FrameScanner};
use crate::protocol::Protocol;
use crate::subpacket::{split, SubPacket};

/// Unit reported for values with no conversion
pub const RAW_UNIT: &str = "raw";

/// How sub-packet streams that do not fill the payload are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Record a [`Issue::TrailingBytes`] and keep what decoded
    #[default]
    Lenient,
    /// Fail with [`Error::SubPacketOverrun`]
    Strict,
}

/// Decoder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /// Reject frames whose version nibble differs
    pub expected_version: Option<u8>,
    /// Sub-packet length mismatch handling
    pub strictness: Strictness,
    /// Drop bad frames in a stream instead of failing
    pub resynchronize: bool,
}

impl DecodeOptions {
    /// Options expecting the frame version of `protocol`
    #[inline]
    pub fn for_protocol(protocol: Protocol) -> Self {
        Self {
            expected_version: Some(protocol.frame_version()),
            ..Self::default()
        }
    }

    /// Set the strictness
    #[inline]
    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Enable or disable resynchronisation
    #[inline]
    pub fn resynchronize(mut self, resynchronize: bool) -> Self {
        self.resynchronize = resynchronize;
        self
    }
}

/// One decoded field
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Reading {
    /// Value as it was on the wire
    pub raw: Option<Value>,
    /// Human-readable value from the sensor's conversion
    pub hrf: Option<Value>,
    /// Unit of `hrf`, or [`RAW_UNIT`]
    pub unit: String,
}

impl Reading {
    /// Reading with only a raw value
    #[inline]
    pub fn raw(value: Value) -> Self {
        Self {
            raw: Some(value),
            hrf: None,
            unit: RAW_UNIT.to_string(),
        }
    }
}

/// Field readings of one sensor, keyed by field name
pub type SensorReadings = BTreeMap<String, Reading>;

/// A recoverable condition met while decoding
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// Sub-packet for a sensor id missing from the table; skipped
    UnknownSensor {
        /// Sensor id
        sensor_id: u8,
    },
    /// Sub-packet with its valid flag clear; skipped
    InvalidReading {
        /// Sensor id
        sensor_id: u8,
        /// Sensor name
        sensor: &'static str,
    },
    /// Sub-packet body did not match the sensor layout; skipped
    Field {
        /// Sensor id
        sensor_id: u8,
        /// Field decode failure
        error: Error,
    },
    /// Sub-packet body longer than the sensor layout; readings kept
    ExtraBodyBytes {
        /// Sensor id
        sensor_id: u8,
        /// Sensor name
        sensor: &'static str,
        /// Bytes taken by the layout
        used: usize,
        /// Body length on the wire
        length: usize,
    },
    /// Conversion missing or unusable; readings kept raw
    ConversionUnavailable {
        /// Sensor name
        sensor: &'static str,
        /// Conversion name
        function: String,
    },
    /// Sub-packets did not consume the payload exactly
    TrailingBytes {
        /// Bytes consumed by complete sub-packets
        consumed: usize,
        /// Payload length
        total: usize,
    },
    /// Frame dropped while resynchronising a stream
    FrameDropped {
        /// Offset of the frame's start byte in the stream
        offset: usize,
        /// Why it was dropped
        error: Error,
    },
}

/// Result of a decode call
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DecodeReport {
    /// Readings keyed by sensor name
    pub sensors: BTreeMap<String, SensorReadings>,
    /// Recoverable issues, in the order they were met
    #[cfg_attr(feature = "serde", serde(skip))]
    pub issues: Vec<Issue>,
}

impl DecodeReport {
    /// Check if decoding met no issues
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    /// Readings of one sensor
    #[inline]
    pub fn sensor(&self, name: &str) -> Option<&SensorReadings> {
        self.sensors.get(name)
    }

    /// Look up a single reading
    #[inline]
    pub fn reading(&self, sensor: &str, field: &str) -> Option<&Reading> {
        self.sensors.get(sensor)?.get(field)
    }
}

/// Decodes frames of one protocol generation
#[derive(Debug, Clone, Copy)]
pub struct SensorDecoder<'c, C: ?Sized = NoConversions> {
    protocol: Protocol,
    conversions: &'c C,
    options: DecodeOptions,
}

impl<'c, C: Conversions + ?Sized> SensorDecoder<'c, C> {
    /// Create a decoder expecting `protocol`'s frame version
    #[inline]
    pub fn new(protocol: Protocol, conversions: &'c C) -> Self {
        Self {
            protocol,
            conversions,
            options: DecodeOptions::for_protocol(protocol),
        }
    }

    /// Replace the decoder options
    #[inline]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Protocol generation
    #[inline]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Current options
    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a single frame
    pub fn decode_frame(&self, frame: &[u8]) -> Result<DecodeReport> {
        let payload = frame::decode(frame, self.options.expected_version)?;
        trace!(len = payload.len(), "decoded frame");
        self.decode_payload(payload)
    }

    /// Decode frames back to back, concatenating their payloads
    ///
    /// Bytes before each start byte are skipped. Without resynchronisation
    /// the first bad frame fails the call.
    pub fn decode_stream(&self, bytes: &[u8]) -> Result<DecodeReport> {
        let mut payload = Vec::new();
        let mut dropped = Vec::new();

        for (offset, result) in FrameScanner::new(bytes, self.options.expected_version) {
            match result {
                Ok(frame) => {
                    trace!(offset, len = frame.payload.len(), "decoded frame");
                    payload.extend_from_slice(frame.payload);
                }
                Err(error) if self.options.resynchronize => {
                    warn!(offset, %error, "dropping frame");
                    dropped.push(Issue::FrameDropped { offset, error });
                }
                Err(error) => return Err(error),
            }
        }

        let mut report = self.decode_payload(&payload)?;
        dropped.append(&mut report.issues);
        report.issues = dropped;
        Ok(report)
    }

    /// Decode the sub-packets of a frame payload
    pub fn decode_payload(&self, payload: &[u8]) -> Result<DecodeReport> {
        let mut report = DecodeReport::default();

        for item in split(payload, self.protocol.table()) {
            match item {
                Ok(packet) => self.decode_subpacket(&packet, &mut report),
                Err(Error::SubPacketOverrun { consumed, total })
                    if self.options.strictness == Strictness::Lenient =>
                {
                    warn!(consumed, total, "payload has trailing bytes");
                    report.issues.push(Issue::TrailingBytes { consumed, total });
                }
                Err(error) => return Err(error),
            }
        }

        Ok(report)
    }

    fn decode_subpacket(&self, packet: &SubPacket<'_>, report: &mut DecodeReport) {
        let table = self.protocol.table();
        let sensor_id = packet.sensor_id;

        let Some(entry) = table.lookup(sensor_id) else {
            warn!(sensor_id, "unknown sensor id, skipping sub-packet");
            report.issues.push(Issue::UnknownSensor { sensor_id });
            return;
        };

        if !packet.valid {
            warn!(sensor_id, sensor = entry.name, "invalid reading, skipping sub-packet");
            report.issues.push(Issue::InvalidReading {
                sensor_id,
                sensor: entry.name,
            });
            return;
        }

        let body = packet.field_bytes();
        let fields = match decode_fields(body, entry.fields, table.signed_encoding()) {
            Ok(fields) => fields,
            Err(error) => {
                warn!(sensor_id, sensor = entry.name, %error, "bad sub-packet body");
                report.issues.push(Issue::Field { sensor_id, error });
                return;
            }
        };

        if let Some(bits) = entry.body_bits() {
            let used = bits.div_ceil(8) as usize;
            if used < body.len() {
                warn!(
                    sensor_id,
                    sensor = entry.name,
                    used,
                    length = body.len(),
                    "sub-packet body longer than layout"
                );
                report.issues.push(Issue::ExtraBodyBytes {
                    sensor_id,
                    sensor: entry.name,
                    used,
                    length: body.len(),
                });
            }
        }

        let raw: RawFields = fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        let mut converted = match entry.conversion {
            Some(function) => match self.conversions.convert(function, &raw) {
                Ok(converted) => converted,
                Err(_) => {
                    debug!(sensor = entry.name, function, "conversion unavailable");
                    report.issues.push(Issue::ConversionUnavailable {
                        sensor: entry.name,
                        function: function.to_string(),
                    });
                    ConvertedFields::new()
                }
            },
            None => ConvertedFields::new(),
        };

        let mut readings = SensorReadings::new();
        for (name, value) in raw {
            let reading = match converted.remove(&name) {
                Some(c) => Reading {
                    raw: Some(value),
                    hrf: Some(c.hrf),
                    unit: c.unit,
                },
                None => Reading::raw(value),
            };
            readings.insert(name, reading);
        }
        // Derived values with no raw counterpart
        for (name, c) in converted {
            readings.insert(
                name,
                Reading {
                    raw: None,
                    hrf: Some(c.hrf),
                    unit: c.unit,
                },
            );
        }

        report.sensors.insert(entry.name.to_string(), readings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConversionRegistry, Converted};
    use crate::frame::encode;
    use crate::tables::{v0, v5};

    fn tmp112_celsius(raw: &RawFields) -> Option<ConvertedFields> {
        let counts = raw.get("temperature")?.as_f64()?;
        let mut out = ConvertedFields::new();
        out.insert(
            "temperature".to_string(),
            Converted::new(Value::Float(counts * 0.0625), "C"),
        );
        out.insert("alarm".to_string(), Converted::new(Value::Unsigned(0), "flag"));
        Some(out)
    }

    #[test]
    fn test_empty_frame() {
        let decoder = SensorDecoder::new(Protocol::V0, &NoConversions);
        let report = decoder.decode_frame(&[0xAA, 0, 0, 0, 0x55]).unwrap();
        assert!(report.sensors.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn test_v0_raw_readings() {
        // TMP112 fixed6 -1.50, HIH4030 counts 0x0203
        let payload = [
            v0::ids::TMP112, 0x82, 0x81, 0x32,
            v0::ids::HIH4030, 0x82, 0x02, 0x03,
        ];
        let frame = encode(&payload, 0, 0).unwrap();
        let report = SensorDecoder::new(Protocol::V0, &NoConversions)
            .decode_frame(&frame)
            .unwrap();

        assert_eq!(
            report.reading("TMP112", "temperature"),
            Some(&Reading::raw(Value::Float(-1.5)))
        );
        assert_eq!(
            report.reading("HIH4030", "humidity").map(|r| &r.raw),
            Some(&Some(Value::Unsigned(0x0203)))
        );
        // HIH4030 names a conversion nobody registered
        assert_eq!(
            report.issues,
            [Issue::ConversionUnavailable {
                sensor: "HIH4030",
                function: "hih4030_humidity".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_sensor_does_not_abort() {
        let payload = [0x7e, 0x81, 0xff, v0::ids::TMP112, 0x82, 0x00, 0x19];
        let report = SensorDecoder::new(Protocol::V0, &NoConversions)
            .decode_payload(&payload)
            .unwrap();

        assert_eq!(report.issues, [Issue::UnknownSensor { sensor_id: 0x7e }]);
        assert!(report.sensor("TMP112").is_some());
    }

    #[test]
    fn test_invalid_and_short_subpackets_skipped() {
        let payload = [
            v0::ids::TMP112, 0x02, 0x00, 0x19, // valid bit clear
            v0::ids::BMP180, 0x82, 0x00, 0x19, // pressure missing
            v0::ids::TSYS01, 0x82, 0x05, 0x00,
        ];
        let report = SensorDecoder::new(Protocol::V0, &NoConversions)
            .decode_payload(&payload)
            .unwrap();

        assert_eq!(report.sensors.len(), 1);
        assert_eq!(
            report.reading("TSYS01", "temperature").and_then(|r| r.raw.clone()),
            Some(Value::Float(5.0))
        );
        assert!(matches!(
            report.issues[..],
            [
                Issue::InvalidReading { sensor_id: 0x01, .. },
                Issue::Field { sensor_id: 0x04, error: Error::UnexpectedEof { .. } },
            ]
        ));
    }

    #[test]
    fn test_body_longer_than_layout_reported() {
        // TMP112 carries 5 bytes; its layout reads 2
        let payload = [v0::ids::TMP112, 0x85, 0x00, 0x19, 0xde, 0xad, 0xbe];
        let report = SensorDecoder::new(Protocol::V0, &NoConversions)
            .decode_payload(&payload)
            .unwrap();

        assert_eq!(
            report.reading("TMP112", "temperature"),
            Some(&Reading::raw(Value::Float(0.25)))
        );
        assert_eq!(
            report.issues,
            [Issue::ExtraBodyBytes {
                sensor_id: v0::ids::TMP112,
                sensor: "TMP112",
                used: 2,
                length: 5,
            }]
        );
    }

    #[test]
    fn test_trailing_bytes_strictness() {
        let payload = [v0::ids::TSYS01, 0x82, 0x05, 0x00, 0x09];
        let lenient = SensorDecoder::new(Protocol::V0, &NoConversions);
        let report = lenient.decode_payload(&payload).unwrap();
        assert_eq!(report.issues, [Issue::TrailingBytes { consumed: 4, total: 5 }]);
        assert!(report.sensor("TSYS01").is_some());

        let strict = lenient.with_options(
            DecodeOptions::for_protocol(Protocol::V0).strictness(Strictness::Strict),
        );
        assert_eq!(
            strict.decode_payload(&payload),
            Err(Error::SubPacketOverrun { consumed: 4, total: 5 })
        );
    }

    #[test]
    fn test_inline_sensor() {
        // D6T: one-byte header, length byte opens the body
        let payload = [v0::ids::D6T, 0x84, 0x80, 0x05, 0x01, 0x02, v0::ids::TSYS01, 0x82, 0x01, 0x00];
        let report = SensorDecoder::new(Protocol::V0, &NoConversions)
            .decode_payload(&payload)
            .unwrap();

        let d6t = report.sensor("D6T").unwrap();
        assert_eq!(d6t["ptat"].raw, Some(Value::Signed(-5)));
        assert_eq!(d6t["temperatures"].raw, Some(Value::Bytes([0x01, 0x02].to_vec())));
        assert!(report.sensor("TSYS01").is_some());
    }

    #[test]
    fn test_v5_conversion_applied() {
        // TMP112: temperature -16 as 12-bit two's complement, alert set
        let payload = [v5::ids::TMP112, 0x82, 0xff, 0x08];
        let frame = encode(&payload, 0, 5).unwrap();
        let registry = ConversionRegistry::new().with("tmp112", tmp112_celsius);
        let report = SensorDecoder::new(Protocol::V5, &registry)
            .decode_frame(&frame)
            .unwrap();

        let tmp = report.sensor("TMP112").unwrap();
        assert_eq!(
            tmp["temperature"],
            Reading {
                raw: Some(Value::Signed(-16)),
                hrf: Some(Value::Float(-1.0)),
                unit: "C".to_string(),
            }
        );
        assert_eq!(tmp["alert"], Reading::raw(Value::Unsigned(1)));
        assert_eq!(tmp["alarm"].raw, None);
        assert!(report.is_complete());
    }

    #[test]
    fn test_version_mismatch_is_fatal() {
        let frame = encode(&[], 0, 5).unwrap();
        assert_eq!(
            SensorDecoder::new(Protocol::V0, &NoConversions).decode_frame(&frame),
            Err(Error::VersionMismatch { expected: 0, got: 5 })
        );
        let any = SensorDecoder::new(Protocol::V0, &NoConversions)
            .with_options(DecodeOptions::default());
        assert!(any.decode_frame(&frame).is_ok());
    }

    #[test]
    fn test_stream_concatenates_payloads() {
        // One sub-packet split across two frames
        let payload = [v0::ids::BMP180, 0x85, 0x00, 0x19, 0x01, 0x86, 0xa0];
        let mut stream = encode(&payload[..3], 0, 0).unwrap();
        stream.extend(encode(&payload[3..], 0, 0).unwrap());

        let decoder = SensorDecoder::new(Protocol::V0, &NoConversions);
        let report = decoder.decode_stream(&stream).unwrap();
        assert_eq!(
            report.reading("BMP180", "pressure").and_then(|r| r.raw.clone()),
            Some(Value::Unsigned(100_000))
        );
        assert!(report.is_complete());
    }

    #[test]
    fn test_stream_resynchronizes() {
        let good = encode(&[v0::ids::TSYS01, 0x82, 0x05, 0x00], 0, 0).unwrap();
        let mut bad = encode(&[v0::ids::TMP112, 0x82, 0x00, 0x19], 0, 0).unwrap();
        let crc_at = bad.len() - 2;
        bad[crc_at] ^= 0x01;

        let mut stream = bad;
        stream.extend_from_slice(&good);

        let decoder = SensorDecoder::new(Protocol::V0, &NoConversions);
        assert!(matches!(
            decoder.decode_stream(&stream),
            Err(Error::InvalidCrc { .. })
        ));

        let resync = decoder.with_options(
            DecodeOptions::for_protocol(Protocol::V0).resynchronize(true),
        );
        let report = resync.decode_stream(&stream).unwrap();
        assert!(report.sensor("TSYS01").is_some());
        assert!(report.sensor("TMP112").is_none());
        assert!(matches!(
            report.issues.first(),
            Some(Issue::FrameDropped { offset: 0, error: Error::InvalidCrc { .. } })
        ));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let frame = encode(&[v0::ids::TSYS01, 0x82, 0x05, 0x00], 0, 0).unwrap();
        let decoder = SensorDecoder::new(Protocol::V0, &NoConversions);
        assert_eq!(decoder.decode_frame(&frame), decoder.decode_frame(&frame));
    }
}
