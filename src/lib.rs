//! waggle-codec: binary codec for Waggle sensor-board frames
//!
//! Sensor boards report readings as checksummed, delimited frames whose
//! payload is a run of sensor-tagged sub-packets. Each sub-packet body is
//! laid out according to a per-generation sensor spec table.
//!
//! # Frame Format
//!
//! ```text
//! +-----------+--------------------+---------+-----------+---------+---------+
//! | Start 0xAA| type<<4 | version  | Len u8  | Payload   | CRC-8   | End 0x55|
//! +-----------+--------------------+---------+-----------+---------+---------+
//!
//! Payload: [sensor_id][valid:1|len:7][body] [sensor_id][valid:1|len:7][body] ...
//! ```
//!
//! # Features
//!
//! - Bit-exact frame, sub-packet and field codecs with total bounds checks
//! - Two protocol generations with separate tables and signed semantics
//! - Best-effort decoding: unknown sensors and bad readings become issues
//! - Multi-frame streams with optional resynchronisation
//! - Sensorgram / datagram / waggle packet message envelopes
//! - `no_std` support with `alloc`
//!
//! # Example
//!
//! ```rust
//! use waggle_codec::*;
//!
//! let frame = [0xAA, 0x00, 0x04, 0x01, 0x82, 0x00, 0x19, 0xa3, 0x55];
//!
//! let decoder = SensorDecoder::new(Protocol::V0, &NoConversions);
//! let report = decoder.decode_frame(&frame)?;
//!
//! let reading = &report.sensors["TMP112"]["temperature"];
//! assert_eq!(reading.raw, Some(Value::Float(0.25)));
//! assert_eq!(reading.unit, "raw");
//! # Ok::<(), waggle_codec::Error>(())
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod convert;
pub mod crc;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod envelope;
pub mod error;
pub mod field;
pub mod frame;
pub mod protocol;
pub mod spec_table;
pub mod subpacket;
pub mod tables;

// Re-export main types
pub use convert::{ConversionRegistry, Conversions, Converted, NoConversions};
pub use decoder::{DecodeOptions, DecodeReport, Issue, Reading, SensorDecoder, Strictness};
pub use encoder::{SensorEncoder, SensorRecord};
pub use envelope::{EnvelopeConfig, MessageCodec};
pub use error::{Error, Result};
pub use field::{FieldFormat, FieldSpec, SignedEncoding, Value};
pub use frame::{Frame, FrameHeader, FrameScanner};
pub use protocol::Protocol;
pub use spec_table::{SpecEntry, SpecTable};
pub use subpacket::{HeaderStyle, SubPacket};

/// First byte of every frame
pub const START_BYTE: u8 = 0xAA;

/// Last byte of every frame
pub const END_BYTE: u8 = 0x55;

/// Valid flag in the second sub-packet header byte
pub const VALID_MASK: u8 = 0x80;

/// Body length bits in the second sub-packet header byte
pub const LENGTH_MASK: u8 = 0x7F;

/// Largest payload one frame can carry
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Frame bytes around the payload: start, type/version, length, crc, end
pub const FRAME_OVERHEAD: usize = 5;

/// Reflected CRC-8 polynomial
pub const CRC8_POLYNOMIAL: u8 = 0x8C;
