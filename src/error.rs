//! Error types for the sensor-frame and envelope codecs

use alloc::string::String;

use crate::field::FieldFormat;

/// Checksummed section of the message envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Sensorgram trailer (CRC-8)
    Sensorgram,
    /// Datagram trailer (CRC-16)
    Datagram,
    /// Waggle packet header (CRC-16)
    PacketHeader,
    /// Waggle packet body (CRC-32)
    PacketBody,
}

/// Errors that can occur during encoding or decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// First frame byte is not the start byte
    #[error("invalid start byte {0:#04x}")]
    InvalidStartByte(u8),
    /// Last frame byte is not the end byte
    #[error("invalid end byte {0:#04x}")]
    InvalidEndByte(u8),
    /// Frame version nibble differs from the expected protocol version
    #[error("protocol version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Version the caller asked for
        expected: u8,
        /// Version carried by the frame
        got: u8,
    },
    /// Declared frame length differs from the actual payload length
    #[error("invalid frame length: declared {declared}, actual {actual}")]
    InvalidLength {
        /// Length byte of the frame
        declared: usize,
        /// Bytes actually present between header and trailer
        actual: usize,
    },
    /// Frame CRC-8 trailer does not match the payload
    #[error("frame CRC mismatch: trailer {expected:#04x}, computed {computed:#04x}")]
    InvalidCrc {
        /// CRC byte carried by the frame
        expected: u8,
        /// CRC computed over the payload
        computed: u8,
    },
    /// Envelope checksum mismatch
    #[error("{section:?} checksum mismatch: stored {expected:#x}, computed {computed:#x}")]
    ChecksumMismatch {
        /// Which checksum failed
        section: Section,
        /// Checksum carried on the wire
        expected: u32,
        /// Checksum computed over the received bytes
        computed: u32,
    },
    /// Buffer ended before the requested bytes (buffer underrun)
    #[error("unexpected end of data: need {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes the read required
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },
    /// Output buffer too small for the encoded data
    #[error("buffer too small: need {needed} bytes, {available} available")]
    ShortBuffer {
        /// Bytes the write required
        needed: usize,
        /// Capacity of the buffer
        available: usize,
    },
    /// Value does not fit the field width on encode
    #[error("value out of range for field {field}")]
    ValueOutOfRange {
        /// Field being encoded
        field: &'static str,
    },
    /// Value kind does not match the field format
    #[error("value for field {field} does not match format {format:?}")]
    TypeMismatch {
        /// Field being encoded
        field: &'static str,
        /// Format of the field
        format: FieldFormat,
    },
    /// Encode record lacks a field required by the sensor layout
    #[error("missing value for field {field}")]
    MissingField {
        /// Field name
        field: &'static str,
    },
    /// Byte-oriented field starts inside a byte
    #[error("field {field} is not byte aligned")]
    Misaligned {
        /// Field name
        field: &'static str,
    },
    /// Sensor id not present in the spec table
    #[error("unknown sensor id {0:#04x}")]
    UnknownSensorId(u8),
    /// No conversion function registered under this name
    #[error("conversion function {0} is unavailable")]
    ConversionUnavailable(String),
    /// Sub-packet stream does not consume the payload exactly
    #[error("sub-packets consumed {consumed} of {total} payload bytes")]
    SubPacketOverrun {
        /// Offset where the last complete sub-packet ended
        consumed: usize,
        /// Payload length
        total: usize,
    },
    /// Body too large for its length field
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Actual length
        len: usize,
        /// Limit of the length field
        max: usize,
    },
    /// Field layout violates a packing rule
    #[error("invalid layout for field {field}: {reason}")]
    InvalidLayout {
        /// Offending field
        field: &'static str,
        /// Rule that failed
        reason: &'static str,
    },
}

impl Error {
    /// Returns true for end-of-data conditions
    ///
    /// Batch decoders treat these as the stream terminator at record
    /// boundaries.
    #[inline]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Error::UnexpectedEof { .. })
    }

    /// Returns true for errors that invalidate a whole frame envelope
    #[inline]
    pub const fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidStartByte(_)
                | Error::InvalidEndByte(_)
                | Error::VersionMismatch { .. }
                | Error::InvalidLength { .. }
                | Error::InvalidCrc { .. }
        )
    }

    #[inline]
    pub(crate) const fn eof(needed: usize, available: usize) -> Self {
        Error::UnexpectedEof { needed, available }
    }
}

/// Result type alias for codec operations
pub type Result<T> = core::result::Result<T, Error>;
