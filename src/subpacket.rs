//! Sub-packet framer
//!
//! A frame payload is a run of sensor-tagged sub-packets:
//!
//! ```text
//! Standard:  [sensor_id][valid:1 | len:7][body: len bytes]
//! Inline:    [sensor_id][valid:1 | len:7 ... body: len + 1 bytes]
//! ```
//!
//! Inline sensors carry variable-length bodies whose length byte belongs to
//! the body, so the header is a single byte and the body is one byte longer
//! than the length field says.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::{LENGTH_MASK, VALID_MASK};

/// Sub-packet header convention of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Two-byte header: id, valid|length
    Standard,
    /// One-byte header; the valid|length byte opens the body
    Inline,
}

/// Tells the framer which header convention a sensor id uses
pub trait HeaderRule {
    /// Header convention for `sensor_id`
    fn header_style(&self, sensor_id: u8) -> HeaderStyle;
}

/// Every sensor uses the standard header
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHeaders;

impl HeaderRule for StandardHeaders {
    #[inline]
    fn header_style(&self, _sensor_id: u8) -> HeaderStyle {
        HeaderStyle::Standard
    }
}

/// One sensor reading inside a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubPacket<'a> {
    /// Sensor id
    pub sensor_id: u8,
    /// Valid flag from the header
    pub valid: bool,
    /// Body bytes; for inline sensors this starts with the length byte
    pub body: &'a [u8],
    /// Header convention used on the wire
    pub style: HeaderStyle,
}

impl<'a> SubPacket<'a> {
    /// Sub-packet with a standard header
    #[inline]
    pub fn new(sensor_id: u8, valid: bool, body: &'a [u8]) -> Self {
        Self {
            sensor_id,
            valid,
            body,
            style: HeaderStyle::Standard,
        }
    }

    /// Sub-packet with an inline header; `body` includes the length byte
    #[inline]
    pub fn inline(sensor_id: u8, valid: bool, body: &'a [u8]) -> Self {
        Self {
            sensor_id,
            valid,
            body,
            style: HeaderStyle::Inline,
        }
    }

    /// Body bytes that carry sensor fields
    #[inline]
    pub fn field_bytes(&self) -> &'a [u8] {
        match self.style {
            HeaderStyle::Standard => self.body,
            HeaderStyle::Inline => self.body.get(1..).unwrap_or_default(),
        }
    }

    /// Size of this sub-packet on the wire
    #[inline]
    pub fn encoded_len(&self) -> usize {
        match self.style {
            HeaderStyle::Standard => 2 + self.body.len(),
            HeaderStyle::Inline => 1 + self.body.len(),
        }
    }
}

/// Iterator over the sub-packets of a payload
///
/// Yields an error once and stops if the next sub-packet header or body runs
/// past the end of the payload.
#[derive(Debug)]
pub struct SubPackets<'a, R: ?Sized> {
    payload: &'a [u8],
    offset: usize,
    rules: &'a R,
    done: bool,
}

impl<'a, R: HeaderRule + ?Sized> SubPackets<'a, R> {
    /// Bytes consumed by complete sub-packets so far
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Check if every payload byte has been consumed
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.offset == self.payload.len()
    }
}

impl<'a, R: HeaderRule + ?Sized> Iterator for SubPackets<'a, R> {
    type Item = Result<SubPacket<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.payload.len() {
            return None;
        }

        let overrun = Error::SubPacketOverrun {
            consumed: self.offset,
            total: self.payload.len(),
        };
        let Some(&header) = self.payload.get(self.offset + 1) else {
            self.done = true;
            return Some(Err(overrun));
        };

        let sensor_id = self.payload[self.offset];
        let valid = header & VALID_MASK != 0;
        let len = (header & LENGTH_MASK) as usize;
        let style = self.rules.header_style(sensor_id);
        let (start, end) = match style {
            HeaderStyle::Standard => (self.offset + 2, self.offset + 2 + len),
            HeaderStyle::Inline => (self.offset + 1, self.offset + 2 + len),
        };

        let Some(body) = self.payload.get(start..end) else {
            self.done = true;
            return Some(Err(overrun));
        };

        self.offset = end;
        Some(Ok(SubPacket {
            sensor_id,
            valid,
            body,
            style,
        }))
    }
}

/// Split a payload into sub-packets
#[inline]
pub fn split<'a, R: HeaderRule + ?Sized>(payload: &'a [u8], rules: &'a R) -> SubPackets<'a, R> {
    SubPackets {
        payload,
        offset: 0,
        rules,
        done: false,
    }
}

/// Concatenate sub-packets into a payload, in the given order
///
/// The length and valid bits are written from the sub-packet itself; for
/// inline sub-packets the leading length byte of the body is rewritten.
pub fn merge(subpackets: &[SubPacket<'_>]) -> Result<Vec<u8>> {
    let total = subpackets.iter().map(SubPacket::encoded_len).sum();
    let mut payload = Vec::with_capacity(total);

    for packet in subpackets {
        let fields = packet.field_bytes();
        if fields.len() > LENGTH_MASK as usize {
            return Err(Error::PayloadTooLarge {
                len: fields.len(),
                max: LENGTH_MASK as usize,
            });
        }
        let valid = if packet.valid { VALID_MASK } else { 0 };

        // Inline bodies must at least hold their own length byte
        if packet.style == HeaderStyle::Inline && packet.body.is_empty() {
            return Err(Error::eof(1, 0));
        }

        payload.push(packet.sensor_id);
        payload.push(valid | fields.len() as u8);
        payload.extend_from_slice(fields);
    }

    Ok(payload)
}
