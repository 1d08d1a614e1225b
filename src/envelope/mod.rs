//! Message envelope codec
//!
//! Batched messages nest three layers, innermost first:
//!
//! ```text
//! WagglePacket { header, header_crc16,
//!     Datagram { header,
//!         Sensorgram { header, body, crc8 } Sensorgram { .. } ...
//!     crc16 }
//! body_crc32 }
//! ```
//!
//! Every layer's length field matches its nested content exactly. Batch
//! decoders stop cleanly on end of data and propagate every other error.

mod datagram;
mod packet;
mod sensorgram;

pub use datagram::{
    pack_datagram, pack_datagrams, unpack_datagram, unpack_datagrams, Datagram, PluginId,
};
pub use packet::{pack_packet, unpack_packet, PacketHeader, WagglePacket, SEQUENCE_MASK};
pub use sensorgram::{
    pack_sensorgram, pack_sensorgrams, unpack_sensorgram, unpack_sensorgrams, Sensorgram,
};

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::cursor::BitCursor;
use crate::error::{Error, Result};

/// Read records back to back until the buffer is exhausted
///
/// Running out of data ends the batch; a partial trailing record is
/// discarded.
fn read_all<'a, T>(
    buf: &'a [u8],
    mut read: impl FnMut(&mut BitCursor<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    let mut cursor = BitCursor::new(buf);
    let mut records = Vec::new();

    while !cursor.is_at_end() {
        let offset = cursor.position();
        match read(&mut cursor) {
            Ok(record) => records.push(record),
            Err(err) if err.is_eof() => {
                debug!(offset, remaining = buf.len() - offset, "batch ends in partial record");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Ok(records)
}

/// Fixed identity stamped on every outgoing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Waggle packet protocol version
    pub packet_version: u8,
    /// Datagram protocol version
    pub datagram_version: u8,
    /// Datagram packet type
    pub packet_type: u8,
    /// Message major type
    pub major_type: u8,
    /// Message minor type
    pub minor_type: u8,
    /// This node
    pub sender_id: u64,
    /// Component on this node
    pub sender_sub_id: u16,
    /// Destination node
    pub receiver_id: u64,
    /// Component on the destination node
    pub receiver_sub_id: u16,
    /// Producing plugin; `run_id` is managed by the codec
    pub plugin: PluginId,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            packet_version: 2,
            datagram_version: 2,
            packet_type: 0,
            major_type: b's',
            minor_type: b'd',
            sender_id: 0,
            sender_sub_id: 0,
            receiver_id: 0,
            receiver_sub_id: 0,
            plugin: PluginId::default(),
        }
    }
}

/// A decoded batched message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Outer packet header
    pub packet: PacketHeader,
    /// Datagram with its body already split
    pub datagram: Datagram,
    /// Sensorgrams carried by the datagram
    pub sensorgrams: Vec<Sensorgram>,
}

/// Packs and unpacks batched messages for one sender
///
/// Owns the sender's sequence counters. Each pack reads and advances every
/// counter it uses exactly once, so a shared codec can be used from several
/// threads.
#[derive(Debug, Default)]
pub struct MessageCodec {
    config: EnvelopeConfig,
    packet_sequence: AtomicU32,
    send_sequence: AtomicU32,
    run_id: AtomicU32,
}

impl MessageCodec {
    /// Create a codec with all counters at zero
    pub fn new(config: EnvelopeConfig) -> Self {
        Self {
            run_id: AtomicU32::new(config.plugin.run_id.into()),
            config,
            packet_sequence: AtomicU32::new(0),
            send_sequence: AtomicU32::new(0),
        }
    }

    /// Stamped identity
    #[inline]
    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Take the next 16-bit datagram packet sequence
    #[inline]
    pub fn next_packet_sequence(&self) -> u16 {
        self.packet_sequence.fetch_add(1, Ordering::Relaxed) as u16
    }

    /// Take the next 24-bit packet send sequence
    #[inline]
    pub fn next_send_sequence(&self) -> u32 {
        self.send_sequence.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK
    }

    /// Current plugin run id
    #[inline]
    pub fn run_id(&self) -> u16 {
        self.run_id.load(Ordering::Relaxed) as u16
    }

    /// Start a new plugin run, returning its id
    #[inline]
    pub fn next_run_id(&self) -> u16 {
        self.run_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1) as u16
    }

    /// Pack sensorgrams into one datagram inside one waggle packet
    ///
    /// Sequence numbers are only taken once the body has packed.
    pub fn pack_message(&self, sensorgrams: &[Sensorgram], timestamp: u32) -> Result<Vec<u8>> {
        let body = pack_sensorgrams(sensorgrams)?;
        if body.len() > Datagram::MAX_BODY_LEN {
            return Err(Error::PayloadTooLarge {
                len: body.len(),
                max: Datagram::MAX_BODY_LEN,
            });
        }

        let config = &self.config;
        let datagram = Datagram {
            protocol_version: config.datagram_version,
            timestamp,
            packet_sequence: self.next_packet_sequence(),
            packet_type: config.packet_type,
            plugin: PluginId {
                run_id: self.run_id(),
                ..config.plugin
            },
            body,
        };
        let packet = WagglePacket {
            header: PacketHeader {
                protocol_version: config.packet_version,
                flags: 0,
                timestamp,
                major_type: config.major_type,
                minor_type: config.minor_type,
                sender_id: config.sender_id,
                sender_sub_id: config.sender_sub_id,
                receiver_id: config.receiver_id,
                receiver_sub_id: config.receiver_sub_id,
                send_sequence: self.next_send_sequence(),
                response_sequence: 0,
                token: 0,
            },
            body: pack_datagram(&datagram)?,
        };
        pack_packet(&packet)
    }

    /// Unpack a message built by [`pack_message`](Self::pack_message)
    pub fn unpack_message(&self, bytes: &[u8]) -> Result<Message> {
        let packet = unpack_packet(bytes)?;
        let datagram = unpack_datagram(&packet.body)?;
        let sensorgrams = unpack_sensorgrams(&datagram.body)?;
        Ok(Message {
            packet: packet.header,
            datagram,
            sensorgrams,
        })
    }
}
