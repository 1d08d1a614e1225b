//! Protocol generations

use crate::field::SignedEncoding;
use crate::spec_table::SpecTable;
use crate::tables;

/// A sensor-board protocol generation
///
/// Generations share the frame, sub-packet and field primitives but have
/// their own spec table and signed-integer semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Byte-aligned fields, sign-magnitude integers
    V0,
    /// Bit-packed fields, two's complement integers
    V5,
}

impl Protocol {
    /// Spec table of this generation
    #[inline]
    pub fn table(&self) -> &'static SpecTable {
        match self {
            Protocol::V0 => &tables::v0::TABLE,
            Protocol::V5 => &tables::v5::TABLE,
        }
    }

    /// Signed integer semantics of this generation
    #[inline]
    pub fn signed_encoding(&self) -> SignedEncoding {
        self.table().signed_encoding()
    }

    /// Version nibble carried in frame headers
    #[inline]
    pub const fn frame_version(&self) -> u8 {
        match self {
            Protocol::V0 => 0,
            Protocol::V5 => 5,
        }
    }

    /// Generation announced by a frame version nibble
    #[inline]
    pub const fn from_frame_version(version: u8) -> Option<Self> {
        match version {
            0 => Some(Protocol::V0),
            5 => Some(Protocol::V5),
            _ => None,
        }
    }
}
