//! Sensor spec tables: sensor id to named field layout
//!
//! Tables are plain `static` data embedded in the crate, so they are built
//! at compile time, immutable, and shared by every decode call.

use crate::error::{Error, Result};
use crate::field::{FieldLength, FieldSpec, SignedEncoding};
use crate::subpacket::{HeaderRule, HeaderStyle};

/// Layout of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecEntry {
    /// One-byte sensor id
    pub id: u8,
    /// Human-readable sensor name
    pub name: &'static str,
    /// Fields in wire order
    pub fields: &'static [FieldSpec],
    /// Name of the conversion producing human-readable values
    pub conversion: Option<&'static str>,
    /// Sub-packet header convention
    pub header: HeaderStyle,
}

impl SpecEntry {
    /// Sensor with a standard two-byte sub-packet header and no conversion
    #[inline]
    pub const fn new(id: u8, name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self {
            id,
            name,
            fields,
            conversion: None,
            header: HeaderStyle::Standard,
        }
    }

    /// Attach a conversion function name
    #[inline]
    pub const fn convert(mut self, conversion: &'static str) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Use the one-byte inline-length sub-packet header
    #[inline]
    pub const fn inline_length(mut self) -> Self {
        self.header = HeaderStyle::Inline;
        self
    }

    /// Fixed body size in bits, `None` when the last field is open-ended
    pub fn body_bits(&self) -> Option<u32> {
        self.fields
            .iter()
            .try_fold(0u32, |acc, f| f.bit_width().map(|bits| acc + bits))
    }

    /// Check the packing rules of this layout
    ///
    /// Sub-byte fields must close on a byte boundary before any byte-oriented
    /// field and at the end of the body; an open-ended field may only come
    /// last.
    pub fn validate(&self) -> Result<()> {
        let mut bit_pos = 0u32;
        let last = self.fields.len().saturating_sub(1);

        for (i, field) in self.fields.iter().enumerate() {
            field.check()?;

            if field.format.is_byte_oriented() && bit_pos % 8 != 0 {
                return Err(Error::Misaligned { field: field.name });
            }

            match field.length {
                FieldLength::Bits(bits) => bit_pos += bits,
                FieldLength::Remainder if i != last => {
                    return Err(Error::InvalidLayout {
                        field: field.name,
                        reason: "open-ended field must come last",
                    });
                }
                FieldLength::Remainder => {}
            }
        }

        if bit_pos % 8 != 0 {
            return Err(Error::InvalidLayout {
                field: self.fields.last().map_or(self.name, |f| f.name),
                reason: "sub-byte fields do not fill their byte",
            });
        }

        Ok(())
    }
}

/// One generation's table of sensor layouts
#[derive(Debug)]
pub struct SpecTable {
    name: &'static str,
    entries: &'static [SpecEntry],
    signed: SignedEncoding,
}

impl SpecTable {
    /// Create a table over embedded entries
    #[inline]
    pub const fn new(
        name: &'static str,
        signed: SignedEncoding,
        entries: &'static [SpecEntry],
    ) -> Self {
        Self {
            name,
            entries,
            signed,
        }
    }

    /// Table name
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signed integer semantics of every entry
    #[inline]
    pub fn signed_encoding(&self) -> SignedEncoding {
        self.signed
    }

    /// Find the layout of a sensor
    #[inline]
    pub fn lookup(&self, sensor_id: u8) -> Option<&'static SpecEntry> {
        self.entries.iter().find(|entry| entry.id == sensor_id)
    }

    /// Find the layout of a sensor by name
    #[inline]
    pub fn lookup_name(&self, name: &str) -> Option<&'static SpecEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Iterate entries in table order
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'static, SpecEntry> {
        self.entries.iter()
    }

    /// Number of sensors
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table has no sensors
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every entry and check ids are unique
    pub fn validate(&self) -> Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            entry.validate()?;
            if self.entries[..i].iter().any(|other| other.id == entry.id) {
                return Err(Error::InvalidLayout {
                    field: entry.name,
                    reason: "duplicate sensor id",
                });
            }
        }
        Ok(())
    }
}

impl HeaderRule for SpecTable {
    #[inline]
    fn header_style(&self, sensor_id: u8) -> HeaderStyle {
        self.lookup(sensor_id)
            .map_or(HeaderStyle::Standard, |entry| entry.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldFormat;

    static PACKED: [FieldSpec; 3] = [
        FieldSpec::bits("enable", FieldFormat::UnsignedInt, 1),
        FieldSpec::bits("mode", FieldFormat::UnsignedInt, 7),
        FieldSpec::bytes("level", FieldFormat::SignedInt, 2),
    ];
    static OPEN: [FieldSpec; 2] = [
        FieldSpec::remainder("samples", FieldFormat::RawBytes),
        FieldSpec::fixed6("temperature"),
    ];
    static TAIL: [FieldSpec; 1] = [FieldSpec::remainder("samples", FieldFormat::RawBytes)];
    static SHORT: [FieldSpec; 2] = [
        FieldSpec::bits("a", FieldFormat::UnsignedInt, 3),
        FieldSpec::bits("b", FieldFormat::UnsignedInt, 3),
    ];
    static GAP: [FieldSpec; 2] = [
        FieldSpec::bits("a", FieldFormat::UnsignedInt, 4),
        FieldSpec::bytes("mac", FieldFormat::Hex, 6),
    ];

    static ENTRIES: [SpecEntry; 2] = [
        SpecEntry::new(0x01, "Packed", &PACKED).convert("packed"),
        SpecEntry::new(0x02, "Open", &TAIL).inline_length(),
    ];
    static TABLE: SpecTable = SpecTable::new("test", SignedEncoding::TwosComplement, &ENTRIES);

    #[test]
    fn test_lookup() {
        assert_eq!(TABLE.lookup(0x01).map(|e| e.name), Some("Packed"));
        assert_eq!(TABLE.lookup(0x01).and_then(|e| e.conversion), Some("packed"));
        assert!(TABLE.lookup(0x7f).is_none());
        assert_eq!(TABLE.lookup_name("Open").map(|e| e.id), Some(0x02));
        assert_eq!(TABLE.len(), 2);
    }

    #[test]
    fn test_header_rule() {
        assert_eq!(TABLE.header_style(0x01), HeaderStyle::Standard);
        assert_eq!(TABLE.header_style(0x02), HeaderStyle::Inline);
        assert_eq!(TABLE.header_style(0x99), HeaderStyle::Standard);
    }

    #[test]
    fn test_body_bits() {
        assert_eq!(ENTRIES[0].body_bits(), Some(24));
        assert_eq!(ENTRIES[1].body_bits(), None);
    }

    #[test]
    fn test_validate_rules() {
        assert!(TABLE.validate().is_ok());
        assert!(matches!(
            SpecEntry::new(9, "open", &OPEN).validate(),
            Err(Error::InvalidLayout { field: "samples", .. })
        ));
        assert!(matches!(
            SpecEntry::new(9, "short", &SHORT).validate(),
            Err(Error::InvalidLayout { field: "b", .. })
        ));
        assert_eq!(
            SpecEntry::new(9, "gap", &GAP).validate(),
            Err(Error::Misaligned { field: "mac" })
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        static DUPES: [SpecEntry; 2] = [
            SpecEntry::new(0x05, "A", &PACKED),
            SpecEntry::new(0x05, "B", &PACKED),
        ];
        let table = SpecTable::new("dupes", SignedEncoding::SignMagnitude, &DUPES);
        assert!(matches!(
            table.validate(),
            Err(Error::InvalidLayout { field: "B", .. })
        ));
    }
}
