//! Field codec: typed sensor fields packed at bit offsets
//!
//! A field is described by a [`FieldSpec`]: a name, a [`FieldFormat`] and a
//! width. Widths are carried in bits so fields narrower than a byte pack
//! MSB-first, left to right, into a shared byte with their siblings.
//!
//! # Formats
//!
//! ```text
//! SignedInt / UnsignedInt / TimeEpoch   any width 1..=64 bits, big-endian
//! Hex / Text / RawBytes                 whole bytes, byte aligned
//! FloatFixed6   [sign:1][int:7] [pad:1][frac/100:7]
//! FloatFixed8   [sign:1][int:5][frac_hi:2] [frac_lo:8]   frac/1000
//! ```

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::cursor::{byte_width, BitCursor, BitWriter};
use crate::error::{Error, Result};

/// Wire format of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Signed integer, semantics set by [`SignedEncoding`]
    SignedInt,
    /// Unsigned big-endian integer
    UnsignedInt,
    /// Bytes rendered as lowercase hex
    Hex,
    /// 2-byte fixed point, 7-bit integer part, hundredths
    FloatFixed6,
    /// 2-byte fixed point, 5-bit integer part, thousandths
    FloatFixed8,
    /// Unsigned Unix timestamp
    TimeEpoch,
    /// Fixed-width NUL-padded text
    Text,
    /// Opaque bytes
    RawBytes,
}

impl FieldFormat {
    /// Formats that occupy whole bytes and must start on a byte boundary
    #[inline]
    pub const fn is_byte_oriented(&self) -> bool {
        !matches!(
            self,
            FieldFormat::SignedInt | FieldFormat::UnsignedInt | FieldFormat::TimeEpoch
        )
    }
}

/// Width of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLength {
    /// Fixed width in bits
    Bits(u32),
    /// Every byte left in the sub-packet body
    Remainder,
}

/// Layout of one named field inside a sensor body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name
    pub name: &'static str,
    /// Wire format
    pub format: FieldFormat,
    /// Width
    pub length: FieldLength,
}

impl FieldSpec {
    /// Field spanning `len` whole bytes
    #[inline]
    pub const fn bytes(name: &'static str, format: FieldFormat, len: u32) -> Self {
        Self {
            name,
            format,
            length: FieldLength::Bits(len * 8),
        }
    }

    /// Field spanning `bits` bits
    #[inline]
    pub const fn bits(name: &'static str, format: FieldFormat, bits: u32) -> Self {
        Self {
            name,
            format,
            length: FieldLength::Bits(bits),
        }
    }

    /// Field taking the rest of the body
    #[inline]
    pub const fn remainder(name: &'static str, format: FieldFormat) -> Self {
        Self {
            name,
            format,
            length: FieldLength::Remainder,
        }
    }

    /// 2-byte fixed point with hundredths
    #[inline]
    pub const fn fixed6(name: &'static str) -> Self {
        Self::bytes(name, FieldFormat::FloatFixed6, 2)
    }

    /// 2-byte fixed point with thousandths
    #[inline]
    pub const fn fixed8(name: &'static str) -> Self {
        Self::bytes(name, FieldFormat::FloatFixed8, 2)
    }

    /// Width in bytes, fractional for sub-byte fields (1 bit is 0.125)
    #[inline]
    pub fn length_bytes(&self) -> Option<f32> {
        match self.length {
            FieldLength::Bits(bits) => Some(bits as f32 / 8.0),
            FieldLength::Remainder => None,
        }
    }

    /// Fixed width in bits
    #[inline]
    pub const fn bit_width(&self) -> Option<u32> {
        match self.length {
            FieldLength::Bits(bits) => Some(bits),
            FieldLength::Remainder => None,
        }
    }

    /// Check width rules for the format, independent of position
    pub fn check(&self) -> Result<()> {
        let layout = |reason| Error::InvalidLayout {
            field: self.name,
            reason,
        };

        match (self.format, self.length) {
            (FieldFormat::FloatFixed6 | FieldFormat::FloatFixed8, FieldLength::Bits(16)) => Ok(()),
            (FieldFormat::FloatFixed6 | FieldFormat::FloatFixed8, _) => {
                Err(layout("fixed-point fields are 2 bytes"))
            }
            (_, FieldLength::Remainder) if !self.format.is_byte_oriented() => {
                Err(layout("integer fields need a fixed width"))
            }
            (_, FieldLength::Remainder) => Ok(()),
            (_, FieldLength::Bits(0)) => Err(layout("zero width")),
            (format, FieldLength::Bits(bits)) if format.is_byte_oriented() && bits % 8 != 0 => {
                Err(layout("byte field width is not a whole byte"))
            }
            (_, FieldLength::Bits(bits)) if bits > 64 && !self.format.is_byte_oriented() => {
                Err(layout("integer wider than 64 bits"))
            }
            _ => Ok(()),
        }
    }
}

/// Signed integer semantics of a protocol generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedEncoding {
    /// Sign in the most significant bit, magnitude in the rest
    SignMagnitude,
    /// Two's complement over the field width
    TwosComplement,
}

/// A decoded or to-be-encoded field value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Value {
    /// Unsigned integer or timestamp
    Unsigned(u64),
    /// Signed integer
    Signed(i64),
    /// Fixed-point or converted number
    Float(f64),
    /// Lowercase hex string
    Hex(String),
    /// Text
    Text(String),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

impl Value {
    /// Integer view of the value, if it holds one
    #[inline]
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::Unsigned(v) => Some(v as i128),
            Value::Signed(v) => Some(v as i128),
            _ => None,
        }
    }

    /// Numeric view of the value, if it holds a number
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Unsigned(v) => Some(v as f64),
            Value::Signed(v) => Some(v as f64),
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Hex(s) | Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Decode one field at the cursor
pub fn decode_field(
    cursor: &mut BitCursor<'_>,
    spec: &FieldSpec,
    signed: SignedEncoding,
) -> Result<Value> {
    spec.check()?;

    if spec.format.is_byte_oriented() {
        if !cursor.is_aligned() {
            return Err(Error::Misaligned { field: spec.name });
        }
        let bytes = match spec.length {
            FieldLength::Bits(bits) => cursor.get_bytes(bits as usize / 8)?,
            FieldLength::Remainder => cursor.rest()?,
        };
        return Ok(match spec.format {
            FieldFormat::Hex => Value::Hex(hex::encode(bytes)),
            FieldFormat::FloatFixed6 => Value::Float(fixed6_from_bytes(bytes[0], bytes[1])),
            FieldFormat::FloatFixed8 => Value::Float(fixed8_from_bytes(bytes[0], bytes[1])),
            FieldFormat::Text => {
                let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                Value::Text(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            _ => Value::Bytes(bytes.to_vec()),
        });
    }

    let bits = spec.bit_width().unwrap_or(0);
    let raw = cursor.get_bits(bits)?;
    Ok(match spec.format {
        FieldFormat::SignedInt => Value::Signed(signed_from_raw(raw, bits, signed)),
        _ => Value::Unsigned(raw),
    })
}

/// Encode one field at the writer position
pub fn encode_field(
    writer: &mut BitWriter,
    spec: &FieldSpec,
    value: &Value,
    signed: SignedEncoding,
) -> Result<()> {
    spec.check()?;

    let mismatch = || Error::TypeMismatch {
        field: spec.name,
        format: spec.format,
    };
    let out_of_range = || Error::ValueOutOfRange { field: spec.name };

    if spec.format.is_byte_oriented() && !writer.is_aligned() {
        return Err(Error::Misaligned { field: spec.name });
    }
    let width = spec.bit_width();

    match spec.format {
        FieldFormat::UnsignedInt | FieldFormat::TimeEpoch => {
            let bits = width.unwrap_or(0);
            let v = value.as_integer().ok_or_else(mismatch)?;
            if v < 0 || (bits < 64 && v >> bits != 0) || v > u64::MAX as i128 {
                return Err(out_of_range());
            }
            writer.put_bits(v as u64, bits);
        }
        FieldFormat::SignedInt => {
            let bits = width.unwrap_or(0);
            let v = value.as_integer().ok_or_else(mismatch)?;
            let raw = signed_to_raw(v, bits, signed).ok_or_else(out_of_range)?;
            writer.put_bits(raw, bits);
        }
        FieldFormat::FloatFixed6 => {
            let v = value.as_f64().ok_or_else(mismatch)?;
            let bytes = fixed6_to_bytes(v).ok_or_else(out_of_range)?;
            writer.put_bytes(&bytes);
        }
        FieldFormat::FloatFixed8 => {
            let v = value.as_f64().ok_or_else(mismatch)?;
            let bytes = fixed8_to_bytes(v).ok_or_else(out_of_range)?;
            writer.put_bytes(&bytes);
        }
        FieldFormat::Hex => {
            let bytes = match value {
                Value::Hex(s) => hex::decode(s).map_err(|_| mismatch())?,
                Value::Bytes(b) => b.clone(),
                _ => return Err(mismatch()),
            };
            put_sized(writer, &bytes, width, false).ok_or_else(out_of_range)?;
        }
        FieldFormat::Text => {
            let Value::Text(s) = value else {
                return Err(mismatch());
            };
            put_sized(writer, s.as_bytes(), width, true).ok_or_else(out_of_range)?;
        }
        FieldFormat::RawBytes => {
            let Value::Bytes(b) = value else {
                return Err(mismatch());
            };
            put_sized(writer, b, width, false).ok_or_else(out_of_range)?;
        }
    }

    Ok(())
}

/// Decode every field of a layout from a body
pub fn decode_fields(
    body: &[u8],
    fields: &[FieldSpec],
    signed: SignedEncoding,
) -> Result<Vec<(&'static str, Value)>> {
    let mut cursor = BitCursor::new(body);
    fields
        .iter()
        .map(|spec| Ok((spec.name, decode_field(&mut cursor, spec, signed)?)))
        .collect()
}

/// Encode named values in layout order
pub fn encode_fields(
    fields: &[FieldSpec],
    values: &BTreeMap<String, Value>,
    signed: SignedEncoding,
) -> Result<Vec<u8>> {
    let mut writer = BitWriter::new();
    for spec in fields {
        let value = values
            .get(spec.name)
            .ok_or(Error::MissingField { field: spec.name })?;
        encode_field(&mut writer, spec, value, signed)?;
    }
    Ok(writer.into_bytes())
}

/// Big-endian unsigned integer of `len` bytes at `offset`
pub fn unsigned_int(buf: &[u8], offset: usize, len: usize) -> Result<u64> {
    at(buf, offset)?.get_uint(len)
}

/// Signed integer of `len` bytes at `offset`
pub fn signed_int(buf: &[u8], offset: usize, len: usize, signed: SignedEncoding) -> Result<i64> {
    let bits = byte_width(len)?;
    let raw = at(buf, offset)?.get_bits(bits)?;
    Ok(signed_from_raw(raw, bits, signed))
}

/// `len` bytes at `offset` as lowercase hex
pub fn hex_string(buf: &[u8], offset: usize, len: usize) -> Result<String> {
    Ok(hex::encode(at(buf, offset)?.get_bytes(len)?))
}

/// Fixed-point value with hundredths at `offset`
pub fn float_fixed6(buf: &[u8], offset: usize) -> Result<f64> {
    let b = at(buf, offset)?.get_bytes(2)?;
    Ok(fixed6_from_bytes(b[0], b[1]))
}

/// Fixed-point value with thousandths at `offset`
pub fn float_fixed8(buf: &[u8], offset: usize) -> Result<f64> {
    let b = at(buf, offset)?.get_bytes(2)?;
    Ok(fixed8_from_bytes(b[0], b[1]))
}

/// Unix timestamp of `len` bytes at `offset`
pub fn time_epoch(buf: &[u8], offset: usize, len: usize) -> Result<u64> {
    unsigned_int(buf, offset, len)
}

/// NUL-trimmed text of `len` bytes at `offset`
pub fn string(buf: &[u8], offset: usize, len: usize) -> Result<String> {
    let spec = FieldSpec::bytes("string", FieldFormat::Text, len as u32);
    match decode_field(&mut at(buf, offset)?, &spec, SignedEncoding::TwosComplement)? {
        Value::Text(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// `len` opaque bytes at `offset`
pub fn raw_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    at(buf, offset)?.get_bytes(len)
}

fn at(buf: &[u8], offset: usize) -> Result<BitCursor<'_>> {
    let mut cursor = BitCursor::new(buf);
    cursor.skip(offset)?;
    Ok(cursor)
}

fn put_sized(writer: &mut BitWriter, bytes: &[u8], width: Option<u32>, pad: bool) -> Option<()> {
    match width {
        None => writer.put_bytes(bytes),
        Some(bits) => {
            let len = bits as usize / 8;
            if bytes.len() > len || (!pad && bytes.len() != len) {
                return None;
            }
            writer.put_bytes(bytes);
            for _ in bytes.len()..len {
                writer.put_u8(0);
            }
        }
    }
    Some(())
}

fn signed_from_raw(raw: u64, bits: u32, signed: SignedEncoding) -> i64 {
    if bits == 0 {
        return 0;
    }
    match signed {
        SignedEncoding::SignMagnitude => {
            let magnitude = if bits == 1 {
                0
            } else {
                (raw & (u64::MAX >> (65 - bits))) as i64
            };
            if raw >> (bits - 1) & 1 == 1 {
                -magnitude
            } else {
                magnitude
            }
        }
        SignedEncoding::TwosComplement => {
            let shift = 64 - bits;
            ((raw << shift) as i64) >> shift
        }
    }
}

fn signed_to_raw(v: i128, bits: u32, signed: SignedEncoding) -> Option<u64> {
    if bits == 0 || bits > 64 {
        return None;
    }
    let half = 1i128 << (bits - 1);
    match signed {
        SignedEncoding::SignMagnitude => {
            let magnitude = v.unsigned_abs();
            if magnitude >= half as u128 {
                return None;
            }
            let sign = u64::from(v < 0) << (bits - 1);
            Some(sign | magnitude as u64)
        }
        SignedEncoding::TwosComplement => {
            if v < -half || v >= half {
                return None;
            }
            let raw = v as i64 as u64;
            Some(if bits < 64 { raw & ((1u64 << bits) - 1) } else { raw })
        }
    }
}

/// Split a float into sign and scaled, rounded magnitude
fn scaled_magnitude(v: f64, scale: f64) -> Option<(bool, u64)> {
    if !v.is_finite() {
        return None;
    }
    let negative = v < 0.0;
    let magnitude = if negative { -v } else { v };
    let scaled = magnitude * scale + 0.5;
    if scaled >= u32::MAX as f64 {
        return None;
    }
    let scaled = scaled as u64;
    Some((negative && scaled != 0, scaled))
}

fn fixed6_from_bytes(b0: u8, b1: u8) -> f64 {
    let value = (b0 & 0x7f) as f64 + (b1 & 0x7f) as f64 / 100.0;
    if b0 & 0x80 != 0 {
        -value
    } else {
        value
    }
}

fn fixed6_to_bytes(v: f64) -> Option<[u8; 2]> {
    let (negative, scaled) = scaled_magnitude(v, 100.0)?;
    let int = scaled / 100;
    if int > 0x7f {
        return None;
    }
    let frac = (scaled % 100) as u8;
    Some([(u8::from(negative) << 7) | int as u8, frac])
}

fn fixed8_from_bytes(b0: u8, b1: u8) -> f64 {
    let int = (b0 >> 2) & 0x1f;
    let frac = (((b0 & 0x03) as u16) << 8) | b1 as u16;
    let value = int as f64 + frac as f64 / 1000.0;
    if b0 & 0x80 != 0 {
        -value
    } else {
        value
    }
}

fn fixed8_to_bytes(v: f64) -> Option<[u8; 2]> {
    let (negative, scaled) = scaled_magnitude(v, 1000.0)?;
    let int = scaled / 1000;
    if int > 0x1f {
        return None;
    }
    let frac = (scaled % 1000) as u16;
    let b0 = (u8::from(negative) << 7) | ((int as u8) << 2) | (frac >> 8) as u8;
    Some([b0, frac as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    const SM: SignedEncoding = SignedEncoding::SignMagnitude;
    const TC: SignedEncoding = SignedEncoding::TwosComplement;

    fn roundtrip(spec: FieldSpec, value: Value, signed: SignedEncoding) -> (Vec<u8>, Value) {
        let mut writer = BitWriter::new();
        encode_field(&mut writer, &spec, &value, signed).unwrap();
        let bytes = writer.into_bytes();
        let decoded = decode_field(&mut BitCursor::new(&bytes), &spec, signed).unwrap();
        (bytes, decoded)
    }

    #[test]
    fn test_unsigned_int_big_endian() {
        let buf = [0x00, 0x12, 0x34, 0x56];
        assert_eq!(unsigned_int(&buf, 1, 2).unwrap(), 0x1234);
        assert_eq!(unsigned_int(&buf, 1, 3).unwrap(), 0x12_3456);
        assert_eq!(time_epoch(&buf, 0, 4).unwrap(), 0x0012_3456);
        assert_eq!(unsigned_int(&buf, 2, 4), Err(Error::eof(4, 2)));
    }

    #[test]
    fn test_integer_helpers_reject_bad_widths() {
        let buf = [0xff; 16];
        let bad_width = |r: Result<u64>| matches!(r, Err(Error::InvalidLayout { .. }));
        assert!(bad_width(unsigned_int(&buf, 0, 9)));
        assert!(bad_width(unsigned_int(&buf, 0, 0)));
        assert!(bad_width(time_epoch(&buf, 0, usize::MAX)));
        assert!(matches!(signed_int(&buf, 0, 9, TC), Err(Error::InvalidLayout { .. })));
        assert!(matches!(signed_int(&buf, 0, 9, SM), Err(Error::InvalidLayout { .. })));
        assert_eq!(signed_int(&buf, 0, 8, TC).unwrap(), -1);
        assert_eq!(unsigned_int(&buf, 8, 8).unwrap(), u64::MAX);
    }

    #[test]
    fn test_sign_magnitude_is_not_twos_complement() {
        let buf = [0x80, 0x05];
        assert_eq!(signed_int(&buf, 0, 2, SM).unwrap(), -5);
        assert_eq!(signed_int(&buf, 0, 2, TC).unwrap(), -32763);

        let (bytes, _) = roundtrip(FieldSpec::bytes("t", FieldFormat::SignedInt, 2), Value::Signed(-5), SM);
        assert_eq!(bytes, [0x80, 0x05]);
        let (bytes, _) = roundtrip(FieldSpec::bytes("t", FieldFormat::SignedInt, 2), Value::Signed(-5), TC);
        assert_eq!(bytes, [0xff, 0xfb]);
    }

    #[test]
    fn test_signed_range_limits() {
        let spec = FieldSpec::bytes("t", FieldFormat::SignedInt, 1);
        let mut writer = BitWriter::new();
        // Sign-magnitude cannot represent -128 in one byte
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Signed(-128), SM),
            Err(Error::ValueOutOfRange { field: "t" })
        );
        encode_field(&mut writer, &spec, &Value::Signed(-128), TC).unwrap();
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Signed(128), TC),
            Err(Error::ValueOutOfRange { field: "t" })
        );
        assert_eq!(writer.as_slice(), &[0x80]);
    }

    #[test]
    fn test_unsigned_rejects_negative_and_wide() {
        let spec = FieldSpec::bytes("n", FieldFormat::UnsignedInt, 2);
        let mut writer = BitWriter::new();
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Signed(-1), SM),
            Err(Error::ValueOutOfRange { field: "n" })
        );
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Unsigned(0x1_0000), SM),
            Err(Error::ValueOutOfRange { field: "n" })
        );
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Float(1.0), SM),
            Err(Error::TypeMismatch {
                field: "n",
                format: FieldFormat::UnsignedInt
            })
        );
    }

    #[test]
    fn test_hex_string() {
        let buf = [0x00, 0x1e, 0x06, 0x10, 0x72, 0xab];
        assert_eq!(hex_string(&buf, 0, 6).unwrap(), "001e061072ab");

        let spec = FieldSpec::bytes("id", FieldFormat::Hex, 6);
        let (bytes, decoded) = roundtrip(spec, Value::Hex("001e061072ab".to_string()), SM);
        assert_eq!(bytes, buf);
        assert_eq!(decoded, Value::Hex("001e061072ab".to_string()));

        let mut writer = BitWriter::new();
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Hex("zz".to_string()), SM),
            Err(Error::TypeMismatch {
                field: "id",
                format: FieldFormat::Hex
            })
        );
        assert_eq!(
            encode_field(&mut writer, &spec, &Value::Hex("0011".to_string()), SM),
            Err(Error::ValueOutOfRange { field: "id" })
        );
    }

    #[test]
    fn test_float_fixed6() {
        // -23.45: sign | 23, 45
        let decoded = float_fixed6(&[0x97, 45], 0).unwrap();
        assert!(decoded < -23.449 && decoded > -23.451);
        assert_eq!(fixed6_to_bytes(-23.45), Some([0x97, 45]));
        assert_eq!(fixed6_to_bytes(127.99), Some([0x7f, 99]));
        assert_eq!(fixed6_to_bytes(128.0), None);
        assert_eq!(fixed6_to_bytes(f64::NAN), None);
        // Rounds to zero without a sign bit
        assert_eq!(fixed6_to_bytes(-0.001), Some([0, 0]));
    }

    #[test]
    fn test_float_fixed8() {
        // 12.345 -> int 12, frac 345 = 0b01_0101_1001
        let bytes = fixed8_to_bytes(12.345).unwrap();
        assert_eq!(bytes, [(12 << 2) | 0x01, 0x59]);
        let delta = float_fixed8(&bytes, 0).unwrap() - 12.345;
        assert!(delta < 1e-9 && delta > -1e-9);
        assert_eq!(fixed8_to_bytes(-31.999).map(|b| b[0] & 0x80), Some(0x80));
        assert_eq!(fixed8_to_bytes(32.0), None);
    }

    #[test]
    fn test_sub_byte_fields_share_a_byte() {
        let fields = [
            FieldSpec::bits("enable", FieldFormat::UnsignedInt, 1),
            FieldSpec::bits("gain", FieldFormat::SignedInt, 3),
            FieldSpec::bits("mode", FieldFormat::UnsignedInt, 4),
            FieldSpec::bytes("count", FieldFormat::UnsignedInt, 1),
        ];
        assert_eq!(fields[0].length_bytes(), Some(0.125));

        let mut values = BTreeMap::new();
        values.insert("enable".to_string(), Value::Unsigned(1));
        values.insert("gain".to_string(), Value::Signed(-3));
        values.insert("mode".to_string(), Value::Unsigned(9));
        values.insert("count".to_string(), Value::Unsigned(200));

        let body = encode_fields(&fields, &values, TC).unwrap();
        // 1 | 101 | 1001
        assert_eq!(body, [0xd9, 200]);

        let decoded = decode_fields(&body, &fields, TC).unwrap();
        assert_eq!(
            decoded,
            vec![
                ("enable", Value::Unsigned(1)),
                ("gain", Value::Signed(-3)),
                ("mode", Value::Unsigned(9)),
                ("count", Value::Unsigned(200)),
            ]
        );
    }

    #[test]
    fn test_byte_field_after_partial_byte_is_misaligned() {
        let fields = [
            FieldSpec::bits("flag", FieldFormat::UnsignedInt, 1),
            FieldSpec::bytes("id", FieldFormat::Hex, 1),
        ];
        assert_eq!(
            decode_fields(&[0x80, 0x01], &fields, TC),
            Err(Error::Misaligned { field: "id" })
        );
    }

    #[test]
    fn test_text_and_raw_bytes() {
        let spec = FieldSpec::bytes("fw", FieldFormat::Text, 6);
        let (bytes, decoded) = roundtrip(spec, Value::Text("3.1".to_string()), SM);
        assert_eq!(bytes, b"3.1\0\0\0");
        assert_eq!(decoded, Value::Text("3.1".to_string()));
        assert_eq!(string(&bytes, 0, 6).unwrap(), "3.1");

        let tail = FieldSpec::remainder("samples", FieldFormat::RawBytes);
        let (bytes, decoded) = roundtrip(tail, Value::Bytes(vec![1, 2, 3]), SM);
        assert_eq!(bytes, [1, 2, 3]);
        assert_eq!(decoded, Value::Bytes(vec![1, 2, 3]));
        assert_eq!(raw_bytes(&bytes, 1, 2).unwrap(), &[2, 3]);
    }

    #[test]
    fn test_missing_field_and_underrun() {
        let fields = [FieldSpec::fixed6("temperature")];
        assert_eq!(
            encode_fields(&fields, &BTreeMap::new(), SM),
            Err(Error::MissingField {
                field: "temperature"
            })
        );
        assert_eq!(decode_fields(&[0x01], &fields, SM), Err(Error::eof(2, 1)));
    }

    #[test]
    fn test_spec_check() {
        assert!(FieldSpec::bits("x", FieldFormat::Hex, 4).check().is_err());
        assert!(FieldSpec::bytes("x", FieldFormat::FloatFixed6, 3).check().is_err());
        assert!(FieldSpec::remainder("x", FieldFormat::UnsignedInt).check().is_err());
        assert!(FieldSpec::bits("x", FieldFormat::UnsignedInt, 65).check().is_err());
        assert!(FieldSpec::bits("x", FieldFormat::SignedInt, 12).check().is_ok());
    }
}
