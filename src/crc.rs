//! CRC engine for frame and envelope integrity checks
//!
//! CRC-8 is the reflected 0x8C polynomial (Dallas/Maxim) used by sensor
//! frames and sensorgrams. CRC-16 (CCITT-FALSE) and CRC-32 (ISO-HDLC) protect
//! the datagram and waggle-packet layers.

use crc::{Crc, CRC_16_IBM_3740, CRC_32_ISO_HDLC};

use crate::CRC8_POLYNOMIAL;

/// Pre-computed CRC-8 lookup table
static CRC8_TABLE: [u8; 256] = generate_crc8_table();

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Generate CRC-8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC8_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Compute the CRC-8 of `data` starting from a zero register
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    crc8_update(0, data)
}

/// Continue a CRC-8 computation from `seed`
#[inline]
pub fn crc8_update(seed: u8, data: &[u8]) -> u8 {
    data.iter()
        .fold(seed, |crc, &byte| CRC8_TABLE[(crc ^ byte) as usize])
}

/// Bitwise CRC-8, one shift per bit
///
/// Slow path kept to cross-check the table.
#[inline]
pub fn crc8_bitwise(seed: u8, data: &[u8]) -> u8 {
    let mut crc = seed;

    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC8_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Compute CRC-16/CCITT-FALSE
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Compute CRC-32/ISO-HDLC
#[inline]
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
