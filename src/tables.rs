//! Embedded sensor spec tables, one module per protocol generation
//!
//! The generations overlap in sensor ids but not in layout, so each has its
//! own table and signed-integer semantics.

use crate::field::{FieldFormat, FieldSpec, SignedEncoding};
use crate::spec_table::{SpecEntry, SpecTable};

/// Generation 0: byte-aligned "format 1..8" fields, sign-magnitude integers
///
/// Covers the metsense, lightsense and chemsense boards. Format numbers in
/// the board firmware map to field formats as follows:
///
/// ```text
/// 1  unsigned 2 bytes      5  signed 3 bytes
/// 2  signed 2 bytes        6  FloatFixed6
/// 3  hex 6 bytes           7  raw 4 bytes
/// 4  unsigned 3 bytes      8  FloatFixed8
/// ```
pub mod v0 {
    use super::*;

    const fn f1(name: &'static str) -> FieldSpec {
        FieldSpec::bytes(name, FieldFormat::UnsignedInt, 2)
    }

    const fn f2(name: &'static str) -> FieldSpec {
        FieldSpec::bytes(name, FieldFormat::SignedInt, 2)
    }

    const fn f3(name: &'static str) -> FieldSpec {
        FieldSpec::bytes(name, FieldFormat::Hex, 6)
    }

    const fn f4(name: &'static str) -> FieldSpec {
        FieldSpec::bytes(name, FieldFormat::UnsignedInt, 3)
    }

    const fn f5(name: &'static str) -> FieldSpec {
        FieldSpec::bytes(name, FieldFormat::SignedInt, 3)
    }

    /// Sensor ids
    pub mod ids {
        /// Metsense board MAC address
        pub const MET_MAC: u8 = 0x00;
        /// TMP112 temperature
        pub const TMP112: u8 = 0x01;
        /// HTU21D temperature and humidity
        pub const HTU21D: u8 = 0x02;
        /// HIH4030 humidity (ADC counts)
        pub const HIH4030: u8 = 0x03;
        /// BMP180 temperature and pressure
        pub const BMP180: u8 = 0x04;
        /// PR103J2 thermistor (ADC counts)
        pub const PR103J2: u8 = 0x05;
        /// TSL250RD light (ADC counts)
        pub const TSL250RD: u8 = 0x06;
        /// MMA8452Q accelerometer
        pub const MMA8452Q: u8 = 0x07;
        /// SPV1840LR5H-B microphone
        pub const SPV1840LR5H: u8 = 0x08;
        /// TSYS01 temperature
        pub const TSYS01: u8 = 0x09;
        /// HMC5883L magnetometer
        pub const HMC5883L: u8 = 0x0a;
        /// HIH6130 temperature and humidity
        pub const HIH6130: u8 = 0x0b;
        /// APDS-9006-020 light
        pub const APDS_9006: u8 = 0x0c;
        /// TSL260RD infrared light
        pub const TSL260RD: u8 = 0x0d;
        /// TSL250RD light on the lightsense board
        pub const TSL250RD_LS: u8 = 0x0e;
        /// MLX75305 light
        pub const MLX75305: u8 = 0x0f;
        /// ML8511 ultraviolet
        pub const ML8511: u8 = 0x10;
        /// D6T thermopile array, variable length
        pub const D6T: u8 = 0x11;
        /// MLX90614 infrared thermometer
        pub const MLX90614: u8 = 0x12;
        /// TMP421 temperature
        pub const TMP421: u8 = 0x13;
        /// Chemsense board MAC address
        pub const CHEM_MAC: u8 = 0x14;
        /// Total reducing gases
        pub const REDUCING_GASES: u8 = 0x15;
        /// Nitrogen dioxide
        pub const NO2: u8 = 0x16;
        /// Ozone
        pub const O3: u8 = 0x17;
        /// Hydrogen sulphide
        pub const H2S: u8 = 0x18;
        /// Total oxidizing gases
        pub const OXIDIZING_GASES: u8 = 0x19;
        /// Carbon monoxide
        pub const CO: u8 = 0x1a;
        /// Sulfur dioxide
        pub const SO2: u8 = 0x1b;
        /// SHT25 temperature and humidity
        pub const SHT25: u8 = 0x1c;
        /// LPS25H temperature and pressure
        pub const LPS25H: u8 = 0x1d;
        /// Si1145 UV, infrared and visible light
        pub const SI1145: u8 = 0x1e;
        /// Chemsense firmware version
        pub const CHEM_FIRMWARE: u8 = 0x1f;
        /// Board real-time clock
        pub const BOARD_TIME: u8 = 0x20;
        /// Chemsense ADC status word
        pub const CHEM_STATUS: u8 = 0x21;
    }

    static MAC: [FieldSpec; 1] = [f3("id")];
    static TEMPERATURE: [FieldSpec; 1] = [FieldSpec::fixed6("temperature")];
    static TEMPERATURE_HUMIDITY: [FieldSpec; 2] = [
        FieldSpec::fixed6("temperature"),
        FieldSpec::fixed6("humidity"),
    ];
    static HUMIDITY_ADC: [FieldSpec; 1] = [f1("humidity")];
    static BMP180: [FieldSpec; 2] = [FieldSpec::fixed6("temperature"), f4("pressure")];
    static TEMPERATURE_ADC: [FieldSpec; 1] = [f1("temperature")];
    static INTENSITY: [FieldSpec; 1] = [f1("intensity")];
    static ACCELERATION: [FieldSpec; 4] = [
        FieldSpec::fixed6("acceleration_x"),
        FieldSpec::fixed6("acceleration_y"),
        FieldSpec::fixed6("acceleration_z"),
        FieldSpec::fixed6("vibration"),
    ];
    static MAGNETIC: [FieldSpec; 3] = [
        FieldSpec::fixed8("magnetic_field_x"),
        FieldSpec::fixed8("magnetic_field_y"),
        FieldSpec::fixed8("magnetic_field_z"),
    ];
    static D6T: [FieldSpec; 2] = [
        f2("ptat"),
        FieldSpec::remainder("temperatures", FieldFormat::RawBytes),
    ];
    static CONCENTRATION: [FieldSpec; 1] = [f5("concentration")];
    static SHT25: [FieldSpec; 2] = [f2("temperature"), f1("humidity")];
    static LPS25H: [FieldSpec; 2] = [f2("temperature"), f4("pressure")];
    static SI1145: [FieldSpec; 3] = [f1("uv_intensity"), f1("ir_intensity"), f1("visible_light")];
    static FIRMWARE: [FieldSpec; 2] = [
        FieldSpec::bytes("version", FieldFormat::Text, 6),
        FieldSpec::bytes("build", FieldFormat::RawBytes, 4),
    ];
    static BOARD_TIME: [FieldSpec; 1] = [FieldSpec::bytes("time", FieldFormat::TimeEpoch, 4)];
    static CHEM_STATUS: [FieldSpec; 1] = [FieldSpec::bytes("status", FieldFormat::RawBytes, 4)];

    static ENTRIES: [SpecEntry; 34] = [
        SpecEntry::new(ids::MET_MAC, "MetMAC", &MAC),
        SpecEntry::new(ids::TMP112, "TMP112", &TEMPERATURE),
        SpecEntry::new(ids::HTU21D, "HTU21D", &TEMPERATURE_HUMIDITY),
        SpecEntry::new(ids::HIH4030, "HIH4030", &HUMIDITY_ADC).convert("hih4030_humidity"),
        SpecEntry::new(ids::BMP180, "BMP180", &BMP180),
        SpecEntry::new(ids::PR103J2, "PR103J2", &TEMPERATURE_ADC).convert("pr103j2_temperature"),
        SpecEntry::new(ids::TSL250RD, "TSL250RD", &INTENSITY).convert("tsl250rd_light"),
        SpecEntry::new(ids::MMA8452Q, "MMA8452Q", &ACCELERATION),
        SpecEntry::new(ids::SPV1840LR5H, "SPV1840LR5H-B", &INTENSITY).convert("spv1840lr5h_sound"),
        SpecEntry::new(ids::TSYS01, "TSYS01", &TEMPERATURE),
        SpecEntry::new(ids::HMC5883L, "HMC5883L", &MAGNETIC),
        SpecEntry::new(ids::HIH6130, "HIH6130", &TEMPERATURE_HUMIDITY),
        SpecEntry::new(ids::APDS_9006, "APDS-9006-020", &INTENSITY).convert("apds9006_light"),
        SpecEntry::new(ids::TSL260RD, "TSL260RD", &INTENSITY).convert("tsl260rd_light"),
        SpecEntry::new(ids::TSL250RD_LS, "TSL250RD-LS", &INTENSITY).convert("tsl250rd_light"),
        SpecEntry::new(ids::MLX75305, "MLX75305", &INTENSITY).convert("mlx75305_light"),
        SpecEntry::new(ids::ML8511, "ML8511", &INTENSITY).convert("ml8511_uv"),
        SpecEntry::new(ids::D6T, "D6T", &D6T)
            .convert("d6t_temperatures")
            .inline_length(),
        SpecEntry::new(ids::MLX90614, "MLX90614", &TEMPERATURE),
        SpecEntry::new(ids::TMP421, "TMP421", &TEMPERATURE),
        SpecEntry::new(ids::CHEM_MAC, "ChemMAC", &MAC),
        SpecEntry::new(ids::REDUCING_GASES, "TotalReducingGases", &CONCENTRATION)
            .convert("chemsense_gas"),
        SpecEntry::new(ids::NO2, "NitrogenDioxide", &CONCENTRATION).convert("chemsense_gas"),
        SpecEntry::new(ids::O3, "Ozone", &CONCENTRATION).convert("chemsense_gas"),
        SpecEntry::new(ids::H2S, "HydrogenSulphide", &CONCENTRATION).convert("chemsense_gas"),
        SpecEntry::new(ids::OXIDIZING_GASES, "TotalOxidizingGases", &CONCENTRATION)
            .convert("chemsense_gas"),
        SpecEntry::new(ids::CO, "CarbonMonoxide", &CONCENTRATION).convert("chemsense_gas"),
        SpecEntry::new(ids::SO2, "SulfurDioxide", &CONCENTRATION).convert("chemsense_gas"),
        SpecEntry::new(ids::SHT25, "SHT25", &SHT25).convert("sht25"),
        SpecEntry::new(ids::LPS25H, "LPS25H", &LPS25H).convert("lps25h"),
        SpecEntry::new(ids::SI1145, "Si1145", &SI1145),
        SpecEntry::new(ids::CHEM_FIRMWARE, "ChemFirmware", &FIRMWARE),
        SpecEntry::new(ids::BOARD_TIME, "BoardTime", &BOARD_TIME),
        SpecEntry::new(ids::CHEM_STATUS, "ChemStatus", &CHEM_STATUS),
    ];

    /// Generation 0 table
    pub static TABLE: SpecTable = SpecTable::new("v0", SignedEncoding::SignMagnitude, &ENTRIES);
}

/// Generation 5: bit-packed layouts, two's complement integers
pub mod v5 {
    use super::*;

    const fn int(name: &'static str, bits: u32) -> FieldSpec {
        FieldSpec::bits(name, FieldFormat::SignedInt, bits)
    }

    const fn uint(name: &'static str, bits: u32) -> FieldSpec {
        FieldSpec::bits(name, FieldFormat::UnsignedInt, bits)
    }

    /// Sensor ids
    pub mod ids {
        /// Board MAC address
        pub const BOARD_MAC: u8 = 0x01;
        /// TMP112 temperature, 12-bit reading plus status bits
        pub const TMP112: u8 = 0x02;
        /// HTU21D temperature and humidity
        pub const HTU21D: u8 = 0x03;
        /// BMP180 temperature and pressure
        pub const BMP180: u8 = 0x04;
        /// MMA8452Q accelerometer
        pub const MMA8452Q: u8 = 0x05;
        /// HMC5883L magnetometer
        pub const HMC5883L: u8 = 0x06;
        /// Chemsense enable flags and mode
        pub const CHEM_CONFIG: u8 = 0x07;
        /// Sampler configuration
        pub const SAMPLER_CONFIG: u8 = 0x08;
        /// GPS position
        pub const GPS: u8 = 0x09;
        /// Board uptime
        pub const UPTIME: u8 = 0x0a;
        /// Firmware version string
        pub const FIRMWARE: u8 = 0x0b;
        /// Si1145 UV, infrared and visible light
        pub const SI1145: u8 = 0x0c;
        /// SHT25 temperature and humidity
        pub const SHT25: u8 = 0x0d;
        /// Raw ADC samples, variable length
        pub const RAW_ADC: u8 = 0x0e;
    }

    static MAC: [FieldSpec; 1] = [FieldSpec::bytes("id", FieldFormat::Hex, 6)];
    static TMP112: [FieldSpec; 3] = [
        int("temperature", 12),
        uint("alert", 1),
        uint("reserved", 3),
    ];
    static HTU21D: [FieldSpec; 2] = [int("temperature", 16), uint("humidity", 16)];
    static BMP180: [FieldSpec; 2] = [int("temperature", 16), uint("pressure", 32)];
    static AXES: [FieldSpec; 3] = [int("x", 16), int("y", 16), int("z", 16)];
    static CHEM_CONFIG: [FieldSpec; 6] = [
        uint("enable_sht25", 1),
        uint("enable_lps25h", 1),
        uint("enable_si1145", 1),
        uint("enable_gas", 1),
        uint("mode", 2),
        uint("reserved", 2),
    ];
    static SAMPLER_CONFIG: [FieldSpec; 4] = [
        uint("sample_rate", 3),
        int("gain", 3),
        uint("power", 2),
        uint("interval", 16),
    ];
    static GPS: [FieldSpec; 3] = [
        int("latitude", 32),
        int("longitude", 32),
        int("altitude", 24),
    ];
    static UPTIME: [FieldSpec; 1] = [FieldSpec::bytes("uptime", FieldFormat::TimeEpoch, 4)];
    static FIRMWARE: [FieldSpec; 1] = [FieldSpec::bytes("version", FieldFormat::Text, 8)];
    static SI1145: [FieldSpec; 3] = [
        uint("uv_intensity", 16),
        uint("ir_intensity", 16),
        uint("visible_light", 16),
    ];
    static SHT25: [FieldSpec; 2] = [int("temperature", 16), uint("humidity", 16)];
    static RAW_ADC: [FieldSpec; 1] = [FieldSpec::remainder("samples", FieldFormat::RawBytes)];

    static ENTRIES: [SpecEntry; 14] = [
        SpecEntry::new(ids::BOARD_MAC, "BoardMAC", &MAC),
        SpecEntry::new(ids::TMP112, "TMP112", &TMP112).convert("tmp112"),
        SpecEntry::new(ids::HTU21D, "HTU21D", &HTU21D).convert("htu21d"),
        SpecEntry::new(ids::BMP180, "BMP180", &BMP180).convert("bmp180"),
        SpecEntry::new(ids::MMA8452Q, "MMA8452Q", &AXES).convert("mma8452q"),
        SpecEntry::new(ids::HMC5883L, "HMC5883L", &AXES).convert("hmc5883l"),
        SpecEntry::new(ids::CHEM_CONFIG, "ChemConfig", &CHEM_CONFIG),
        SpecEntry::new(ids::SAMPLER_CONFIG, "SamplerConfig", &SAMPLER_CONFIG),
        SpecEntry::new(ids::GPS, "GPS", &GPS).convert("gps"),
        SpecEntry::new(ids::UPTIME, "Uptime", &UPTIME),
        SpecEntry::new(ids::FIRMWARE, "Firmware", &FIRMWARE),
        SpecEntry::new(ids::SI1145, "Si1145", &SI1145).convert("si1145"),
        SpecEntry::new(ids::SHT25, "SHT25", &SHT25).convert("sht25"),
        SpecEntry::new(ids::RAW_ADC, "RawADC", &RAW_ADC),
    ];

    /// Generation 5 table
    pub static TABLE: SpecTable =
        SpecTable::new("v5", SignedEncoding::TwosComplement, &ENTRIES);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subpacket::HeaderStyle;

    #[test]
    fn test_embedded_tables_validate() {
        v0::TABLE.validate().unwrap();
        v5::TABLE.validate().unwrap();
    }

    #[test]
    fn test_v0_inline_sensor() {
        let d6t = v0::TABLE.lookup(v0::ids::D6T).unwrap();
        assert_eq!(d6t.header, HeaderStyle::Inline);
        assert_eq!(d6t.body_bits(), None);
        assert!(v0::TABLE
            .iter()
            .filter(|e| e.id != v0::ids::D6T)
            .all(|e| e.header == HeaderStyle::Standard));
    }

    #[test]
    fn test_v5_sub_byte_groups_fill_bytes() {
        let config = v5::TABLE.lookup(v5::ids::CHEM_CONFIG).unwrap();
        let lengths: f32 = config.fields.iter().filter_map(|f| f.length_bytes()).sum();
        assert_eq!(lengths, 1.0);
        assert_eq!(config.fields[0].length_bytes(), Some(0.125));

        let tmp112 = v5::TABLE.lookup(v5::ids::TMP112).unwrap();
        assert_eq!(tmp112.body_bits(), Some(16));
    }

    #[test]
    fn test_generations_differ() {
        assert_eq!(v0::TABLE.signed_encoding(), SignedEncoding::SignMagnitude);
        assert_eq!(v5::TABLE.signed_encoding(), SignedEncoding::TwosComplement);
        assert_ne!(
            v0::TABLE.lookup(0x02).map(|e| e.name),
            v5::TABLE.lookup(0x02).map(|e| e.name)
        );
    }
}
