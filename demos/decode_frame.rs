//! Encode a few sensor readings, decode them back, and wrap them in a
//! batched message
//!
//! Run with: cargo run --example decode_frame

use waggle_codec::convert::{ConvertedFields, RawFields};
use waggle_codec::envelope::Sensorgram;
use waggle_codec::tables::v0;
use waggle_codec::*;

fn hih4030_humidity(raw: &RawFields) -> Option<ConvertedFields> {
    let counts = raw.get("humidity")?.as_f64()?;
    let volts = counts * 5.0 / 1024.0;
    let mut out = ConvertedFields::new();
    out.insert(
        "humidity".to_string(),
        Converted::new(Value::Float((volts / 5.0 - 0.16) / 0.0062), "%RH"),
    );
    Some(out)
}

fn main() -> Result<()> {
    println!("waggle-codec frame demo");
    println!("=======================");

    // 1. Encode readings into a frame
    let records = [
        SensorRecord::new(v0::ids::MET_MAC).with("id", Value::Hex("0004a3b1c2d3".into())),
        SensorRecord::new(v0::ids::HTU21D)
            .with("temperature", Value::Float(22.75))
            .with("humidity", Value::Float(41.5)),
        SensorRecord::new(v0::ids::HIH4030).with("humidity", Value::Unsigned(420)),
        SensorRecord::new(v0::ids::BMP180)
            .with("temperature", Value::Float(23.1))
            .with("pressure", Value::Unsigned(99_870)),
    ];
    let frame = SensorEncoder::new(Protocol::V0).encode_stream(&records)?;
    println!("\n1. Encoded {} bytes: {}", frame.len(), hex::encode(&frame));

    // 2. Decode with one registered conversion
    let registry = ConversionRegistry::new().with("hih4030_humidity", hih4030_humidity);
    let report = SensorDecoder::new(Protocol::V0, &registry).decode_frame(&frame)?;
    println!("\n2. Decoded readings:");
    for (sensor, readings) in &report.sensors {
        for (field, reading) in readings {
            let raw = reading.raw.as_ref().map(ToString::to_string);
            let hrf = reading.hrf.as_ref().map(ToString::to_string);
            println!(
                "  {sensor}.{field}: raw={} hrf={} unit={}",
                raw.as_deref().unwrap_or("-"),
                hrf.as_deref().unwrap_or("-"),
                reading.unit
            );
        }
    }

    // 3. A damaged frame is rejected as a whole
    let mut damaged = frame.clone();
    damaged[4] ^= 0x01;
    let decoder = SensorDecoder::new(Protocol::V0, &NoConversions);
    match decoder.decode_frame(&damaged) {
        Ok(_) => println!("\n3. Damaged frame decoded?"),
        Err(err) => println!("\n3. Damaged frame rejected: {err}"),
    }

    // 4. Ship the raw frame inside a batched message
    let codec = MessageCodec::new(EnvelopeConfig {
        sender_id: 0x0000_001e_0610_ba8f,
        ..EnvelopeConfig::default()
    });
    let gram = Sensorgram {
        sensor_id: 0x0100,
        sensor_instance: 0,
        parameter_id: 0,
        timestamp: 1_600_000_000,
        body: frame,
    };
    let message = codec.pack_message(&[gram], 1_600_000_000)?;
    let unpacked = codec.unpack_message(&message)?;
    println!(
        "\n4. Message of {} bytes, send sequence {}, {} sensorgram(s)",
        message.len(),
        unpacked.packet.send_sequence,
        unpacked.sensorgrams.len()
    );

    Ok(())
}
