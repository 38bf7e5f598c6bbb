//! Uplink frame encoding.
//!
//! A frame is ASCII, `|`-separated, with `,`-separated sub-fields:
//!
//! ```text
//! <stationId>|<deviceId>|<batteryVoltage:3dp>|<unixTimestamp>|<sensorId>,<typeCode>[,<value>]+|...
//! ```
//!
//! Values are rendered at 3-decimal precision with trailing zeros and a
//! trailing decimal point stripped (`55.000` → `55`), matching the rounding
//! done at acquisition so encoded size is predictable run-to-run. A failed
//! read is encoded as the literal `nan`. The battery voltage keeps its fixed
//! 3 decimals.
//!
//! Two encoding strategies exist, chosen per deployment:
//!
//! - [`encode_fragmented`]: splits a batch over as many frames as needed so
//!   that no reading is ever lost. The produced frames partition the input;
//!   every frame fits within `max_payload` as long as every individual
//!   reading does.
//! - [`encode_delimited`]: produces exactly one frame and silently drops the
//!   tail of the batch on overflow. The number of dropped readings is
//!   reported so the caller can count truncation events.
//!
//! Neither encoder ever fails: overflow is part of the contract, not an
//! error.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::reading::{Reading, ReadingValue, SensorId, MAX_SUBVALUES};

/// Application payload budget for one frame (bytes), bounded by the regional
/// size limit at the pinned datarate.
pub const MAX_PAYLOAD: usize = 200;

/// Fixed capacity of the frame build buffer. Must exceed [`MAX_PAYLOAD`] by
/// at least the encoded size of one worst-case reading, so that a tentative
/// append can complete before the length check evicts it.
pub const FRAME_CAPACITY: usize = 256;

/// Upper bound on frames produced by one fragmented encode.
pub const MAX_FRAMES: usize = 16;

/// Upper bound on readings carried by one decoded frame.
pub const MAX_FRAME_READINGS: usize = 32;

/// Maximum length of the station and device identifiers.
pub const STATION_ID_LEN: usize = 16;

pub type StationId = String<STATION_ID_LEN>;

/// The fixed per-frame header.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub station_id: StationId,
    pub device_id: StationId,
    pub battery_volts: f32,
    pub timestamp: u32,
}

/// One encoded over-the-air application payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame(String<FRAME_CAPACITY>);

impl Frame {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which encoder a deployment uses. The two are never mixed at runtime.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(serde_repr::Deserialize_repr))]
#[repr(u8)]
pub enum PayloadStrategy {
    /// No-loss multi-frame encoding.
    Fragmented = 0,
    /// Single compact frame, tail dropped on overflow.
    Delimited = 1,
}

impl PayloadStrategy {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Fragmented),
            1 => Some(Self::Delimited),
            _ => None,
        }
    }
}

/// Result of a delimited encode. `dropped > 0` is the truncation event the
/// cycle report counts.
#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedOutcome {
    pub frame: Frame,
    /// Readings that made it into the frame.
    pub encoded: usize,
    /// Readings dropped from the tail of the batch.
    pub dropped: usize,
}

/// Append one value in stripped 3-decimal notation.
///
/// The scratch buffer fits the widest output the rounding step can produce
/// (a saturated magnitude of ~9.2e15 renders as 21 characters).
fn write_value(buf: &mut String<FRAME_CAPACITY>, value: f32) -> fmt::Result {
    if value.is_nan() {
        return buf.push_str("nan").map_err(|_| fmt::Error);
    }
    let mut tmp: String<24> = String::new();
    write!(tmp, "{:.3}", value)?;
    let trimmed = tmp.as_str().trim_end_matches('0').trim_end_matches('.');
    buf.push_str(trimmed).map_err(|_| fmt::Error)
}

fn write_header(buf: &mut String<FRAME_CAPACITY>, header: &FrameHeader) -> fmt::Result {
    write!(buf, "{}|{}|", header.station_id, header.device_id)?;
    if header.battery_volts.is_nan() {
        buf.push_str("nan").map_err(|_| fmt::Error)?;
    } else {
        write!(buf, "{:.3}", header.battery_volts)?;
    }
    write!(buf, "|{}", header.timestamp)
}

fn write_reading(buf: &mut String<FRAME_CAPACITY>, reading: &Reading) -> fmt::Result {
    write!(buf, "|{},{}", reading.sensor_id, reading.kind.code())?;
    match &reading.value {
        ReadingValue::Single(value) => {
            buf.push(',').map_err(|_| fmt::Error)?;
            write_value(buf, *value)
        }
        ReadingValue::Multi(sub_values) => {
            // Sub-value keys are not sent; their order carries the meaning.
            for sv in sub_values {
                buf.push(',').map_err(|_| fmt::Error)?;
                write_value(buf, sv.value)?;
            }
            Ok(())
        }
    }
}

/// Encode a batch into a single flat frame of at most `max_payload` bytes.
///
/// Readings are appended in order; the first reading that would push the
/// frame over the limit and everything after it are dropped and reported in
/// [`DelimitedOutcome::dropped`].
pub fn encode_delimited(header: &FrameHeader, readings: &[Reading], max_payload: usize) -> DelimitedOutcome {
    let mut buf: String<FRAME_CAPACITY> = String::new();
    write_header(&mut buf, header).ok();

    let mut encoded = 0;
    for reading in readings {
        let mark = buf.len();
        let fits = write_reading(&mut buf, reading).is_ok() && buf.len() <= max_payload;
        if !fits {
            buf.truncate(mark);
            break;
        }
        encoded += 1;
    }

    DelimitedOutcome {
        frame: Frame(buf),
        encoded,
        dropped: readings.len() - encoded,
    }
}

/// Encode a batch into as many frames as needed, each carrying the full
/// header, with no reading lost or duplicated.
///
/// After each tentative append the frame length is re-checked; a reading
/// that crosses `max_payload` is evicted, the current frame is finalized,
/// and the evicted reading opens the next frame. A reading too large for
/// even an empty frame is kept anyway (the partition guarantee wins over
/// the size guarantee, which only holds when every individual reading
/// fits). The output is deterministic for a fixed input.
///
/// An empty batch produces no frames.
pub fn encode_fragmented(header: &FrameHeader, readings: &[Reading], max_payload: usize) -> Vec<Frame, MAX_FRAMES> {
    let mut frames: Vec<Frame, MAX_FRAMES> = Vec::new();
    if readings.is_empty() {
        return frames;
    }

    let mut buf: String<FRAME_CAPACITY> = String::new();
    write_header(&mut buf, header).ok();
    let header_len = buf.len();
    let mut in_frame = 0usize;

    for reading in readings {
        let mark = buf.len();
        let fits = write_reading(&mut buf, reading).is_ok() && buf.len() <= max_payload;
        if fits {
            in_frame += 1;
            continue;
        }

        buf.truncate(mark);
        if in_frame > 0 {
            if frames.push(Frame(buf.clone())).is_err() {
                // Frame budget exhausted; stop rather than overwrite.
                return frames;
            }
            buf.truncate(header_len);
        }
        if write_reading(&mut buf, reading).is_err() {
            // Does not fit the build buffer at all; never emit a partial
            // fragment.
            buf.truncate(header_len);
            in_frame = 0;
            continue;
        }
        in_frame = 1;
    }

    if in_frame > 0 {
        frames.push(Frame(buf)).ok();
    }
    frames
}

/// Errors produced by [`decode_delimited`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A header field is missing or a field does not parse.
    Malformed,
    /// The frame carries more readings or longer fields than supported.
    Overflow,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed frame"),
            Self::Overflow => write!(f, "frame exceeds decoder limits"),
        }
    }
}

/// One reading as recovered from a frame. Sub-value keys are not on the
/// wire, so multi-value readings come back as a plain value list.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReading {
    pub sensor_id: SensorId,
    pub type_code: u8,
    pub values: Vec<f32, MAX_SUBVALUES>,
}

/// A fully decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub station_id: StationId,
    pub device_id: StationId,
    pub battery_volts: f32,
    pub timestamp: u32,
    pub readings: Vec<DecodedReading, MAX_FRAME_READINGS>,
}

/// Parse a delimited frame back into its parts. Used by the host tools and
/// by tests; the device itself never decodes its own uplinks.
pub fn decode_delimited(input: &str) -> Result<DecodedFrame, DecodeError> {
    let mut fields = input.split('|');

    let station_id = StationId::try_from(fields.next().ok_or(DecodeError::Malformed)?)
        .map_err(|_| DecodeError::Overflow)?;
    let device_id = StationId::try_from(fields.next().ok_or(DecodeError::Malformed)?)
        .map_err(|_| DecodeError::Overflow)?;
    let battery_volts: f32 = fields
        .next()
        .ok_or(DecodeError::Malformed)?
        .parse()
        .map_err(|_| DecodeError::Malformed)?;
    let timestamp: u32 = fields
        .next()
        .ok_or(DecodeError::Malformed)?
        .parse()
        .map_err(|_| DecodeError::Malformed)?;

    let mut readings: Vec<DecodedReading, MAX_FRAME_READINGS> = Vec::new();
    for field in fields {
        let mut parts = field.split(',');
        let sensor_id = SensorId::try_from(parts.next().ok_or(DecodeError::Malformed)?)
            .map_err(|_| DecodeError::Overflow)?;
        let type_code: u8 = parts
            .next()
            .ok_or(DecodeError::Malformed)?
            .parse()
            .map_err(|_| DecodeError::Malformed)?;
        let mut values: Vec<f32, MAX_SUBVALUES> = Vec::new();
        for part in parts {
            let value: f32 = part.parse().map_err(|_| DecodeError::Malformed)?;
            values.push(value).map_err(|_| DecodeError::Overflow)?;
        }
        readings
            .push(DecodedReading {
                sensor_id,
                type_code,
                values,
            })
            .map_err(|_| DecodeError::Overflow)?;
    }

    Ok(DecodedFrame {
        station_id,
        device_id,
        battery_volts,
        timestamp,
        readings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::{Reading, SensorKind, SubValue};

    use rstest::rstest;

    fn header() -> FrameHeader {
        FrameHeader {
            station_id: StationId::try_from("ST001").unwrap(),
            device_id: StationId::try_from("DEV01").unwrap(),
            battery_volts: 3.7,
            timestamp: 1_700_000_000,
        }
    }

    fn rtd_reading() -> Reading {
        Reading::single(
            SensorId::try_from("RTD1").unwrap(),
            SensorKind::Rtd,
            23.456,
        )
    }

    fn sht30_reading() -> Reading {
        let mut subs = heapless::Vec::new();
        subs.push(SubValue {
            key: crate::reading::SubValueKey::try_from("T").unwrap(),
            value: 21.1,
        })
        .unwrap();
        subs.push(SubValue {
            key: crate::reading::SubValueKey::try_from("H").unwrap(),
            value: 55.0,
        })
        .unwrap();
        Reading::multi(SensorId::try_from("SHT30_1").unwrap(), SensorKind::Sht30, subs)
    }

    fn sensor_id(s: &str) -> SensorId {
        SensorId::try_from(s).unwrap()
    }

    #[rstest]
    #[case(23.456, "23.456")]
    #[case(21.1, "21.1")]
    #[case(55.0, "55")]
    #[case(0.0, "0")]
    #[case(1000.0, "1000")]
    #[case(f32::NAN, "nan")]
    fn test_value_formatting(#[case] value: f32, #[case] expected: &str) {
        let mut buf: String<FRAME_CAPACITY> = String::new();
        write_value(&mut buf, value).unwrap();
        assert_eq!(buf.as_str(), expected);
    }

    /// Reference frame from the backend's decoding documentation: both
    /// readings fit in one delimited frame, the RTD sits in a DS18B20-class
    /// slot (type code 4).
    #[test]
    fn test_delimited_reference_frame() {
        let readings = [
            Reading::single(sensor_id("RTD1"), SensorKind::Ds18b20, 23.456),
            sht30_reading(),
        ];
        let outcome = encode_delimited(&header(), &readings, 200);
        assert_eq!(
            outcome.frame.as_str(),
            "ST001|DEV01|3.700|1700000000|RTD1,4,23.456|SHT30_1,9,21.1,55"
        );
        assert_eq!(outcome.encoded, 2);
        assert_eq!(outcome.dropped, 0);
    }

    #[test]
    fn test_delimited_truncates_tail_and_reports_it() {
        let readings = [rtd_reading(), sht30_reading()];
        // Header is 28 bytes, the RTD reading 14 more: limit 42 holds
        // exactly one reading.
        let outcome = encode_delimited(&header(), &readings, 42);
        assert_eq!(outcome.frame.as_str(), "ST001|DEV01|3.700|1700000000|RTD1,3,23.456");
        assert_eq!(outcome.encoded, 1);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_delimited_nan_distinct_from_zero() {
        let failed = [Reading::failed(sensor_id("PH1"), SensorKind::Ph)];
        let zero = [Reading::single(sensor_id("PH1"), SensorKind::Ph, 0.0)];
        let failed_frame = encode_delimited(&header(), &failed, 200);
        let zero_frame = encode_delimited(&header(), &zero, 200);
        assert!(failed_frame.frame.as_str().ends_with("|PH1,5,nan"));
        assert!(zero_frame.frame.as_str().ends_with("|PH1,5,0"));
        assert_ne!(failed_frame.frame, zero_frame.frame);
    }

    #[test]
    fn test_fragmented_single_frame_when_batch_fits() {
        let readings = [rtd_reading(), sht30_reading()];
        let frames = encode_fragmented(&header(), &readings, 200);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].as_str(),
            "ST001|DEV01|3.700|1700000000|RTD1,3,23.456|SHT30_1,9,21.1,55"
        );
    }

    #[test]
    fn test_fragmented_splits_at_limit() {
        let readings = [rtd_reading(), sht30_reading()];
        let frames = encode_fragmented(&header(), &readings, 40);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_str(), "ST001|DEV01|3.700|1700000000|RTD1,3,23.456");
        assert_eq!(frames[1].as_str(), "ST001|DEV01|3.700|1700000000|SHT30_1,9,21.1,55");
    }

    #[test]
    fn test_fragmented_partitions_input() {
        let mut readings: std::vec::Vec<Reading> = std::vec::Vec::new();
        for i in 0u8..10 {
            let mut id = std::string::String::from("NTC");
            id.push(char::from(b'0' + i));
            readings.push(Reading::single(
                sensor_id(&id),
                SensorKind::Ntc10k,
                20.0 + f32::from(i),
            ));
        }

        let frames = encode_fragmented(&header(), &readings, 60);
        assert!(frames.len() > 1);
        for frame in &frames {
            assert!(frame.len() <= 60, "frame too long: {}", frame.as_str());
        }

        // Every reading appears exactly once, in order.
        let mut recovered: std::vec::Vec<std::string::String> = std::vec::Vec::new();
        for frame in &frames {
            let decoded = decode_delimited(frame.as_str()).unwrap();
            for r in &decoded.readings {
                recovered.push(r.sensor_id.as_str().into());
            }
        }
        let expected: std::vec::Vec<std::string::String> = readings
            .iter()
            .map(|r| r.sensor_id.as_str().into())
            .collect();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_fragmented_keeps_a_reading_too_large_for_any_frame() {
        let readings = [rtd_reading(), sht30_reading()];
        // Limit below even the bare header: each reading still comes out,
        // one oversized frame each.
        let frames = encode_fragmented(&header(), &readings, 20);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_str(), "ST001|DEV01|3.700|1700000000|RTD1,3,23.456");
        assert_eq!(frames[1].as_str(), "ST001|DEV01|3.700|1700000000|SHT30_1,9,21.1,55");
    }

    #[test]
    fn test_huge_value_does_not_corrupt_the_frame() {
        let readings = [Reading::single(
            sensor_id("CND1"),
            SensorKind::Conductivity,
            1.0e15,
        )];

        let outcome = encode_delimited(&header(), &readings, 200);
        let decoded = decode_delimited(outcome.frame.as_str()).unwrap();
        assert_eq!(outcome.encoded, 1);
        assert_eq!(decoded.readings.len(), 1);
        assert!((decoded.readings[0].values[0] - 1.0e15).abs() < 1.0e9);

        // The fragmented reopen path renders the same value intact.
        let frames = encode_fragmented(&header(), &[rtd_reading(), readings[0].clone()], 42);
        assert_eq!(frames.len(), 2);
        let decoded = decode_delimited(frames[1].as_str()).unwrap();
        assert!((decoded.readings[0].values[0] - 1.0e15).abs() < 1.0e9);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let readings = [rtd_reading(), sht30_reading()];
        let first = encode_fragmented(&header(), &readings, 40);
        let second = encode_fragmented(&header(), &readings, 40);
        assert_eq!(first, second);

        let a = encode_delimited(&header(), &readings, 200);
        let b = encode_delimited(&header(), &readings, 200);
        assert_eq!(a.frame, b.frame);
    }

    #[test]
    fn test_fragmented_empty_batch_produces_no_frames() {
        let frames = encode_fragmented(&header(), &[], 200);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_decode_reference_frame() {
        let decoded =
            decode_delimited("ST001|DEV01|3.700|1700000000|RTD1,4,23.456|SHT30_1,9,21.1,55").unwrap();
        assert_eq!(decoded.station_id.as_str(), "ST001");
        assert_eq!(decoded.device_id.as_str(), "DEV01");
        assert!((decoded.battery_volts - 3.7).abs() < 1e-6);
        assert_eq!(decoded.timestamp, 1_700_000_000);
        assert_eq!(decoded.readings.len(), 2);
        assert_eq!(decoded.readings[0].sensor_id.as_str(), "RTD1");
        assert_eq!(decoded.readings[0].type_code, 4);
        assert_eq!(decoded.readings[1].values.len(), 2);
        assert!((decoded.readings[1].values[1] - 55.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_delimited("ST001|DEV01"), Err(DecodeError::Malformed));
        assert_eq!(
            decode_delimited("ST001|DEV01|x.y|1700000000"),
            Err(DecodeError::Malformed)
        );
    }

    #[test]
    fn test_decode_nan_value() {
        let decoded = decode_delimited("ST001|DEV01|3.700|1700000000|PH1,5,nan").unwrap();
        assert!(decoded.readings[0].values[0].is_nan());
    }
}
