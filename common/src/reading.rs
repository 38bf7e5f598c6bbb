//! Sensor readings as produced by the acquisition layer.
//!
//! A failed read is represented as a NaN value, never as a silent zero, so
//! that the backend can tell "sensor broken" apart from "measured 0.0".

use heapless::{String, Vec};

/// Maximum length of a sensor identifier (e.g. `SHT30_1`).
pub const SENSOR_ID_LEN: usize = 20;
/// Maximum length of a sub-value key (e.g. `T`, `H`).
pub const SUBVALUE_KEY_LEN: usize = 10;
/// Maximum number of sub-values a single sensor can report.
pub const MAX_SUBVALUES: usize = 8;

pub type SensorId = String<SENSOR_ID_LEN>;
pub type SubValueKey = String<SUBVALUE_KEY_LEN>;

/// Wire type codes for Modbus sensors are offset by this amount so that the
/// backend can distinguish them from the directly attached sensor kinds.
pub const MODBUS_CODE_OFFSET: u8 = 100;

/// Sensor kinds known to the station.
///
/// The discriminants are the wire type codes; they must stay stable because
/// the backend keys its decoding tables on them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorKind {
    /// NTC thermistor, 100 kΩ
    Ntc100k = 0,
    /// NTC thermistor, 10 kΩ
    Ntc10k = 1,
    /// Water NTC thermistor, 10 kΩ
    WaterNtc10k = 2,
    /// PT100 RTD
    Rtd = 3,
    /// DS18B20 one-wire temperature probe
    Ds18b20 = 4,
    /// pH probe
    Ph = 5,
    /// Conductivity probe
    Conductivity = 6,
    /// Condensation humidity
    CondensationHumidity = 7,
    /// Soil humidity
    SoilHumidity = 8,
    /// SHT30 combined temperature/humidity (reports T and H sub-values)
    Sht30 = 9,
    /// Modbus environmental multi-sensor (T, H, noise, PM, ...)
    EnvModbus = MODBUS_CODE_OFFSET,
}

impl SensorKind {
    /// The numeric type code used on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// One named component of a multi-value reading.
#[derive(Debug, Clone, PartialEq)]
pub struct SubValue {
    pub key: SubValueKey,
    pub value: f32,
}

/// The measured value(s) of one reading.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingValue {
    /// A sensor reporting a single quantity.
    Single(f32),
    /// A sensor reporting several quantities in a fixed order.
    Multi(Vec<SubValue, MAX_SUBVALUES>),
}

/// One sensor reading, ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub kind: SensorKind,
    pub value: ReadingValue,
}

impl Reading {
    /// A single-value reading, rounded to the codec's 3-decimal precision.
    pub fn single(sensor_id: SensorId, kind: SensorKind, value: f32) -> Self {
        Self {
            sensor_id,
            kind,
            value: ReadingValue::Single(round3(value)),
        }
    }

    /// A multi-value reading; every sub-value is rounded to 3 decimals.
    pub fn multi(sensor_id: SensorId, kind: SensorKind, mut sub_values: Vec<SubValue, MAX_SUBVALUES>) -> Self {
        for sv in sub_values.iter_mut() {
            sv.value = round3(sv.value);
        }
        Self {
            sensor_id,
            kind,
            value: ReadingValue::Multi(sub_values),
        }
    }

    /// The representation of a failed read: a single NaN value.
    pub fn failed(sensor_id: SensorId, kind: SensorKind) -> Self {
        Self {
            sensor_id,
            kind,
            value: ReadingValue::Single(f32::NAN),
        }
    }

    /// Whether this reading carries no valid value at all.
    pub fn is_failed(&self) -> bool {
        match &self.value {
            ReadingValue::Single(v) => v.is_nan(),
            ReadingValue::Multi(subs) => subs.iter().all(|sv| sv.value.is_nan()),
        }
    }
}

/// Round to 3 decimal places, half away from zero.
///
/// Implemented with integer casts because `f32::round` is not available in
/// `core`. NaN passes through unchanged.
pub fn round3(value: f32) -> f32 {
    if value.is_nan() || value.is_infinite() {
        return value;
    }
    let scaled = value * 1000.0;
    let rounded = if scaled >= 0.0 {
        (scaled + 0.5) as i64
    } else {
        (scaled - 0.5) as i64
    };
    rounded as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case(23.4564, 23.456)]
    #[case(23.4567, 23.457)]
    #[case(-1.2345, -1.234)]
    #[case(-1.2346, -1.235)]
    #[case(0.0, 0.0)]
    #[case(55.0, 55.0)]
    fn test_round3(#[case] input: f32, #[case] expected: f32) {
        assert!((round3(input) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_round3_nan_passthrough() {
        assert!(round3(f32::NAN).is_nan());
    }

    #[test]
    fn test_failed_reading_is_nan_not_zero() {
        let reading = Reading::failed(SensorId::try_from("RTD1").unwrap(), SensorKind::Rtd);
        assert!(reading.is_failed());
        match reading.value {
            ReadingValue::Single(v) => assert!(v.is_nan()),
            _ => panic!("failed reading must be a single NaN"),
        }
    }

    #[test]
    fn test_kind_codes_stable() {
        assert_eq!(SensorKind::Rtd.code(), 3);
        assert_eq!(SensorKind::Ds18b20.code(), 4);
        assert_eq!(SensorKind::Sht30.code(), 9);
        assert_eq!(SensorKind::EnvModbus.code(), 100);
    }
}
