//! Raw register decoding
//!
//! Pure conversion from a raw transport read plus a declared data type into
//! a typed value: native word codecs, the packed base-10000 (M10K) forms,
//! bit expansion of boolean-typed whole registers, and scaling. Device
//! exceptions and zero scaling factors surface as tagged decode errors; an
//! unmapped type/raw combination is a soft miss producing no value.

use crate::config::DataType;
use crate::error::{ArgusError, Result};
use crate::registry::{Value, ValueKind};

use super::locator::RegisterEncoding;

/// Bits in one Modbus register
pub(crate) const BITS_IN_REGISTER: usize = 16;

/// Raw result of one transport read
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Device-reported protocol exception, carried per point in batch mode
    Exception(String),
}

/// Decode failure attributable to the device or the point configuration
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("device exception: {0}")]
    Device(String),
    #[error("scaling factor must be nonzero")]
    ZeroScaling,
}

impl RegisterEncoding {
    /// Decode raw register words into a transport-level value
    pub fn decode_words(&self, words: &[u16]) -> Result<RawValue> {
        let need = self.register_count(words.len() as u16) as usize;
        if words.len() < need {
            return Err(ArgusError::modbus(format!(
                "Insufficient registers for {:?}: got {}",
                self,
                words.len()
            )));
        }

        let value = match self {
            RegisterEncoding::Binary => RawValue::Bool(words[0] & 1 == 1),
            RegisterEncoding::Int8 => RawValue::Number((words[0] as u8 as i8) as f64),
            RegisterEncoding::Uint8 => RawValue::Number((words[0] as u8) as f64),
            RegisterEncoding::Int16 => RawValue::Number((words[0] as i16) as f64),
            RegisterEncoding::Uint16 => RawValue::Number(words[0] as f64),
            RegisterEncoding::Int32 => {
                let bits = ((words[0] as u32) << 16) | (words[1] as u32);
                RawValue::Number((bits as i32) as f64)
            }
            RegisterEncoding::Uint32 => {
                let bits = ((words[0] as u32) << 16) | (words[1] as u32);
                RawValue::Number(bits as f64)
            }
            RegisterEncoding::Float32 => {
                let bits = ((words[0] as u32) << 16) | (words[1] as u32);
                RawValue::Number(f32::from_bits(bits) as f64)
            }
            RegisterEncoding::CharString => RawValue::Text(decode_string(words)?),
        };
        Ok(value)
    }
}

/// Decode a string from registers, high byte first, trimming NULs and
/// surrounding whitespace
pub fn decode_string(registers: &[u16]) -> Result<String> {
    let mut bytes = Vec::with_capacity(registers.len() * 2);

    for &reg in registers {
        bytes.push((reg >> 8) as u8);
        bytes.push((reg & 0xFF) as u8);
    }

    let string = String::from_utf8(bytes)
        .map_err(|e| ArgusError::modbus(format!("Invalid UTF-8 string: {}", e)))?;

    Ok(string.trim_matches('\0').trim().to_string())
}

fn is_bit_set(num: i64, bit: usize) -> bool {
    ((num >> bit) & 1) == 1
}

/// Split a 32-bit register pair into two signed base-10000 digit groups
pub(crate) fn parse_int_modulo_10k(register_contents: i32, swap: bool) -> i32 {
    let high_register = (register_contents >> BITS_IN_REGISTER) as i16;
    let low_register = register_contents as i16;
    if swap {
        (low_register as i32) * 10000 + high_register as i32
    } else {
        (high_register as i32) * 10000 + low_register as i32
    }
}

/// Unsigned variant; the sum is combined in 64 bits so two 16-bit*10000
/// terms cannot overflow
pub(crate) fn parse_uint_modulo_10k(register_contents: u32, swap: bool) -> u64 {
    let high_register = (register_contents >> BITS_IN_REGISTER) as u16 as u64;
    let low_register = (register_contents & 0xffff) as u64;
    if swap {
        low_register * 10000 + high_register
    } else {
        high_register * 10000 + low_register
    }
}

/// Decode a raw transport read into a typed value.
///
/// Returns `Ok(None)` when the type/raw combination has no decoding rule:
/// a soft miss, possibly an intentionally unconfigured point.
pub fn decode(
    data_type: DataType,
    scaling: f64,
    scaling_offset: f64,
    raw: RawValue,
) -> std::result::Result<Option<Value>, DecodeError> {
    if let RawValue::Exception(message) = &raw {
        return Err(DecodeError::Device(message.clone()));
    }

    if RegisterEncoding::for_data_type(data_type).is_some() {
        return match (data_type, raw) {
            (DataType::Boolean, RawValue::Bool(b)) => Ok(Some(Value::Bool(b))),
            (DataType::Boolean, RawValue::Number(n)) => {
                let word = n as i64;
                let bits = (0..BITS_IN_REGISTER)
                    .map(|i| is_bit_set(word, i))
                    .collect();
                Ok(Some(Value::Bits(bits)))
            }
            (dt, RawValue::Text(s)) if dt.is_string() => Ok(Some(Value::Text(s))),
            (_, RawValue::Number(n)) => {
                if scaling == 0.0 {
                    return Err(DecodeError::ZeroScaling);
                }
                Ok(Some(Value::Number(n / scaling + scaling_offset)))
            }
            _ => Ok(None),
        };
    }

    match (data_type, raw) {
        (DataType::Int32M10k | DataType::Int32M10kSwap, RawValue::Number(n)) => {
            if scaling == 0.0 {
                return Err(DecodeError::ZeroScaling);
            }
            let register_contents = n as i32;
            let swap = data_type == DataType::Int32M10kSwap;
            let num = parse_int_modulo_10k(register_contents, swap);
            Ok(Some(Value::Number(num as f64 / scaling + scaling_offset)))
        }
        (DataType::Uint32M10k | DataType::Uint32M10kSwap, RawValue::Number(n)) => {
            if scaling == 0.0 {
                return Err(DecodeError::ZeroScaling);
            }
            let register_contents = (n as i32) as u32;
            let swap = data_type == DataType::Uint32M10kSwap;
            let num = parse_uint_modulo_10k(register_contents, swap);
            Ok(Some(Value::Number(num as f64 / scaling + scaling_offset)))
        }
        _ => Ok(None),
    }
}

/// Type-appropriate zero substituted on failed polls
pub(crate) fn fallback_zero(kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::Number => Some(Value::Number(0.0)),
        ValueKind::Bool => Some(Value::Bool(false)),
        ValueKind::Text | ValueKind::Bits => None,
    }
}

/// Registry kind a point starts out with, before its first decode
pub(crate) fn default_kind(data_type: DataType) -> ValueKind {
    match data_type {
        DataType::Boolean => ValueKind::Bool,
        DataType::CharString => ValueKind::Text,
        _ => ValueKind::Number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(high: i16, low: i16) -> f64 {
        let bits = ((high as u16 as u32) << 16) | (low as u16 as u32);
        (bits as i32) as f64
    }

    #[test]
    fn int32_m10k_round_trip_over_corners() {
        for &(high, low) in &[
            (0i16, 0i16),
            (1, 2345),
            (-1, 9999),
            (i16::MIN, i16::MIN),
            (i16::MAX, i16::MAX),
            (i16::MIN, i16::MAX),
            (1234, -4321),
        ] {
            let decoded = decode(DataType::Int32M10k, 1.0, 0.0, RawValue::Number(pack(high, low)))
                .unwrap()
                .unwrap();
            assert_eq!(
                decoded,
                Value::Number((high as i32 * 10000 + low as i32) as f64),
                "high={} low={}",
                high,
                low
            );
        }
    }

    #[test]
    fn int32_m10k_swap_reverses_halves() {
        let decoded = decode(
            DataType::Int32M10kSwap,
            1.0,
            0.0,
            RawValue::Number(pack(7, 42)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(decoded, Value::Number((42 * 10000 + 7) as f64));
    }

    #[test]
    fn uint32_m10k_swap_never_negative_or_overflowed() {
        for &(high, low) in &[
            (0u16, 0u16),
            (u16::MAX, u16::MAX),
            (u16::MAX, 0),
            (0, u16::MAX),
            (40000, 40000),
        ] {
            let bits = ((high as u32) << 16) | (low as u32);
            let raw = RawValue::Number((bits as i32) as f64);
            let decoded = decode(DataType::Uint32M10kSwap, 1.0, 0.0, raw).unwrap().unwrap();
            let expected = (low as u64) * 10000 + high as u64;
            assert_eq!(decoded, Value::Number(expected as f64));
            if let Value::Number(n) = decoded {
                assert!(n >= 0.0);
            }
        }
    }

    #[test]
    fn boolean_from_numeric_expands_bits_little_end_first() {
        let decoded = decode(DataType::Boolean, 1.0, 0.0, RawValue::Number(0b1010 as f64))
            .unwrap()
            .unwrap();
        let mut expected = vec![false; BITS_IN_REGISTER];
        expected[1] = true;
        expected[3] = true;
        assert_eq!(decoded, Value::Bits(expected));
    }

    #[test]
    fn boolean_from_bool_passes_through() {
        let decoded = decode(DataType::Boolean, 1.0, 0.0, RawValue::Bool(true))
            .unwrap()
            .unwrap();
        assert_eq!(decoded, Value::Bool(true));
    }

    #[test]
    fn numeric_applies_scaling_and_offset() {
        let decoded = decode(DataType::Int16, 10.0, -5.0, RawValue::Number(250.0))
            .unwrap()
            .unwrap();
        assert_eq!(decoded, Value::Number(20.0));
    }

    #[test]
    fn zero_scaling_is_a_configuration_error() {
        let err = decode(DataType::Uint16, 0.0, 0.0, RawValue::Number(1.0)).unwrap_err();
        assert!(matches!(err, DecodeError::ZeroScaling));
        let err = decode(DataType::Int32M10k, 0.0, 0.0, RawValue::Number(1.0)).unwrap_err();
        assert!(matches!(err, DecodeError::ZeroScaling));
    }

    #[test]
    fn device_exception_is_tagged() {
        let err = decode(
            DataType::Int16,
            1.0,
            0.0,
            RawValue::Exception("IllegalDataAddress".to_string()),
        )
        .unwrap_err();
        match err {
            DecodeError::Device(msg) => assert_eq!(msg, "IllegalDataAddress"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn unmapped_combination_is_a_soft_miss() {
        assert_eq!(
            decode(DataType::Int16, 1.0, 0.0, RawValue::Text("x".into())).unwrap(),
            None
        );
        assert_eq!(
            decode(DataType::Int32M10k, 1.0, 0.0, RawValue::Bool(true)).unwrap(),
            None
        );
    }

    #[test]
    fn string_passes_through() {
        let decoded = decode(
            DataType::CharString,
            1.0,
            0.0,
            RawValue::Text("pump A".into()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(decoded, Value::Text("pump A".into()));
    }

    #[test]
    fn word_codecs_decode_expected_values() {
        assert_eq!(
            RegisterEncoding::Int16.decode_words(&[0xFFFF]).unwrap(),
            RawValue::Number(-1.0)
        );
        assert_eq!(
            RegisterEncoding::Uint16.decode_words(&[0xFFFF]).unwrap(),
            RawValue::Number(65535.0)
        );
        assert_eq!(
            RegisterEncoding::Int8.decode_words(&[0x00FF]).unwrap(),
            RawValue::Number(-1.0)
        );
        assert_eq!(
            RegisterEncoding::Uint8.decode_words(&[0x00FF]).unwrap(),
            RawValue::Number(255.0)
        );
        assert_eq!(
            RegisterEncoding::Int32
                .decode_words(&[0xFFFF, 0xFFFE])
                .unwrap(),
            RawValue::Number(-2.0)
        );
        assert_eq!(
            RegisterEncoding::Uint32
                .decode_words(&[0x0001, 0x0000])
                .unwrap(),
            RawValue::Number(65536.0)
        );
        // 1.0f32 in IEEE 754 big-endian register order
        assert_eq!(
            RegisterEncoding::Float32
                .decode_words(&[0x3F80, 0x0000])
                .unwrap(),
            RawValue::Number(1.0)
        );
        assert_eq!(
            RegisterEncoding::CharString
                .decode_words(&[0x4142, 0x4300])
                .unwrap(),
            RawValue::Text("ABC".to_string())
        );
    }

    #[test]
    fn short_word_slices_error() {
        assert!(RegisterEncoding::Int32.decode_words(&[0x0001]).is_err());
        assert!(RegisterEncoding::Int16.decode_words(&[]).is_err());
    }

    #[test]
    fn fallback_zero_by_kind() {
        assert_eq!(fallback_zero(ValueKind::Number), Some(Value::Number(0.0)));
        assert_eq!(fallback_zero(ValueKind::Bool), Some(Value::Bool(false)));
        assert_eq!(fallback_zero(ValueKind::Text), None);
        assert_eq!(fallback_zero(ValueKind::Bits), None);
    }

    #[test]
    fn default_kind_follows_data_type() {
        assert_eq!(default_kind(DataType::Boolean), ValueKind::Bool);
        assert_eq!(default_kind(DataType::CharString), ValueKind::Text);
        assert_eq!(default_kind(DataType::Uint32M10k), ValueKind::Number);
    }
}
