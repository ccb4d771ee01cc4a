//! Property-style sweeps over the register decoder's public surface

use argus::config::DataType;
use argus::poller::decode::{RawValue, decode};
use argus::registry::Value;

fn pack_signed(high: i16, low: i16) -> f64 {
    let bits = ((high as u16 as u32) << 16) | (low as u16 as u32);
    (bits as i32) as f64
}

fn pack_unsigned(high: u16, low: u16) -> f64 {
    let bits = ((high as u32) << 16) | (low as u32);
    (bits as i32) as f64
}

#[test]
fn int32_m10k_matches_arithmetic_over_a_signed_sweep() {
    for high in (-32768i32..=32767).step_by(4096) {
        for low in (-32768i32..=32767).step_by(4096) {
            let raw = RawValue::Number(pack_signed(high as i16, low as i16));
            let decoded = decode(DataType::Int32M10k, 1.0, 0.0, raw).unwrap().unwrap();
            assert_eq!(
                decoded,
                Value::Number((high * 10000 + low) as f64),
                "high={} low={}",
                high,
                low
            );
        }
    }
}

#[test]
fn int32_m10k_swap_matches_arithmetic_over_a_signed_sweep() {
    for high in (-32768i32..=32767).step_by(8191) {
        for low in (-32768i32..=32767).step_by(8191) {
            let raw = RawValue::Number(pack_signed(high as i16, low as i16));
            let decoded = decode(DataType::Int32M10kSwap, 1.0, 0.0, raw)
                .unwrap()
                .unwrap();
            assert_eq!(decoded, Value::Number((low * 10000 + high) as f64));
        }
    }
}

#[test]
fn uint32_m10k_never_negative_over_an_unsigned_sweep() {
    for high in (0u32..=65535).step_by(5000) {
        for low in (0u32..=65535).step_by(5000) {
            for swap in [false, true] {
                let data_type = if swap {
                    DataType::Uint32M10kSwap
                } else {
                    DataType::Uint32M10k
                };
                let raw = RawValue::Number(pack_unsigned(high as u16, low as u16));
                let decoded = decode(data_type, 1.0, 0.0, raw).unwrap().unwrap();
                let expected = if swap {
                    low as u64 * 10000 + high as u64
                } else {
                    high as u64 * 10000 + low as u64
                };
                match decoded {
                    Value::Number(n) => {
                        assert!(n >= 0.0);
                        assert_eq!(n, expected as f64);
                    }
                    other => panic!("unexpected value: {:?}", other),
                }
            }
        }
    }
}

#[test]
fn bit_expansion_covers_every_bit_position() {
    for bit in 0..16usize {
        let raw = RawValue::Number((1u32 << bit) as f64);
        let decoded = decode(DataType::Boolean, 1.0, 0.0, raw).unwrap().unwrap();
        match decoded {
            Value::Bits(bits) => {
                assert_eq!(bits.len(), 16);
                for (i, b) in bits.iter().enumerate() {
                    assert_eq!(*b, i == bit, "bit {} of 1<<{}", i, bit);
                }
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }
}

#[test]
fn scaling_divides_and_offset_adds() {
    let decoded = decode(DataType::Uint16, 100.0, 3.0, RawValue::Number(250.0))
        .unwrap()
        .unwrap();
    assert_eq!(decoded, Value::Number(5.5));

    // Scaling applies to the packed forms too
    let raw = RawValue::Number(pack_signed(1, 2345));
    let decoded = decode(DataType::Int32M10k, 10.0, 0.0, raw).unwrap().unwrap();
    assert_eq!(decoded, Value::Number(1234.5));
}
