#![no_main]
use libfuzzer_sys::fuzz_target;

use argus::config::DataType;
use argus::poller::decode::{RawValue, decode, decode_string};
use argus::poller::locator::RegisterEncoding;

fuzz_target!(|data: &[u8]| {
    // Interpret the input as u16 register stream in big-endian pairs
    let mut regs = Vec::new();
    let mut it = data.chunks_exact(2);
    for b in &mut it {
        regs.push(u16::from_be_bytes([b[0], b[1]]));
    }

    // Exercise the word codecs under varying lengths
    for encoding in [
        RegisterEncoding::Int8,
        RegisterEncoding::Uint8,
        RegisterEncoding::Int16,
        RegisterEncoding::Uint16,
        RegisterEncoding::Int32,
        RegisterEncoding::Uint32,
        RegisterEncoding::Float32,
        RegisterEncoding::CharString,
    ] {
        let _ = encoding.decode_words(&regs);
    }
    let _ = decode_string(&regs);

    // And the packed decode paths on the first register pair
    if regs.len() >= 2 {
        let bits = ((regs[0] as u32) << 16) | regs[1] as u32;
        let raw = (bits as i32) as f64;
        for data_type in [
            DataType::Int32M10k,
            DataType::Int32M10kSwap,
            DataType::Uint32M10k,
            DataType::Uint32M10kSwap,
            DataType::Boolean,
        ] {
            let _ = decode(data_type, 1.0, 0.0, RawValue::Number(raw));
        }
    }
});
