//! Point-to-register locator mapping
//!
//! Translates a point's declared address/type metadata into the transport
//! read descriptor the executor issues. Pure mapping; a point without a
//! configured offset has no locator and never reaches the transport.

use crate::config::{DataType, PointConfig, PointType};

/// Word-level codec a read is issued and decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterEncoding {
    /// Native bit read, or a bit extracted from one register
    Binary,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    CharString,
}

impl RegisterEncoding {
    /// Native transport encoding for a declared data type.
    ///
    /// The M10K family has no native mapping and returns None; the locator
    /// falls back to a 4-byte signed read whose contents the decoder splits.
    pub fn for_data_type(data_type: DataType) -> Option<Self> {
        match data_type {
            DataType::Boolean => Some(RegisterEncoding::Binary),
            DataType::Int8 => Some(RegisterEncoding::Int8),
            DataType::Uint8 => Some(RegisterEncoding::Uint8),
            DataType::Int16 => Some(RegisterEncoding::Int16),
            DataType::Uint16 => Some(RegisterEncoding::Uint16),
            DataType::Int32 => Some(RegisterEncoding::Int32),
            DataType::Uint32 => Some(RegisterEncoding::Uint32),
            DataType::Float32 => Some(RegisterEncoding::Float32),
            DataType::CharString => Some(RegisterEncoding::CharString),
            DataType::Int32M10k
            | DataType::Int32M10kSwap
            | DataType::Uint32M10k
            | DataType::Uint32M10kSwap => None,
        }
    }

    /// Registers one value of this encoding occupies
    pub fn register_count(&self, number_of_registers: u16) -> u16 {
        match self {
            RegisterEncoding::Binary
            | RegisterEncoding::Int8
            | RegisterEncoding::Uint8
            | RegisterEncoding::Int16
            | RegisterEncoding::Uint16 => 1,
            RegisterEncoding::Int32 | RegisterEncoding::Uint32 | RegisterEncoding::Float32 => 2,
            RegisterEncoding::CharString => number_of_registers.max(1),
        }
    }
}

/// Transport-level read descriptor for one point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Read range
    pub range: PointType,
    /// Register offset
    pub offset: u16,
    /// Registers covered by the read (1 for bit ranges)
    pub count: u16,
    /// Word-level codec
    pub encoding: RegisterEncoding,
    /// Bit extracted from the register, for bit-in-word points
    pub bit: Option<u8>,
}

/// Build the read descriptor for a point, or None when the point lacks a
/// configured offset.
pub fn build_locator(point: &PointConfig) -> Option<Locator> {
    let offset = point.offset?;

    let mut encoding =
        RegisterEncoding::for_data_type(point.data_type).unwrap_or(RegisterEncoding::Int32);

    // A boolean point on a word range without a bit index reads the whole
    // register as a signed 16-bit value; the decoder expands it to bits.
    if point.data_type == DataType::Boolean
        && !point.point_type.is_bit_range()
        && point.bit.is_none()
    {
        encoding = RegisterEncoding::Int16;
    }

    let count = if point.point_type.is_bit_range() {
        1
    } else {
        encoding.register_count(point.number_of_registers)
    };

    Some(Locator {
        range: point.point_type,
        offset,
        count,
        encoding,
        bit: point.bit,
    })
}
