//! Typed event arguments and their wire marshaling.
//!
//! The variants mirror [crate::descriptor::FieldType]. The emission path
//! serializes arguments in the order given, which must match the field order
//! declared in the event's metadata; that agreement is a caller contract and
//! is not checked at runtime.

/// One event argument.
#[derive(Clone, Copy, Debug)]
pub enum EventValue<'a> {
    /// UTF-16 code units, no terminator; one is appended on the wire.
    UnicodeStr(&'a [u16]),
    /// Narrow string, NUL-terminated on the wire.
    AnsiStr(&'a str),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Bool32(bool),
    HexInt32(u32),
    HexInt64(u64),
    /// Rendered as a fixed-width hex integer at the platform's address width.
    Pointer(usize),
}

impl EventValue<'_> {
    pub(crate) fn marshal_into(&self, buf: &mut Vec<u8>) {
        match *self {
            EventValue::UnicodeStr(units) => {
                for unit in units {
                    buf.extend_from_slice(&unit.to_le_bytes());
                }
                buf.extend_from_slice(&0u16.to_le_bytes());
            }
            EventValue::AnsiStr(s) => {
                buf.extend_from_slice(s.as_bytes());
                buf.push(0);
            }
            EventValue::Int8(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::UInt8(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Int16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::UInt16(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::UInt32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::UInt64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Bool32(v) => buf.extend_from_slice(&(v as u32).to_le_bytes()),
            EventValue::HexInt32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::HexInt64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            EventValue::Pointer(v) => buf.extend_from_slice(&v.to_le_bytes()),
        }
    }
}
