//! Event identity and self-describing metadata.
//!
//! Every event kind is described by two immutable pieces of data, both built
//! once per kind and reused for every emission:
//!
//! - an [EventDescriptor], the identity ETW filters on (id, level, opcode,
//!   task, keyword);
//! - an [EventMetadata] blob, the TraceLogging ("manifest-free") description
//!   of the payload schema that lets tools decode the event without a
//!   registered manifest.

/// A provider or group identifier. Redefined here so the public surface does
/// not depend on any OS header type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }
}

// Severity levels, matching the TRACE_LEVEL_* values sessions pass down.
pub const LEVEL_NONE: u8 = 0;
pub const LEVEL_FATAL: u8 = 1;
pub const LEVEL_ERROR: u8 = 2;
pub const LEVEL_WARNING: u8 = 3;
pub const LEVEL_INFO: u8 = 4;
pub const LEVEL_VERBOSE: u8 = 5;

// Standard opcodes, matching the EVENT_TRACE_TYPE_* values.
pub const OPCODE_INFO: u8 = 0;
pub const OPCODE_START: u8 = 1;
pub const OPCODE_STOP: u8 = 2;

/// All manifest-free events go to channel 11.
pub const MANIFEST_FREE_CHANNEL: u8 = 11;

/// The identity of one event kind. Constructed once as a `static`, never per
/// call.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EventDescriptor {
    pub id: u16,
    pub level: u8,
    pub opcode: u8,
    pub task: u16,
    pub keyword: u64,
}

impl EventDescriptor {
    pub const fn new(id: u16, level: u8, opcode: u8, task: u16, keyword: u64) -> Self {
        Self {
            id,
            level,
            opcode,
            task,
            keyword,
        }
    }
}

/// Payload field types. The discriminants are the TraceLogging in-type tags
/// that get serialized into the metadata blob.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldType {
    UnicodeStr = 1,
    AnsiStr = 2,
    Int8 = 3,
    UInt8 = 4,
    Int16 = 5,
    UInt16 = 6,
    Int32 = 7,
    UInt32 = 8,
    Int64 = 9,
    UInt64 = 10,
    Float = 11,
    Double = 12,
    Bool32 = 13,
    HexInt32 = 20,
    HexInt64 = 21,
}

impl FieldType {
    /// Fixed-width hex integer sized to the platform's address width.
    pub const POINTER: FieldType = if cfg!(target_pointer_width = "64") {
        FieldType::HexInt64
    } else {
        FieldType::HexInt32
    };
}

/// One named, typed payload field.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldType) -> Self {
        Self { name, kind }
    }
}

/// The materialized self-describing metadata for one event kind.
///
/// Layout: a little-endian u16 total size (including the size field itself),
/// the event name as a NUL-terminated byte string, then for each field in
/// declared order its NUL-terminated name followed by a one-byte type tag.
///
/// The field order here defines the payload serialization order; the
/// arguments passed to the emission path must match it exactly.
pub struct EventMetadata {
    blob: Box<[u8]>,
    field_count: usize,
}

impl EventMetadata {
    pub fn new(event_name: &str, fields: &[Field]) -> Self {
        let mut blob = Vec::with_capacity(
            2 + event_name.len()
                + 1
                + fields
                    .iter()
                    .map(|f| f.name.len() + 2)
                    .sum::<usize>(),
        );
        blob.extend_from_slice(&[0, 0]);
        blob.extend_from_slice(event_name.as_bytes());
        blob.push(0);
        for field in fields {
            blob.extend_from_slice(field.name.as_bytes());
            blob.push(0);
            blob.push(field.kind as u8);
        }
        let size = blob.len() as u16;
        blob[..2].copy_from_slice(&size.to_le_bytes());
        Self {
            blob: blob.into_boxed_slice(),
            field_count: fields.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    pub fn field_count(&self) -> usize {
        self.field_count
    }
}
