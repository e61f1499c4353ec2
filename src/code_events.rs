//! Translates code-generation notifications into MethodLoad/SourceLoad
//! events.
//!
//! The translator keeps a per-isolate cache of scripts it has already
//! announced, so a script's SourceLoad event is emitted exactly once no
//! matter how many methods are compiled from it. Cache entries are kept for
//! the life of the provider.

use std::sync::LazyLock;

use crate::descriptor::{EventMetadata, Field, FieldType, LEVEL_INFO};
use crate::native::EventSink;
use crate::v8_provider::{METHOD_LOAD_EVENT, SOURCE_LOAD_EVENT, V8Provider};
use crate::values::EventValue;

/// Name used for a script whose source object cannot be read as a string.
pub const UNKNOWN_SCRIPT_NAME: &str = "[unknown]";

/// Identifies one runtime instance. Pointer-sized and opaque; it scopes the
/// script de-duplication cache and is reported as the script context id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct IsolateId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CodeType {
    JitCode,
    ByteCode,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CodeEventType {
    CodeAdded,
    CodeMoved,
    CodeRemoved,
    CodeAddLinePosInfo,
}

/// The script a code object was compiled from, when one is associated.
#[derive(Clone, Copy, Debug)]
pub struct ScriptInfo<'a> {
    /// Small integer, stable for the life of the script within its isolate.
    pub id: i32,
    /// Display name, or `None` when the name is not representable as text.
    pub name: Option<&'a str>,
}

/// A code-generation notification from the runtime.
#[derive(Clone, Copy, Debug)]
pub struct CodeEvent<'a> {
    pub code_type: CodeType,
    pub event_type: CodeEventType,
    pub isolate: IsolateId,
    pub code_start: usize,
    pub code_len: usize,
    /// UTF-8 method name, not NUL-terminated.
    pub name: &'a [u8],
    pub script: Option<ScriptInfo<'a>>,
}

static SOURCE_LOAD_META: LazyLock<EventMetadata> = LazyLock::new(|| {
    EventMetadata::new(
        "SourceLoad",
        &[
            Field::new("SourceID", FieldType::UInt64),
            Field::new("ScriptContextID", FieldType::POINTER),
            Field::new("SourceFlags", FieldType::UInt32),
            Field::new("Url", FieldType::UnicodeStr),
        ],
    )
});

static METHOD_LOAD_META: LazyLock<EventMetadata> = LazyLock::new(|| {
    EventMetadata::new(
        "MethodLoad",
        &[
            Field::new("ScriptContextID", FieldType::POINTER),
            Field::new("MethodStartAddress", FieldType::POINTER),
            Field::new("MethodSize", FieldType::UInt64),
            Field::new("MethodID", FieldType::UInt32),
            Field::new("MethodFlags", FieldType::UInt16),
            Field::new("MethodAddressRangeID", FieldType::UInt16),
            Field::new("SourceID", FieldType::UInt64),
            Field::new("Line", FieldType::UInt32),
            Field::new("Column", FieldType::UInt32),
            Field::new("MethodName", FieldType::UnicodeStr),
        ],
    )
});

impl<S: EventSink> V8Provider<S> {
    /// Handles one code-generation notification.
    ///
    /// Only JIT code additions are modeled; moves, removals and line-info
    /// updates are discarded. When the code has an associated script that has
    /// not been seen for this isolate, one SourceLoad event is emitted before
    /// the MethodLoad event for the code object.
    ///
    /// Takes `&mut self`: notifications for one provider must be delivered
    /// from one thread at a time, which the runtime's code-event dispatch
    /// already guarantees.
    pub fn code_event_handler(&mut self, event: &CodeEvent<'_>) {
        if !self.etw.is_enabled() || self.etw.level() < LEVEL_INFO {
            return;
        }
        if event.code_type != CodeType::JitCode {
            return;
        }
        if event.event_type != CodeEventType::CodeAdded {
            return;
        }

        let method_name = wide_from_utf8(event.name);

        let mut script_id = 0i32;
        if let Some(script) = &event.script {
            script_id = script.id;
            let script_map = self.scripts.entry(event.isolate).or_default();
            if !script_map.contains_key(&script.id) {
                // First time seeing this source file: record it, then log the
                // SourceLoad event.
                let url: Box<[u16]> = script
                    .name
                    .unwrap_or(UNKNOWN_SCRIPT_NAME)
                    .encode_utf16()
                    .collect();
                let url: &[u16] = script_map.entry(script.id).or_insert(url);
                self.etw.log_event_data(
                    &SOURCE_LOAD_EVENT,
                    &SOURCE_LOAD_META,
                    &[
                        EventValue::UInt64(script.id as u64),
                        EventValue::Pointer(event.isolate.0),
                        EventValue::UInt32(0), // SourceFlags
                        EventValue::UnicodeStr(url),
                    ],
                );
            }
        }

        self.etw.log_event_data(
            &METHOD_LOAD_EVENT,
            &METHOD_LOAD_META,
            &[
                // The isolate stands in for the script context id.
                EventValue::Pointer(event.isolate.0),
                EventValue::Pointer(event.code_start),
                EventValue::UInt64(event.code_len as u64),
                EventValue::UInt32(0), // MethodID
                EventValue::UInt16(0), // MethodFlags
                EventValue::UInt16(0), // MethodAddressRangeID
                EventValue::UInt64(script_id as u64),
                EventValue::UInt32(0), // Line
                EventValue::UInt32(0), // Column
                EventValue::UnicodeStr(&method_name),
            ],
        );
    }
}

fn wide_from_utf8(bytes: &[u8]) -> Vec<u16> {
    String::from_utf8_lossy(bytes).encode_utf16().collect()
}
