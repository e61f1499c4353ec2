//! The high-level provider: the fixed catalog of runtime lifecycle events.
//!
//! For simple testing, use `logman` from an admin prompt to create a trace
//! for this provider:
//!
//! ```text
//! logman create trace -n v8js -o v8js.etl -p {57277741-3638-4A4B-BDBA-0AC6E45DA56C}
//! logman start v8js
//! logman stop v8js
//! logman delete v8js
//! ```
//!
//! Keywords and a level can optionally follow the provider GUID, e.g.
//! `-p {57277741-...} 0xBEEF 0x05`. Tools such as PerfView or WPR can be used
//! instead of `logman`.

use core::hash::BuildHasherDefault;
use std::sync::LazyLock;

use crate::code_events::IsolateId;
use crate::descriptor::{
    EventDescriptor, EventMetadata, Field, FieldType, Guid, LEVEL_INFO, LEVEL_VERBOSE,
    OPCODE_INFO, OPCODE_START, OPCODE_STOP,
};
use crate::error::EtwError;
use crate::native::EventSink;
use crate::provider::EtwProvider;
use crate::values::EventValue;

pub const PROVIDER_NAME: &str = "V8.js";

/// Generated from the "V8.js" name, which allows the "*V8.js" provider
/// specifier in tools such as PerfView.
pub const PROVIDER_GUID: Guid = Guid::from_fields(
    0xca4c76aa,
    0xe822,
    0x589e,
    [0x8f, 0x5d, 0x9f, 0xdc, 0xa8, 0xba, 0xd8, 0x13],
);

/// Registering under this GUID lets tools that understand stack walking via
/// JScript-runtime events consume the MethodLoad/SourceLoad stream.
pub const JSCRIPT_PROVIDER_GUID: Guid = Guid::from_fields(
    0x57277741,
    0x3638,
    0x4A4B,
    [0xBD, 0xBA, 0x0A, 0xC6, 0xE4, 0x5D, 0xA5, 0x6C],
);

const JSCRIPT_RUNTIME_KEYWORD: u64 = 1;

// Event identities. Field order is: id, level, opcode, task, keyword.
// MethodLoad and SourceLoad mimic the JScript runtime events needed for
// stack walking.
pub(crate) const METHOD_LOAD_EVENT: EventDescriptor =
    EventDescriptor::new(9, LEVEL_INFO, 10, 1, JSCRIPT_RUNTIME_KEYWORD);
pub(crate) const SOURCE_LOAD_EVENT: EventDescriptor =
    EventDescriptor::new(41, LEVEL_INFO, 12, 2, JSCRIPT_RUNTIME_KEYWORD);

const MSG_EVENT: EventDescriptor = EventDescriptor::new(100, LEVEL_INFO, OPCODE_INFO, 0, 0);
const INITIALIZE_PLATFORM_EVENT: EventDescriptor =
    EventDescriptor::new(101, LEVEL_INFO, OPCODE_INFO, 0, 0);
const SHUTDOWN_PLATFORM_EVENT: EventDescriptor =
    EventDescriptor::new(102, LEVEL_INFO, OPCODE_INFO, 0, 0);
const INITIALIZE_RUNTIME_EVENT: EventDescriptor =
    EventDescriptor::new(103, LEVEL_INFO, OPCODE_INFO, 0, 0);
const TEAR_DOWN_RUNTIME_EVENT: EventDescriptor =
    EventDescriptor::new(104, LEVEL_INFO, OPCODE_INFO, 0, 0);
const ISOLATE_START_EVENT: EventDescriptor =
    EventDescriptor::new(105, LEVEL_INFO, OPCODE_START, 0, 0);
const ISOLATE_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(106, LEVEL_INFO, OPCODE_STOP, 0, 0);
const SNAPSHOT_INIT_START_EVENT: EventDescriptor =
    EventDescriptor::new(107, LEVEL_INFO, OPCODE_START, 0, 0);
const SNAPSHOT_INIT_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(108, LEVEL_INFO, OPCODE_STOP, 0, 0);
const PARSING_START_EVENT: EventDescriptor =
    EventDescriptor::new(109, LEVEL_VERBOSE, OPCODE_START, 0, 0);
const PARSING_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(110, LEVEL_VERBOSE, OPCODE_STOP, 0, 0);
const GENERATE_UNOPTIMIZED_CODE_START_EVENT: EventDescriptor =
    EventDescriptor::new(111, LEVEL_VERBOSE, OPCODE_START, 0, 0);
const GENERATE_UNOPTIMIZED_CODE_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(112, LEVEL_VERBOSE, OPCODE_STOP, 0, 0);
const JIT_EXECUTE_START_EVENT: EventDescriptor =
    EventDescriptor::new(113, LEVEL_VERBOSE, OPCODE_START, 0, 0);
const JIT_EXECUTE_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(114, LEVEL_VERBOSE, OPCODE_STOP, 0, 0);
const JIT_FINALIZE_START_EVENT: EventDescriptor =
    EventDescriptor::new(115, LEVEL_VERBOSE, OPCODE_START, 0, 0);
const JIT_FINALIZE_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(116, LEVEL_VERBOSE, OPCODE_STOP, 0, 0);
const CONCURRENT_MARKING_START_EVENT: EventDescriptor =
    EventDescriptor::new(117, LEVEL_VERBOSE, OPCODE_START, 0, 0);
const CONCURRENT_MARKING_STOP_EVENT: EventDescriptor =
    EventDescriptor::new(118, LEVEL_VERBOSE, OPCODE_STOP, 0, 0);
const DEOPT_EVENT: EventDescriptor = EventDescriptor::new(119, LEVEL_VERBOSE, OPCODE_INFO, 0, 0);
const DISABLE_OPT_EVENT: EventDescriptor =
    EventDescriptor::new(120, LEVEL_VERBOSE, OPCODE_INFO, 0, 0);

type FnvBuildHasher = BuildHasherDefault<hashers::fnv::FNV1aHasher64>;

/// For each isolate, script ids already announced with a SourceLoad event,
/// mapped to their resolved UTF-16 names. Entries live for the life of the
/// provider; there is no eviction.
pub(crate) type ScriptMap =
    hashbrown::HashMap<IsolateId, hashbrown::HashMap<i32, Box<[u16]>, FnvBuildHasher>, FnvBuildHasher>;

/// The runtime's event provider. Owns the enable-state machine and the
/// per-isolate script cache used by the code-event translator.
pub struct V8Provider<S: EventSink> {
    pub(crate) etw: EtwProvider<S>,
    pub(crate) scripts: ScriptMap,
}

impl<S: EventSink> V8Provider<S> {
    pub fn new(sink: S) -> Self {
        Self {
            etw: EtwProvider::new(sink),
            scripts: ScriptMap::default(),
        }
    }

    /// Registers under the JScript-compatible GUID so existing trace tools
    /// understand the method/source events.
    pub fn register(&self) -> Result<(), EtwError> {
        self.etw.register(&JSCRIPT_PROVIDER_GUID, PROVIDER_NAME)
    }

    pub fn unregister(&self) {
        self.etw.unregister();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.etw.is_enabled()
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.etw.level()
    }

    #[inline]
    pub fn keywords(&self) -> u64 {
        self.etw.keywords()
    }

    pub fn msg(&self, msg: &str) {
        if self.etw.is_enabled() {
            self.log_msg(msg);
        }
    }

    // The below are infrequent and expensive enough to not bother checking
    // enablement first; the emission path checks anyway.

    pub fn initialize_platform(&self) {
        self.log_no_args(&INITIALIZE_PLATFORM_EVENT, &INITIALIZE_PLATFORM_META);
    }

    pub fn shutdown_platform(&self) {
        self.log_no_args(&SHUTDOWN_PLATFORM_EVENT, &SHUTDOWN_PLATFORM_META);
    }

    pub fn initialize_runtime(&self) {
        self.log_no_args(&INITIALIZE_RUNTIME_EVENT, &INITIALIZE_RUNTIME_META);
    }

    pub fn tear_down_runtime(&self) {
        self.log_no_args(&TEAR_DOWN_RUNTIME_EVENT, &TEAR_DOWN_RUNTIME_META);
    }

    pub fn isolate_start(&self, isolate: IsolateId) {
        self.log_isolate(&ISOLATE_START_EVENT, &ISOLATE_START_META, isolate);
    }

    pub fn isolate_stop(&self, isolate: IsolateId) {
        self.log_isolate(&ISOLATE_STOP_EVENT, &ISOLATE_STOP_META, isolate);
    }

    pub fn snapshot_init_start(&self, isolate: IsolateId) {
        self.log_isolate(&SNAPSHOT_INIT_START_EVENT, &SNAPSHOT_INIT_START_META, isolate);
    }

    pub fn snapshot_init_stop(&self, isolate: IsolateId) {
        self.log_isolate(&SNAPSHOT_INIT_STOP_EVENT, &SNAPSHOT_INIT_STOP_META, isolate);
    }

    pub fn parsing_start(&self, isolate: IsolateId) {
        if self.etw.is_enabled() {
            self.log_isolate(&PARSING_START_EVENT, &PARSING_START_META, isolate);
        }
    }

    pub fn parsing_stop(&self, isolate: IsolateId) {
        if self.etw.is_enabled() {
            self.log_isolate(&PARSING_STOP_EVENT, &PARSING_STOP_META, isolate);
        }
    }

    pub fn generate_unoptimized_code_start(&self, isolate: IsolateId) {
        if self.etw.is_enabled() {
            self.log_isolate(
                &GENERATE_UNOPTIMIZED_CODE_START_EVENT,
                &GENERATE_UNOPTIMIZED_CODE_START_META,
                isolate,
            );
        }
    }

    pub fn generate_unoptimized_code_stop(&self, isolate: IsolateId) {
        if self.etw.is_enabled() {
            self.log_isolate(
                &GENERATE_UNOPTIMIZED_CODE_STOP_EVENT,
                &GENERATE_UNOPTIMIZED_CODE_STOP_META,
                isolate,
            );
        }
    }

    pub fn jit_execute_start(&self) {
        if self.etw.is_enabled() {
            self.log_no_args(&JIT_EXECUTE_START_EVENT, &JIT_EXECUTE_START_META);
        }
    }

    pub fn jit_execute_stop(&self) {
        if self.etw.is_enabled() {
            self.log_no_args(&JIT_EXECUTE_STOP_EVENT, &JIT_EXECUTE_STOP_META);
        }
    }

    pub fn jit_finalize_start(&self) {
        if self.etw.is_enabled() {
            self.log_no_args(&JIT_FINALIZE_START_EVENT, &JIT_FINALIZE_START_META);
        }
    }

    pub fn jit_finalize_stop(&self) {
        if self.etw.is_enabled() {
            self.log_no_args(&JIT_FINALIZE_STOP_EVENT, &JIT_FINALIZE_STOP_META);
        }
    }

    pub fn concurrent_marking_start(&self) {
        if self.etw.is_enabled() {
            self.log_no_args(&CONCURRENT_MARKING_START_EVENT, &CONCURRENT_MARKING_START_META);
        }
    }

    pub fn concurrent_marking_stop(&self) {
        if self.etw.is_enabled() {
            self.log_no_args(&CONCURRENT_MARKING_STOP_EVENT, &CONCURRENT_MARKING_STOP_META);
        }
    }

    pub fn deopt(
        &self,
        reason: &str,
        kind: &str,
        src: &str,
        function: &str,
        line: i32,
        column: i32,
    ) {
        static META: LazyLock<EventMetadata> = LazyLock::new(|| {
            EventMetadata::new(
                "Deopt",
                &[
                    Field::new("reason", FieldType::AnsiStr),
                    Field::new("kind", FieldType::AnsiStr),
                    Field::new("src", FieldType::AnsiStr),
                    Field::new("fn", FieldType::AnsiStr),
                    Field::new("line", FieldType::Int32),
                    Field::new("column", FieldType::Int32),
                ],
            )
        });
        self.etw.log_event_data(
            &DEOPT_EVENT,
            &META,
            &[
                EventValue::AnsiStr(reason),
                EventValue::AnsiStr(kind),
                EventValue::AnsiStr(src),
                EventValue::AnsiStr(function),
                EventValue::Int32(line),
                EventValue::Int32(column),
            ],
        );
    }

    pub fn disable_opt(&self, function: &str, reason: &str) {
        static META: LazyLock<EventMetadata> = LazyLock::new(|| {
            EventMetadata::new(
                "DisableOpt",
                &[
                    Field::new("fn", FieldType::AnsiStr),
                    Field::new("reason", FieldType::AnsiStr),
                ],
            )
        });
        self.etw.log_event_data(
            &DISABLE_OPT_EVENT,
            &META,
            &[EventValue::AnsiStr(function), EventValue::AnsiStr(reason)],
        );
    }

    fn log_msg(&self, msg: &str) {
        static META: LazyLock<EventMetadata> =
            LazyLock::new(|| EventMetadata::new("Msg", &[Field::new("Msg", FieldType::AnsiStr)]));
        self.etw
            .log_event_data(&MSG_EVENT, &META, &[EventValue::AnsiStr(msg)]);
    }

    fn log_no_args(&self, descriptor: &EventDescriptor, metadata: &EventMetadata) {
        self.etw.log_event_data(descriptor, metadata, &[]);
    }

    fn log_isolate(
        &self,
        descriptor: &EventDescriptor,
        metadata: &EventMetadata,
        isolate: IsolateId,
    ) {
        self.etw
            .log_event_data(descriptor, metadata, &[EventValue::Pointer(isolate.0)]);
    }
}

fn no_arg_meta(name: &'static str) -> EventMetadata {
    EventMetadata::new(name, &[])
}

fn isolate_meta(name: &'static str) -> EventMetadata {
    EventMetadata::new(name, &[Field::new("isolate", FieldType::POINTER)])
}

static INITIALIZE_PLATFORM_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("InitializePlatform"));
static SHUTDOWN_PLATFORM_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("ShutdownPlatform"));
static INITIALIZE_RUNTIME_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("InitializeRuntime"));
static TEAR_DOWN_RUNTIME_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("TearDownRuntime"));
static ISOLATE_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| isolate_meta("IsolateStart"));
static ISOLATE_STOP_META: LazyLock<EventMetadata> = LazyLock::new(|| isolate_meta("IsolateStop"));
static SNAPSHOT_INIT_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| isolate_meta("SnapshotInitStart"));
static SNAPSHOT_INIT_STOP_META: LazyLock<EventMetadata> =
    LazyLock::new(|| isolate_meta("SnapshotInitStop"));
static PARSING_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| isolate_meta("ParsingStart"));
static PARSING_STOP_META: LazyLock<EventMetadata> = LazyLock::new(|| isolate_meta("ParsingStop"));
static GENERATE_UNOPTIMIZED_CODE_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| isolate_meta("GenerateUnoptimizedCodeStart"));
static GENERATE_UNOPTIMIZED_CODE_STOP_META: LazyLock<EventMetadata> =
    LazyLock::new(|| isolate_meta("GenerateUnoptimizedCodeStop"));
static JIT_EXECUTE_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("JitExecuteStart"));
static JIT_EXECUTE_STOP_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("JitExecuteStop"));
static JIT_FINALIZE_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("JitFinalizeStart"));
static JIT_FINALIZE_STOP_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("JitFinalizeStop"));
static CONCURRENT_MARKING_START_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("ConcurrentMarkingStart"));
static CONCURRENT_MARKING_STOP_META: LazyLock<EventMetadata> =
    LazyLock::new(|| no_arg_meta("ConcurrentMarkingStop"));
