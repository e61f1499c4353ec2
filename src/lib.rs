//! # An ETW event provider for JavaScript runtime JIT tracing
//!
//! ## Overview
//!
//! This crate lets a JavaScript runtime emit structured trace events (JIT
//! compilation lifecycle, script loads, deoptimizations) as Windows ETW
//! TraceLogging events, gated by the session-controlled enable/level/keyword
//! mask. When no tracing session is listening the cost of every call site is
//! a few atomic loads and integer compares.
//!
//! ETW is a Windows-wide, high performance, lossy tracing API built into the
//! kernel. Events from this provider can be correlated alongside other system
//! activity in tools such as WPA or PerfView. Users unfamiliar with the
//! basics may find the following helpful:
//! - <https://learn.microsoft.com/windows/win32/etw/about-event-tracing>
//! - <https://learn.microsoft.com/windows/win32/tracelogging/trace-logging-about>
//!
//! Events are emitted in the self-describing ("manifest-free") encoding: the
//! event name and the name and type of each payload field travel with the
//! event itself, so trace tools can decode payloads without a registered
//! manifest.
//!
//! ## Structure
//!
//! [EtwProvider] is the base provider: the enable-state machine fed by the
//! controller's asynchronous callback, plus the emission path that marshals
//! typed arguments into the payload. [V8Provider] wraps it with the fixed
//! catalog of runtime lifecycle events and the code-event translator, which
//! turns code-added notifications into MethodLoad events plus at most one
//! SourceLoad event per distinct script per isolate.
//!
//! The OS backend sits behind the [native::EventSink] trait. On Windows the
//! real backend ([native::EtwSink]) talks to the Win32 event-provider API;
//! the null backend ([native::NoopSink]) has identical signatures and leaves
//! the provider permanently disabled. [native::DefaultSink] picks the
//! platform's functional backend when there is one.
//!
//! ## Example
//!
//! ```no_run
//! use v8_etw::{V8Provider, IsolateId, native::DefaultSink};
//!
//! let provider = V8Provider::new(DefaultSink::new());
//! let _ = provider.register();
//!
//! provider.isolate_start(IsolateId(0x7f00_1000));
//! ```
//!
//! ## Error behavior
//!
//! Tracing is best effort and must never affect the host program: a refused
//! registration leaves the provider disabled for the process, a script name
//! that cannot be read becomes a `"[unknown]"` sentinel, and a failed backend
//! write is dropped. Nothing in this crate panics on a backend failure.

mod code_events;
mod descriptor;
pub mod error;
// Abstracts the native ETW API behind a trait. Most consumers only need
// DefaultSink or NoopSink from here.
pub mod native;
mod provider;
mod v8_provider;
mod values;

pub use code_events::{
    CodeEvent, CodeEventType, CodeType, IsolateId, ScriptInfo, UNKNOWN_SCRIPT_NAME,
};
pub use descriptor::{
    EventDescriptor, EventMetadata, Field, FieldType, Guid, LEVEL_ERROR, LEVEL_FATAL, LEVEL_INFO,
    LEVEL_NONE, LEVEL_VERBOSE, LEVEL_WARNING, MANIFEST_FREE_CHANNEL, OPCODE_INFO, OPCODE_START,
    OPCODE_STOP,
};
pub use error::EtwError;
pub use provider::{CONTROL_CODE_DISABLE, CONTROL_CODE_ENABLE, EtwProvider, ProviderState};
pub use v8_provider::{JSCRIPT_PROVIDER_GUID, PROVIDER_GUID, PROVIDER_NAME, V8Provider};
pub use values::EventValue;
