//! The seam between the provider and the OS tracing backend.
//!
//! The backend is modeled as a capability: [EventSink] is implemented by the
//! real ETW backend on Windows and by a null backend everywhere (including
//! Windows, for builds or configurations that want tracing compiled down to
//! nothing while keeping identical call signatures). Tests implement it with
//! a collecting fake.

extern crate alloc;
use alloc::sync::Arc;

use crate::descriptor::{EventDescriptor, Guid};
use crate::provider::ProviderState;

/// One OS tracing backend.
///
/// All operations are best effort from the provider's point of view: only
/// registration reports failure (as a raw backend status code, zero meaning
/// success), and a failed write is silently dropped.
pub trait EventSink: Send + Sync {
    /// Registers the provider with the backend, wiring the controller's
    /// enable callback to [ProviderState::on_enable_callback] and storing the
    /// registration handle into `state`. Returns the backend status code.
    fn register(&self, guid: &Guid, state: &Arc<ProviderState>) -> u32;

    /// Releases the registration handle held in `state`.
    fn unregister(&self, state: &ProviderState);

    /// Submits one event. `metadata` is the self-describing metadata blob and
    /// `payload` the marshaled field values, in metadata order.
    fn write(
        &self,
        state: &ProviderState,
        descriptor: &EventDescriptor,
        metadata: &[u8],
        payload: &[u8],
    );
}

// A shared sink is still a sink.
impl<T: EventSink> EventSink for Arc<T> {
    fn register(&self, guid: &Guid, state: &Arc<ProviderState>) -> u32 {
        (**self).register(guid, state)
    }

    fn unregister(&self, state: &ProviderState) {
        (**self).unregister(state)
    }

    fn write(
        &self,
        state: &ProviderState,
        descriptor: &EventDescriptor,
        metadata: &[u8],
        payload: &[u8],
    ) {
        (**self).write(state, descriptor, metadata, payload)
    }
}

#[cfg(windows)]
pub mod etw;
#[cfg(windows)]
pub use etw::EtwSink;

pub mod noop;
pub use noop::NoopSink;

/// The platform's functional backend, or the null backend where none exists.
#[cfg(windows)]
pub type DefaultSink = EtwSink;
#[cfg(not(windows))]
pub type DefaultSink = NoopSink;
