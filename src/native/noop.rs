//! The null backend: identical signatures, no work.

extern crate alloc;
use alloc::sync::Arc;

use crate::descriptor::{EventDescriptor, Guid};
use crate::provider::ProviderState;

/// A backend that accepts registration and discards everything. The provider
/// state never becomes enabled, so every emission call site bails out at the
/// enable check.
#[derive(Default)]
pub struct NoopSink;

impl NoopSink {
    pub const fn new() -> Self {
        Self
    }
}

impl super::EventSink for NoopSink {
    fn register(&self, _guid: &Guid, _state: &Arc<ProviderState>) -> u32 {
        0
    }

    fn unregister(&self, _state: &ProviderState) {}

    fn write(
        &self,
        _state: &ProviderState,
        _descriptor: &EventDescriptor,
        _metadata: &[u8],
        _payload: &[u8],
    ) {
    }
}
