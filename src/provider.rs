//! Provider enable-state machine and the event emission path.

use core::cell::RefCell;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

extern crate alloc;
use alloc::sync::Arc;

use crate::descriptor::{EventDescriptor, EventMetadata, Guid};
use crate::error::EtwError;
use crate::native::EventSink;
use crate::values::EventValue;

/// Controller callback control code: provider disabled.
pub const CONTROL_CODE_DISABLE: u32 = 0;
/// Controller callback control code: provider enabled.
pub const CONTROL_CODE_ENABLE: u32 = 1;

/// Shared state between the controller's asynchronous enable callback and the
/// emission call sites.
///
/// The callback is the only writer of `enabled`/`level`/`keywords`; emission
/// sites only read them. The triple is advisory: a reader may observe a
/// snapshot that is stale for a short window around an enablement change, and
/// the one extra or missing event that can produce is tolerated.
pub struct ProviderState {
    registration_handle: AtomicU64,
    enabled: AtomicBool,
    level: AtomicU8,
    keywords: AtomicU64,
    // Provider traits blob: u16 total size, provider name, NUL. Written once
    // at registration.
    provider_trait: OnceLock<Box<[u8]>>,
}

impl ProviderState {
    pub(crate) fn new() -> Self {
        Self {
            registration_handle: AtomicU64::new(0),
            enabled: AtomicBool::new(false),
            level: AtomicU8::new(0),
            keywords: AtomicU64::new(0),
            provider_trait: OnceLock::new(),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Applies the level/keyword eligibility rule on top of the enabled flag.
    /// A handful of atomic loads and compares; safe to call on every
    /// potential emission site.
    #[inline]
    pub fn is_event_enabled(&self, event: &EventDescriptor) -> bool {
        if !self.enabled.load(Ordering::Acquire) {
            return false;
        }
        if event.level > self.level.load(Ordering::Relaxed) {
            return false;
        }
        event.keyword == 0 || (event.keyword & self.keywords.load(Ordering::Relaxed)) != 0
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn keywords(&self) -> u64 {
        self.keywords.load(Ordering::Relaxed)
    }

    /// Zero when unregistered.
    pub fn registration_handle(&self) -> u64 {
        self.registration_handle.load(Ordering::Acquire)
    }

    /// Stores the backend registration handle. For [crate::native::EventSink]
    /// implementations.
    pub fn set_registration_handle(&self, handle: u64) {
        self.registration_handle.store(handle, Ordering::Release);
    }

    /// The length-prefixed, NUL-terminated provider traits blob. Empty until
    /// registration has run.
    pub fn provider_trait(&self) -> &[u8] {
        self.provider_trait.get().map_or(&[], |b| b)
    }

    pub(crate) fn set_provider_trait(&self, provider_name: &str) {
        let total = 2 + provider_name.len() + 1;
        let mut blob = Vec::with_capacity(total);
        blob.extend_from_slice(&(total as u16).to_le_bytes());
        blob.extend_from_slice(provider_name.as_bytes());
        blob.push(0);
        let _ = self.provider_trait.set(blob.into_boxed_slice());
    }

    /// Target for the controller's asynchronous enable callback.
    ///
    /// Control code 0 disables the provider and zeroes the level/keyword
    /// mask. Control code 1 records the session's level and match-any keyword
    /// mask (the controller passes all bits set when the session did not
    /// restrict them) before flipping `enabled`. Any other code is ignored.
    pub fn on_enable_callback(
        &self,
        control_code: u32,
        level: u8,
        match_any_keyword: u64,
        _match_all_keyword: u64,
    ) {
        match control_code {
            CONTROL_CODE_DISABLE => {
                self.level.store(0, Ordering::Relaxed);
                self.keywords.store(0, Ordering::Relaxed);
                self.enabled.store(false, Ordering::Release);
            }
            CONTROL_CODE_ENABLE => {
                self.level.store(level, Ordering::Relaxed);
                self.keywords.store(match_any_keyword, Ordering::Relaxed);
                self.enabled.store(true, Ordering::Release);
            }
            _ => {}
        }
    }

    pub(crate) fn reset(&self) {
        self.enabled.store(false, Ordering::Release);
        self.level.store(0, Ordering::Relaxed);
        self.keywords.store(0, Ordering::Relaxed);
        self.registration_handle.store(0, Ordering::Release);
    }
}

thread_local! {
    // Scratch space for marshaling one event's payload. Grows to fit the
    // largest event logged on this thread and is reused after that.
    static PAYLOAD_SCRATCH: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// The base event provider: owns a [ProviderState] and a backend sink, and
/// implements registration and the emission path. Higher-level providers wrap
/// this with their event catalog.
///
/// The provider is an owned, injectable object; tests substitute a fake sink
/// for the real backend.
pub struct EtwProvider<S: EventSink> {
    sink: S,
    state: Arc<ProviderState>,
    // Latches the first registration status for the life of this instance.
    registration: OnceLock<u32>,
}

impl<S: EventSink> EtwProvider<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: Arc::new(ProviderState::new()),
            registration: OnceLock::new(),
        }
    }

    /// Registers this provider with the backend, at most once per instance.
    ///
    /// A second call does not re-register; it reports the latched outcome of
    /// the first call. A backend failure leaves the provider permanently
    /// disabled and is fatal only to tracing, never to the host.
    pub fn register(&self, guid: &Guid, provider_name: &str) -> Result<(), EtwError> {
        if provider_name.contains('\0') {
            return Err(EtwError::InvalidProviderNameCharacters(
                provider_name.into(),
            ));
        }

        let status = *self.registration.get_or_init(|| {
            self.state.set_provider_trait(provider_name);
            let status = self.sink.register(guid, &self.state);
            if status != 0 {
                tracing::warn!(provider = provider_name, status, "event provider registration failed");
            }
            status
        });

        if status == 0 {
            Ok(())
        } else {
            Err(EtwError::RegistrationFailed(status))
        }
    }

    /// Releases the backend registration and zeroes the state. A no-op when
    /// never registered.
    pub fn unregister(&self) {
        if self.state.registration_handle() != 0 {
            self.sink.unregister(&self.state);
        }
        self.state.reset();
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    #[inline]
    pub fn is_event_enabled(&self, event: &EventDescriptor) -> bool {
        self.state.is_event_enabled(event)
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.state.level()
    }

    #[inline]
    pub fn keywords(&self) -> u64 {
        self.state.keywords()
    }

    pub fn state(&self) -> &Arc<ProviderState> {
        &self.state
    }

    /// Marshals `values` in order and submits the event to the sink.
    ///
    /// The number and types of `values` must match the field sequence
    /// declared in `metadata`; that is the caller's contract. Eligibility is
    /// re-checked here so call sites may skip their own check for rare
    /// events. The sink write is best effort and any failure is dropped.
    pub fn log_event_data(
        &self,
        descriptor: &EventDescriptor,
        metadata: &EventMetadata,
        values: &[EventValue<'_>],
    ) {
        if !self.state.is_event_enabled(descriptor) {
            return;
        }

        PAYLOAD_SCRATCH.with_borrow_mut(|payload| {
            payload.clear();
            for value in values {
                value.marshal_into(payload);
            }
            self.sink
                .write(&self.state, descriptor, metadata.as_bytes(), payload);
        });
    }
}
