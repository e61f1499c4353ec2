#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use v8_etw::native::EventSink;
use v8_etw::{
    CONTROL_CODE_DISABLE, CONTROL_CODE_ENABLE, EventDescriptor, Guid, ProviderState,
};

/// One event as submitted to the backend.
#[derive(Clone)]
pub struct WrittenEvent {
    pub descriptor: EventDescriptor,
    pub metadata: Vec<u8>,
    pub payload: Vec<u8>,
}

impl WrittenEvent {
    /// The event name from the self-describing metadata blob.
    pub fn event_name(&self) -> String {
        let name = &self.metadata[2..];
        let end = name.iter().position(|b| *b == 0).unwrap();
        String::from_utf8(name[..end].to_vec()).unwrap()
    }

    /// Decodes a NUL-terminated UTF-16LE string starting at `offset` in the
    /// payload.
    pub fn utf16_str_at(&self, offset: usize) -> String {
        let units: Vec<u16> = self.payload[offset..]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|u| *u != 0)
            .collect();
        String::from_utf16(&units).unwrap()
    }
}

/// A backend fake that records registrations and written events, and lets
/// tests play the role of the tracing controller.
pub struct CollectingSink {
    register_status: u32,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
    next_handle: AtomicU64,
    state: Mutex<Option<Arc<ProviderState>>>,
    events: Mutex<Vec<WrittenEvent>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Self::with_status(0)
    }

    /// A sink whose registration fails with the given status.
    pub fn failing(status: u32) -> Arc<Self> {
        Self::with_status(status)
    }

    fn with_status(register_status: u32) -> Arc<Self> {
        Arc::new(Self {
            register_status,
            registrations: AtomicUsize::new(0),
            unregistrations: AtomicUsize::new(0),
            next_handle: AtomicU64::new(1),
            state: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<WrittenEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_ids(&self) -> Vec<u16> {
        self.events().iter().map(|e| e.descriptor.id).collect()
    }

    /// Plays the controller: delivers an enable callback to the registered
    /// provider state.
    pub fn enable(&self, level: u8, match_any_keyword: u64) {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .expect("provider not registered")
            .on_enable_callback(CONTROL_CODE_ENABLE, level, match_any_keyword, 0);
    }

    /// Plays the controller: delivers a disable callback.
    pub fn disable(&self) {
        self.state
            .lock()
            .unwrap()
            .as_ref()
            .expect("provider not registered")
            .on_enable_callback(CONTROL_CODE_DISABLE, 0, 0, 0);
    }
}

impl EventSink for CollectingSink {
    fn register(&self, _guid: &Guid, state: &Arc<ProviderState>) -> u32 {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        if self.register_status != 0 {
            return self.register_status;
        }
        state.set_registration_handle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        *self.state.lock().unwrap() = Some(Arc::clone(state));
        0
    }

    fn unregister(&self, _state: &ProviderState) {
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
    }

    fn write(
        &self,
        _state: &ProviderState,
        descriptor: &EventDescriptor,
        metadata: &[u8],
        payload: &[u8],
    ) {
        self.events.lock().unwrap().push(WrittenEvent {
            descriptor: *descriptor,
            metadata: metadata.to_vec(),
            payload: payload.to_vec(),
        });
    }
}
