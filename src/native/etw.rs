//! The real ETW backend, built on the Win32 event-provider primitives.

extern crate alloc;
use alloc::sync::Arc;
use core::ffi::c_void;

use windows::Win32::System::Diagnostics::Etw::{
    EVENT_DATA_DESCRIPTOR, EVENT_DATA_DESCRIPTOR_0, EVENT_DATA_DESCRIPTOR_0_0, EVENT_DESCRIPTOR,
    EVENT_FILTER_DESCRIPTOR, EVENT_INFO_CLASS, EventRegister, EventSetInformation,
    EventUnregister, EventWriteTransfer,
};
use windows::core::GUID;

use crate::descriptor::{EventDescriptor, Guid, MANIFEST_FREE_CHANNEL};
use crate::provider::ProviderState;

// EVENT_DATA_DESCRIPTOR Type values for self-describing events.
const DATA_TYPE_USER_DATA: u8 = 0;
const DATA_TYPE_EVENT_METADATA: u8 = 1;
const DATA_TYPE_PROVIDER_METADATA: u8 = 2;

// EVENT_INFO_CLASS value for EventProviderSetTraits.
const EVENT_PROVIDER_SET_TRAITS: EVENT_INFO_CLASS = EVENT_INFO_CLASS(2);

/// Emits events through `EventRegister`/`EventWriteTransfer`.
#[derive(Default)]
pub struct EtwSink;

impl EtwSink {
    pub const fn new() -> Self {
        Self
    }
}

fn native_guid(guid: &Guid) -> GUID {
    GUID {
        data1: guid.data1,
        data2: guid.data2,
        data3: guid.data3,
        data4: guid.data4,
    }
}

fn data_descriptor(data: &[u8], kind: u8) -> EVENT_DATA_DESCRIPTOR {
    EVENT_DATA_DESCRIPTOR {
        Ptr: data.as_ptr() as u64,
        Size: data.len() as u32,
        Anonymous: EVENT_DATA_DESCRIPTOR_0 {
            Anonymous: EVENT_DATA_DESCRIPTOR_0_0 {
                Type: kind,
                Reserved1: 0,
                Reserved2: 0,
            },
        },
    }
}

// Invoked by the tracing controller on a thread of its choosing, possibly
// concurrently with emission calls. The context is the raw pointer to the
// ProviderState handed out at registration.
unsafe extern "system" fn enable_callback(
    _source_id: *const GUID,
    control_code: u32,
    level: u8,
    match_any_keyword: u64,
    match_all_keyword: u64,
    _filter_data: *const EVENT_FILTER_DESCRIPTOR,
    callback_context: *mut c_void,
) {
    if callback_context.is_null() {
        return;
    }
    let state = unsafe { &*(callback_context as *const ProviderState) };
    state.on_enable_callback(control_code, level, match_any_keyword, match_all_keyword);
}

impl super::EventSink for EtwSink {
    fn register(&self, guid: &Guid, state: &Arc<ProviderState>) -> u32 {
        let guid = native_guid(guid);
        let mut handle = 0u64;

        // The context must outlive the registration; the state Arc is leaked
        // into it and reclaimed only at process exit, which is harmless for a
        // process-lifetime provider.
        let context = Arc::into_raw(Arc::clone(state)) as *const c_void;

        let status = unsafe {
            EventRegister(
                &guid,
                Some(enable_callback),
                Some(context),
                &mut handle,
            )
        };
        if status != 0 {
            return status;
        }

        state.set_registration_handle(handle);

        // Attach the provider traits (name) to the registration so decoders
        // can resolve the provider without a manifest. Best effort.
        let traits = state.provider_trait();
        if !traits.is_empty() {
            unsafe {
                let _ = EventSetInformation(
                    handle,
                    EVENT_PROVIDER_SET_TRAITS,
                    traits.as_ptr() as *const c_void,
                    traits.len() as u32,
                );
            }
        }

        0
    }

    fn unregister(&self, state: &ProviderState) {
        let handle = state.registration_handle();
        if handle != 0 {
            unsafe {
                let _ = EventUnregister(handle);
            }
        }
    }

    fn write(
        &self,
        state: &ProviderState,
        descriptor: &EventDescriptor,
        metadata: &[u8],
        payload: &[u8],
    ) {
        let handle = state.registration_handle();
        if handle == 0 {
            return;
        }

        let native = EVENT_DESCRIPTOR {
            Id: descriptor.id,
            Version: 0,
            Channel: MANIFEST_FREE_CHANNEL,
            Level: descriptor.level,
            Opcode: descriptor.opcode,
            Task: descriptor.task,
            Keyword: descriptor.keyword,
        };

        let data = [
            data_descriptor(state.provider_trait(), DATA_TYPE_PROVIDER_METADATA),
            data_descriptor(metadata, DATA_TYPE_EVENT_METADATA),
            data_descriptor(payload, DATA_TYPE_USER_DATA),
        ];

        // Best effort; a dropped event must not affect the host.
        unsafe {
            let _ = EventWriteTransfer(handle, &native, None, None, Some(&data));
        }
    }
}
