mod common;

use common::CollectingSink;
use v8_etw::{EtwError, IsolateId, LEVEL_INFO, LEVEL_VERBOSE, V8Provider, native::NoopSink};

#[test]
fn registration_is_latched() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());

    assert!(provider.register().is_ok());
    assert!(provider.register().is_ok());
    assert_eq!(sink.registrations(), 1);
}

#[test]
fn failed_registration_latches_and_disables() {
    // Render the provider's own diagnostics while exercising the failure path.
    let _ = tracing_subscriber::fmt().try_init();

    let sink = CollectingSink::failing(1722); // RPC_S_SERVER_UNAVAILABLE
    let provider = V8Provider::new(sink.clone());

    match provider.register() {
        Err(EtwError::RegistrationFailed(status)) => assert_eq!(status, 1722),
        other => panic!("expected registration failure, got {other:?}"),
    }
    // A second attempt reports the latched status without touching the backend.
    assert!(matches!(
        provider.register(),
        Err(EtwError::RegistrationFailed(1722))
    ));
    assert_eq!(sink.registrations(), 1);

    assert!(!provider.is_enabled());
    provider.isolate_start(IsolateId(0x1000));
    assert!(sink.events().is_empty());
}

#[test]
fn nothing_is_emitted_without_a_session() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();

    provider.initialize_platform();
    provider.isolate_start(IsolateId(0x1000));
    provider.jit_execute_start();
    provider.msg("hello");
    assert!(sink.events().is_empty());
}

#[test]
fn enabled_session_receives_events() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();
    sink.enable(LEVEL_VERBOSE, !0u64);
    assert!(provider.is_enabled());

    provider.isolate_start(IsolateId(0xABC0));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].descriptor.id, 105);
    assert_eq!(events[0].event_name(), "IsolateStart");
    assert_eq!(events[0].payload, 0xABC0usize.to_le_bytes());
}

#[test]
fn session_level_gates_verbose_events() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();
    sink.enable(LEVEL_INFO, !0u64);

    provider.parsing_start(IsolateId(1)); // verbose, filtered
    provider.isolate_start(IsolateId(1)); // info, passes
    assert_eq!(sink.event_ids(), vec![105]);
}

#[test]
fn disable_callback_stops_emission() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();
    sink.enable(LEVEL_VERBOSE, !0u64);

    provider.jit_finalize_start();
    sink.disable();
    provider.jit_finalize_stop();
    provider.isolate_stop(IsolateId(1));

    assert_eq!(sink.event_ids(), vec![115]);
    assert_eq!(provider.level(), 0);
    assert_eq!(provider.keywords(), 0);
}

#[test]
fn unregister_resets_state_and_is_idempotent() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();
    sink.enable(LEVEL_VERBOSE, !0u64);

    provider.unregister();
    assert!(!provider.is_enabled());
    assert_eq!(sink.unregistrations(), 1);

    // Safe to call again; the handle is already released.
    provider.unregister();
    assert_eq!(sink.unregistrations(), 1);
}

#[test]
fn unregister_without_register_is_a_no_op() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.unregister();
    assert_eq!(sink.unregistrations(), 0);
}

#[test]
fn deopt_payload_matches_declared_field_order() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();
    sink.enable(LEVEL_VERBOSE, !0u64);

    provider.deopt("wrong-map", "eager", "app.js", "handler", 12, 7);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.descriptor.id, 119);
    assert_eq!(event.event_name(), "Deopt");

    let mut expected = Vec::new();
    for s in ["wrong-map", "eager", "app.js", "handler"] {
        expected.extend_from_slice(s.as_bytes());
        expected.push(0);
    }
    expected.extend_from_slice(&12i32.to_le_bytes());
    expected.extend_from_slice(&7i32.to_le_bytes());
    assert_eq!(event.payload, expected);
}

#[test]
fn disable_opt_carries_function_and_reason() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();
    sink.enable(LEVEL_VERBOSE, !0u64);

    provider.disable_opt("slowFn", "TryCatchStatement");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].descriptor.id, 120);
    assert_eq!(events[0].payload, b"slowFn\0TryCatchStatement\0");
}

#[test]
fn msg_is_gated_on_enablement() {
    let sink = CollectingSink::new();
    let provider = V8Provider::new(sink.clone());
    provider.register().unwrap();

    provider.msg("dropped");
    sink.enable(LEVEL_VERBOSE, !0u64);
    provider.msg("kept");

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name(), "Msg");
    assert_eq!(events[0].payload, b"kept\0");
}

#[test]
fn noop_sink_registers_but_never_enables() {
    let provider = V8Provider::new(NoopSink::new());
    assert!(provider.register().is_ok());
    assert!(!provider.is_enabled());

    // All call signatures are usable; nothing happens.
    provider.initialize_platform();
    provider.isolate_start(IsolateId(42));
    provider.deopt("r", "k", "s", "f", 0, 0);
    provider.unregister();
}
