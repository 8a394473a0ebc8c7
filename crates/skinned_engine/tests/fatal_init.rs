//! Initialization failures surface from the engine constructor

use skinned_engine::core::EngineConfig;
use skinned_engine::foundation::time::ManualClock;
use skinned_engine::render::{ProgramKind, RecordingBackend, RenderError, Viewport};
use skinned_engine::{Engine, EngineError};

fn init(backend: RecordingBackend) -> Result<Engine<RecordingBackend>, EngineError> {
    Engine::new(backend, EngineConfig::default(), Box::new(ManualClock::new(0.0)), Viewport::full(64, 64))
}

#[test]
fn missing_context_is_fatal() {
    let error = init(RecordingBackend::new().without_context()).err().unwrap();
    assert!(matches!(error, EngineError::Render(RenderError::ContextUnavailable(_))));
}

#[test]
fn shader_failures_are_fatal_for_every_program() {
    for kind in [ProgramKind::Main, ProgramKind::DirectionalDepth, ProgramKind::PointDepth, ProgramKind::DebugLines] {
        let error = init(RecordingBackend::new().failing_program(kind)).err().unwrap();
        match error {
            EngineError::Render(RenderError::ShaderCompilation { program, .. }) => assert_eq!(program, kind.name()),
            other => panic!("unexpected error for {kind:?}: {other}"),
        }
    }
}

#[test]
fn incomplete_shadow_framebuffer_is_fatal() {
    let error = init(RecordingBackend::new().with_incomplete_framebuffers()).err().unwrap();
    assert!(matches!(error, EngineError::Render(RenderError::FramebufferIncomplete(_))));
    assert!(error.to_string().contains("shadow"));
}

#[test]
fn healthy_backend_initializes() {
    let engine = init(RecordingBackend::new()).unwrap();
    let backend = engine.shutdown();
    assert_eq!(backend.texture_count(), 0);
}
