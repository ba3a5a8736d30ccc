use std::sync::Arc;
use std::thread;

use egemaps_engine::testing::SyntheticSpec;
use egemaps_engine::{Engine, EngineConfig, EngineError, EngineState};

fn voice() -> egemaps_engine::DecodedAudio {
    SyntheticSpec::voice(150.0).with_duration_ms(1_200).to_audio()
}

#[test]
fn analyze_requires_initialize() {
    let engine = Engine::new();
    assert_eq!(engine.state(), EngineState::Uninitialized);
    assert_eq!(engine.analyze(&voice()), Err(EngineError::EngineNotReady));
}

#[test]
fn initialize_is_idempotent() {
    let engine = Engine::new();
    engine.initialize().expect("first initialize");
    engine.initialize().expect("second initialize");
    assert_eq!(engine.state(), EngineState::Ready);

    let features = engine.analyze(&voice()).expect("analysis after initialize");
    assert_eq!(features.len(), 88);
}

#[test]
fn concurrent_initialize_and_analyze() {
    let engine = Arc::new(Engine::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                engine.initialize().expect("initialize from worker");
                engine.analyze(&voice()).expect("analysis from worker")
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect();

    assert!(engine.is_ready());
    for features in &results[1..] {
        assert_eq!(features, &results[0]);
    }
}

#[test]
fn invalid_config_fails_initialization() {
    let mut config = EngineConfig::default();
    config.framing.hop_size_ms = 0.0;
    let engine = Engine::with_config(config);

    match engine.initialize() {
        Err(EngineError::InitializationFailure { reason }) => {
            assert!(reason.contains("invalid configuration"), "{}", reason)
        }
        other => panic!("Expected InitializationFailure, got {:?}", other),
    }
    assert_eq!(engine.state(), EngineState::Failed);
    // The failure is sticky
    assert!(engine.initialize().is_err());
    assert_eq!(engine.analyze(&voice()), Err(EngineError::EngineNotReady));
}

#[test]
fn reinitialize_keeps_ready_engine() {
    let mut engine = Engine::new();
    engine.initialize().expect("initialize");
    let before = engine.analyze(&voice()).expect("analysis before reinitialize");

    engine.reinitialize().expect("reinitialize");
    let after = engine.analyze(&voice()).expect("analysis after reinitialize");
    assert_eq!(before, after);
}
