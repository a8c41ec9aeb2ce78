use stretch_stage::config::{read_config_json, write_config_json};
use stretch_stage::stretch::{PitchQuality, ProcessMode};
use stretch_stage::{AudioFormat, EngineTuning, ProcessorConfig, ProcessorError, StretchProcessor};

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.json");
    let config = ProcessorConfig {
        speed: 1.3,
        pitch: 1.2,
        output_sample_rate_hz: Some(48000),
        engine: EngineTuning {
            segment_ms: 30.0,
            pitch_quality: PitchQuality::HighSpeed,
            process_mode: ProcessMode::Offline,
            ..EngineTuning::default()
        },
    };

    write_config_json(&path, &config).unwrap();
    assert_eq!(read_config_json(&path).unwrap(), config);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_config_json(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ProcessorError::Io(_)));
}

#[test]
fn test_malformed_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ speed: fast }").unwrap();

    match read_config_json(&path) {
        Err(ProcessorError::Config(msg)) => assert!(msg.contains("broken.json"), "{}", msg),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_invalid_tuning_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuning.json");
    std::fs::write(&path, r#"{ "engine": { "segment_ms": 0.0 } }"#).unwrap();
    assert!(matches!(
        read_config_json(&path),
        Err(ProcessorError::InvalidParameter { .. })
    ));
}

#[test]
fn test_loaded_config_drives_processor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.json");
    std::fs::write(&path, r#"{ "speed": 1.5, "output_sample_rate_hz": 48000 }"#).unwrap();

    let config = read_config_json(&path).unwrap();
    let mut processor: StretchProcessor = StretchProcessor::with_config(&config);
    assert_eq!(processor.speed(), 1.5);
    let out = processor.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    assert_eq!(out.sample_rate_hz, 48000);
    processor.flush();
    assert!(processor.is_active());
    assert_eq!(processor.engine().unwrap().config().tuning, config.engine);
}
