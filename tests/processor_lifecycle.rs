mod common;

use common::{init_logging, to_bytes, RecordingStretcher};
use stretch_stage::{
    AudioFormat, Encoding, EngineOptions, OutputSampleRate, ProcessorConfig, ProcessorError,
    StretchProcessor,
};

fn recording() -> StretchProcessor<RecordingStretcher> {
    init_logging();
    StretchProcessor::with_config(&ProcessorConfig::default())
}

/// Everything a caller can observe without queueing audio.
fn observe(p: &mut StretchProcessor<RecordingStretcher>) -> String {
    let pending_output = p.output().len();
    format!(
        "{} {} {} {:?} {:?} {} {} {} {}",
        p.is_active(),
        p.is_ended(),
        p.engine().is_none(),
        p.input_format(),
        p.output_format(),
        p.speed(),
        p.pitch(),
        p.media_duration(1000),
        pending_output,
    )
}

#[test]
fn test_engine_built_with_requested_parameters() {
    let mut p = recording();
    p.set_speed(1.3);
    p.set_pitch(1.2);
    p.configure(AudioFormat::pcm16(48000, 2)).unwrap();
    p.flush();

    assert!(p.is_active());
    let engine = p.engine().expect("engine built at flush");
    assert_eq!(engine.config.speed, 1.3);
    assert_eq!(engine.config.pitch, 1.2);
    assert_eq!(engine.config.sample_rate, 48000);
    assert_eq!(engine.config.output_sample_rate, 48000);
    assert_eq!(engine.config.channels, 2);
    assert_eq!(engine.config.options, EngineOptions::REALTIME_HIGH_QUALITY_PITCH);
}

#[test]
fn test_configure_keeps_rate_without_pin() {
    let mut p = recording();
    let out = p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    assert_eq!(out, AudioFormat::pcm16(44100, 2));
}

#[test]
fn test_configure_uses_pinned_rate() {
    let mut p = recording();
    p.set_output_sample_rate(OutputSampleRate::Hz(48000));
    let out = p.configure(AudioFormat::pcm16(44100, 1)).unwrap();
    assert_eq!(out, AudioFormat::pcm16(48000, 1));
    // A rate change alone makes the stage active.
    assert!(p.is_active());
}

#[test]
fn test_configure_rejects_unsupported_encodings() {
    let mut p = recording();
    for encoding in [
        Encoding::Pcm8Bit,
        Encoding::Pcm24Bit,
        Encoding::Pcm32Bit,
        Encoding::PcmFloat,
    ] {
        let format = AudioFormat::new(44100, 2, encoding);
        assert!(matches!(
            p.configure(format),
            Err(ProcessorError::UnsupportedFormat(_))
        ));
    }
    assert!(p.configure(AudioFormat::pcm16(0, 2)).is_err());
    assert!(p.configure(AudioFormat::pcm16(44100, 0)).is_err());
}

#[test]
fn test_zero_output_rate_keeps_previous_pending_format() {
    let mut p = recording();
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    p.set_output_sample_rate(OutputSampleRate::Hz(0));
    assert!(matches!(
        p.configure(AudioFormat::pcm16(48000, 2)),
        Err(ProcessorError::UnsupportedFormat(f)) if f == AudioFormat::pcm16(0, 2)
    ));

    // The earlier 44100 Hz pass-through negotiation is still what flush commits.
    assert!(!p.is_active());
    p.set_output_sample_rate(OutputSampleRate::Hz(48000));
    assert!(!p.is_active());
    p.flush();
    assert!(p.engine().is_none());
}

#[test]
fn test_configure_does_not_touch_active_format() {
    let mut p = recording();
    p.set_speed(2.0);
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    p.flush();
    p.configure(AudioFormat::pcm16(22050, 1)).unwrap();

    assert_eq!(p.input_format(), Some(AudioFormat::pcm16(44100, 2)));
    assert_eq!(p.engine().unwrap().config.sample_rate, 44100);

    p.flush();
    assert_eq!(p.input_format(), Some(AudioFormat::pcm16(22050, 1)));
    assert_eq!(p.engine().unwrap().config.channels, 1);
}

#[test]
fn test_is_active_threshold_rule() {
    let formats = [
        AudioFormat::pcm16(8000, 1),
        AudioFormat::pcm16(44100, 2),
        AudioFormat::pcm16(48000, 6),
    ];
    let values = [0.5, 0.9999, 0.99995, 1.0, 1.00005, 1.0001, 1.3];

    for format in formats {
        for &speed in &values {
            for &pitch in &values {
                let mut p = recording();
                p.set_speed(speed);
                p.set_pitch(pitch);
                p.configure(format).unwrap();
                p.flush();

                let expected =
                    (speed - 1.0f64).abs() >= 1e-4 || (pitch - 1.0f64).abs() >= 1e-4;
                assert_eq!(
                    p.is_active(),
                    expected,
                    "speed {} pitch {} format {}",
                    speed,
                    pitch,
                    format
                );
                assert_eq!(p.engine().is_some(), expected);
            }
        }
    }
}

#[test]
fn test_unconfigured_processor_is_never_active() {
    let mut p = recording();
    p.set_speed(3.0);
    assert!(!p.is_active());
    p.flush();
    assert!(p.engine().is_none());
}

#[test]
fn test_repeated_pitch_is_no_op() {
    let mut p = recording();
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    p.set_pitch(1.4);
    p.flush();
    let first = p.engine().unwrap().id;

    p.set_pitch(1.4);
    p.flush();
    let engine = p.engine().unwrap();
    assert_eq!(engine.id, first, "unchanged pitch must not rebuild the engine");
    assert_eq!(engine.resets, 1);
}

#[test]
fn test_parameter_change_rebuilds_engine() {
    let mut p = recording();
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    p.set_speed(1.5);
    p.flush();
    let first = p.engine().unwrap().id;

    p.set_speed(0.75);
    // Not applied until the next flush.
    assert_eq!(p.engine().unwrap().config.speed, 1.5);
    p.flush();

    let engine = p.engine().unwrap();
    assert_ne!(engine.id, first);
    assert_eq!(engine.config.speed, 0.75);
    assert_eq!(engine.resets, 0);
}

#[test]
fn test_flush_clears_stream_state() {
    let mut p = recording();
    p.set_speed(2.0);
    p.configure(AudioFormat::pcm16(44100, 1)).unwrap();
    p.flush();

    p.queue_input(&to_bytes(&vec![100i16; 2048]));
    p.queue_end_of_stream();
    assert!(!p.output().is_empty());
    assert!(p.is_ended());

    p.flush();
    assert!(!p.is_ended());
    assert!(p.output().is_empty());
    assert_eq!(p.media_duration(1000), 2000);
}

#[test]
fn test_reset_restores_fresh_state() {
    let mut fresh = recording();
    let expected = observe(&mut fresh);

    let mut p = recording();
    p.set_speed(1.3);
    p.set_pitch(0.8);
    p.set_output_sample_rate(OutputSampleRate::Hz(48000));
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    p.flush();
    p.queue_input(&to_bytes(&vec![7i16; 4096]));
    p.queue_end_of_stream();

    p.reset();
    assert_eq!(observe(&mut p), expected);

    // The pinned output rate is gone too.
    let out = p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    assert_eq!(out.sample_rate_hz, 44100);
}

#[test]
fn test_reset_is_idempotent() {
    let mut p = recording();
    p.set_speed(2.0);
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    p.flush();

    p.reset();
    let once = observe(&mut p);
    p.reset();
    assert_eq!(observe(&mut p), once);
}

#[test]
fn test_end_of_stream_without_engine() {
    let mut p = recording();
    assert!(!p.is_ended());
    p.queue_end_of_stream();
    assert!(p.is_ended());
}

#[test]
fn test_empty_input_is_ignored_before_flush() {
    let mut p = recording();
    p.set_speed(2.0);
    p.configure(AudioFormat::pcm16(44100, 2)).unwrap();
    // No engine yet, but empty buffers are a no-op rather than a fault.
    p.queue_input(&[]);
    assert!(p.output().is_empty());
}
