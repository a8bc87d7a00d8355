//! Integration tests for the transcription pipeline

use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::mpsc;

use melody_transcriber::analysis::result::AnalysisFlag;
use melody_transcriber::features::pitch::{analyze, PitchTrackSmoother};
use melody_transcriber::io::decode_audio_bytes;
use melody_transcriber::notation::model::{MeasureEvent, PitchView};
use melody_transcriber::notation::transposition::TranspositionEngine;
use melody_transcriber::notation::{catalog, ExportViews, InstrumentProfile};
use melody_transcriber::{
    spawn_transcription, transcribe, transcribe_audio, AudioBuffer, AutocorrelationEstimator,
    CancellationToken, Key, KeySource, NotationExporter, NoteModel, PitchEstimate, PitchEstimator,
    TimeSignature, TranscriptionConfig, TranscriptionError, TranscriptionRequest,
    TranscriptionWarning,
};

const SAMPLE_RATE: u32 = 44100;

/// Render `(frequency, seconds)` pairs as a sine melody; frequency 0.0 is silence
fn render(melody: &[(f32, f32)]) -> Vec<f32> {
    let mut samples = Vec::new();
    for &(frequency, seconds) in melody {
        let n = (seconds * SAMPLE_RATE as f32).round() as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            samples.push(if frequency > 0.0 {
                0.5 * (2.0 * PI * frequency * t).sin()
            } else {
                0.0
            });
        }
    }
    samples
}

fn midi_hz(midi: f32) -> f32 {
    440.0 * 2.0f32.powf((midi - 69.0) / 12.0)
}

/// Deterministic estimator: period from interpolated positive-going zero crossings
struct ZeroCrossingEstimator {
    sample_rate: u32,
}

impl PitchEstimator for ZeroCrossingEstimator {
    fn expected_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn estimate(&mut self, frame: &[f32]) -> PitchEstimate {
        let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len().max(1) as f32).sqrt();
        if rms < 0.01 {
            return PitchEstimate::unvoiced(0.0);
        }
        let crossings: Vec<f32> = frame
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] < 0.0 && w[1] >= 0.0)
            .map(|(i, w)| i as f32 + w[0] / (w[0] - w[1]))
            .collect();
        if crossings.len() < 2 {
            return PitchEstimate::unvoiced(0.2);
        }
        let span = crossings[crossings.len() - 1] - crossings[0];
        let frequency = (crossings.len() - 1) as f32 * self.sample_rate as f32 / span;
        PitchEstimate::voiced(frequency, 0.9)
    }
}

fn stub() -> ZeroCrossingEstimator {
    ZeroCrossingEstimator {
        sample_rate: SAMPLE_RATE,
    }
}

fn buffer(melody: &[(f32, f32)]) -> AudioBuffer {
    AudioBuffer::new(render(melody), SAMPLE_RATE).unwrap()
}

/// C5 E5 G5 (quarters), quarter rest, C5 (half) at 120 BPM
fn arpeggio() -> AudioBuffer {
    buffer(&[
        (midi_hz(72.0), 0.5),
        (midi_hz(76.0), 0.5),
        (midi_hz(79.0), 0.5),
        (0.0, 0.5),
        (midi_hz(72.0), 1.0),
    ])
}

fn concert_midis(model: &NoteModel) -> Vec<i32> {
    model.notes().map(|n| n.concert.midi).collect()
}

#[test]
fn test_transcribe_arpeggio_end_to_end() {
    let request = TranscriptionRequest::new("flute", 120);
    let outcome = transcribe(
        &arpeggio(),
        &request,
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .expect("Transcription should succeed");

    let model = &outcome.model;
    assert_eq!(concert_midis(model), vec![72, 76, 79, 72]);
    assert_eq!(model.measures.len(), 2);

    let first: Vec<(bool, u32)> = model.measures[0]
        .events
        .iter()
        .map(|e| (e.as_note().is_some(), e.duration_ticks()))
        .collect();
    assert_eq!(first, vec![(true, 480), (true, 480), (true, 480), (false, 480)]);

    let second = &model.measures[1];
    assert_eq!(second.events[0].duration_ticks(), 960);
    assert!(matches!(
        second.events[1],
        MeasureEvent::Rest {
            start_tick: 2880,
            duration_ticks: 960
        }
    ));

    assert_eq!(outcome.key.key, Key::Major(0));
    assert_eq!(outcome.key.source, KeySource::Detected);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.metadata.frames_analyzed, 300);
    assert_eq!(outcome.metadata.segments, 4);
    assert_eq!(outcome.metadata.sample_rate, SAMPLE_RATE);
    assert!(outcome.confidence.overall_confidence > 0.5);
}

/// A4 struck twice: the decay envelope restarts at 0.5 s with no pitch change
fn reattacked_a4() -> AudioBuffer {
    let samples: Vec<f32> = (0..SAMPLE_RATE as usize)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            0.8 * (-3.0 * (t % 0.5)).exp() * (2.0 * PI * 440.0 * t).sin()
        })
        .collect();
    AudioBuffer::new(samples, SAMPLE_RATE).unwrap()
}

#[test]
fn test_reattacked_note_splits_at_onset() {
    let request = TranscriptionRequest::new("oboe", 120);
    let token = CancellationToken::new();

    let outcome = transcribe(
        &reattacked_a4(),
        &request,
        stub(),
        &TranscriptionConfig::default(),
        &token,
    )
    .unwrap();
    let notes: Vec<(i32, u32)> = outcome
        .model
        .notes()
        .map(|n| (n.concert.midi, n.duration_ticks))
        .collect();
    assert_eq!(notes, vec![(69, 480), (69, 480)]);
    assert!(outcome.metadata.onsets_detected >= 1);

    // Pitch changes alone cannot see the second attack
    let config = TranscriptionConfig {
        onset_detection: false,
        ..Default::default()
    };
    let outcome = transcribe(&reattacked_a4(), &request, stub(), &config, &token).unwrap();
    let notes: Vec<(i32, u32)> = outcome
        .model
        .notes()
        .map(|n| (n.concert.midi, n.duration_ticks))
        .collect();
    assert_eq!(notes, vec![(69, 960)]);
    assert_eq!(outcome.metadata.onsets_detected, 0);
}

#[test]
fn test_ordering_and_contiguity() {
    let outcome = transcribe(
        &arpeggio(),
        &TranscriptionRequest::new("violin", 97).with_time_signature(TimeSignature::THREE_FOUR),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    let capacity = TimeSignature::THREE_FOUR.measure_ticks();
    let mut expected = 0;
    for (i, measure) in outcome.model.measures.iter().enumerate() {
        assert_eq!(measure.start_tick, i as u32 * capacity);
        assert_eq!(measure.filled_ticks(), capacity);
        for event in &measure.events {
            assert_eq!(event.start_tick(), expected);
            assert!(event.end_tick() <= measure.start_tick + capacity);
            expected = event.end_tick();
        }
    }
}

#[test]
fn test_four_seconds_of_silence() {
    let silence = buffer(&[(0.0, 4.0)]);
    let outcome = transcribe_audio(
        &silence,
        &TranscriptionRequest::new("soprano_voice", 120),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .expect("Silence is not an error");

    assert!(outcome.model.is_empty());
    assert_eq!(outcome.warnings, vec![TranscriptionWarning::NoVoicedAudio]);
    assert_eq!(outcome.metadata.voiced_frames, 0);
    assert_eq!(outcome.confidence.overall_confidence, 0.0);
    assert!(outcome.confidence.flags.contains(&AnalysisFlag::SparseVoicing));
}

#[test]
fn test_horn_in_f_written_view() {
    let a4 = buffer(&[(440.0, 2.0)]);
    let request = TranscriptionRequest::new("horn_f", 120).with_key(Key::Major(0));
    let outcome = transcribe(
        &a4,
        &request,
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    let note = outcome.model.notes().next().expect("one note");
    assert_eq!(note.concert.midi, 69);
    assert_eq!(note.written.midi, 76);
    assert_eq!(note.written.spelling.to_string(), "E5");

    let written = outcome.model.view(PitchView::Written);
    assert!(written.is_transposed_view());
    assert_eq!(written.key(), Key::Major(7));
    let concert = outcome.model.view(PitchView::Concert);
    assert!(!concert.is_transposed_view());
    assert_eq!(concert.key(), Key::Major(0));
}

#[test]
fn test_transposition_round_trip_over_catalog() {
    let catalog = catalog().unwrap();
    assert!(catalog.len() >= 78);
    for profile in catalog.all() {
        let engine = TranspositionEngine::new(profile);
        for midi in 0..=127 {
            assert_eq!(engine.to_concert(engine.to_written(midi)), midi, "{}", profile.id);
        }
    }
}

#[test]
fn test_analysis_and_smoothing_are_idempotent() {
    let audio = arpeggio();
    let config = TranscriptionConfig::default();
    let run = || {
        let estimator = AutocorrelationEstimator::from_config(SAMPLE_RATE, &config).unwrap();
        let frames = analyze(&audio, config.hop_seconds, estimator, &config).unwrap();
        PitchTrackSmoother::from_config(&config).smooth(frames)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_builtin_estimator_on_sustained_tone() {
    let a4 = buffer(&[(440.0, 2.0)]);
    let outcome = transcribe_audio(
        &a4,
        &TranscriptionRequest::new("oboe", 120),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();
    let midis = concert_midis(&outcome.model);
    assert!(!midis.is_empty());
    assert!(midis.iter().all(|&m| m == 69), "{:?}", midis);
}

#[test]
fn test_cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();
    let result = transcribe(
        &arpeggio(),
        &TranscriptionRequest::new("flute", 120),
        stub(),
        &TranscriptionConfig::default(),
        &token,
    );
    assert_eq!(result.unwrap_err(), TranscriptionError::TranscriptionCancelled);
}

/// Waits for a go signal before its first estimate
struct GatedEstimator {
    inner: ZeroCrossingEstimator,
    gate: Option<mpsc::Receiver<()>>,
}

impl PitchEstimator for GatedEstimator {
    fn expected_sample_rate(&self) -> u32 {
        self.inner.expected_sample_rate()
    }

    fn estimate(&mut self, frame: &[f32]) -> PitchEstimate {
        if let Some(gate) = self.gate.take() {
            let _ = gate.recv();
        }
        self.inner.estimate(frame)
    }
}

#[test]
fn test_background_worker_cancellation() {
    let (go, gate) = mpsc::channel();
    let handle = spawn_transcription(
        arpeggio(),
        TranscriptionRequest::new("flute", 120),
        GatedEstimator {
            inner: stub(),
            gate: Some(gate),
        },
        TranscriptionConfig::default(),
    )
    .unwrap();

    handle.cancel();
    // The worker may already have stopped at the first stage check
    let _ = go.send(());
    assert_eq!(handle.join().unwrap_err(), TranscriptionError::TranscriptionCancelled);
}

#[test]
fn test_background_worker_completes() {
    let handle = spawn_transcription(
        arpeggio(),
        TranscriptionRequest::new("flute", 120),
        stub(),
        TranscriptionConfig::default(),
    )
    .unwrap();
    let outcome = handle.join().unwrap();
    assert_eq!(concert_midis(&outcome.model), vec![72, 76, 79, 72]);
}

#[test]
fn test_key_override_replaces_detection() {
    let outcome = transcribe(
        &arpeggio(),
        &TranscriptionRequest::new("flute", 120).with_key(Key::Minor(2)),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(outcome.key.key, Key::Minor(2));
    assert_eq!(outcome.key.source, KeySource::Manual);
    assert_eq!(outcome.key.correlation_score, 1.0);
    assert_eq!(outcome.model.concert_key, Key::Minor(2));
}

#[test]
fn test_sample_rate_mismatch_is_rejected() {
    let audio = AudioBuffer::new(vec![0.0f32; 48000], 48000).unwrap();
    let result = transcribe(
        &audio,
        &TranscriptionRequest::new("flute", 120),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    );
    assert_eq!(
        result.unwrap_err(),
        TranscriptionError::UnsupportedSampleRate {
            actual: 48000,
            expected: 44100
        }
    );
}

#[test]
fn test_unknown_instrument_and_bad_tempo() {
    let config = TranscriptionConfig::default();
    let token = CancellationToken::new();
    assert!(matches!(
        transcribe(
            &arpeggio(),
            &TranscriptionRequest::new("theremin_in_z", 120),
            stub(),
            &config,
            &token
        ),
        Err(TranscriptionError::UnknownInstrument(_))
    ));
    assert!(matches!(
        transcribe(&arpeggio(), &TranscriptionRequest::new("flute", 0), stub(), &config, &token),
        Err(TranscriptionError::InvalidInput(_))
    ));
}

#[test]
fn test_out_of_range_notes_are_warned() {
    // A4 is below the piccolo's sounding range
    let outcome = transcribe(
        &buffer(&[(440.0, 1.0)]),
        &TranscriptionRequest::new("piccolo", 120),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(outcome.model.note_count(), 1);
    assert!(matches!(
        outcome.warnings.as_slice(),
        [TranscriptionWarning::InstrumentRangeExceeded { measure: 0, midi: 69, .. }]
    ));
}

#[test]
fn test_decode_in_memory_wav() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mono = render(&[(midi_hz(67.0), 1.0)]);
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in &mono {
            let v = (s * i16::MAX as f32) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();
    }

    let decoded = decode_audio_bytes(cursor.into_inner(), Some("wav")).unwrap();
    assert_eq!(decoded.sample_rate(), SAMPLE_RATE);
    assert_eq!(decoded.len(), mono.len());

    let outcome = transcribe(
        &decoded,
        &TranscriptionRequest::new("violin", 120),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(concert_midis(&outcome.model), vec![67]);
}

/// Collects a line per note for each requested view
struct TextExporter;

impl NotationExporter for TextExporter {
    type Output = Vec<String>;

    fn export(
        &mut self,
        model: NoteModel,
        instrument: &InstrumentProfile,
        views: ExportViews,
    ) -> Result<Vec<String>, TranscriptionError> {
        let mut lines = Vec::new();
        for view in views.iter() {
            let score = model.view(view);
            for measure in score.measures() {
                for note in measure.notes() {
                    lines.push(format!(
                        "{} {:?} {}",
                        instrument.id,
                        view,
                        score.pitch(note).spelling
                    ));
                }
            }
        }
        Ok(lines)
    }
}

#[test]
fn test_exporter_consumes_both_views() {
    let outcome = transcribe(
        &buffer(&[(midi_hz(70.0), 1.0)]),
        &TranscriptionRequest::new("clarinet_bb", 120).with_key(Key::Major(5)),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    let clarinet = melody_transcriber::notation::instrument("clarinet_bb").unwrap();
    let lines = TextExporter
        .export(outcome.model, clarinet, ExportViews::for_instrument(clarinet))
        .unwrap();
    assert_eq!(
        lines,
        vec![
            "clarinet_bb Concert Bb4".to_string(),
            "clarinet_bb Written C5".to_string(),
        ]
    );
}

#[test]
fn test_outcome_serializes_to_json() {
    let outcome = transcribe(
        &arpeggio(),
        &TranscriptionRequest::new("flute", 120),
        stub(),
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )
    .unwrap();
    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains("\"instrument_id\":\"flute\""));
}
