//! Example: Transcribe a single audio file
//!
//! Usage:
//!   cargo run --release --example transcribe_file -- <file> [--instrument ID] [--tempo BPM]
//!       [--time 3/4] [--key Bb] [--written]

use melody_transcriber::io::decode_audio;
use melody_transcriber::notation::model::{MeasureEvent, PitchView};
use melody_transcriber::{
    transcribe_audio, CancellationToken, Key, TimeSignature, TranscriptionConfig,
    TranscriptionRequest,
};
use std::env;

fn parse_time_signature(text: &str) -> Result<TimeSignature, Box<dyn std::error::Error>> {
    let (beats, unit) = text.split_once('/').ok_or("time signature must look like 3/4")?;
    Ok(TimeSignature::new(beats.parse()?, unit.parse()?)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut path: Option<String> = None;
    let mut request = TranscriptionRequest::new("flute", 120);
    let mut view = PitchView::Concert;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        let mut value = || -> Result<String, Box<dyn std::error::Error>> {
            if args.is_empty() {
                return Err(format!("{} requires a value", a).into());
            }
            Ok(args.remove(0))
        };
        match a.as_str() {
            "--instrument" => request.instrument = value()?,
            "--tempo" => request.tempo_bpm = value()?.parse()?,
            "--time" => request.time_signature = parse_time_signature(&value()?)?,
            "--key" => request.key_override = Some(Key::parse(&value()?)?),
            "--written" => view = PitchView::Written,
            "--help" | "-h" => {
                eprintln!(
                    "Usage: transcribe_file <file> [--instrument ID] [--tempo BPM] \
                     [--time 3/4] [--key Bb] [--written]"
                );
                return Ok(());
            }
            _ => path = Some(a.clone()),
        }
    }

    let path = match path {
        Some(p) => p,
        None => {
            eprintln!("ERROR: Provide an audio file path. Use --help for usage.");
            std::process::exit(2);
        }
    };

    let buffer = decode_audio(&path)?;
    let outcome = transcribe_audio(
        &buffer,
        &request,
        &TranscriptionConfig::default(),
        &CancellationToken::new(),
    )?;
    let score = outcome.model.view(view);

    // Print results
    println!("Transcription Results:");
    println!("  Instrument: {}", outcome.model.instrument_id);
    println!(
        "  Key: {} ({:?}, correlation {:.2}, clarity {:.2})",
        score.key().long_name(),
        outcome.key.source,
        outcome.key.correlation_score,
        outcome.key.clarity
    );
    println!("  Clef: {}", score.clef().name());
    println!(
        "  Notes: {} in {} measures",
        outcome.model.note_count(),
        outcome.model.measures.len()
    );
    println!(
        "  Confidence: {:.2} ({})",
        outcome.confidence.overall_confidence,
        outcome.confidence.confidence_level()
    );
    println!("  Processing time: {:.2} ms", outcome.metadata.processing_time_ms);

    for measure in score.measures() {
        let events: Vec<String> = measure
            .events
            .iter()
            .map(|event| match event {
                MeasureEvent::Note(note) => {
                    let tie = if note.tie.to_next { "~" } else { "" };
                    format!("{}:{}{}", score.pitch(note).spelling, note.duration_ticks, tie)
                }
                MeasureEvent::Rest { duration_ticks, .. } => format!("r:{}", duration_ticks),
            })
            .collect();
        println!("  {:>3} | {}", measure.index + 1, events.join(" "));
    }

    for warning in &outcome.warnings {
        println!("  warning: {}", warning);
    }

    Ok(())
}
