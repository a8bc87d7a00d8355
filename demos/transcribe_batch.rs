//! Example: Transcribe multiple audio files in parallel
//!
//! Usage:
//!   cargo run --release --example transcribe_batch -- [--jobs N] [--json]
//!       [--instrument ID] [--tempo BPM] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files (batch-level). Each transcription is still single-threaded.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.
//! - With --json, each line is the full serialized outcome of one file (JSONL).

use melody_transcriber::io::decode_audio;
use melody_transcriber::{
    transcribe_audio, CancellationToken, TranscriptionConfig, TranscriptionOutcome,
    TranscriptionRequest,
};
use rayon::prelude::*;
use std::env;
use std::time::Instant;

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn transcribe_path(
    path: &str,
    request: &TranscriptionRequest,
    config: &TranscriptionConfig,
    cancel: &CancellationToken,
) -> Result<TranscriptionOutcome, String> {
    let buffer = decode_audio(path).map_err(|e| format!("decode failed: {e}"))?;
    transcribe_audio(&buffer, request, config, cancel)
        .map_err(|e| format!("transcription failed: {e}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut request = TranscriptionRequest::new("flute", 120);
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" | "--instrument" | "--tempo" => {
                let v = args.first().cloned().ok_or(format!("{a} requires a value"))?;
                args.remove(0);
                match a.as_str() {
                    "--jobs" => jobs = Some(std::cmp::max(1, v.parse::<usize>()?)),
                    "--instrument" => request.instrument = v,
                    _ => request.tempo_bpm = v.parse()?,
                }
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: transcribe_batch [--jobs N] [--json] [--instrument ID] \
                     [--tempo BPM] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let config = TranscriptionConfig::default();
    let cancel = CancellationToken::new();
    let t0 = Instant::now();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let outs: Vec<(String, Result<TranscriptionOutcome, String>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| (path.clone(), transcribe_path(path, &request, &config, &cancel)))
            .collect()
    });

    for (idx, (path, out)) in outs.iter().enumerate() {
        match (out, json) {
            (Ok(outcome), true) => println!(
                "{{\"file\":{},\"outcome\":{}}}",
                serde_json::to_string(path)?,
                serde_json::to_string(outcome)?
            ),
            (Err(e), true) => println!(
                "{{\"file\":{},\"error\":{}}}",
                serde_json::to_string(path)?,
                serde_json::to_string(e)?
            ),
            (Ok(outcome), false) => println!(
                "[{}/{}] {}: Key={} notes={} measures={} conf={:.3} warnings={} time={:.2}ms",
                idx + 1,
                outs.len(),
                path,
                outcome.key.key.name(),
                outcome.model.note_count(),
                outcome.model.measures.len(),
                outcome.confidence.overall_confidence,
                outcome.warnings.len(),
                outcome.metadata.processing_time_ms
            ),
            (Err(e), false) => println!("[{}/{}] {}: ERROR: {}", idx + 1, outs.len(), path, e),
        }
    }

    let ok = outs.iter().filter(|(_, o)| o.is_ok()).count();
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
