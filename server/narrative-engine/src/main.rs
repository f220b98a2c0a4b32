//! Binary entrypoint: read Event JSON lines from stdin, write one Analysis
//! JSON document to stdout.
//!
//! Blank lines are skipped. Lines that fail to parse are logged to stderr and
//! skipped. Set `NARRATIVE_ENGINE_CONFIG` to a JSON config file to override
//! defaults; `RUST_LOG` controls log verbosity.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use narrative_engine::{Analysis, Config, Engine, Event};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "NARRATIVE_ENGINE_CONFIG";

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let engine = match load_engine() {
    Ok(engine) => engine,
    Err(e) => {
      error!(error = %e, "failed to load config");
      return ExitCode::FAILURE;
    }
  };

  let events = match read_events(io::stdin().lock()) {
    Ok(events) => events,
    Err(e) => {
      error!(error = %e, "read error");
      return ExitCode::FAILURE;
    }
  };
  info!(events = events.len(), "read events");

  let analysis = engine.analyze(&events);

  if let Err(e) = write_json(io::stdout().lock(), &analysis) {
    error!(error = %e, "write error");
    return ExitCode::FAILURE;
  }
  ExitCode::SUCCESS
}

fn load_engine() -> Result<Engine, Box<dyn std::error::Error>> {
  let Ok(path) = std::env::var(CONFIG_ENV) else {
    return Ok(Engine::with_defaults());
  };
  let json = std::fs::read_to_string(&path)?;
  let config = Config::from_json(&json)?;
  info!(path = %path, "loaded config");
  Ok(Engine::new(config)?)
}

fn read_events(input: impl BufRead) -> io::Result<Vec<Event>> {
  let mut events = Vec::new();
  for (n, line) in input.lines().enumerate() {
    let line = line?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }
    match serde_json::from_str::<Event>(trimmed) {
      Ok(event) => events.push(event),
      Err(e) => warn!(line = n + 1, error = %e, "skipping unparsable event"),
    }
  }
  Ok(events)
}

fn write_json(output: impl Write, analysis: &Analysis) -> io::Result<()> {
  let mut out = io::BufWriter::new(output);
  serde_json::to_writer(&mut out, analysis)?;
  writeln!(out)?;
  out.flush()
}
