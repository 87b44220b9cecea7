//! Resonance CLI - Command-line interface for the Resonance Engine
//!
//! Commands:
//! - transform: Analyze interaction events into behavioral reports (batch mode)
//! - validate: Validate interaction event NDJSON

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use resonance_engine::{
    Engine, EngineConfig, InteractionEvent, OutcomeRecord, ReportEncoder, ENGINE_VERSION,
};

/// Resonance - Behavioral state inference engine
#[derive(Parser)]
#[command(name = "resonance")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Infer behavioral state from interaction events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze interaction events into behavioral reports (batch mode)
    Transform {
        /// Input file path with event NDJSON (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path for report JSON (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// User identifier for the batch
        #[arg(long, default_value = "anonymous")]
        user_id: String,

        /// Session identifier for the batch; events carrying their own
        /// session id are grouped accordingly
        #[arg(long, default_value = "session-1")]
        session_id: String,

        /// Load engine configuration from a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Additionally append a flat outcome record to this file
        #[arg(long)]
        outcomes: Option<PathBuf>,

        /// Pretty-print the report JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Validate interaction event NDJSON
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Transform {
            input,
            output,
            user_id,
            session_id,
            config,
            outcomes,
            pretty,
        } => run_transform(input, output, user_id, session_id, config, outcomes, pretty),
        Commands::Validate { input, json } => run_validate(input, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_transform(
    input: PathBuf,
    output: PathBuf,
    user_id: String,
    session_id: String,
    config: Option<PathBuf>,
    outcomes: Option<PathBuf>,
    pretty: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let engine_config = match config {
        Some(path) => {
            let text = fs::read_to_string(&path)?;
            EngineConfig::from_json(&text)?
        }
        None => EngineConfig::builtin(),
    };
    let mut engine = Engine::with_config(engine_config)?;

    let text = read_input(&input)?;
    let (events, parse_errors) = parse_events(&text);
    for (line_no, error) in &parse_errors {
        eprintln!("line {line_no}: skipped malformed event: {error}");
    }

    let report = engine.analyze(&user_id, &session_id, events)?;

    let encoder = ReportEncoder::new();
    let json = if pretty {
        serde_json::to_string_pretty(&encoder.encode(&report))?
    } else {
        encoder.encode_to_json(&report)?
    };
    write_output(&output, &format!("{json}\n"))?;

    if let Some(path) = outcomes {
        let record = OutcomeRecord::from_analysis(&report);
        let mut existing = fs::read_to_string(&path).unwrap_or_default();
        existing.push_str(&record.to_line());
        existing.push('\n');
        fs::write(&path, existing)?;
    }

    Ok(if parse_errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_validate(input: PathBuf, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let text = read_input(&input)?;
    let (events, parse_errors) = parse_events(&text);

    if json {
        let report = serde_json::json!({
            "valid_events": events.len(),
            "errors": parse_errors
                .iter()
                .map(|(line, e)| serde_json::json!({"line": line, "error": e}))
                .collect::<Vec<_>>(),
        });
        println!("{report}");
    } else {
        println!("{} valid event(s)", events.len());
        for (line_no, error) in &parse_errors {
            println!("line {line_no}: {error}");
        }
    }

    Ok(if parse_errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn parse_events(text: &str) -> (Vec<InteractionEvent>, Vec<(usize, String)>) {
    let mut events = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<InteractionEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => errors.push((idx + 1, e.to_string())),
        }
    }

    (events, errors)
}

fn read_input(path: &PathBuf) -> Result<String, Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        if atty::is(atty::Stream::Stdin) {
            eprintln!("reading events from stdin (end with EOF)...");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &PathBuf, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if path.as_os_str() == "-" {
        io::stdout().write_all(content.as_bytes())?;
        Ok(())
    } else {
        fs::write(path, content)?;
        Ok(())
    }
}
