use std::io::{self, BufWriter};

use asciiplay::cli::Args;
use asciiplay::config::PlaybackConfig;
use asciiplay::playback::{PlaybackSummary, Session, TerminalControls};
use asciiplay::terminal::TerminalGuard;
use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = args.resolve_config(PlaybackConfig::load(args.config.as_deref()));
    let tools = args.tools(&config);
    let request = args.request();

    println!("asciiplay {}", env!("CARGO_PKG_VERSION"));

    let mut session = match Session::prepare(&config, &tools, &request) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let metadata = session.metadata();
    println!(
        "Video: {}x{} @ {:.2} fps",
        metadata.source_width, metadata.source_height, metadata.frame_rate
    );
    println!(
        "Display: {} | audio offset: {:.2}s",
        session.geometry(),
        config.audio_offset
    );

    let summary = match play(&mut session) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: could not set up terminal: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", summary);
    if let Some(reason) = summary.audio_failure() {
        eprintln!("Warning: audio playback failed: {}", reason);
    }
    if let Some(e) = &summary.error {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Run the session with the terminal in playback mode. The terminal is
/// restored before this returns.
fn play(session: &mut Session<'_>) -> io::Result<PlaybackSummary> {
    let _guard = TerminalGuard::enter()?;
    let mut out = BufWriter::new(io::stdout().lock());
    let mut controls = TerminalControls::new();
    Ok(session.run(&mut out, &mut controls))
}
