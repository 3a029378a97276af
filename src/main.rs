//! Application entry point: terminal bilingual reader.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse arguments and load [`AppConfig`] (defaults on first run).
//!    `--init-config` writes the settings file and stops here.
//! 3. Build the OpenAI-compatible client; `--validate-key` stops here.
//! 4. Open the audio output (falls back to a device-less output).
//! 5. Wire session, sequencer and orchestrator.
//! 6. Spawn the state-event printer, the stdin reader and the optional
//!    hotkey listener.
//! 7. Run the [`Controller`] until `q` or end of input.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

use bilingual_reader::audio::{AudioOutput, AudioPayload, AudioPlayer, OutputSession, PlaybackError};
use bilingual_reader::config::AppConfig;
use bilingual_reader::controller::{ControlEvent, Controller, HELP};
use bilingual_reader::pipeline::{
    PairStatus, PipelineOrchestrator, PlaybackSequencer, Session, SpeechSettings, StateEvent,
};
use bilingual_reader::service::{KeyValidator, OpenAiClient};
use bilingual_reader::text::{AbbreviationTable, Segmenter};

/// Translate text sentence by sentence and listen to it in both languages.
#[derive(Debug, Parser)]
#[command(name = "bilingual-reader", version)]
struct Args {
    /// Text file to process at start-up.  Without it, use `t <text>`.
    file: Option<PathBuf>,

    /// Settings file to use instead of the platform default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Check the API key against the service and exit.
    #[arg(long)]
    validate_key: bool,

    /// Write the effective settings to the settings file and exit.
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Arguments + configuration
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    if args.init_config {
        let written = init_config(&config, args.config.as_deref())?;
        println!("Settings written to {}", written.display());
        return Ok(());
    }

    // 3. Service client
    let client = Arc::new(OpenAiClient::from_config(&config));
    if args.validate_key {
        if client.validate().await {
            println!("API key is valid");
            return Ok(());
        }
        anyhow::bail!("API key is missing or was rejected");
    }

    let text = args
        .file
        .as_deref()
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))
        })
        .transpose()?;

    // 4. Audio output
    let output = open_output();

    // 5. Core wiring
    let session = Session::new();
    let playback = Arc::new(PlaybackSequencer::new(
        Arc::clone(&session),
        AudioPlayer::new(output),
    ));
    let abbreviations =
        AbbreviationTable::english().with_extra(&config.segmenter.extra_abbreviations);
    log::debug!("segmenter: {} abbreviations", abbreviations.entries().len());
    let orchestrator = Arc::new(
        PipelineOrchestrator::new(
            Arc::clone(&session),
            Segmenter::new(abbreviations),
            client.clone(),
            client,
            playback,
        )
        .with_speech_settings(SpeechSettings::from_config(&config.speech)),
    );

    // 6. Event sources
    let (tx, rx) = mpsc::channel::<ControlEvent>(32);
    tokio::spawn(print_events(session.subscribe()));

    #[cfg(feature = "global-hotkey")]
    let _hotkey = start_hotkey(&config.hotkey, tx.clone());

    println!("{HELP}");
    if let Some(text) = text {
        tx.send(ControlEvent::Process(text)).await?;
    }
    tokio::spawn(read_commands(tx));

    // 7. Control loop
    Controller::new(orchestrator).run(rx).await;
    Ok(())
}

/// Save `config` to `path`, or to the platform settings file when `None`.
fn init_config(config: &AppConfig, path: Option<&Path>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => {
            config
                .save_to(path)
                .with_context(|| format!("cannot write config {}", path.display()))?;
            Ok(path.to_path_buf())
        }
        None => {
            config.save().context("cannot write settings file")?;
            Ok(bilingual_reader::config::AppPaths::new().settings_file)
        }
    }
}

// ---------------------------------------------------------------------------
// Event sources / sinks
// ---------------------------------------------------------------------------

/// Forward terminal lines as control events.  End of input quits.
async fn read_commands(tx: mpsc::Sender<ControlEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => match ControlEvent::parse(&line) {
                Ok(event) => event,
                Err(e) => {
                    eprintln!("{e}");
                    continue;
                }
            },
            Ok(None) => ControlEvent::Quit,
            Err(e) => {
                log::error!("stdin: {e}");
                ControlEvent::Quit
            }
        };
        let quit = event == ControlEvent::Quit;
        if tx.send(event).await.is_err() || quit {
            return;
        }
    }
}

/// Print progress, errors and playback changes as they happen.
async fn print_events(mut events: broadcast::Receiver<StateEvent>) {
    loop {
        match events.recv().await {
            Ok(StateEvent::Progress(progress)) if !progress.message.is_empty() => {
                println!("[{}/{}] {}", progress.current, progress.total, progress.message);
            }
            Ok(StateEvent::PairsReplaced { count }) if count > 0 => {
                println!("{count} sentence(s) queued");
            }
            Ok(StateEvent::LastError(Some(message))) => eprintln!("error: {message}"),
            Ok(StateEvent::PairChanged {
                index,
                status: PairStatus::Complete,
            }) => println!("sentence {} ready", index + 1),
            Ok(StateEvent::Playback(state)) if state.is_playing => {
                println!("playing sentence {} ({})", state.index + 1, state.language);
            }
            Ok(StateEvent::NothingToPlay) => println!("nothing to play yet"),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("events: skipped {skipped} state events");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

#[cfg(feature = "global-hotkey")]
fn start_hotkey(
    config: &bilingual_reader::config::HotkeyConfig,
    tx: mpsc::Sender<ControlEvent>,
) -> Option<bilingual_reader::hotkey::HotkeyListener> {
    use bilingual_reader::hotkey::{parse_key, HotkeyListener};

    if !config.enabled {
        return None;
    }
    let Some(key) = parse_key(&config.advance_key) else {
        log::warn!("Unknown hotkey {:?}; global hotkey disabled", config.advance_key);
        return None;
    };
    HotkeyListener::start(key, tx)
        .map_err(|e| log::warn!("Could not start hotkey listener: {e}"))
        .ok()
}

// ---------------------------------------------------------------------------
// Audio output selection
// ---------------------------------------------------------------------------

#[cfg(feature = "rodio-output")]
fn open_output() -> Arc<dyn AudioOutput> {
    match bilingual_reader::audio::RodioOutput::new() {
        Ok(output) => Arc::new(output),
        Err(e) => {
            log::warn!("{e}. Playback is disabled.");
            Arc::new(NoDeviceOutput { error: e })
        }
    }
}

#[cfg(not(feature = "rodio-output"))]
fn open_output() -> Arc<dyn AudioOutput> {
    Arc::new(NoDeviceOutput {
        error: PlaybackError::Device("built without the rodio-output feature".into()),
    })
}

// ---------------------------------------------------------------------------
// NoDeviceOutput: fallback AudioOutput when no device can be opened
// ---------------------------------------------------------------------------

/// Lets the app translate and synthesize even without a sound device; every
/// playback attempt fails with the original error.
struct NoDeviceOutput {
    error: PlaybackError,
}

impl AudioOutput for NoDeviceOutput {
    fn open(&self, _payload: &AudioPayload) -> Result<Arc<dyn OutputSession>, PlaybackError> {
        Err(self.error.clone())
    }
}
