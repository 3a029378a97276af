//! Control loop: maps user commands onto pipeline and playback operations.
//!
//! Front ends (the terminal reader in `main.rs`, the global hotkey) only
//! send [`ControlEvent`]s.  [`Controller::run`] owns the receiving end and
//! dispatches each event; long-running operations are spawned so an
//! `Advance` is never stuck behind a batch that is still translating.

use std::fmt::Write as _;
use std::ops::ControlFlow;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::Voice;
use crate::pipeline::{Language, PairStatus, PipelineOrchestrator, SessionState};

// ---------------------------------------------------------------------------
// ControlEvent
// ---------------------------------------------------------------------------

/// One user command.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Play the next entry (skipping the current one if playing).
    Advance,
    Stop,
    /// Jump to one half of a pair.  `index` is 0-based.
    PlaySentence { index: usize, language: Language },
    Regenerate,
    SetSpeed(f32),
    SetVoice(Voice),
    DismissError,
    /// Replace the current text.
    Process(String),
    Reset,
    List,
    Quit,
}

/// A terminal line that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command `{0}` (type `h` for help)")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Help text for the terminal front end.
pub const HELP: &str = "\
commands:
  <Enter> | n          play next (skips the current entry)
  s                    stop playback
  p <n> <src|tgt>      play sentence n (1-based) in one language
  r                    regenerate audio with the current voice/speed
  speed <x>            set speech speed (0.25 - 4.0)
  voice <name>         set voice (alloy, echo, fable, onyx, nova, shimmer)
  d                    dismiss the last error
  l                    list sentence pairs
  t <text>             translate new text
  x                    reset
  q                    quit";

impl ControlEvent {
    /// Parse one terminal line.  An empty line means [`ControlEvent::Advance`].
    ///
    /// ```
    /// use bilingual_reader::controller::ControlEvent;
    /// use bilingual_reader::pipeline::Language;
    ///
    /// assert_eq!(ControlEvent::parse(""), Ok(ControlEvent::Advance));
    /// assert_eq!(
    ///     ControlEvent::parse("p 2 tgt"),
    ///     Ok(ControlEvent::PlaySentence { index: 1, language: Language::Target })
    /// );
    /// ```
    pub fn parse(line: &str) -> Result<ControlEvent, CommandError> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command.to_ascii_lowercase().as_str() {
            "" | "n" | "next" => Ok(ControlEvent::Advance),
            "s" | "stop" => Ok(ControlEvent::Stop),
            "p" | "play" => parse_play(rest),
            "r" | "regen" | "regenerate" => Ok(ControlEvent::Regenerate),
            "speed" => rest
                .parse::<f32>()
                .ok()
                .filter(|speed| speed.is_finite())
                .map(ControlEvent::SetSpeed)
                .ok_or(CommandError::Usage("speed <x>")),
            "voice" => Voice::from_name(rest)
                .map(ControlEvent::SetVoice)
                .ok_or(CommandError::Usage(
                    "voice <alloy|echo|fable|onyx|nova|shimmer>",
                )),
            "d" | "dismiss" => Ok(ControlEvent::DismissError),
            "t" | "text" if rest.is_empty() => Err(CommandError::Usage("t <text>")),
            "t" | "text" => Ok(ControlEvent::Process(rest.to_string())),
            "x" | "reset" => Ok(ControlEvent::Reset),
            "l" | "ls" | "list" => Ok(ControlEvent::List),
            "q" | "quit" | "exit" => Ok(ControlEvent::Quit),
            _ => Err(CommandError::Unknown(command.to_string())),
        }
    }
}

fn parse_play(args: &str) -> Result<ControlEvent, CommandError> {
    const USAGE: CommandError = CommandError::Usage("p <n> <src|tgt>");

    let mut parts = args.split_whitespace();
    let number = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .ok_or(USAGE)?;
    let language = match parts.next() {
        Some(lang) => Language::parse(lang).ok_or(USAGE)?,
        None => Language::Source,
    };
    if parts.next().is_some() {
        return Err(USAGE);
    }
    Ok(ControlEvent::PlaySentence {
        index: number - 1,
        language,
    })
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Dispatches [`ControlEvent`]s to a [`PipelineOrchestrator`] and its
/// playback sequencer.
pub struct Controller {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl Controller {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Handle events until `Quit` arrives or every sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<ControlEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }

        self.orchestrator.playback().stop();
        log::info!("controller: shutting down");
    }

    /// Dispatch a single event.  Returns `Break` for [`ControlEvent::Quit`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn handle(&self, event: ControlEvent) -> ControlFlow<()> {
        log::debug!("controller: {event:?}");
        let playback = self.orchestrator.playback();

        match event {
            ControlEvent::Advance => {
                let playback = Arc::clone(playback);
                tokio::spawn(async move {
                    let outcome = playback.advance().await;
                    log::debug!("controller: advance finished: {outcome:?}");
                });
            }
            ControlEvent::Stop => playback.stop(),
            ControlEvent::PlaySentence { index, language } => {
                if !playback.play_sentence(index, language) {
                    log::warn!(
                        "controller: sentence {} has no {language} audio yet",
                        index + 1
                    );
                }
            }
            ControlEvent::Regenerate => {
                if self.orchestrator.is_processing() {
                    log::warn!("controller: still processing, regenerate ignored");
                } else {
                    let orchestrator = Arc::clone(&self.orchestrator);
                    tokio::spawn(async move {
                        orchestrator.regenerate_audio().await;
                    });
                }
            }
            ControlEvent::SetSpeed(speed) => {
                let applied = self.orchestrator.set_speech_speed(speed);
                log::info!("controller: speech speed {applied} (regenerate to apply)");
            }
            ControlEvent::SetVoice(voice) => {
                self.orchestrator.set_voice(voice);
                log::info!(
                    "controller: voice {} (regenerate to apply)",
                    voice.as_str()
                );
            }
            ControlEvent::DismissError => self.orchestrator.dismiss_error(),
            ControlEvent::Process(text) => {
                let orchestrator = Arc::clone(&self.orchestrator);
                tokio::spawn(async move {
                    orchestrator.process(&text).await;
                });
            }
            ControlEvent::Reset => self.orchestrator.reset(),
            ControlEvent::List => {
                println!("{}", render_pairs(&self.orchestrator.session().read()));
            }
            ControlEvent::Quit => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }
}

/// One block per pair: number, status, source, then translation or error.
/// The pair currently playing is marked with `>`.
pub fn render_pairs(state: &SessionState) -> String {
    if state.pairs.is_empty() {
        return "no sentences yet (use `t <text>`)".to_string();
    }

    let mut out = String::new();
    for (i, pair) in state.pairs.iter().enumerate() {
        let marker = if state.playback.is_playing && state.playback.index == i {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{marker}[{}] {:<16} {}",
            i + 1,
            pair.status.label(),
            pair.source
        );
        match (&pair.translation, pair.status, &pair.error) {
            (_, PairStatus::Error, Some(error)) => {
                let _ = writeln!(out, "      ! {error}");
            }
            (Some(translation), _, _) => {
                let _ = writeln!(out, "      {translation}");
            }
            _ => {}
        }
    }
    if let Some(error) = &state.last_error {
        let _ = writeln!(out, "last error: {error} (`d` to dismiss)");
    }
    out.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioPayload, AudioPlayer, MockBehaviour, MockOutput};
    use crate::pipeline::{Phase, PlaybackSequencer, SentencePair, Session};
    use crate::service::{ServiceError, SpeechSynthesizer, Translator};
    use crate::text::Segmenter;
    use async_trait::async_trait;
    use std::time::Duration;

    struct EchoTranslator;

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, text: &str) -> Result<String, ServiceError> {
            Ok(text.to_uppercase())
        }
    }

    struct BytesSpeech;

    #[async_trait]
    impl SpeechSynthesizer for BytesSpeech {
        async fn synthesize(
            &self,
            text: &str,
            _voice: Voice,
            _speed: f32,
        ) -> Result<AudioPayload, ServiceError> {
            Ok(AudioPayload::new(text.as_bytes().to_vec()))
        }
    }

    fn controller() -> (Controller, Arc<PipelineOrchestrator>, Arc<MockOutput>) {
        let session = Session::new();
        let output = Arc::new(MockOutput::new(MockBehaviour::Finish));
        let playback = Arc::new(PlaybackSequencer::new(
            Arc::clone(&session),
            AudioPlayer::new(output.clone()),
        ));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            session,
            Segmenter::default(),
            Arc::new(EchoTranslator),
            Arc::new(BytesSpeech),
            playback,
        ));
        (
            Controller::new(Arc::clone(&orchestrator)),
            orchestrator,
            output,
        )
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition never became true");
    }

    // ---- parse ---

    #[test]
    fn parse_simple_commands() {
        assert_eq!(ControlEvent::parse("  "), Ok(ControlEvent::Advance));
        assert_eq!(ControlEvent::parse("n"), Ok(ControlEvent::Advance));
        assert_eq!(ControlEvent::parse("S"), Ok(ControlEvent::Stop));
        assert_eq!(ControlEvent::parse("r"), Ok(ControlEvent::Regenerate));
        assert_eq!(ControlEvent::parse("d"), Ok(ControlEvent::DismissError));
        assert_eq!(ControlEvent::parse("x"), Ok(ControlEvent::Reset));
        assert_eq!(ControlEvent::parse("l"), Ok(ControlEvent::List));
        assert_eq!(ControlEvent::parse("quit"), Ok(ControlEvent::Quit));
    }

    #[test]
    fn parse_play_sentence() {
        assert_eq!(
            ControlEvent::parse("p 3"),
            Ok(ControlEvent::PlaySentence {
                index: 2,
                language: Language::Source
            })
        );
        assert_eq!(
            ControlEvent::parse("play 1 target"),
            Ok(ControlEvent::PlaySentence {
                index: 0,
                language: Language::Target
            })
        );
        assert!(matches!(
            ControlEvent::parse("p 0 src"),
            Err(CommandError::Usage(_))
        ));
        assert!(matches!(
            ControlEvent::parse("p 1 fr"),
            Err(CommandError::Usage(_))
        ));
    }

    #[test]
    fn parse_settings() {
        assert_eq!(ControlEvent::parse("speed 1.25"), Ok(ControlEvent::SetSpeed(1.25)));
        assert!(ControlEvent::parse("speed fast").is_err());
        assert!(ControlEvent::parse("speed NaN").is_err());
        assert_eq!(
            ControlEvent::parse("voice Shimmer"),
            Ok(ControlEvent::SetVoice(Voice::Shimmer))
        );
        assert!(ControlEvent::parse("voice robot").is_err());
    }

    #[test]
    fn parse_text_keeps_the_whole_rest_of_the_line() {
        assert_eq!(
            ControlEvent::parse("t Dr. Smith went home.  He left."),
            Ok(ControlEvent::Process("Dr. Smith went home.  He left.".into()))
        );
        assert_eq!(
            ControlEvent::parse("t"),
            Err(CommandError::Usage("t <text>"))
        );
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(
            ControlEvent::parse("launch"),
            Err(CommandError::Unknown("launch".into()))
        );
    }

    // ---- render ---

    #[test]
    fn render_marks_errors_and_playing_pair() {
        let mut state = SessionState::default();
        let mut ok = SentencePair::new(0, "Hello.");
        ok.translation = Some("Bonjour.".into());
        ok.status = PairStatus::Complete;
        let mut failed = SentencePair::new(1, "Bye.");
        failed.status = PairStatus::Error;
        failed.error = Some("Rate limit exceeded.".into());
        state.pairs = vec![ok, failed];
        state.playback.is_playing = true;
        state.last_error = Some("Rate limit exceeded.".into());

        let text = render_pairs(&state);

        assert!(text.starts_with(">[1] complete"));
        assert!(text.contains("Bonjour."));
        assert!(text.contains(" [2] error"));
        assert!(text.contains("! Rate limit exceeded."));
        assert!(text.ends_with("(`d` to dismiss)"));
    }

    #[test]
    fn render_empty_session() {
        assert!(render_pairs(&SessionState::default()).contains("t <text>"));
    }

    // ---- dispatch ---

    #[tokio::test]
    async fn process_then_advance_plays_first_source() {
        let (controller, orchestrator, output) = controller();

        let _ = controller.handle(ControlEvent::Process("One. Two.".into()));
        wait_for(|| orchestrator.session().read().progress.phase == Phase::Complete).await;

        let _ = controller.handle(ControlEvent::Advance);
        wait_for(|| !output.opened().is_empty()).await;

        assert_eq!(output.opened()[0], AudioPayload::new(b"One.".to_vec()));
    }

    #[tokio::test]
    async fn settings_events_reach_the_orchestrator() {
        let (controller, orchestrator, _) = controller();

        let _ = controller.handle(ControlEvent::SetSpeed(10.0));
        let _ = controller.handle(ControlEvent::SetVoice(Voice::Echo));

        let settings = orchestrator.speech_settings();
        assert_eq!(settings.speed, 4.0);
        assert_eq!(settings.voice, Voice::Echo);
    }

    #[tokio::test]
    async fn run_stops_on_quit() {
        let (controller, orchestrator, _) = controller();
        let (tx, rx) = mpsc::channel(8);

        tx.send(ControlEvent::Reset).await.unwrap();
        tx.send(ControlEvent::Quit).await.unwrap();
        // Never handled: the loop has already stopped.
        tx.send(ControlEvent::Process("Ignored.".into())).await.unwrap();

        controller.run(rx).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(orchestrator.session().read().pairs.is_empty());
    }
}
