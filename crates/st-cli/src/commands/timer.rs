//! Timer command: an interactive study session.
//!
//! Runs a single-threaded event loop that multiplexes stdin commands with a
//! one-second interval. The interval only delivers the tick the engine has
//! currently scheduled, so a pause or reset handled between two interval
//! firings can never be undone by a late tick.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use st_core::{
    Clock, PauseReason, Phase, SESSION_CAP_SECS, SessionDetails, Storage, SystemClock,
    TimerEvent, TimerObserver, Tracker, format_clock,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;

use crate::cli::TimerArgs;

/// Cadence of elapsed-time updates.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

const HELP: &str = "\
Commands:
  start [subject]   start or resume timing
  pause             pause the timer
  reset             discard the current run
  stop | end        record the session and reset
  status            show the timer state
  notes <text>      set session notes
  links <a,b,...>   set session links
  footnote <text>   set a footnote
  images <a,b,...>  set image URLs
  quit | exit       leave (an unsaved run is discarded)";

/// A line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Start(Option<String>),
    Pause,
    Reset,
    Stop,
    Status,
    Notes(String),
    Links(String),
    Footnote(String),
    Images(String),
    Help,
    Quit,
}

impl FromStr for TimerCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(word, rest)| (word, rest.trim()));

        match word {
            "start" if rest.is_empty() => Ok(Self::Start(None)),
            "start" => Ok(Self::Start(Some(rest.to_string()))),
            "pause" => Ok(Self::Pause),
            "reset" => Ok(Self::Reset),
            "stop" | "end" => Ok(Self::Stop),
            "status" => Ok(Self::Status),
            "notes" => Ok(Self::Notes(rest.to_string())),
            "links" => Ok(Self::Links(rest.to_string())),
            "footnote" => Ok(Self::Footnote(rest.to_string())),
            "images" => Ok(Self::Images(rest.to_string())),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(UnknownCommand(line.to_string())),
        }
    }
}

/// Error type for unrecognized timer input.
#[derive(Debug, Clone)]
pub struct UnknownCommand(String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command: {}", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

enum Flow {
    Continue,
    Quit,
}

/// Prints engine events as they happen.
pub struct ConsoleObserver<W: Write> {
    writer: W,
    mid_line: bool,
}

impl<W: Write> ConsoleObserver<W> {
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            mid_line: false,
        }
    }

    fn line(&mut self, text: &str) {
        let prefix = if self.mid_line { "\n" } else { "" };
        self.mid_line = false;
        let _ = writeln!(self.writer, "{prefix}{text}");
    }
}

impl<W: Write> TimerObserver for ConsoleObserver<W> {
    fn on_event(&mut self, event: &TimerEvent) {
        match event {
            TimerEvent::Started {
                subject,
                elapsed_secs,
            } => {
                let remaining = SESSION_CAP_SECS.saturating_sub(*elapsed_secs);
                self.line(&format!(
                    "Studying {subject} ({} remaining)",
                    format_clock(remaining)
                ));
            }
            TimerEvent::Ticked { elapsed_secs } => {
                let remaining = SESSION_CAP_SECS.saturating_sub(*elapsed_secs);
                let _ = write!(self.writer, "\r{} ", format_clock(remaining));
                let _ = self.writer.flush();
                self.mid_line = true;
            }
            TimerEvent::Paused {
                elapsed_secs,
                reason: PauseReason::User,
            } => {
                let remaining = SESSION_CAP_SECS.saturating_sub(*elapsed_secs);
                self.line(&format!("Paused with {} remaining", format_clock(remaining)));
            }
            TimerEvent::Paused {
                reason: PauseReason::CapReached,
                ..
            } => {
                self.line("Session cap reached. Type 'stop' to record it.");
            }
            TimerEvent::Reset => self.line("Timer reset."),
            TimerEvent::Stopped { .. } => {
                if self.mid_line {
                    self.line("");
                }
            }
        }
    }
}

/// State of one interactive run: the tracker plus the user's pending input.
struct TimerSession<'a, S: Storage> {
    tracker: &'a mut Tracker<S>,
    subject: Option<String>,
    details: SessionDetails,
}

impl<S: Storage> TimerSession<'_, S> {
    fn handle<W: Write>(
        &mut self,
        command: TimerCommand,
        clock: &impl Clock,
        writer: &mut W,
    ) -> Result<Flow> {
        match command {
            TimerCommand::Start(subject) => {
                if subject.is_some() {
                    self.subject = subject;
                }
                self.start(clock, writer)?;
            }
            TimerCommand::Pause => {
                if !self.tracker.timer_mut().pause() {
                    writeln!(writer, "Timer is not running.")?;
                }
            }
            TimerCommand::Reset => self.tracker.timer_mut().reset(),
            TimerCommand::Stop => self.stop(writer)?,
            TimerCommand::Status => {
                let state = self.tracker.timer().state();
                let subject = state
                    .active_subject
                    .as_ref()
                    .map(|s| s.as_str().to_string())
                    .or_else(|| self.subject.clone())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    writer,
                    "{} | {subject} | {} remaining",
                    state.phase.as_str(),
                    format_clock(state.remaining_secs())
                )?;
            }
            TimerCommand::Notes(text) => {
                self.details.notes = text;
                writeln!(writer, "Notes set.")?;
            }
            TimerCommand::Links(text) => {
                self.details.links = text;
                writeln!(writer, "Links set.")?;
            }
            TimerCommand::Footnote(text) => {
                self.details.footnote = text;
                writeln!(writer, "Footnote set.")?;
            }
            TimerCommand::Images(text) => {
                self.details.images = text;
                writeln!(writer, "Images set.")?;
            }
            TimerCommand::Help => writeln!(writer, "{HELP}")?,
            TimerCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn start<W: Write>(&mut self, clock: &impl Clock, writer: &mut W) -> Result<()> {
        let Some(subject) = self.subject.as_deref().filter(|s| !s.is_empty()) else {
            writeln!(writer, "Select a subject first: start <subject>")?;
            return Ok(());
        };

        let timer = self.tracker.timer();
        if timer.phase() == Phase::Running {
            writeln!(writer, "Timer is already running.")?;
            return Ok(());
        }
        if timer.elapsed_secs() >= SESSION_CAP_SECS {
            writeln!(writer, "Session cap reached. Type 'stop' to record it.")?;
            return Ok(());
        }

        if !self.tracker.subjects().contains(subject) {
            writeln!(
                writer,
                "Note: {subject} is not a registered subject and won't appear in reports."
            )?;
        }
        self.tracker.timer_mut().start(subject, clock.now());
        Ok(())
    }

    fn stop<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        let details = std::mem::take(&mut self.details);
        match self.tracker.stop(details) {
            Ok(Some(session)) => writeln!(
                writer,
                "Recorded {} minutes of {} ({}s).",
                session.minutes(),
                session.subject,
                session.duration
            )?,
            Ok(None) => writeln!(writer, "Nothing to record.")?,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist session");
                writeln!(writer, "Failed to save session: {e}")?;
            }
        }
        Ok(())
    }
}

/// Runs the command loop until `quit` or end of input.
///
/// Ticks are delivered every [`TICK_INTERVAL`] while the engine has one
/// scheduled. A run that was not stopped is discarded on exit.
pub async fn drive<S, R, W, C>(
    tracker: &mut Tracker<S>,
    input: R,
    writer: &mut W,
    clock: &C,
    subject: Option<String>,
    details: SessionDetails,
) -> Result<()>
where
    S: Storage,
    R: AsyncBufRead + Unpin,
    W: Write,
    C: Clock,
{
    let mut session = TimerSession {
        tracker,
        subject,
        details,
    };
    let mut lines = input.lines();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(token) = session.tracker.timer().scheduled_tick() {
                    session.tracker.timer_mut().tick(token, clock.now());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read timer input")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<TimerCommand>() {
                    Ok(command) => {
                        if let Flow::Quit = session.handle(command, clock, writer)? {
                            break;
                        }
                    }
                    Err(e) => writeln!(writer, "{e} (type 'help' for commands)")?,
                }
            }
        }
    }

    let elapsed = session.tracker.timer().elapsed_secs();
    if elapsed > 0 {
        tracing::warn!(elapsed, "discarding unsaved study session");
        writeln!(
            writer,
            "Discarded unsaved session ({} studied).",
            format_clock(elapsed)
        )?;
    }
    Ok(())
}

/// Runs the timer command on stdin/stdout.
pub fn run<S: Storage>(tracker: &mut Tracker<S>, args: TimerArgs) -> Result<()> {
    tracker
        .timer_mut()
        .subscribe(ConsoleObserver::new(std::io::stdout()));

    let details = SessionDetails {
        notes: args.notes,
        links: args.links,
        footnote: args.footnote,
        images: args.images,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start timer runtime")?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let result = runtime.block_on(drive(
        tracker,
        stdin,
        &mut stdout,
        &SystemClock,
        args.subject,
        details,
    ));

    // A pending stdin read would otherwise block shutdown.
    runtime.shutdown_background();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeZone, Utc};
    use st_core::{MemoryStorage, SESSIONS_KEY};
    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::time::Instant;

    /// Wall clock that follows tokio's (pausable) clock.
    struct VirtualClock {
        origin: Instant,
        origin_utc: DateTime<Utc>,
    }

    impl VirtualClock {
        fn new() -> Self {
            Self {
                origin: Instant::now(),
                origin_utc: Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
            }
        }
    }

    impl Clock for VirtualClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = Instant::now() - self.origin;
            self.origin_utc + chrono::Duration::from_std(elapsed).unwrap()
        }
    }

    /// Feeds `script` into the timer; each step waits before writing its line.
    async fn run_script(
        tracker: &mut Tracker<MemoryStorage>,
        script: &[(u64, &str)],
    ) -> String {
        let (mut client, server) = tokio::io::duplex(1024);
        let clock = VirtualClock::new();
        let mut output = Vec::new();

        let owned: Vec<(u64, String)> = script.iter().map(|(d, l)| (*d, (*l).to_string())).collect();
        let feed = async move {
            for (delay, line) in owned {
                tokio::time::sleep(Duration::from_secs(delay)).await;
                client.write_all(format!("{line}\n").as_bytes()).await.unwrap();
            }
        };

        let (_, result) = tokio::join!(
            feed,
            drive(
                tracker,
                BufReader::new(server),
                &mut output,
                &clock,
                None,
                SessionDetails::default(),
            )
        );
        result.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!("start".parse::<TimerCommand>().unwrap(), TimerCommand::Start(None));
        assert_eq!(
            "start  Linear Algebra ".parse::<TimerCommand>().unwrap(),
            TimerCommand::Start(Some("Linear Algebra".to_string()))
        );
        assert_eq!("end".parse::<TimerCommand>().unwrap(), TimerCommand::Stop);
        assert_eq!(
            "links a.example, b.example".parse::<TimerCommand>().unwrap(),
            TimerCommand::Links("a.example, b.example".to_string())
        );
        assert_eq!("notes".parse::<TimerCommand>().unwrap(), TimerCommand::Notes(String::new()));
        assert_eq!("exit".parse::<TimerCommand>().unwrap(), TimerCommand::Quit);
    }

    #[test]
    fn unknown_command_errors() {
        let err = "dance".parse::<TimerCommand>().unwrap_err();
        assert_eq!(err.to_string(), "unknown command: dance");
    }

    #[test]
    fn console_observer_renders_events() {
        let mut output = Vec::new();
        {
            let mut observer = ConsoleObserver::new(&mut output);
            observer.on_event(&TimerEvent::Started {
                subject: st_core::Subject::new("Math").unwrap(),
                elapsed_secs: 0,
            });
            observer.on_event(&TimerEvent::Ticked { elapsed_secs: 65 });
            observer.on_event(&TimerEvent::Paused {
                elapsed_secs: 65,
                reason: PauseReason::User,
            });
            observer.on_event(&TimerEvent::Reset);
        }
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Studying Math (25:00 remaining)\n\r23:55 \nPaused with 23:55 remaining\nTimer reset.\n"
        );
    }

    #[tokio::test]
    async fn commands_without_timing_record_nothing() {
        let mut tracker = Tracker::open(MemoryStorage::new());
        let mut output = Vec::new();
        let input: &[u8] = b"stop\n\ndance\nstart\npause\nquit\nstart Math\n";

        drive(
            &mut tracker,
            input,
            &mut output,
            &SystemClock,
            None,
            SessionDetails::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Nothing to record.\n\
             unknown command: dance (type 'help' for commands)\n\
             Select a subject first: start <subject>\n\
             Timer is not running.\n"
        );
        assert!(tracker.sessions().is_empty());
        assert_eq!(tracker.storage().get(SESSIONS_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_session_is_recorded() {
        let mut tracker = Tracker::open(MemoryStorage::new());
        tracker.add_subject("Math").unwrap();

        let output = run_script(
            &mut tracker,
            &[
                (0, "start Math"),
                (0, "notes chain rule"),
                (0, "images https://img.example/1.png, https://img.example/2.png"),
                (130, "stop"),
            ],
        )
        .await;

        let sessions = tracker.sessions().all();
        assert_eq!(sessions.len(), 1);
        assert!((129..=130).contains(&sessions[0].duration));
        assert_eq!(sessions[0].notes, "chain rule");
        assert_eq!(sessions[0].images.len(), 2);
        assert!(output.contains("Recorded 2 minutes of Math"));
        assert_eq!(tracker.timer().phase(), Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_and_resume_continues() {
        let mut tracker = Tracker::open(MemoryStorage::new());
        tracker.add_subject("Math").unwrap();

        run_script(
            &mut tracker,
            &[(0, "start Math"), (65, "pause"), (300, "status")],
        )
        .await;

        assert_eq!(tracker.timer().phase(), Phase::Paused);
        let frozen = tracker.timer().elapsed_secs();
        assert!((64..=65).contains(&frozen));

        run_script(&mut tracker, &[(0, "start Math"), (10, "stop")]).await;
        let recorded = tracker.sessions().all()[0].duration;
        assert!((frozen + 9..=frozen + 10).contains(&recorded));
    }

    #[tokio::test(start_paused = true)]
    async fn cap_pauses_without_stop() {
        let mut tracker = Tracker::open(MemoryStorage::new());

        let output = run_script(&mut tracker, &[(0, "start Math"), (1600, "start")]).await;

        assert_eq!(tracker.timer().phase(), Phase::Paused);
        assert_eq!(tracker.timer().elapsed_secs(), SESSION_CAP_SECS);
        assert!(output.contains("is not a registered subject"));
        assert!(output.contains("Session cap reached."));
        assert!(output.ends_with("Discarded unsaved session (25:00 studied).\n"));
        assert!(tracker.sessions().is_empty());
    }
}
