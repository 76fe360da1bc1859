use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use senior_assistant::assistant;
use senior_assistant::db::{CalendarRepo, ContactRepo};
use senior_assistant::voice::{
    AudioCapture, AudioPlayback, MicrophoneRecorder, Speaker, test_tone,
};
use senior_assistant::{Config, LoopEvent, Shell, ShellStatus, Utterance};

/// Senior Assistant - push-to-talk help with calls, weather, and reminders
#[derive(Parser)]
#[command(name = "assistant", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Action round-trips allowed per command
    #[arg(long, env = "ASSISTANT_MAX_ROUND_TRIPS")]
    max_round_trips: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive push-to-talk session (the default)
    Listen,
    /// Run a recorded voice command from a file
    Ask {
        /// Audio file (wav, mp3, m4a, ogg, flac)
        file: PathBuf,
        /// Override the detected media type
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Manage the local contacts directory
    Contacts {
        #[command(subcommand)]
        command: ContactsCommand,
    },
    /// Manage local calendars
    Calendars {
        #[command(subcommand)]
        command: CalendarsCommand,
    },
    /// Show scheduled reminders
    Events {
        /// Maximum number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test speech output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[derive(Subcommand)]
enum ContactsCommand {
    /// Add a contact with one or more phone numbers
    Add {
        name: String,
        #[arg(required = true)]
        numbers: Vec<String>,
    },
    /// List all contacts
    List,
    /// Remove a contact by ID
    Remove { id: String },
}

#[derive(Subcommand)]
enum CalendarsCommand {
    /// Add a calendar
    Add {
        title: String,
        /// Mark as the primary calendar
        #[arg(long)]
        primary: bool,
        /// Refuse new events in this calendar
        #[arg(long)]
        read_only: bool,
    },
    /// List calendars
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,senior_assistant=info",
        1 => "info,senior_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(bound) = cli.max_round_trips {
        config.max_round_trips = bound;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Listen) {
        Command::Listen => listen(&config).await,
        Command::Ask { file, mime_type } => ask(&config, &file, mime_type).await,
        Command::Contacts { command } => contacts(&config, command),
        Command::Calendars { command } => calendars(&config, command),
        Command::Events { limit } => events(&config, limit),
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker(),
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Print action progress while a command runs
fn spawn_progress_printer() -> tokio::sync::mpsc::Sender<LoopEvent> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                LoopEvent::ActionStarted { invocation, .. } => println!("  → {invocation}"),
                LoopEvent::ActionFinished {
                    invocation,
                    is_error: true,
                    ..
                } => println!("  ✗ {invocation}"),
                LoopEvent::ActionFinished { .. } => {}
            }
        }
    });
    tx
}

/// Interactive push-to-talk session
#[allow(clippy::future_not_send)]
async fn listen(config: &Config) -> anyhow::Result<()> {
    let pool = assistant::open_database(config)?;
    let command_loop =
        assistant::build_command_loop(config, &pool, Some(spawn_progress_printer()))?;
    let mut shell = Shell::new(
        command_loop,
        MicrophoneRecorder::new(),
        assistant::build_speaker(config),
    );

    println!("Senior Assistant");
    println!("I can help you with calls, weather, and reminders.");
    println!("Press Enter to start and stop recording, q to quit.\n");
    println!("{}", shell.status_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }

        match shell.status() {
            ShellStatus::Idle | ShellStatus::Done => {
                // Failures are reflected in the shell status
                let _ = shell.start_recording();
            }
            ShellStatus::Listening => {
                println!("Processing...");
                if let Ok(text) = shell.stop_and_process().await {
                    println!("\n{text}\n");
                }
            }
            ShellStatus::Error => {
                if input.eq_ignore_ascii_case("r") {
                    shell.retry();
                }
            }
            ShellStatus::Processing => {}
        }

        println!("{}", shell.status_text());
        if let Some(detail) = shell.error_detail() {
            println!("Something went wrong: {detail}");
            println!("Type r and press Enter to retry.");
        }
    }

    Ok(())
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp3") => "audio/mp3",
        Some("m4a") => "audio/m4a",
        Some("aac") => "audio/aac",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/wav",
    }
}

/// Run one recorded command
#[allow(clippy::future_not_send)]
async fn ask(config: &Config, file: &Path, mime_type: Option<String>) -> anyhow::Result<()> {
    let data = std::fs::read(file)?;
    if data.is_empty() {
        anyhow::bail!("{} is empty", file.display());
    }
    let mime_type = mime_type.unwrap_or_else(|| mime_type_for(file).to_string());
    let utterance = Utterance::new(data, mime_type);

    let pool = assistant::open_database(config)?;
    let command_loop =
        assistant::build_command_loop(config, &pool, Some(spawn_progress_printer()))?;

    let text = command_loop.run(utterance).await?;
    println!("{text}");

    let mut speaker = assistant::build_speaker(config);
    if let Err(e) = speaker.speak(&text).await {
        tracing::warn!(error = %e, "failed to speak response");
    }

    Ok(())
}

fn contacts(config: &Config, command: ContactsCommand) -> anyhow::Result<()> {
    let repo = ContactRepo::new(assistant::open_database(config)?);

    match command {
        ContactsCommand::Add { name, numbers } => {
            let contact = repo.add(&name, &numbers)?;
            println!("Added {} ({})", contact.name, contact.id);
        }
        ContactsCommand::List => {
            let all = repo.list_all()?;
            if all.is_empty() {
                println!("No contacts");
            }
            for contact in all {
                println!(
                    "{}  {}  {}",
                    contact.id,
                    contact.name,
                    contact.phone_numbers.join(", ")
                );
            }
        }
        ContactsCommand::Remove { id } => {
            if repo.delete(&id)? {
                println!("Removed {id}");
            } else {
                anyhow::bail!("no contact with id {id}");
            }
        }
    }

    Ok(())
}

fn calendars(config: &Config, command: CalendarsCommand) -> anyhow::Result<()> {
    let repo = CalendarRepo::new(assistant::open_database(config)?);

    match command {
        CalendarsCommand::Add {
            title,
            primary,
            read_only,
        } => {
            let calendar = repo.add_calendar(&title, primary, !read_only)?;
            println!("Added calendar {} ({})", calendar.title, calendar.id);
        }
        CalendarsCommand::List => {
            for calendar in repo.list_calendars()? {
                let mut flags = Vec::new();
                if calendar.is_primary {
                    flags.push("primary");
                }
                if !calendar.allows_modifications {
                    flags.push("read-only");
                }
                println!("{}  {}  {}", calendar.id, calendar.title, flags.join(", "));
            }
        }
    }

    Ok(())
}

fn events(config: &Config, limit: usize) -> anyhow::Result<()> {
    let repo = CalendarRepo::new(assistant::open_database(config)?);
    let events = repo.list_events(limit)?;
    if events.is_empty() {
        println!("No reminders");
    }
    for event in events {
        println!(
            "{}  {}  ({})",
            event.start.format("%Y-%m-%d %H:%M"),
            event.title,
            event.time_zone
        );
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.drain();
        let energy = calculate_rms(&samples);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | [{meter}]", i + 1);
    }

    let _ = capture.stop();

    println!("\nIf you saw movement in the meter, your mic is working!");
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;
    playback.play(test_tone(440.0, 2000))?;

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

/// Test speech output
#[allow(clippy::future_not_send)]
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing speech with text: \"{text}\"\n");

    let Some(tts) = assistant::build_tts(config)? else {
        println!("Speech output is set to console; nothing to synthesize");
        return Ok(());
    };

    let mp3 = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3.len());

    AudioPlayback::new()?.play_mp3(&mp3)?;

    println!("If you heard the speech, text to speech is working!");
    Ok(())
}
