use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_studio::audio::{AudioCapture, CpalPlayer, CpalTimeline};
use voice_studio::gemini::{GeminiClient, GeminiLive};
use voice_studio::{Config, LiveConfig, LiveController, SpeechPlayer, TranscriptionCapturer, Voice};

/// voice-studio - Voice client for generative AI audio services
#[derive(Parser)]
#[command(name = "voice-studio", version, about)]
struct Cli {
    /// Voice to use (kore, puck, charon, fenrir, zephyr)
    #[arg(long, env = "VOICE_STUDIO_VOICE", default_value = "zephyr")]
    voice: Voice,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize text and play it through the speakers
    Speak {
        /// Text to speak
        text: String,

        /// Speaking rate multiplier (approximate, 0.5 to 2.0)
        #[arg(short, long, default_value = "1.0")]
        rate: f32,
    },
    /// Record 5 seconds from the microphone and transcribe it
    Transcribe,
    /// Hold a real-time voice conversation until interrupted
    Live,
    /// List available voices
    Voices,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_studio=info",
        1 => "info,voice_studio=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
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
    let config = Config {
        voice: cli.voice,
        ..Config::default()
    };

    match cli.command {
        Command::Speak { text, rate } => speak(&config, &text, rate).await,
        Command::Transcribe => transcribe(&config).await,
        Command::Live => live(&config).await,
        Command::Voices => {
            for voice in Voice::ALL {
                println!("{:<8} {}", voice.name(), voice.description());
            }
            Ok(())
        }
    }
}

/// Synthesize and play long-form text
async fn speak(config: &Config, text: &str, rate: f32) -> anyhow::Result<()> {
    let synthesizer = Arc::new(GeminiClient::from_env(config)?);
    let sink = Arc::new(CpalPlayer::new()?);
    let player = SpeechPlayer::new(synthesizer, sink, config.chunk_budget);

    // Ctrl-C stops the run at the next chunk boundary
    let stopper = player.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("stop requested");
            stopper.stop();
        }
    });

    player.synthesize_and_play(text, config.voice, rate).await?;
    Ok(())
}

/// Record a bounded sample and print the transcript
#[allow(clippy::future_not_send)]
async fn transcribe(config: &Config) -> anyhow::Result<()> {
    let transcriber = Arc::new(GeminiClient::from_env(config)?);
    let capturer = TranscriptionCapturer::new(transcriber);

    println!("Recording for 5 seconds, speak now...");
    if let Some(text) = capturer.capture_and_transcribe().await? {
        println!("{text}");
    }
    Ok(())
}

/// Run a live conversation until Ctrl-C
#[allow(clippy::future_not_send)]
async fn live(config: &Config) -> anyhow::Result<()> {
    let backend = GeminiLive::from_env()?;
    let timeline = Arc::new(CpalTimeline::new()?);
    let mut controller = LiveController::new(timeline);

    let live_config = LiveConfig::from(config);
    let mut events = controller.open(&backend, &live_config).await?;

    // Capture frame queue depth is the only outbound backpressure tunable
    let (frame_tx, mut frames) = tokio::sync::mpsc::channel(16);
    let mut capture = AudioCapture::new()?;
    capture.start_streaming(frame_tx)?;

    println!("Live session active, speak naturally. Ctrl-C ends the session.");
    tokio::select! {
        () = controller.run(&mut frames, &mut events) => {
            tracing::info!("session ended by server");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("session ended by user");
        }
    }

    capture.stop();
    controller.close();
    Ok(())
}
