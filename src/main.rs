use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use visionspeak::config::SpeechProvider;
use visionspeak::voice::{AudioPlayback, TextToSpeech};
use visionspeak::{
    CapturedImage, Config, ConsoleSpeech, Error, ImageNormalizer, NarrationController, Playback,
    PipelineCoordinator, RecognitionClient, RunOutcome, SpeechEngine, SynthesizedSpeech,
};

/// How often narration is checked for completion while waiting
const SETTLE_INTERVAL: Duration = Duration::from_millis(100);

/// `VisionSpeak` - read photographed documents aloud
#[derive(Parser)]
#[command(name = "visionspeak", version, about)]
struct Cli {
    /// OCR endpoint receiving the upload
    #[arg(long, env = "VISIONSPEAK_ENDPOINT")]
    endpoint: Option<String>,

    /// Longest side of the uploaded image in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Print narration instead of playing audio
    #[arg(long, env = "VISIONSPEAK_NO_AUDIO")]
    no_audio: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize a stored photo and read it aloud
    Read {
        /// Photo written by the camera
        image: PathBuf,
    },
    /// Control loop: capture, speak, pause, repeat, stop, status, quit
    Interactive,
    /// Normalize a photo and write the upload JPEG
    Normalize {
        /// Photo written by the camera
        image: PathBuf,
        /// Output path (defaults to `JPEG_<timestamp>.jpg`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Speak a phrase through the configured engine
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,visionspeak=info",
        1 => "info,visionspeak=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(endpoint) = &cli.endpoint {
        config.set_endpoint(endpoint)?;
    }
    if let Some(max_dimension) = cli.max_dimension {
        config.max_dimension = max_dimension;
    }
    if cli.no_audio {
        config.voice.enabled = false;
    }
    config.validate()?;

    match cli.command {
        Command::Read { image } => cmd_read(&config, &image).await,
        Command::Interactive => cmd_interactive(&config).await,
        Command::Normalize { image, output } => cmd_normalize(&config, &image, output),
        Command::TestTts { text } => cmd_test_tts(&config, text).await,
    }
}

/// Pick the speech engine, falling back to the console when audio is unavailable
fn build_engine(config: &Config) -> Box<dyn SpeechEngine> {
    if !config.voice.enabled || config.voice.provider == SpeechProvider::Console {
        return Box::new(ConsoleSpeech::new());
    }

    let engine = TextToSpeech::from_config(config)
        .and_then(|tts| Ok(SynthesizedSpeech::new(tts, AudioPlayback::new()?)));
    match engine {
        Ok(engine) => Box::new(engine),
        Err(e) => {
            tracing::warn!(error = %e, "audio narration unavailable, using console");
            Box::new(ConsoleSpeech::new())
        }
    }
}

fn build_pipeline(config: &Config) -> anyhow::Result<PipelineCoordinator> {
    let recognizer = RecognitionClient::from_config(config)?;
    tracing::info!(endpoint = %recognizer.endpoint(), "recognition endpoint");

    Ok(PipelineCoordinator::new(
        ImageNormalizer::new(config.max_dimension),
        Arc::new(recognizer),
        NarrationController::new(build_engine(config)),
    ))
}

/// Wait until narration finishes or Ctrl-C stops it
async fn wait_for_narration(narration: &mut NarrationController) {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                narration.stop();
                break;
            }
            () = tokio::time::sleep(SETTLE_INTERVAL) => {
                if narration.settle() != Playback::Speaking {
                    break;
                }
            }
        }
    }
}

/// One capture-to-speech run
async fn cmd_read(config: &Config, image: &Path) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config)?;

    let capture = CapturedImage::from_path(image)?;
    let status = pipeline.start_run(capture)?;
    println!(
        "Processing {}x{} image... please wait 10-30 seconds",
        status.width, status.height
    );

    let outcome = pipeline
        .next_outcome()
        .await
        .ok_or_else(|| anyhow::anyhow!("recognition task ended without a result"))?;

    match outcome {
        RunOutcome::Recognized { text, autoplay, .. } => {
            if autoplay {
                println!("{text}");
                wait_for_narration(pipeline.narration_mut()).await;
            } else {
                println!("No text found. Try better lighting or a steadier hold.");
            }
        }
        RunOutcome::Failed { error, .. } => {
            pipeline.shutdown();
            anyhow::bail!("{}: {error}", error.kind());
        }
        RunOutcome::Superseded { run } => {
            tracing::warn!(%run, "run superseded");
        }
    }

    pipeline.shutdown();
    Ok(())
}

/// Outcome of handling one interactive command
#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Line-driven control loop mirroring the capture/speak/pause/repeat buttons
async fn cmd_interactive(config: &Config) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Commands: capture <path>, speak, pause, repeat, stop, status, quit");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if handle_command(&mut pipeline, line.trim()) == Flow::Quit {
                    break;
                }
            }
            Some(outcome) = pipeline.next_outcome() => report_outcome(&outcome),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    pipeline.shutdown();
    Ok(())
}

fn handle_command(pipeline: &mut PipelineCoordinator, line: &str) -> Flow {
    let (command, arg) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(c, a)| (c, a.trim()));

    match command {
        "" => {}
        "capture" => {
            if arg.is_empty() {
                println!("usage: capture <path>");
                return Flow::Continue;
            }
            match CapturedImage::from_path(Path::new(arg))
                .and_then(|capture| pipeline.start_run(capture))
            {
                Ok(status) => println!("{}: processing... please wait", status.run),
                Err(e) => println!("Error: {}: {e}", e.kind()),
            }
        }
        "speak" | "play" => speak_or_advise(pipeline.narration_mut().play()),
        "repeat" => speak_or_advise(pipeline.narration_mut().repeat()),
        "pause" => pipeline.narration_mut().pause(),
        "stop" => pipeline.narration_mut().stop(),
        "status" => {
            let playback = pipeline.narration_mut().settle();
            let narration = pipeline.narration();
            println!(
                "playback: {playback:?}, pending: {}, text: {:?}",
                pipeline.has_pending(),
                narration.last_text()
            );
        }
        "quit" | "exit" => return Flow::Quit,
        other => println!("unknown command: {other}"),
    }

    Flow::Continue
}

fn speak_or_advise(result: visionspeak::Result<()>) {
    match result {
        Ok(()) => {}
        Err(Error::NothingToNarrate) => println!("No text to read"),
        Err(e) => println!("Error: {e}"),
    }
}

fn report_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Recognized {
            run,
            text,
            autoplay: true,
        } => println!("{run}: {text}"),
        RunOutcome::Recognized { run, .. } => println!("{run}: no text found"),
        RunOutcome::Failed { run, error } => println!("{run}: Error: {}: {error}", error.kind()),
        RunOutcome::Superseded { run } => tracing::debug!(%run, "superseded result discarded"),
    }
}

/// Normalize only and write the upload payload
fn cmd_normalize(config: &Config, image: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let capture = CapturedImage::from_path(image)?;
    let orientation = capture.orientation();
    let (width, height) = (capture.width(), capture.height());

    let normalized = ImageNormalizer::new(config.max_dimension).normalize(capture)?;

    let output = output.unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("JPEG_{stamp}.jpg"))
    });
    normalized.save_jpeg(&output, config.jpeg_quality)?;

    println!(
        "{width}x{height} ({} deg) -> {}x{} written to {}",
        orientation.degrees(),
        normalized.width(),
        normalized.height(),
        output.display()
    );
    Ok(())
}

/// Speak a phrase through the configured engine
async fn cmd_test_tts(config: &Config, text: String) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let mut narration = NarrationController::new(build_engine(config));
    narration.set_text(text);
    narration.play()?;
    wait_for_narration(&mut narration).await;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}
