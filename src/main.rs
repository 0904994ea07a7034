use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use beacon_speaker::speaker::{
    DEFAULT_MAX_CHUNK_CHARS, HttpVoiceCatalog, SessionManager, VoiceCatalog,
};
use beacon_speaker::{
    Config, Device, HttpDevice, PlayArgs, PlayOutcome, ResponseDispatcher, ResponseRequest,
    SpeakerRegistry, StreamCursor, StreamSegmenter, TokioClock, VoiceProvider,
};

/// Beacon Speaker - spoken responses on networked smart speakers
#[derive(Parser)]
#[command(name = "beacon-speaker", version, about)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, env = "SPEAKER_CONFIG")]
    config: Option<PathBuf>,

    /// Device bridge URL, overrides the config file
    #[arg(long, env = "SPEAKER_DEVICE_URL")]
    device_url: Option<String>,

    /// Longest sentence chunk sent to vendor TTS
    #[arg(long, env = "SPEAKER_MAX_CHUNK_CHARS", default_value_t = DEFAULT_MAX_CHUNK_CHARS)]
    max_chunk: usize,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Speak text; pass "-" to stream lines from stdin
    Say {
        text: String,
        /// Use the device's built-in voice
        #[arg(long)]
        native: bool,
        /// Play the boundary chime around the speech
        #[arg(long)]
        chime: bool,
        /// Leave the assistant listening afterwards
        #[arg(long)]
        keep_awake: bool,
        /// Vendor voice id for this response only
        #[arg(long)]
        voice: Option<String>,
    },
    /// Play an audio URL
    Play {
        url: String,
        /// Leave the assistant listening afterwards
        #[arg(long)]
        keep_awake: bool,
    },
    /// Speak text with the player's own TTS, without monitoring
    Announce { text: String },
    /// List vendor voices
    Voices,
    /// Switch the default vendor voice, then speak a sample
    Voice {
        /// Display name or provider id
        name: String,
    },
    /// Show the device's playback state
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,beacon_speaker=info",
        1 => "info,beacon_speaker=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.device_url {
        config.device_url = url;
    }
    tracing::debug!(?config, "loaded configuration");

    let device = Arc::new(HttpDevice::connect(&config.device_url, config.request_timeout).await?);

    match &cli.command {
        Command::Status => return cmd_status(device.as_ref()).await,
        Command::Announce { text } => {
            device.play(PlayArgs::Tts(text.clone())).await?;
            return Ok(());
        }
        _ => {}
    }

    let catalog = match &config.voices_endpoint {
        Some(endpoint) => Some(
            Arc::new(HttpVoiceCatalog::new(endpoint, config.request_timeout)?)
                as Arc<dyn VoiceCatalog>,
        ),
        None => None,
    };
    let registry = Arc::new(SpeakerRegistry::new(config.default_voice.clone(), catalog));
    let segmenter = StreamSegmenter::new(cli.max_chunk);
    let dispatcher = ResponseDispatcher::new(
        &config,
        device,
        Arc::new(TokioClock),
        Arc::clone(&registry),
        SessionManager::new(),
    )?
    .with_segmenter(segmenter);

    match cli.command {
        Command::Say {
            text,
            native,
            chime,
            keep_awake,
            voice,
        } => {
            let provider = if native {
                VoiceProvider::Native
            } else {
                config.provider
            };
            cmd_say(
                &dispatcher,
                segmenter,
                &text,
                provider,
                chime,
                keep_awake,
                voice,
            )
            .await
        }
        Command::Play { url, keep_awake } => {
            let request = ResponseRequest::audio(url)
                .provider(config.provider)
                .keep_awake(keep_awake);
            report(dispatcher.respond(request).await?);
            Ok(())
        }
        Command::Voices => cmd_voices(&registry).await,
        Command::Voice { name } => cmd_voice(&dispatcher, &name).await,
        Command::Status | Command::Announce { .. } => Ok(()),
    }
}

/// Speak text, or stream stdin lines as they arrive
async fn cmd_say(
    dispatcher: &ResponseDispatcher,
    segmenter: StreamSegmenter,
    text: &str,
    provider: VoiceProvider,
    chime: bool,
    keep_awake: bool,
    voice: Option<String>,
) -> anyhow::Result<()> {
    let mut request = if text == "-" {
        let cursor = StreamCursor::new(segmenter);
        let producer = cursor.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => producer.push(&format!("{line}\n")),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read stdin");
                        break;
                    }
                }
            }
            producer.finish();
        });

        ResponseRequest::stream(cursor)
    } else {
        ResponseRequest::text(text)
    };

    request = request
        .provider(provider)
        .chime(chime)
        .keep_awake(keep_awake);
    if let Some(voice) = voice {
        request = request.voice(voice);
    }

    report(dispatcher.respond(request).await?);
    Ok(())
}

async fn cmd_voices(registry: &SpeakerRegistry) -> anyhow::Result<()> {
    let voices = registry
        .voices()
        .await
        .ok_or_else(|| anyhow::anyhow!("voice catalog unavailable"))?;

    let active = registry.active_voice();
    for voice in voices {
        let marker = if voice.speaker == active { "*" } else { " " };
        println!("{marker} {:<24} {}", voice.name, voice.speaker);
    }

    Ok(())
}

async fn cmd_voice(dispatcher: &ResponseDispatcher, name: &str) -> anyhow::Result<()> {
    if !dispatcher.registry().switch_default_voice(name).await {
        anyhow::bail!("no voice named {name:?}");
    }

    let voice = dispatcher.registry().active_voice();
    println!("Default voice: {voice}");

    let request = ResponseRequest::text(format!("Voice switched to {name}."))
        .provider(VoiceProvider::Vendor);
    report(dispatcher.respond(request).await?);
    Ok(())
}

async fn cmd_status(device: &dyn Device) -> anyhow::Result<()> {
    let status = device.status().await?;
    match status.playback_state().foreign_media() {
        Some(media) => println!("{} ({media})", status.status),
        None => println!("{}", status.status),
    }
    Ok(())
}

fn report(outcome: PlayOutcome) {
    match outcome {
        PlayOutcome::Completed => tracing::info!("playback completed"),
        PlayOutcome::Interrupted => tracing::info!("playback interrupted"),
        PlayOutcome::Skipped => tracing::info!("nothing to play"),
    }
}
