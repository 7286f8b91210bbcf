use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use response_agent::{create_router, AppState, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "response-agent", about = "Agent-backed answer drafting with voice chat")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/response-agent")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Send one question to the answer agent
    Ask { question: String },
    /// Print the text extracted from a .txt or .docx file
    Extract { path: PathBuf },
    /// Record from the default microphone and save the blob
    Record {
        #[arg(long, default_value_t = 5)]
        seconds: u64,
        #[arg(long)]
        output: PathBuf,
        /// Width of the printed waveform
        #[arg(long, default_value_t = 60)]
        columns: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    info!("Loaded config: {}", cfg.service.name);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cfg).await,
        Command::Ask { question } => {
            let state = AppState::from_config(&cfg);
            println!("{}", state.agent.generate_response(&question).await);
            Ok(())
        }
        Command::Extract { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            println!("{}", response_agent::document::extract_text(&bytes, name)?);
            Ok(())
        }
        Command::Record {
            seconds,
            output,
            columns,
        } => record(&cfg, seconds, output, columns).await,
    }
}

async fn serve(cfg: &Config) -> Result<()> {
    let state = AppState::from_config(cfg);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn record(cfg: &Config, seconds: u64, output: PathBuf, columns: usize) -> Result<()> {
    let mut audio = response_agent::VoiceAudio::new(
        Arc::new(response_agent::CpalPlatform::new()),
        Arc::new(response_agent::CpalEngineFactory),
        cfg.audio.voice_audio(),
    );

    let format = audio.begin_capture().await?;
    info!("Recording {}s as {}", seconds, format);
    tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;

    let captured = audio.end_capture().await?;
    tokio::fs::write(&output, &captured.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Saved {} bytes to {}", captured.bytes.len(), output.display());

    let encoded = base64::engine::general_purpose::STANDARD.encode(&captured.bytes);
    if let Some(envelope) = audio.waveform(&encoded, columns).await {
        let bars: String = envelope
            .iter()
            .map(|rms| match (rms * response_agent::audio::WAVEFORM_GAIN / 25.0) as u32 {
                0 => ' ',
                1 => '.',
                2 => ':',
                3 => '|',
                _ => '#',
            })
            .collect();
        println!("[{}]", bars);
    }

    audio.dispose().await;
    Ok(())
}
