use clap::Parser;
use narrate::domain::tts::{ProviderCatalog, TtsService, TtsServiceApi};
use narrate::error::{AppError, AppResult};
use narrate::infrastructure::config::{Config, LogFormat};
use narrate::infrastructure::repositories::ProviderRepositoryFactory;
use narrate::infrastructure::storage::{
    audio_file_name, embed_block, Anchor, AudioSink, FsAudioSink, FsTextInserter, TextInserter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Narrate a note: synthesize its text and embed the audio in it
#[derive(Debug, Parser)]
#[command(name = "narrate", version)]
struct Cli {
    /// Note to read aloud
    note: PathBuf,

    /// Backend to use instead of TTS_PROVIDER
    #[arg(long)]
    provider: Option<String>,

    /// Directory for the audio file instead of NARRATE_OUTPUT_DIR
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Where the embed goes: top, bottom or heading:<text>
    #[arg(long, default_value = "bottom")]
    anchor: Anchor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().map_err(|e| AppError::Config(e.to_string()))?;

    // Initialize logging
    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        tracing::error!(error = %e, "Narration failed");
        eprintln!("narrate: {}", e);
        std::process::exit(e.exit_code());
    }

    Ok(())
}

async fn run(cli: Cli, mut config: Config) -> AppResult<()> {
    if let Some(provider) = cli.provider {
        config.tts.provider = provider;
    }
    let output_dir = cli.out_dir.unwrap_or_else(|| config.output_dir.clone());

    tracing::info!(
        note = %cli.note.display(),
        provider = %config.tts.provider,
        output_dir = %output_dir.display(),
        cache_enabled = config.tts_cache_enabled,
        "Starting narration"
    );

    let text = tokio::fs::read_to_string(&cli.note).await?;

    // === DEPENDENCY INJECTION SETUP ===
    let factory = Arc::new(ProviderRepositoryFactory::new(reqwest::Client::new()));
    let tts_service = TtsService::new(factory, ProviderCatalog::default(), config.tts_cache_enabled);
    let audio_sink = FsAudioSink::new(output_dir);
    let inserter = FsTextInserter::new();

    let result = tts_service.synthesize(&text, &config.tts).await?;

    let path = audio_sink
        .write(&audio_file_name(&result, chrono::Utc::now()), result.audio())
        .await?;
    inserter
        .insert(&cli.note, &cli.anchor, &embed_block(&path, &result))
        .await?;

    println!("{}", path.display());
    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narrate=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "narrate=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
