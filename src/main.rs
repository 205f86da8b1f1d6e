use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;
use voxrelay_core::{AppConfig, CancelToken};
use voxrelay_destination::{
    ConnectionResolver, Delivery, FileLookup, RetryPolicy, Sink, SinkRegistry,
};
use voxrelay_engine::{EngineRegistry, Synthesizer, TranscriptionHost, Translator};
use voxrelay_router::{PipelineConfig, RelayHost, UtterancePipeline};
use voxrelay_stream::{BridgeConfig, DemandBridge, FileFetcher};

#[derive(Parser)]
#[command(
    name = "voxrelay",
    about = "Relay streamed speech through transcription, translation and synthesis to connected clients"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("voxrelay starting");

    // One token stops the source, the transcription feed and pending lookups.
    let cancel = CancelToken::new();
    let engines = EngineRegistry::new();

    // Source
    let stream_cfg = &config.stream;
    let fetcher = FileFetcher::new(&stream_cfg.path, stream_cfg.follow);
    let start = fetcher
        .start_position(stream_cfg.start)
        .await
        .with_context(|| format!("failed to open record stream {:?}", stream_cfg.path))?;
    tracing::info!(
        path = %stream_cfg.path.display(),
        position = %start,
        follow = stream_cfg.follow,
        "reading audio records"
    );
    let bridge = DemandBridge::with_cancel(
        Arc::new(fetcher),
        start,
        BridgeConfig {
            encoding: stream_cfg.encoding,
            max_batch_size: stream_cfg.max_batch_size,
            idle_poll: Duration::from_millis(stream_cfg.idle_poll_ms),
        },
        cancel.clone(),
    );

    // Transcription
    let mut transcribe_table = config.transcribe.extra.clone();
    transcribe_table.insert(
        "language_code".to_string(),
        toml::Value::String(config.transcribe.language_code.clone()),
    );
    let mut transcription = TranscriptionHost::with_cancel(cancel.clone());
    let transcripts = transcription
        .take_transcript_receiver()
        .context("transcript receiver already taken")?;
    transcription
        .set_feed(
            bridge,
            &config.transcribe.engine,
            toml::Value::Table(transcribe_table),
            &engines,
            stream_cfg.initial_demand,
        )
        .await
        .with_context(|| {
            format!(
                "failed to set up transcriber '{}'",
                config.transcribe.engine
            )
        })?;

    // Translation and synthesis
    let mut translator = engines
        .create_translator(&config.translate.engine)
        .context("failed to create translator")?;
    translator
        .initialize(toml::Value::Table(config.translate.extra.clone()))
        .await
        .with_context(|| format!("failed to initialize translator '{}'", translator.name()))?;
    let translator: Arc<dyn Translator> = Arc::from(translator);

    let mut synthesizer = engines
        .create_synthesizer(&config.synthesis.engine)
        .context("failed to create synthesizer")?;
    synthesizer
        .initialize(toml::Value::Table(config.synthesis.extra.clone()))
        .await
        .with_context(|| {
            format!(
                "failed to initialize synthesizer '{}'",
                synthesizer.name()
            )
        })?;
    let synthesizer: Arc<dyn Synthesizer> = Arc::from(synthesizer);

    // Resolution and delivery
    let resolver = ConnectionResolver::new(
        Arc::new(FileLookup::new(&config.resolver.registry_path)),
        config.resolver.resolution_policy(),
        RetryPolicy {
            max_attempts: config.resolver.max_attempts,
            initial_backoff: config.resolver.initial_backoff(),
        },
    )
    .with_cancel(cancel.clone());

    let mut sink = SinkRegistry::new()
        .create(&config.delivery.sink)
        .context("failed to create delivery sink")?;
    sink.initialize(toml::Value::Table(config.delivery.extra.clone()))
        .await
        .with_context(|| format!("failed to initialize sink '{}'", config.delivery.sink))?;
    if !sink.is_healthy() {
        tracing::warn!(sink = sink.name(), "sink reports unhealthy after initialization");
    }
    let sink: Arc<dyn Sink> = Arc::from(sink);

    tracing::info!(
        translator = translator.name(),
        synthesizer = synthesizer.name(),
        sink = sink.name(),
        policy = ?resolver.policy(),
        "relay pipeline ready"
    );

    let pipeline = Arc::new(UtterancePipeline::new(
        translator,
        synthesizer,
        resolver,
        Delivery::new(Arc::clone(&sink)),
        PipelineConfig::from_app_config(&config),
    ));

    let mut relay = RelayHost::new(pipeline, transcripts);
    let stats = relay.stats();
    relay.start();
    transcription.start();

    let run_timeout = Duration::from_secs(config.general.run_timeout_secs);
    tokio::select! {
        _ = relay.shutdown() => {
            tracing::info!("audio stream finished");
        }
        _ = tokio::time::sleep(run_timeout) => {
            tracing::warn!(
                timeout_secs = config.general.run_timeout_secs,
                "run timeout reached, stopping"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, stopping");
        }
    }

    cancel.cancel();
    transcription.shutdown().await;
    relay.shutdown().await;

    if let Err(e) = sink.shutdown().await {
        tracing::error!(sink = sink.name(), "sink shutdown failed: {e}");
    }

    tracing::info!(
        events = stats.events(),
        utterances = stats.dispatched(),
        "voxrelay stopped"
    );
    Ok(())
}
