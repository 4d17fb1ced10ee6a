//! CLI entrypoint for council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use council_application::{
    ConversationLogger, LeaderboardSink, MemoryLookup, ModelBackend, NoConversationLogger,
    NoLeaderboard, NoMemory, NoTools, RunDeliberationInput, RunDeliberationUseCase, ToolInvoker,
};
use council_domain::{CouncilSnapshot, Query, parse_panel_override};
use council_infrastructure::{
    ConfigLoader, FileConfig, HttpMemoryLookup, HttpToolInvoker, JsonFileLeaderboard,
    JsonlConversationLogger, OpenAiCompatibleBackend,
};
use council_presentation::{
    AppState, AskArgs, Cli, Command, DeliberationService, NdjsonWriter, ServeArgs,
    TranscriptFactory,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Everything a command needs, built once from the loaded config
struct Wiring {
    service: DeliberationService,
    councils: Vec<CouncilSnapshot>,
    leaderboard: Arc<dyn LeaderboardSink>,
    transcripts: Option<TranscriptFactory>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting council");

    match cli.command {
        Command::Config => show_config(cli.config.as_deref()),
        Command::Ask(args) => {
            let config = load_config(cli.config.as_deref())?;
            let wiring = wire(&config)?;
            ask(args, &config, wiring).await
        }
        Command::Serve(args) => {
            let config = load_config(cli.config.as_deref())?;
            let wiring = wire(&config)?;
            serve(args, &config, wiring).await
        }
    }
}

/// Logs go to stderr so stdout stays pure NDJSON
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path
                .file_name()
                .with_context(|| format!("invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

fn load_config(path: Option<&Path>) -> Result<FileConfig> {
    let config = ConfigLoader::load(path).context("failed to load configuration")?;
    if config.councils.is_empty() {
        bail!(
            "No councils configured. Add a [councils.<id>] table to council.toml \
             (run `council config` to see where configuration is read from)."
        );
    }
    Ok(config)
}

// === Dependency Injection ===
fn wire(config: &FileConfig) -> Result<Wiring> {
    let councils = config
        .council_snapshots()
        .context("invalid council configuration")?;

    let backend: Arc<dyn ModelBackend> = Arc::new(
        OpenAiCompatibleBackend::new(&config.backend).context("failed to create model backend")?,
    );

    let tools: Arc<dyn ToolInvoker> = match &config.tools.endpoint {
        Some(endpoint) => {
            info!("Tool gateway: {}", endpoint);
            Arc::new(HttpToolInvoker::new(endpoint))
        }
        None => Arc::new(NoTools),
    };

    let memory: Arc<dyn MemoryLookup> = match &config.memory.endpoint {
        Some(endpoint) => {
            info!("Memory service: {}", endpoint);
            Arc::new(
                HttpMemoryLookup::new(endpoint)
                    .with_record_endpoint(config.memory.record_endpoint.as_deref()),
            )
        }
        None => Arc::new(NoMemory),
    };

    let leaderboard: Arc<dyn LeaderboardSink> = match &config.leaderboard.path {
        Some(path) => Arc::new(JsonFileLeaderboard::new(path)),
        None => Arc::new(NoLeaderboard),
    };

    let transcripts = config.logging.transcript_dir.clone().map(|dir| {
        let factory: TranscriptFactory = Arc::new(move |conversation_id: &str| {
            match JsonlConversationLogger::for_conversation(&dir, conversation_id) {
                Some(logger) => Arc::new(logger) as Arc<dyn ConversationLogger>,
                None => Arc::new(NoConversationLogger),
            }
        });
        factory
    });

    let service = RunDeliberationUseCase::new(
        backend,
        tools,
        config.deliberation.to_deliberation_config(),
    )
    .with_memory(memory)
    .with_leaderboard(Arc::clone(&leaderboard));

    Ok(Wiring {
        service,
        councils,
        leaderboard,
        transcripts,
    })
}

async fn ask(args: AskArgs, config: &FileConfig, wiring: Wiring) -> Result<()> {
    let Some(council_id) = args.council.as_deref().or_else(|| config.default_council_id())
    else {
        bail!("No council selected");
    };
    let council = wiring
        .councils
        .into_iter()
        .find(|council| council.id() == council_id)
        .with_context(|| format!("Unknown council: {}", council_id))?;

    let query = Query::try_new(args.question)?;
    let conversation_id = args.conversation.unwrap_or_else(|| {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        format!("cli-{}", millis)
    });

    let mut input = RunDeliberationInput::new(conversation_id.as_str(), query, Arc::new(council))
        .with_force_direct(args.force_direct);
    if let Some(panel) = args.panel.as_deref() {
        input = input.with_panel_override(parse_panel_override(panel));
    }
    if let Some(mode) = args.mode {
        input = input.with_mode(mode.into());
    }

    let service = match &wiring.transcripts {
        Some(factory) => wiring
            .service
            .with_conversation_logger(factory(&conversation_id)),
        None => wiring.service,
    };

    let (tx, rx) = mpsc::channel(service.config().event_buffer.max(1));
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling deliberation");
            interrupt.cancel();
        }
    });

    let run = tokio::spawn(async move { service.execute(input, tx, cancel).await });

    let mut writer = NdjsonWriter::new(std::io::stdout());
    let saw_done = writer.drain(rx).await.context("failed to write events")?;

    match run.await.context("deliberation task panicked")? {
        Ok(outcome) => info!("Conversation {} complete", outcome.conversation_id),
        Err(e) if e.is_cancelled() => bail!("Deliberation cancelled"),
        Err(e) => return Err(e).context("deliberation failed"),
    }
    if !saw_done {
        bail!("Deliberation ended without a done event");
    }
    Ok(())
}

async fn serve(args: ServeArgs, config: &FileConfig, wiring: Wiring) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let mut state = AppState::new(wiring.service, wiring.councils, wiring.leaderboard)
        .with_default_council(config.default_council_id());
    if let Some(factory) = wiring.transcripts {
        state = state.with_transcripts(factory);
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            signal.cancel();
        }
    });

    council_presentation::serve(state, &bind, shutdown)
        .await
        .with_context(|| format!("server on {} failed", bind))
}

fn show_config(path: Option<&Path>) -> Result<()> {
    for line in ConfigLoader::describe_sources(path) {
        println!("{}", line);
    }

    let config = ConfigLoader::load(path).context("failed to load configuration")?;
    let default_id = config.default_council_id();
    println!();
    println!("Backend: {}", config.backend.base_url);
    if config.councils.is_empty() {
        println!("Councils: none configured");
        return Ok(());
    }
    println!("Councils:");
    for council in config
        .council_snapshots()
        .context("invalid council configuration")?
    {
        let marker = if Some(council.id()) == default_id { "*" } else { " " };
        println!(
            "  {} {} ({}): chairman {}, {} advisors",
            marker,
            council.id(),
            council.name(),
            council.chairman(),
            council.advisors().len()
        );
    }
    Ok(())
}
