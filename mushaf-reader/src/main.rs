mod clock;

use crate::clock::media_clock;
use mushaf_core::{
    bootstrap, CoreError, MushafApi, MushafEvent, MushafReaderConfig, Navigator, Result,
};
use mushaf_qul_client::QulClient;
use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Length reported by the simulated media element for every audio source
const SIMULATED_SOURCE_LENGTH: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    // Load config before tracing so the file layer can honour logging.enabled
    let loaded = MushafReaderConfig::load_or_create();
    init_tracing(loaded.as_ref().is_ok_and(|config| config.logging.enabled));

    let config = match loaded {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            warn!(
                "Created a configuration template at {}; continuing with defaults",
                path.display()
            );
            MushafReaderConfig::default()
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    match runtime.block_on(run(&config, cancel_token)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Wire the client, navigator and media clock together and run until cancelled.
async fn run(config: &MushafReaderConfig, cancel_token: CancellationToken) -> Result<()> {
    let client = QulClient::new(&config.api)?;
    info!("Using Mushaf service at {}", client.base_url());
    let api: Arc<dyn MushafApi> = Arc::new(client);

    let startup = bootstrap(
        api.as_ref(),
        config.mushaf.layout_id,
        config.audio.recitation_id,
    );
    let controller = tokio::select! {
        () = cancel_token.cancelled() => return Ok(()),
        controller = startup => controller?,
    };

    let (media, clock) = media_clock(
        config.audio.tick_interval(),
        SIMULATED_SOURCE_LENGTH,
        cancel_token.clone(),
    );
    let navigator = Navigator::new(
        controller,
        Arc::clone(&api),
        Box::new(media),
        Some(cancel_token.clone()),
    );
    let handle = navigator.handle();

    let events_task = tokio::spawn(log_events(navigator.subscribe()));
    let navigator_task = navigator.start();
    let clock_task = tokio::spawn(clock.run(handle.clone()));

    handle.go_to_page(i64::from(config.mushaf.initial_page))?;

    let _ = navigator_task.await;
    let _ = clock_task.await;
    let _ = events_task.await;
    Ok(())
}

/// Log all state events to the console
async fn log_events(mut rx: broadcast::Receiver<MushafEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match &event {
                MushafEvent::PageLoading { page_number } => {
                    debug!("Loading page {}", page_number);
                }
                MushafEvent::PageChanged { page } => {
                    let words = page.word_range().map_or_else(
                        || "no words".to_string(),
                        |(first, last)| format!("words {first}..={last}"),
                    );
                    info!(
                        "Page {} ({} lines, {})",
                        page.page_number,
                        page.lines.len(),
                        words
                    );
                }
                MushafEvent::PageFailed {
                    page_number,
                    kind,
                    message,
                } => {
                    error!("Page {} failed ({:?}): {}", page_number, kind, message);
                }
                MushafEvent::NavigationFailed {
                    target,
                    kind,
                    message,
                } => {
                    warn!("Cannot go to {} ({:?}): {}", target, kind, message);
                }
                MushafEvent::SelectionChanged { word } => match word {
                    Some(word) => info!("Selected word {} {}", word.word_id, word.text),
                    None => info!("Selection cleared"),
                },
                MushafEvent::HighlightChanged { word_id } => {
                    // Fires every few ticks during playback
                    debug!("Highlight {:?}", word_id);
                }
                MushafEvent::PlaybackChanged { status, position } => {
                    info!("Playback {:?} at {:?}", status, position);
                }
                MushafEvent::AudioUnavailable { kind, message } => {
                    warn!("Audio unavailable ({:?}): {}", kind, message);
                }
            },
            Err(broadcast::error::RecvError::Closed) => {
                info!("Event channel closed");
                break;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {} events", n);
            }
        }
    }
}

/// Filter used when `RUST_LOG` is unset: engine and host at info, dependencies quieter
const DEFAULT_LOG_FILTER: &str = "warn,mushaf=info,mushaf_reader=info,mushaf_qul_client=info";

/// Console logging, plus a plain-text copy in the cache dir when enabled
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_layer = if file_logging_enabled {
        open_log_file().map(|file| {
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
        })
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .init();
}

/// Truncate the log file for this run; `None` leaves logging console-only
fn open_log_file() -> Option<File> {
    let log_path = mushaf_core::log_file_path();
    let opened = log_path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| File::create(&log_path));

    match opened {
        Ok(file) => Some(file),
        Err(e) => {
            // The subscriber is not installed yet
            eprintln!("Failed to create log file at {}: {e}", log_path.display());
            None
        }
    }
}
