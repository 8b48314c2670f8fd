use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use logsentinel::alerting::{AlertDispatcher, AlertQueue};
use logsentinel::config::Config;
use logsentinel::input::watcher::AsyncDirectoryWatcher;
use logsentinel::output::{OutputFormat, OutputHandler};
use logsentinel::persistence::{AlertStore, SqliteAlertStore};
use logsentinel::{process_upload, AlertEmitter, LogAnalyzer};

/// Main daemon entry point: watch a folder and analyze each new log file
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Starting LogSentinel daemon...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    // Setup graceful shutdown signal handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, gracefully stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    let analyzer = Arc::new(LogAnalyzer::from_config(&config.detection)?);
    log::info!(
        "Detection initialized: {} attempts within {}s",
        analyzer.detector().threshold(),
        analyzer.detector().max_window_seconds()
    );

    let store: Arc<dyn AlertStore> = Arc::new(SqliteAlertStore::new(&config.persistence.db_path)?);
    log::info!("Alert store: {:?}", config.persistence.db_path);

    // Notifications are queued and delivered by a background task
    let (alert_tx, alert_rx) = AlertDispatcher::create_channel();
    let dispatcher = AlertDispatcher::new(config.alerting.clone());
    let dispatcher_handle = tokio::spawn(dispatcher.run(alert_rx));

    let emitter = AlertEmitter::new(
        store,
        Arc::new(AlertQueue::new(alert_tx)),
        config.alerting.default_recipient.clone(),
    );

    let mut output_handler = OutputHandler::new(
        OutputFormat::parse(&config.output.format),
        config.output.file_path.clone(),
    )?;

    // Watch for new files
    std::fs::create_dir_all(&config.input.watch_dir)?;
    let (file_tx, mut file_rx) = mpsc::channel::<PathBuf>(64);
    let mut watcher = AsyncDirectoryWatcher::new(
        config.input.watch_dir.clone(),
        Duration::from_millis(config.input.poll_interval_ms),
    );
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watcher.run(file_tx).await {
            log::error!("Directory watcher failed: {}", e);
        }
    });

    log::info!("Daemon running. Press Ctrl+C to stop.");

    // Main file processing loop
    while running.load(Ordering::SeqCst) {
        let path = match tokio::time::timeout(Duration::from_millis(100), file_rx.recv()).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                log::error!("Directory watcher stopped");
                break;
            }
            Err(_) => continue,
        };

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) => {
                log::error!("Failed to read {:?}: {}", path, e);
                continue;
            }
        };

        let analyzer = Arc::clone(&analyzer);
        let emitter = emitter.clone();
        let result = tokio::task::spawn_blocking(move || {
            process_upload(&analyzer, &emitter, Some(content.as_slice()), None)
        })
        .await;

        match result {
            Ok(Ok(report)) => {
                log::info!(
                    "Analyzed {:?}: {} line(s), {} alert(s)",
                    path,
                    report.total_lines,
                    report.alerts.len()
                );
                if let Err(e) = output_handler.write_report(&path.display().to_string(), &report) {
                    log::error!("Failed to write report: {}", e);
                }
            }
            Ok(Err(e)) => log::error!("Failed to analyze {:?}: {}", path, e),
            Err(e) => log::error!("Analysis task for {:?} panicked: {}", path, e),
        }
    }

    // Closing the receiver stops the watcher; dropping the emitter closes the alert queue
    drop(file_rx);
    drop(emitter);
    let _ = watcher_handle.await;
    let _ = dispatcher_handle.await;

    output_handler.flush()?;
    log::info!("LogSentinel daemon stopped");
    Ok(())
}
