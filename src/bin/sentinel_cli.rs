use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use structopt::StructOpt;

use logsentinel::config::Config;
use logsentinel::output::{OutputFormat, OutputHandler};
use logsentinel::persistence::{AlertQuery, AlertStore, SqliteAlertStore};
use logsentinel::{process_upload, AlertEmitter, LogAnalyzer, LogNotifier};

/// LogSentinel brute-force detection command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "sentinel", about = "Brute-force burst detection for authentication logs")]
pub enum Cli {
    /// Analyze a log file for brute-force bursts
    Analyze {
        /// Path to log file
        #[structopt(short, long)]
        file: PathBuf,
        /// Path to configuration file
        #[structopt(short, long)]
        config: Option<PathBuf>,
        /// Store alerts in this database (overrides the configured path)
        #[structopt(long)]
        db: Option<PathBuf>,
        /// Do not store alerts
        #[structopt(long)]
        dry_run: bool,
        /// Notification recipient
        #[structopt(short, long)]
        recipient: Option<String>,
        /// Output format: json, jsonl or console
        #[structopt(long, default_value = "console")]
        format: String,
    },
    /// Query stored alerts
    Alerts {
        /// Path to alert database
        #[structopt(long, default_value = "logsentinel.db")]
        db: PathBuf,
        /// Only alerts for this source address
        #[structopt(long)]
        ip: Option<String>,
        /// First day to include (YYYY-MM-DD)
        #[structopt(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[structopt(long)]
        to: Option<NaiveDate>,
        /// Output format: json, jsonl or console
        #[structopt(long, default_value = "console")]
        format: String,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::from_args();

    match cli {
        Cli::Analyze {
            file,
            config,
            db,
            dry_run,
            recipient,
            format,
        } => {
            if !file.exists() {
                eprintln!("File not found: {:?}", file);
                std::process::exit(1);
            }

            let config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            let analyzer = LogAnalyzer::from_config(&config.detection)?;
            let content = std::fs::read(&file)?;

            let report = if dry_run {
                analyzer.analyze_upload(Some(content.as_slice()))?
            } else {
                let db_path = db.unwrap_or(config.persistence.db_path);
                let store: Arc<dyn AlertStore> = Arc::new(SqliteAlertStore::new(&db_path)?);
                let emitter = AlertEmitter::new(
                    store,
                    Arc::new(LogNotifier),
                    config.alerting.default_recipient,
                );
                process_upload(&analyzer, &emitter, Some(content.as_slice()), recipient.as_deref())?
            };

            let mut output = OutputHandler::new(OutputFormat::parse(&format), None)?;
            output.write_report(&file.display().to_string(), &report)?;
        }
        Cli::Alerts {
            db,
            ip,
            from,
            to,
            format,
        } => {
            if !db.exists() {
                eprintln!("Database not found: {:?}", db);
                std::process::exit(1);
            }

            let store = SqliteAlertStore::new(&db)?;
            let query = AlertQuery {
                address: ip,
                from,
                to,
            };
            let alerts = store.query(&query)?;

            let mut output = OutputHandler::new(OutputFormat::parse(&format), None)?;
            output.write_alerts(&alerts)?;
        }
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
    }

    Ok(())
}
