use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::Parser;
use petition_sync::{Config, HttpSource, Ledger, ProposalStore, SyncOptions, Syncer};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Record newly submitted petition proposals and append them to a log.
#[derive(Parser, Debug)]
#[command(name = "petition-sync", version)]
struct Args {
    /// TOML config file; built-in defaults are used without one
    #[arg(long, value_name = "FILE", env = "PETITION_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Number of newest proposals to check
    #[arg(long, env = "PETITION_SYNC_LIMIT")]
    limit: Option<usize>,

    /// Pause before each detail request, in milliseconds
    #[arg(long, env = "PETITION_SYNC_DELAY_MS")]
    delay_ms: Option<u64>,

    /// Directory holding one JSON file per proposal
    #[arg(long, value_name = "DIR", env = "PETITION_SYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Append-only proposal log
    #[arg(long, value_name = "FILE", env = "PETITION_SYNC_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[arg(long, value_name = "URL", env = "PETITION_SYNC_BASE_URL")]
    base_url: Option<String>,

    /// Log filter (e.g. info, debug); falls back to RUST_LOG
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(limit) = self.limit {
            config.sync.limit = limit;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.sync.delay_ms = delay_ms;
        }
        if let Some(data_dir) = self.data_dir {
            config.sync.data_dir = data_dir;
        }
        if let Some(log_file) = self.log_file {
            config.sync.log_file = log_file;
        }
        if let Some(base_url) = self.base_url {
            config.site.base_url = base_url;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let (filter, filter_error) = log_filter(args.log_level.as_deref());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    if let Some(error) = filter_error {
        tracing::warn!("{}, logging at info", error);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut chain = error_chain(err.as_ref()).into_iter();
            if let Some(top) = chain.next() {
                tracing::error!("{}", top);
            }
            for cause in chain {
                tracing::error!("  caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

/// Builds the log filter from `--log-level`, else `RUST_LOG`, else `info`.
///
/// A level that fails to parse is reported back instead of being dropped.
fn log_filter(level: Option<&str>) -> (EnvFilter, Option<String>) {
    match level {
        Some(level) => match EnvFilter::try_new(level) {
            Ok(filter) => (filter, None),
            Err(err) => (
                EnvFilter::new("info"),
                Some(format!("invalid --log-level '{level}': {err}")),
            ),
        },
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, None),
            Err(_) => (EnvFilter::new("info"), None),
        },
    }
}

/// Messages of `err` and each of its sources, outermost first.
fn error_chain(err: &(dyn Error + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let source = HttpSource::new(&config.site)?;
    let syncer = Syncer::new(
        ProposalStore::open(&config.sync.data_dir)?,
        Ledger::new(&config.sync.log_file),
        config.extractor()?,
        SyncOptions {
            limit: config.sync.limit,
            delay: config.sync.delay(),
        },
    );

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for event: {:?}", error);
            return;
        }
        tracing::info!("received ctrl-c, finishing up");
        ctrl_c_token.cancel();
    });

    syncer.run(&source, token).await?;
    Ok(())
}
