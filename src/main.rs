//! Headless board session driver.
//!
//! Reads one JSON [`SessionCommand`] per line from stdin and writes one JSON
//! [`SessionEvent`] per line to stdout. Logs go to stderr. End of input or
//! Ctrl-C stops the session after flushing pending edits.

use std::process::ExitCode;
use std::sync::Arc;

use tabletop::config::Config;
use tabletop::db;
use tabletop::roster::{HttpRoster, RosterProvider, StaticRoster};
use tabletop::session::{BoardSession, SessionCommand, SessionConfig, SessionDeps, SessionEvent};
use tabletop::store::{ChangeFeed, MemoryStore, PgStore, SnapshotStore};
use tabletop::upload::{DisabledUploads, HttpUploadSink, UploadSink};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "no .env file loaded");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let (store, feed): (Arc<dyn SnapshotStore>, Arc<dyn ChangeFeed>) = match config.database_url.as_deref() {
        Some(url) => match db::init_pool(url, config.db_max_connections).await {
            Ok(pool) => {
                let store = Arc::new(PgStore::new(pool));
                (store.clone() as Arc<dyn SnapshotStore>, store as Arc<dyn ChangeFeed>)
            }
            Err(e) => {
                error!(error = %e, "database init failed");
                return ExitCode::FAILURE;
            }
        },
        None => {
            warn!("DATABASE_URL not set; board state lives in memory only");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn SnapshotStore>, store as Arc<dyn ChangeFeed>)
        }
    };

    let deps = SessionDeps { store, roster: roster_provider(&config), uploads: upload_sink(&config) };
    let session_config = SessionConfig { campaign_id: config.campaign_id.clone(), persistence: config.persistence() };

    let remote = match feed.subscribe(config.session_id).await {
        Ok(rx) => rx,
        Err(e) => {
            warn!(error = %e, "change feed unavailable; remote updates disabled");
            mpsc::channel(1).1
        }
    };

    let session = match BoardSession::open(config.session_id, deps, session_config).await {
        Ok(session) => session,
        Err(e) => {
            error!(session = %config.session_id, error = %e, "session open failed");
            return ExitCode::FAILURE;
        }
    };
    info!(session = %config.session_id, "session ready; reading commands from stdin");

    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let reader = tokio::spawn(read_commands(cmd_tx));
    let writer = tokio::spawn(write_events(out_rx));

    session.run(cmd_rx, remote, out_tx).await;

    reader.abort();
    if let Err(e) = writer.await {
        error!(error = %e, "output task failed");
    }
    ExitCode::SUCCESS
}

fn roster_provider(config: &Config) -> Arc<dyn RosterProvider> {
    let Some(url) = config.roster_url.as_deref() else {
        return Arc::new(StaticRoster::default());
    };
    match HttpRoster::new(url, config.http_timeout) {
        Ok(roster) => Arc::new(roster),
        Err(e) => {
            warn!(error = %e, "roster client unavailable; using empty roster");
            Arc::new(StaticRoster::default())
        }
    }
}

fn upload_sink(config: &Config) -> Arc<dyn UploadSink> {
    let Some(url) = config.upload_url.as_deref() else {
        return Arc::new(DisabledUploads);
    };
    match HttpUploadSink::new(url, config.http_timeout) {
        Ok(sink) => Arc::new(sink),
        Err(e) => {
            warn!(error = %e, "upload client unavailable; images stay local");
            Arc::new(DisabledUploads)
        }
    }
}

async fn read_commands(tx: mpsc::Sender<SessionCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; shutting down");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SessionCommand>(&line) {
            Ok(command) => {
                if tx.send(command).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "invalid command skipped"),
        }
    }
}

async fn write_events(mut rx: mpsc::Receiver<SessionEvent>) {
    let mut stdout = tokio::io::stdout();
    while let Some(event) = rx.recv().await {
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "event encode failed");
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            error!(error = %e, "stdout write failed");
            break;
        }
        if let Err(e) = stdout.flush().await {
            error!(error = %e, "stdout flush failed");
            break;
        }
    }
}
