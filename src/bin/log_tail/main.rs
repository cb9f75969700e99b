//! Terminal viewer: prints the recent history matching `--level`/`--type`, then
//! tails new records as they are inserted.

use broadcast::{delivery, ChangeFeed, DeliveryEnd, Hub, PgNotificationSource};
use clap::Parser;
use domain::log_record::{self as LogRecordApi, DatabaseRecordStore};
use domain::Filter;
use log::*;
use service::{config::Config, logging::Logger};
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod terminal;

use terminal::TerminalSink;

#[derive(Debug, Parser)]
#[command(author, version, about = "Tail log records in real time", long_about = None)]
struct Args {
    /// Only show records with this level (INFO, WARNING, ERROR, DEBUG)
    #[arg(long)]
    level: Option<String>,

    /// Only show records with this type (SYSTEM, AUTH, DATABASE, USER, API)
    #[arg(long = "type")]
    category: Option<String>,

    #[command(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = args.config;

    // stdout is reserved for records
    if let Err(e) = Logger::init_stderr_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        return ExitCode::FAILURE;
    }

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to connect to database: {e}");
            return ExitCode::FAILURE;
        }
    };

    let source = match PgNotificationSource::connect(config.database_url()).await {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to start log listener: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let hub = Arc::new(Hub::new(config.subscriber_queue_capacity));
    let filter = Filter::new(args.level, args.category);

    // Subscribe before reading history so records inserted in between are not missed
    let subscription = hub.register(filter.clone());

    let feed = ChangeFeed::new(source, config.feed_settings()).subscribe(shutdown.child_token());
    let feed_task = {
        let hub = Arc::clone(&hub);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = hub.pump(feed).await;
            if let Err(e) = &result {
                error!("Log listener failed: {e}");
            }
            shutdown.cancel();
            result
        })
    };

    let store = DatabaseRecordStore::new(db);
    let records = match LogRecordApi::snapshot(&store, &filter, config.snapshot_limit).await {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to get logs: {e}");
            shutdown.cancel();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = terminal::write_snapshot(&mut io::stdout().lock(), &filter, &records) {
        error!("Failed to write to stdout: {e}");
        shutdown.cancel();
        return ExitCode::FAILURE;
    }

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = service::shutdown_signal() => shutdown.cancel(),
                _ = shutdown.cancelled() => {}
            }
        }
    });

    let end = delivery::run(
        Arc::clone(&hub),
        subscription,
        TerminalSink::stdout(),
        shutdown.child_token(),
    )
    .await;
    if end == DeliveryEnd::Closed {
        warn!("Fell too far behind the log feed and was disconnected");
    }
    shutdown.cancel();

    println!("\nShutting down...");

    let feed_failed = !matches!(feed_task.await, Ok(Ok(())));
    if feed_failed || end == DeliveryEnd::SinkFailed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
