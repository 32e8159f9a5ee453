#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::Error;
use domain::models::Notification;
use domain::models::Request;
use domain::services::SessionCoordinator;
use infrastructure::audio::NoopAudio;
use infrastructure::capture::NoopCapture;
use infrastructure::store::FileStore;
use tokio::sync::mpsc;
use tokio::task;
use yansi::Paint;

use crate::application::cli;
use crate::application::console::ConsoleService;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! Sidekick has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    process::exit(1);
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("SIDEKICK_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap_or_else(|| return std::path::PathBuf::from("."))
            .join("sidekick")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("sidekick")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let ready_res = cli::parse().await;
    if let Err(ready_err) = ready_res {
        handle_error(ready_err);
        return;
    }
    if !ready_res.unwrap() {
        process::exit(0);
    }

    let (request_tx, request_rx) = mpsc::unbounded_channel::<Request>();
    let (notify_tx, notify_rx) = mpsc::unbounded_channel::<Notification>();

    let coordinator = SessionCoordinator::new(
        Arc::new(NoopCapture::default()),
        Box::new(NoopAudio::default()),
        Box::new(FileStore::default()),
        notify_tx,
    );

    let mut background_futures = task::JoinSet::new();
    background_futures.spawn(async move {
        return coordinator.run(request_rx).await;
    });

    let console_future = ConsoleService::start(request_tx, notify_rx);

    let res = tokio::select!(
        res = background_futures.join_next() => res.unwrap().unwrap(),
        res = console_future => res,
    );

    if res.is_err() {
        handle_error(res.unwrap_err());
    }

    process::exit(0);
}
