mod cli;
mod config;
mod error;
mod output;
mod progress;

use crate::{
    cli::Args,
    config::AppConfig,
    error::{AppError, Result},
    progress::ProgressReporter,
};
use clap::Parser;
use indicatif::HumanBytes;
use spool_engine::{CaptureSession, capture_channel};
use std::process;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        if matches!(&e, AppError::Capture(err) if err.is_retryable()) {
            eprintln!("The server may be temporarily unavailable; try again later.");
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?.with_overrides(&args)?;
    let spool_config = config.to_spool_config(args.proxy_type)?;
    let label = config.label(args.name.as_deref());

    let manifest_url = match &args.url {
        Some(url) => url.clone(),
        None if args.stdin => read_manifest_from_stdin().await?,
        None => {
            return Err(AppError::InvalidInput(
                "a playlist URL or --stdin is required".to_string(),
            ));
        }
    };

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current segment window");
            ctrl_c_token.cancel();
        }
    });

    let session = CaptureSession::from_config(spool_config)?;
    let reporter = ProgressReporter::new(args.quiet);
    info!(
        url = %manifest_url,
        label = %label,
        concurrency = session.config().scheduler.download_concurrency,
        "Starting capture"
    );
    let media = session.run(&manifest_url, &label, &reporter, &token).await?;
    drop(reporter);

    let path = output::save_artifact(&config.output_dir, &media.filename, &media.artifact.bytes)
        .await?;
    if media.segments_failed > 0 {
        warn!(
            failed = media.segments_failed,
            total = media.segments_total,
            "Some segments could not be downloaded and were skipped"
        );
    }
    println!(
        "Saved {} ({}, {}) to {}",
        media.filename,
        media.mime(),
        HumanBytes(media.artifact.len() as u64),
        path.display()
    );
    Ok(())
}

/// Feeds stdin lines into the capture channel until a playlist URL shows up.
async fn read_manifest_from_stdin() -> Result<String> {
    info!("Waiting for a playlist URL on stdin");
    first_manifest_url(BufReader::new(tokio::io::stdin())).await
}

/// Returns the first playlist URL found in `reader`, one candidate per line.
///
/// Bytes that are not valid UTF-8 are replaced rather than ending the scan.
async fn first_manifest_url<R>(mut reader: R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let (capture, receiver) = capture_channel();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&line);
        if capture.observe(text.trim_end()) {
            break;
        }
    }
    drop(capture);

    receiver.recv().await.ok_or(AppError::NoManifest)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    subscriber
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}
