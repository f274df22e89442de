use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;

use bookpack::app::artifact_store::LocalDirSink;
use bookpack::app::progress::{Progress, WatchProgress};
use bookpack::app::{BookService, StartOutcome};
use bookpack::cli::{Cli, Command, FetchArgs};
use bookpack::config::JobConfig;
use bookpack::epub::ZipArchiveBuilder;
use bookpack::fetch::HttpFetcher;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookpack::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Fetch(args) => fetch(args).await.context("fetch")?,
        Command::Toc(args) => bookpack::toc::render(args).context("toc")?,
    }

    Ok(())
}

async fn fetch(args: FetchArgs) -> anyhow::Result<()> {
    let config = JobConfig::from_env()
        .context("load config from environment")?
        .apply_args(&args)?;
    let fetcher = HttpFetcher::new(&config.fetcher_options()).context("build http fetcher")?;

    let (progress, mut badge) = WatchProgress::channel();
    let reporter = tokio::spawn(async move {
        while badge.changed().await.is_ok() {
            let progress = *badge.borrow_and_update();
            match progress {
                Progress::Idle => tracing::debug!("progress cleared"),
                _ => tracing::info!(badge = %progress, "progress"),
            }
        }
    });

    let service = BookService::new(
        config,
        Arc::new(fetcher),
        Arc::new(ZipArchiveBuilder),
        Arc::new(progress),
        Arc::new(LocalDirSink::new(&args.out, args.force)),
    );
    let outcome = service.start(&args.url).await;
    drop(service);
    let _ = reporter.await;

    match outcome? {
        StartOutcome::Saved(path) => {
            println!("{}", path.display());
            Ok(())
        }
        StartOutcome::NotABookPage => anyhow::bail!("not a book page: {}", args.url),
        StartOutcome::Busy => anyhow::bail!("a book job is already running"),
    }
}
