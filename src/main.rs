//! wp-ingest main entry point
//!
//! Command-line interface over the ingestion engine's task entry points.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wp_ingest::config::load_config_with_hash;
use wp_ingest::url::Filter;
use wp_ingest::{Engine, EntityKind, TaskSummary};

/// wp-ingest: pulls posts, categories and authors out of a WordPress site
/// into a local relational store
#[derive(Parser, Debug)]
#[command(name = "wp-ingest")]
#[command(version = "1.0.0")]
#[command(about = "A WordPress content-ingestion engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the platform for a keyword and record the result slugs
    Search {
        keyword: String,

        /// Number of result pages to walk
        #[arg(long)]
        pages: Option<u32>,
    },

    /// Resolve pending keyword-search items into posts
    ResolveKeywordItems,

    /// Discover the latest posts and resolve pending daily items
    ResolveDaily,

    /// Manage auto-scrape directives
    #[command(subcommand)]
    AutoScrap(AutoScrapCommand),

    /// Look up a single post, category or author
    Lookup {
        /// post, category or author
        kind: EntityKind,

        #[arg(long, conflicts_with = "slug", required_unless_present = "slug")]
        id: Option<u64>,

        #[arg(long)]
        slug: Option<String>,
    },

    /// Run every periodic task on its configured interval until Ctrl-C
    Run,

    /// Show statistics from the database and exit
    Stats,
}

#[derive(Subcommand, Debug)]
enum AutoScrapCommand {
    /// Create a directive
    Add {
        /// post, category or author
        kind: EntityKind,

        /// First page to fetch (default 1)
        #[arg(long)]
        start: Option<u32>,

        /// Number of pages to fetch (default 5)
        #[arg(long)]
        count: Option<u32>,

        /// Restrict a post directive to one category (remote id)
        #[arg(long)]
        category: Option<i64>,
    },

    /// Run every pending directive once
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let engine = Engine::from_config(config).context("failed to start the engine")?;

    match cli.command {
        Command::Search { keyword, pages } => {
            print_summary(&engine.search_keyword(&keyword, pages).await)?;
        }
        Command::ResolveKeywordItems => {
            print_summary(&engine.resolve_pending_keyword_items().await)?;
        }
        Command::ResolveDaily => {
            print_summary(&engine.resolve_pending_daily_items().await)?;
        }
        Command::AutoScrap(AutoScrapCommand::Add {
            kind,
            start,
            count,
            category,
        }) => {
            let directive = engine.create_auto_scrap(kind, start, count, category)?;
            println!(
                "Created directive {} ({} pages {}..+{})",
                directive.id, directive.field, directive.page_start, directive.page_count
            );
        }
        Command::AutoScrap(AutoScrapCommand::Run) => {
            print_summary(&engine.run_pending_auto_scraps().await)?;
        }
        Command::Lookup { kind, id, slug } => {
            let filter = match (id, slug) {
                (Some(id), _) => Filter::Id(id),
                (None, Some(slug)) => Filter::Slug(slug),
                (None, None) => anyhow::bail!("either --id or --slug is required"),
            };
            let normalized = engine.scrape_single(kind, filter).await?;
            println!(
                "{} {} ({}){}",
                normalized.entity.kind(),
                normalized.entity.id(),
                normalized.entity.slug(),
                if normalized.created { " [new]" } else { "" }
            );
        }
        Command::Run => handle_run(engine).await?,
        Command::Stats => handle_stats(&engine)?,
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wp_ingest=info,warn"),
            1 => EnvFilter::new("wp_ingest=debug,info"),
            2 => EnvFilter::new("wp_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn print_summary(summary: &TaskSummary) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(summary)?);
    Ok(())
}

/// Handles the `stats` command
fn handle_stats(engine: &Engine) -> anyhow::Result<()> {
    use wp_ingest::output::{load_statistics, print_statistics};

    println!("Database: {}\n", engine.config().storage.database_path);

    let stats = load_statistics(&*engine.storage()?)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the `run` command: each entry point on its own interval
async fn handle_run(engine: Engine) -> anyhow::Result<()> {
    let schedule = engine.config().schedule.clone();

    let keyword = spawn_periodic(engine.clone(), schedule.keyword_items_interval(), |e| {
        Box::pin(async move { e.resolve_pending_keyword_items().await })
    });
    let daily = spawn_periodic(engine.clone(), schedule.daily_items_interval(), |e| {
        Box::pin(async move { e.resolve_pending_daily_items().await })
    });
    let auto = spawn_periodic(engine.clone(), schedule.auto_scrap_interval(), |e| {
        Box::pin(async move { e.run_pending_auto_scraps().await })
    });

    tracing::info!("Periodic tasks started, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");
    engine.cancel();

    for handle in [keyword, daily, auto] {
        handle.await.context("periodic task panicked")?;
    }
    Ok(())
}

type TaskFuture = std::pin::Pin<Box<dyn std::future::Future<Output = TaskSummary> + Send>>;

fn spawn_periodic<F>(engine: Engine, every: Duration, task: F) -> tokio::task::JoinHandle<()>
where
    F: Fn(Engine) -> TaskFuture + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = engine.cancel_token().cancelled() => break,
                _ = interval.tick() => {
                    let summary = task(engine.clone()).await;
                    if let Err(e) = print_summary(&summary) {
                        tracing::error!(error = %e, "Failed to print summary");
                    }
                }
            }
        }
    })
}
