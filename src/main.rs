//! Regatlas main entry point
//!
//! This is the command-line interface for the Regatlas regulations graph.

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use regatlas::chat::{answer_relationship, render_context};
use regatlas::config::{load_config_with_hash, Config};
use regatlas::crawler::crawl;
use regatlas::output::{export_tree, format_crawl_summary, load_statistics, print_statistics};
use regatlas::retrieval::RetrievalEngine;
use regatlas::storage::{GraphStore, SqliteGraphStore};
use regatlas::url::{resolve, CrawlScope};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Regatlas: a regulations knowledge graph
///
/// Regatlas crawls a hierarchical regulations website breadth-first, stores
/// every document and link in a SQLite graph with a full-text index, and
/// answers structural and content questions from it.
#[derive(Parser, Debug)]
#[command(name = "regatlas")]
#[command(version)]
#[command(about = "Crawl and query a regulations knowledge graph", long_about = None)]
#[command(group(ArgGroup::new("mode").args(["dry_run", "stats", "search", "context", "structure", "export_tree"])))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete the existing database before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Run a full-text search and print the ranked hits
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Print the retrieval context an answer generator would receive
    #[arg(long, value_name = "QUERY")]
    context: Option<String>,

    /// Answer a structural question from the hierarchy
    #[arg(long, value_name = "QUERY")]
    structure: Option<String>,

    /// Write the document hierarchy as a markdown outline
    #[arg(long, value_name = "PATH")]
    export_tree: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if let Some(query) = &cli.search {
        handle_search(&config, query)
    } else if let Some(query) = &cli.context {
        handle_context(&config, query)
    } else if let Some(query) = &cli.structure {
        handle_structure(&config, query)
    } else if let Some(path) = &cli.export_tree {
        handle_export_tree(&config, path)
    } else {
        handle_crawl(&config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("regatlas=info,warn"),
            1 => EnvFilter::new("regatlas=debug,info"),
            2 => EnvFilter::new("regatlas=trace,debug"),
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

/// Opens an existing database for querying
fn open_existing(config: &Config) -> anyhow::Result<SqliteGraphStore> {
    let path = Path::new(&config.storage.database_path);
    if !path.exists() {
        bail!(
            "Database {} does not exist; run a crawl first",
            path.display()
        );
    }
    SqliteGraphStore::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Regatlas Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Root: {}", config.crawler.root_url);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);

    println!("\nScope:");
    println!("  Domain: {}", config.scope.allowed_domain);
    println!("  Path prefix: {}", config.scope.allowed_path_prefix);
    println!(
        "  Skip anchor patterns: {}",
        config.scope.skip_anchor_patterns.len()
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nRetrieval:");
    println!(
        "  Window: {} chars, bias {:.2}, boilerplate skip {}",
        config.retrieval.window_size,
        config.retrieval.backward_bias,
        config.retrieval.boilerplate_skip
    );
    println!("  Extra acronyms: {}", config.acronyms.len());

    // Both were checked during validation; this shows how the root resolves
    CrawlScope::from_config(&config.scope)?;
    let root = resolve(&config.crawler.root_url)?;
    println!("\nRoot identity:");
    println!("  Address: {}", root.canonical_address);
    println!(
        "  Identity key: {}",
        root.identity_key.as_deref().unwrap_or("(none)")
    );

    println!("\nConfiguration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_existing(config)?;
    let status = load_statistics(&store)?;
    print_statistics(&status);

    Ok(())
}

/// Handles the --search mode: prints ranked full-text hits
fn handle_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let store = open_existing(config)?;
    let hits = store.lexical_search(query, config.retrieval.candidate_limit)?;

    if hits.is_empty() {
        println!("No documents found for '{}'", query);
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. {} (depth {})", rank + 1, hit.title, hit.depth);
        println!("   {}", hit.address);
        if !hit.snippet.is_empty() {
            println!("   {}", hit.snippet);
        }
    }

    Ok(())
}

/// Handles the --context mode: prints retrieval excerpts
fn handle_context(config: &Config, query: &str) -> anyhow::Result<()> {
    let store = open_existing(config)?;
    let engine = RetrievalEngine::new(&store, &config.retrieval, &config.acronyms)?;

    tracing::info!("Search query: {}", engine.expand_query(query));
    let items = engine.retrieve(query)?;
    println!("{}", render_context(&items));

    Ok(())
}

/// Handles the --structure mode: answers from the hierarchy
fn handle_structure(config: &Config, query: &str) -> anyhow::Result<()> {
    let store = open_existing(config)?;

    match answer_relationship(query, &store)? {
        Some(answer) => println!("{}", answer.to_markdown()),
        None => println!("No document title matches '{}'", query),
    }

    Ok(())
}

/// Handles the --export-tree mode: writes the hierarchy outline
fn handle_export_tree(config: &Config, path: &Path) -> anyhow::Result<()> {
    let store = open_existing(config)?;
    let count = export_tree(&store, config.crawler.max_depth, path)?;

    println!("Exported {} documents to {}", count, path.display());

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    let db_path = Path::new(&config.storage.database_path);

    if fresh {
        tracing::info!("Starting fresh crawl (removing {})", db_path.display());
        remove_database(db_path)?;
    } else {
        tracing::info!("Starting crawl (existing documents are updated in place)");
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut store = SqliteGraphStore::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            stop_on_signal.store(true, Ordering::Relaxed);
        }
    });

    let result = crawl(config, &mut store, stop).await;
    store.close()?;

    match result {
        Ok(summary) => {
            println!("{}", format_crawl_summary(&summary));
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Removes the database and its WAL side files
fn remove_database(path: &Path) -> anyhow::Result<()> {
    let mut targets = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut side = path.as_os_str().to_owned();
        side.push(suffix);
        targets.push(PathBuf::from(side));
    }

    for target in targets {
        if target.exists() {
            std::fs::remove_file(&target)
                .with_context(|| format!("Failed to remove {}", target.display()))?;
        }
    }

    Ok(())
}
