use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use freshfeed::app::{App, AppEvent};
use freshfeed::config::Config;
use freshfeed::feed::Environment;
use freshfeed::router::Route;
use freshfeed::storage::{Database, DatabaseError, NewPost, SearchQuery};
use freshfeed::ui;

/// Maximum import file size (50 MB).
const MAX_IMPORT_SIZE: u64 = 50 * 1024 * 1024;

/// Get the config directory path (~/.config/freshfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("freshfeed"))
}

#[derive(Parser, Debug)]
#[command(name = "freshfeed", about = "Terminal browser for curated Reddit, X and YouTube posts")]
struct Args {
    /// Route to open, e.g. `/funny`, `/gaming/youtube` or `/collections/most-viral-content`
    #[arg(default_value = "/")]
    path: String,

    /// Import posts from a JSON array file
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Reset database (delete and recreate)
    #[arg(long)]
    reset_db: bool,

    /// Print posts matching QUERY as JSON and exit
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Config file (default: ~/.config/freshfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let route = Route::parse(&args.path).with_context(|| format!("Invalid path '{}'", args.path))?;

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = config_dir.join("posts.db");
    if args.reset_db && db_path.exists() {
        std::fs::remove_file(&db_path).context("Failed to delete database")?;
        println!("Database reset.");
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of freshfeed appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    if let Some(import_file) = &args.import {
        let stored = import(&db, import_file).await?;
        println!("Imported {} posts from {}", stored, import_file.display());
    }

    if let Some(query) = &args.search {
        let posts = db
            .search_posts_limited(&SearchQuery::matching(query), config.search_limit)
            .await
            .context("Search failed")?;
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }

    if args.import.is_some() && args.path == "/" {
        // Import-only invocation
        return Ok(());
    }

    let count = db.count_posts().await.context("Failed to count posts")?;
    if count == 0 {
        eprintln!("No posts yet. Import some with:");
        eprintln!("  freshfeed --import /path/to/posts.json");
        std::process::exit(1);
    }
    tracing::info!(posts = count, route = %route, "Starting");

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(64);
    let mut app = App::new(db, &config, Environment::terminal(), event_tx);
    app.start(route);

    ui::run(&mut app, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}

/// Read a JSON array of posts and store them.
async fn import(db: &Database, path: &Path) -> Result<usize> {
    // SEC-008: Canonicalize to resolve symlinks and prevent path traversal
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve import file: {}", path.display()))?;
    let metadata = std::fs::metadata(&canonical)?;
    if !metadata.is_file() {
        anyhow::bail!("Import path must be a regular file");
    }
    if metadata.len() > MAX_IMPORT_SIZE {
        anyhow::bail!(
            "Import file is {} bytes (max {} bytes)",
            metadata.len(),
            MAX_IMPORT_SIZE
        );
    }

    let content = std::fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read import file: {}", canonical.display()))?;
    let posts: Vec<NewPost> =
        serde_json::from_str(&content).context("Import file must be a JSON array of posts")?;

    db.import_posts(&posts)
        .await
        .context("Failed to import posts")
}
