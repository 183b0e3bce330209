use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::output::{entry_line, page_header, write_image};
use futures::StreamExt;
use shelfscan_core::config::{self, AppConfig};
use shelfscan_core::{title, Library};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    // Title cleaning needs neither the database nor the gateway.
    if let Commands::Clean { names } = &cli.command {
        for name in names {
            println!("{}", title::clean(name));
        }
        return Ok(());
    }

    let library = open_library(cfg, cli.username.as_deref(), cli.password.as_deref()).await?;
    match cli.command {
        Commands::Ls { path, json } => run_ls(&library, &path, json).await,
        Commands::Scan {
            root,
            max_depth,
            json,
        } => run_scan(&library, &root, max_depth, json).await,
        Commands::Page {
            path,
            page,
            page_size,
            posters,
            json,
        } => run_page(&library, &path, page, page_size, posters, json).await,
        Commands::Search {
            query,
            root,
            page,
            page_size,
            json,
        } => run_search(&library, &root, &query, page, page_size, json).await,
        Commands::Poster { title, json } => run_poster(&library, &title, json).await,
        Commands::Fetch { url, out } => run_fetch(&library, &url, &out).await,
        Commands::Categories { root, json } => run_categories(&library, &root, json).await,
        Commands::Searches { command } => run_searches(&library, command).await,
        Commands::Recent { command } => run_recent(&library, command).await,
        Commands::Clean { .. } => Ok(()),
    }
}

#[derive(Parser)]
#[command(name = "shelfscan")]
#[command(about = "Comic library scanner with cover lookup", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Override the remote gateway user
    #[arg(long, global = true)]
    username: Option<String>,

    /// Password for --username
    #[arg(long, global = true, requires = "username")]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List one directory, directories first
    Ls {
        path: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Walk a tree and print comic folders as they are found
    Scan {
        root: String,
        /// Deepest level to descend to; the root is level 0
        #[arg(long)]
        max_depth: Option<usize>,
        /// One JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Print one page of the comic folders under a path
    Page {
        path: String,
        /// 0-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,
        /// Entries per page; defaults to scan.page_size
        #[arg(long)]
        page_size: Option<usize>,
        /// Resolve cover images for the page
        #[arg(long, default_value_t = false)]
        posters: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Search comic titles and record the query
    Search {
        query: String,
        /// Tree to search when the gateway has no search index
        #[arg(long, default_value = "")]
        root: String,
        /// 0-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 100)]
        page_size: usize,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Print search-ready titles for raw names
    Clean { names: Vec<String> },
    /// Resolve the cover image URL for a title
    Poster {
        title: String,
        /// Output JSON metadata
        #[arg(long)]
        json: bool,
    },
    /// Download an image through the blob cache
    Fetch {
        url: String,
        /// Destination file
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List top-level categories
    Categories {
        root: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Recent search queries
    Searches {
        #[command(subcommand)]
        command: SearchCommand,
    },
    /// Recently opened comics
    Recent {
        #[command(subcommand)]
        command: RecentCommand,
    },
}

#[derive(Subcommand)]
enum SearchCommand {
    List,
    Add { query: String },
    Clear,
}

#[derive(Subcommand)]
enum RecentCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    /// Record a folder as opened
    Add { path: String },
    Remove { path: String },
}

async fn open_library(
    cfg: AppConfig,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Library> {
    let library = Library::open(cfg).await?;
    if let Some(user) = username {
        if !library.set_credentials(user, password.unwrap_or_default()) {
            tracing::warn!("credentials ignored: gateway is not remote");
        }
    }
    Ok(library)
}

async fn run_ls(library: &Library, path: &str, json: bool) -> Result<()> {
    let entries = library.list(path).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!("{}", entry_line(entry));
        }
    }
    Ok(())
}

async fn run_scan(library: &Library, root: &str, max_depth: Option<usize>, json: bool) -> Result<()> {
    let mut scan = library.scan(root, max_depth)?;
    let mut found = 0usize;
    while let Some(entry) = scan.next().await {
        found += 1;
        if json {
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!("{}", entry_line(&entry));
        }
    }
    if !json {
        println!("{found} comic folders");
    }
    Ok(())
}

async fn run_page(
    library: &Library,
    path: &str,
    page: usize,
    page_size: Option<usize>,
    posters: bool,
    json: bool,
) -> Result<()> {
    let page_size = page_size.unwrap_or(library.config().scan.page_size).max(1);
    let mut result = library.page(path, page, page_size).await?;
    if posters {
        library.enrich(&mut result.items).await;
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", page_header(&result));
        for entry in &result.items {
            println!("{}", entry_line(entry));
        }
    }
    Ok(())
}

async fn run_search(
    library: &Library,
    root: &str,
    query: &str,
    page: usize,
    page_size: usize,
    json: bool,
) -> Result<()> {
    let result = library.search(root, query, page, page_size.max(1)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", page_header(&result));
        for entry in &result.items {
            println!("{}", entry_line(entry));
        }
    }
    Ok(())
}

async fn run_poster(library: &Library, title: &str, json: bool) -> Result<()> {
    if json {
        let entry = providers::Entry::directory(title, title);
        let meta = library.metadata(&entry).await;
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }
    match library.resolve_poster(title).await {
        Some(url) => println!("{url}"),
        None => println!("no cover found for \"{}\"", title::clean(title)),
    }
    Ok(())
}

async fn run_fetch(library: &Library, url: &str, out: &std::path::Path) -> Result<()> {
    let bytes = library
        .fetch_image(url)
        .await
        .with_context(|| format!("no image at {url}"))?;
    write_image(out, &bytes)?;
    println!("{} bytes -> {}", bytes.len(), out.display());
    Ok(())
}

async fn run_categories(library: &Library, root: &str, json: bool) -> Result<()> {
    let categories = library.categories(root).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else {
        for entry in &categories {
            println!("{}\t{}", entry.name, entry.path);
        }
    }
    Ok(())
}

async fn run_searches(library: &Library, command: SearchCommand) -> Result<()> {
    match command {
        SearchCommand::List => {
            for query in library.recent_searches().await? {
                println!("{query}");
            }
        }
        SearchCommand::Add { query } => library.add_recent_search(&query).await?,
        SearchCommand::Clear => library.clear_recent_searches().await?,
    }
    Ok(())
}

async fn run_recent(library: &Library, command: RecentCommand) -> Result<()> {
    match command {
        RecentCommand::List { json } => {
            let comics = library.recent_comics().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comics)?);
            } else {
                for entry in &comics {
                    println!("{}", entry_line(entry));
                }
            }
        }
        RecentCommand::Add { path } => {
            let name = providers::models::base_name(&path).to_string();
            let mut entry = providers::Entry::directory(name, path.clone());
            entry.metadata = Some(library.metadata(&entry).await);
            library.add_recent_comic(&entry).await?;
        }
        RecentCommand::Remove { path } => library.remove_recent_comic(&path).await?,
    }
    Ok(())
}
