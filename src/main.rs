//! serp-harvest CLI - localized result harvesting and archive lookups.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use serp_harvest::{
    proxy::ProxyConfig, ArchiveConfig, ArchiveOrg, Coordinate, GoogleSearch, Location,
    SearchConfig, SearchOutcome, SearchRequest, StaticGeoDataset,
};

/// serp-harvest - localized search result harvester
#[derive(Parser)]
#[command(name = "serp-harvest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest results for a keyword
    Search(SearchArgs),

    /// Query the web archive
    #[command(subcommand)]
    Archive(ArchiveCommand),
}

#[derive(Args)]
struct SearchArgs {
    /// Search keyword
    keyword: String,

    /// Stop at the first result matching this pattern (e.g. "*.example.com")
    #[arg(short, long)]
    target: Option<String>,

    /// Maximum number of results to collect
    #[arg(short = 'n', long, default_value = "100")]
    max_results: usize,

    /// Named location, resolved through --geotargets
    #[arg(short, long, conflicts_with_all = ["lat", "lng"])]
    location: Option<String>,

    /// JSON geotarget table used to resolve --location
    #[arg(long, requires = "location")]
    geotargets: Option<std::path::PathBuf>,

    /// Latitude of the search origin
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude of the search origin
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,

    /// Inner radius of the sampling ring in meters
    #[arg(long, conflicts_with = "location")]
    min_distance: Option<f64>,

    /// Outer radius of the sampling ring in meters
    #[arg(long, conflicts_with = "location")]
    max_distance: Option<f64>,

    /// Interface language (e.g. "en")
    #[arg(long)]
    language: Option<String>,

    /// Proxy URL (e.g., http://127.0.0.1:8080 or socks5://127.0.0.1:1080)
    #[arg(short, long)]
    proxy: Option<String>,

    /// Attempts per page
    #[arg(short, long, default_value = "10")]
    retries: u32,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum ArchiveCommand {
    /// List monthly captures of a domain
    Index {
        domain: String,
        /// Proxy URL
        #[arg(short, long)]
        proxy: Option<String>,
    },
    /// Print the HTML of one capture
    Snapshot {
        domain: String,
        timestamp: String,
        /// Proxy URL
        #[arg(short, long)]
        proxy: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Search(args) => run_search(args).await,
        Commands::Archive(command) => run_archive(command).await,
    }
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let location = match (&args.location, args.lat, args.lng) {
        (Some(name), _, _) => Location::Named(name.clone()),
        (None, Some(lat), Some(lng)) => Location::Coordinate(Coordinate::new(lat, lng)),
        _ => anyhow::bail!("Either --location or --lat/--lng is required"),
    };

    let config = SearchConfig::default().with_max_retries(args.retries);
    let mut search = GoogleSearch::new(config)?;

    if let Some(path) = &args.geotargets {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading geotargets from {}", path.display()))?;
        search = search.with_datasets(Arc::new(StaticGeoDataset::from_json(&json)?));
    }

    let mut request =
        SearchRequest::new(&args.keyword, location).with_max_results(args.max_results);
    request.min_distance = args.min_distance;
    request.max_distance = args.max_distance;
    if let Some(target) = &args.target {
        request = request.with_target(target);
    }
    if let Some(language) = &args.language {
        request = request.with_language(language);
    }
    if let Some(proxy_url) = &args.proxy {
        let proxy: ProxyConfig = proxy_url.parse()?;
        if matches!(args.format, OutputFormat::Text) {
            eprintln!("Using proxy: {}", proxy);
        }
        request = request.with_proxy(proxy);
    }

    let outcome = search.search(&request).await?;

    let target = request.target.as_deref().unwrap_or_default();
    match args.format {
        OutputFormat::Text => match &outcome {
            SearchOutcome::Found(item) => {
                println!("\nTarget \"{}\" found at position {}:\n", target, item.position);
                print_item(item);
            }
            SearchOutcome::NotFound => {
                println!("\nTarget \"{}\" not found", target);
            }
            SearchOutcome::Collected(items) => {
                println!("\nResults for \"{}\" ({} results):\n", args.keyword, items.len());
                for item in items {
                    print_item(item);
                }
            }
        },
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Compact => {
            for item in outcome.items() {
                println!(
                    "{}\t{}\t{}",
                    item.position,
                    item.title.as_deref().unwrap_or_default(),
                    item.url.as_deref().unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

fn print_item(item: &serp_harvest::ResultItem) {
    println!("{}. {}", item.position, item.title.as_deref().unwrap_or("(no title)"));
    if let Some(url) = &item.url {
        println!("   URL: {}", url);
    }
    if let Some(description) = &item.description {
        let description = if description.chars().count() > 150 {
            format!("{}...", description.chars().take(150).collect::<String>())
        } else {
            description.clone()
        };
        println!("   {}", description);
    }
    println!();
}

async fn run_archive(command: ArchiveCommand) -> Result<()> {
    match command {
        ArchiveCommand::Index { domain, proxy } => {
            let archive = ArchiveOrg::new(archive_config(proxy.as_deref())?)?;
            let records = archive.get_index(&domain).await?;
            for record in &records {
                if let Some(timestamp) = record.timestamp() {
                    println!("{}", timestamp);
                }
            }
        }
        ArchiveCommand::Snapshot {
            domain,
            timestamp,
            proxy,
        } => {
            let archive = ArchiveOrg::new(archive_config(proxy.as_deref())?)?;
            let html = archive.get_snapshot(&domain, &timestamp).await?;
            println!("{}", html);
        }
    }
    Ok(())
}

fn archive_config(proxy: Option<&str>) -> Result<ArchiveConfig> {
    let mut config = ArchiveConfig::default();
    if let Some(proxy) = proxy {
        config = config.with_proxy(proxy.parse()?);
    }
    Ok(config)
}
