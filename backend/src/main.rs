//! Assettag CLI - Browse a commissary asset sheet
//!
//! # Main Commands
//!
//! ```bash
//! assettag serve --url <sheet>          # Start HTTP server (port 3000)
//! assettag stations                     # Station tabs with counts
//! assettag groups -s "Hot Station" -t Tools
//! assettag details -s "Hot Station" -a Oven
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! assettag normalize assets.csv         # Two header rows → table JSON
//! assettag fetch --url <sheet>          # Raw worksheet rows
//! assettag cache list                   # Cached worksheets
//! ```
//!
//! The sheet comes from `--input` (CSV file), `--url`, or
//! `ASSETTAG_SHEET_URL`.

use assettag::{
    config::{DEFAULT_PORT, ENV_SHEET_URL},
    load_catalog, normalize, parse_csv_file_auto,
    cache::SheetCache,
    sheets::format_delimiter,
    transform::NO_DATA,
    AppConfig, CacheMode, Catalog, CatalogLayout, ConfigError, LoadOptions, SheetClient,
    SheetLocator, SheetSource, ALL,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "assettag")]
#[command(about = "Browse a commissary asset sheet by station, type and asset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the sheet comes from
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// CSV export of the sheet (instead of fetching it)
    #[arg(short, long, conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Spreadsheet URL or id (default: $ASSETTAG_SHEET_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Zero-based worksheet index (default: $ASSETTAG_SHEET_INDEX or 0)
    #[arg(long)]
    sheet_index: Option<usize>,

    /// Cache behaviour for remote sheets
    #[arg(long, value_enum, default_value = "use")]
    cache: CacheMode,

    /// Layout JSON file (overrides $ASSETTAG_CONFIG)
    #[arg(long)]
    layout: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a CSV export (two header rows) and output the table as JSON
    Normalize {
        /// Input CSV file
        input: PathBuf,

        /// Leading columns to drop after normalization
        #[arg(long, default_value = "0")]
        drop_columns: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Station tabs with asset counts
    Stations {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Selector options and asset cards of one station / type tab
    Groups {
        /// Station tab
        #[arg(short, long)]
        station: String,

        /// Type tab (matched case-insensitively as a substring)
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Asset name filter (default: All)
        #[arg(short, long)]
        asset: Option<String>,

        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Every item behind one asset card
    Details {
        /// Station tab
        #[arg(short, long)]
        station: String,

        /// Asset name
        #[arg(short, long)]
        asset: String,

        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch the raw worksheet rows
    Fetch {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Manage the fetch cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached worksheets
    List,

    /// Delete every cached worksheet
    Clear,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize {
            input,
            drop_columns,
            output,
        } => cmd_normalize(&input, drop_columns, output.as_deref()),

        Commands::Stations { source, output } => cmd_stations(&source, output.as_deref()).await,

        Commands::Groups {
            station,
            kind,
            asset,
            source,
            output,
        } => cmd_groups(&station, &kind, asset.as_deref(), &source, output.as_deref()).await,

        Commands::Details {
            station,
            asset,
            source,
            output,
        } => cmd_details(&station, &asset, &source, output.as_deref()).await,

        Commands::Fetch { source, output } => cmd_fetch(&source, output.as_deref()).await,

        Commands::Serve { port, source } => cmd_serve(port, &source).await,

        Commands::Cache { action } => cmd_cache(action),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Configuration with CLI overrides applied, plus the sheet source
fn resolve(args: &SourceArgs) -> Result<(AppConfig, SheetSource), Box<dyn std::error::Error>> {
    let mut config = AppConfig::from_env()?;

    if let Some(ref path) = args.layout {
        config.layout = CatalogLayout::from_file(path)?;
    }
    if let Some(index) = args.sheet_index {
        config.sheet_index = index;
    }

    let source = match (&args.input, args.url.as_ref().or(config.sheet_url.as_ref())) {
        (Some(path), _) => SheetSource::File(path.clone()),
        (None, Some(url)) => SheetSource::Remote(SheetLocator::parse(url, config.sheet_index)?),
        (None, None) => return Err(ConfigError::MissingSource.into()),
    };

    Ok((config, source))
}

async fn load(args: &SourceArgs) -> Result<Catalog, Box<dyn std::error::Error>> {
    let (config, source) = resolve(args)?;
    let options = LoadOptions {
        cache_mode: args.cache,
        ..LoadOptions::from(&config)
    };
    Ok(load_catalog(&source, &options).await?)
}

fn cmd_normalize(
    input: &Path,
    drop_columns: usize,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Normalizing: {}", input.display());

    let parsed = parse_csv_file_auto(input)?;
    eprintln!("   Encoding: {}", parsed.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(parsed.delimiter));

    let table = normalize(&parsed.rows).drop_leading_columns(drop_columns);
    if table.columns().is_empty() {
        eprintln!("⚠️  {} ({} rows, need at least 4)", NO_DATA, parsed.rows.len());
    } else {
        eprintln!("   Columns: {}", table.columns().join(", "));
        eprintln!("✅ {} rows", table.len());
    }

    write_json(&table, output)
}

async fn cmd_stations(
    source: &SourceArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load(source).await?;

    let Some(view) = catalog.view() else {
        eprintln!("⚠️  {}", NO_DATA);
        return write_json(&Vec::<()>::new(), output);
    };

    let stations = view.stations()?;
    for tab in &stations {
        eprintln!("   {:<24} {}", tab.name, tab.count);
    }
    write_json(&stations, output)
}

async fn cmd_groups(
    station: &str,
    kind: &str,
    asset: Option<&str>,
    source: &SourceArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load(source).await?;

    let Some(view) = catalog.view() else {
        eprintln!("⚠️  {}", NO_DATA);
        return write_json(&Vec::<()>::new(), output);
    };

    let tab = view.type_tab(station, kind, asset.unwrap_or(ALL))?;
    if tab.is_empty() {
        eprintln!("   No {} at {}", kind, station);
    } else {
        eprintln!("📦 {} cards ({} options)", tab.cards.len(), tab.options.len() - 1);
    }
    write_json(&tab, output)
}

async fn cmd_details(
    station: &str,
    asset: &str,
    source: &SourceArgs,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load(source).await?;

    let detail = match catalog.view() {
        Some(view) => view.details(station, asset)?,
        None => None,
    };

    match detail {
        Some(ref d) => eprintln!("📋 {} × {} at {}", d.count, d.asset, d.station),
        None => eprintln!("   No '{}' at {}", asset, station),
    }
    write_json(&detail, output)
}

async fn cmd_fetch(source: &SourceArgs, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, source) = resolve(source)?;
    let client = SheetClient::new(config.credentials.clone());

    let rows = client.load(&source).await?;
    eprintln!("✅ {} rows", rows.len());

    if let Some(key) = source.cache_key() {
        SheetCache::with_dir(&config.cache_dir).put(&key, source.to_string(), rows.clone())?;
        eprintln!("💾 Cached as {}", key);
    }

    write_json(&rows, output)
}

async fn cmd_serve(port: u16, source: &SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, sheet) = resolve(source).map_err(|e| {
        format!("{} (set {} or pass --url / --input)", e, ENV_SHEET_URL)
    })?;
    assettag::server::start_server(port, sheet, config).await
}

fn cmd_cache(action: CacheAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let mut cache = SheetCache::with_dir(&config.cache_dir);

    match action {
        CacheAction::List => {
            let sheets = cache.list();
            if sheets.is_empty() {
                eprintln!("📋 Nothing cached in {}", cache.dir().display());
                return Ok(());
            }

            eprintln!("📋 Cached worksheets ({}):\n", sheets.len());
            for s in sheets {
                let state = if s.is_fresh(config.cache_ttl) { "fresh" } else { "expired" };
                println!("  📄 {} ({})", s.key, s.source);
                println!("     Rows: {}", s.rows.len());
                println!("     Fetched: {} ({})", s.fetched_at.to_rfc3339(), state);
                println!();
            }
        }

        CacheAction::Clear => {
            let removed = cache.clear()?;
            eprintln!("🗑️  Removed {} cached worksheet(s)", removed);
        }
    }

    Ok(())
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
