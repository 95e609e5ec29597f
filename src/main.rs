use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use rad_scraper::import::{self, ImportOptions};
use rad_scraper::settings::Settings;
use rad_scraper::sources::fetch::HttpFetcher;
use rad_scraper::upsert::UpdatePolicy;
use rad_scraper::{db, pipeline, sources};

#[derive(Parser)]
#[command(name = "rad_scraper", about = "Scrape and import provider listings into the RAD Remedy store")]
struct Cli {
    /// Settings file (default: ./radremedy.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Run the configured scrapers and upsert what they find
    Scrape {
        /// Only run sources with this name (repeatable)
        #[arg(short, long)]
        source: Vec<String>,
        /// Override the source's default targets (requires a single source)
        #[arg(short, long)]
        target: Vec<String>,
        /// Overwrite resources that already exist
        #[arg(long)]
        eager: bool,
    },
    /// Import records from a CSV (or .json) file
    Import {
        file: PathBuf,
        /// Create categories that do not exist yet
        #[arg(long)]
        create_categories: bool,
        /// Overwrite resources that already exist
        #[arg(long)]
        eager: bool,
        /// Report invalid rows and duplicates without writing
        #[arg(long)]
        dry_run: bool,
        /// Source for rows that have none (default: the file name)
        #[arg(long)]
        source: Option<String>,
    },
    /// Show store statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    let conn = db::connect(&settings.database_path)
        .with_context(|| format!("opening {}", settings.database_path.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Schema ready at {}", settings.database_path.display());
        }
        Commands::Scrape {
            source,
            target,
            eager,
        } => {
            let mut scrapers = sources::configured(&settings)?;
            if !source.is_empty() {
                scrapers.retain(|s| source.iter().any(|n| n.eq_ignore_ascii_case(s.source())));
            }
            if scrapers.is_empty() {
                bail!("no enabled source matches {:?}", source);
            }
            if !target.is_empty() && scrapers.len() > 1 {
                bail!("--target needs exactly one --source");
            }

            let fetcher = HttpFetcher::new(&settings.http.user_agent, settings.http.timeout())?;
            let targets = (!target.is_empty()).then_some(target.as_slice());
            let report = pipeline::run_scrapers(&conn, &scrapers, &fetcher, targets, policy(&settings, eager))?;
            report.print();
        }
        Commands::Import {
            file,
            create_categories,
            eager,
            dry_run,
            source,
        } => {
            let rows = import::load_records(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let source = source.unwrap_or_else(|| {
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "import".to_string())
            });
            let options = ImportOptions {
                create_categories,
                policy: policy(&settings, eager),
                dry_run,
                source,
            };
            let report = import::run_import(&conn, rows, &options)?;
            report.print();
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Resources:  {}", s.resources);
            println!("Categories: {}", s.categories);
            println!("Links:      {}", s.links);
            for (source, n) in &s.by_source {
                println!("  {:<40} {:>6}", source, n);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn policy(settings: &Settings, eager: bool) -> UpdatePolicy {
    if eager {
        UpdatePolicy::Eager
    } else {
        UpdatePolicy::from_lazy(settings.lazy)
    }
}
