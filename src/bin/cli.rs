//! Listing scraper CLI
//!
//! Runs crawls directly, through the stdin setup dialogue, or as a
//! supervised child process, and manages the reports they produce.

use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use listing_scraper::{
    error::{AppError, Result},
    models::{Config, Portal},
    orchestrator::{Orchestrator, PlanOutcome, RunPlan, ScrapeMode, input_script, read_plan},
    pipeline,
    storage::{self, ReportFilter},
    utils::{http::HttpSource, log::RunLog},
};

/// Property listing scraper
#[derive(Parser, Debug)]
#[command(
    name = "listing-scraper",
    version,
    about = "Scrapes property portal listings into xlsx reports"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl result pages and write a report
    Crawl(CrawlArgs),

    /// Read run settings from stdin, then crawl
    Interactive {
        /// Report path (default: timestamped file in the output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a crawl as a child process and stream its output
    Dashboard(DashboardArgs),

    /// Browse and delete reports
    Files {
        #[command(subcommand)]
        action: FilesCommand,
    },

    /// Create or check the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Portal to scrape (propertyfinder, bayut)
    #[arg(long, value_parser = parse_portal)]
    portal: Option<Portal>,

    /// Search URL; `{page}` is replaced with the page number
    #[arg(long)]
    base_url: Option<String>,

    /// First page to fetch
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    start_page: Option<u32>,

    /// Number of pages to fetch (default: unlimited)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Fetch each listing's detail page
    #[arg(long)]
    details: bool,

    /// Keep going through empty pages
    #[arg(long)]
    no_auto_detect: bool,

    /// Report path (default: timestamped file in the output directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DashboardArgs {
    /// Preset 1-5 (3, 5, 10 pages, unlimited, unlimited with details)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5),
          conflicts_with_all = ["start_page", "max_pages", "details", "no_auto_detect"])]
    mode: Option<u8>,

    /// First page to fetch
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    start_page: u32,

    /// Number of pages to fetch (default: unlimited)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Fetch each listing's detail page
    #[arg(long)]
    details: bool,

    /// Keep going through empty pages
    #[arg(long)]
    no_auto_detect: bool,
}

impl DashboardArgs {
    fn plan(&self) -> RunPlan {
        let preset = self
            .mode
            .and_then(|m| ScrapeMode::from_choice(&m.to_string()))
            .and_then(ScrapeMode::plan);

        preset.unwrap_or(RunPlan {
            start_page: self.start_page,
            max_pages: self.max_pages,
            collect_details: self.details,
            auto_detect_end: !self.no_auto_detect,
        })
    }
}

#[derive(Subcommand, Debug)]
enum FilesCommand {
    /// List reports, newest first
    List,

    /// Summarize a report's contents
    Show {
        /// Report file name or path
        file: PathBuf,

        /// Only rows with this location (repeatable)
        #[arg(long = "location")]
        locations: Vec<String>,

        /// Only rows with this property type (repeatable)
        #[arg(long = "property-type")]
        property_types: Vec<String>,

        /// Number of rows to print
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },

    /// Delete reports
    Delete {
        /// Report file names or paths
        files: Vec<PathBuf>,

        /// Delete every report in the output directory
        #[arg(long, conflicts_with = "files")]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate the configuration file
    Validate,
}

fn parse_portal(s: &str) -> std::result::Result<Portal, String> {
    s.parse().map_err(|e: AppError| e.to_string())
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Crawl and write the report; an empty run is not an error.
async fn scrape(config: &Config, output: Option<&Path>) -> Result<()> {
    config.validate()?;
    let source = HttpSource::from_config(&config.http)?;
    let run_log = RunLog::stdout(&config.logging.level);

    let outcome = pipeline::run_scrape(config, &source, output, &run_log).await;
    run_log.finish();

    match outcome {
        Ok(_) => Ok(()),
        Err(AppError::NoData) => {
            log::warn!("No properties were scraped; no report written");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Resolve a bare report name against the output directory.
fn report_path(config: &Config, file: &Path) -> PathBuf {
    if file.exists() || file.components().count() > 1 {
        file.to_path_buf()
    } else {
        config.report.output_dir.join(file)
    }
}

async fn run_dashboard(cli: &Cli, config: &Config, args: &DashboardArgs) -> Result<()> {
    let plan = args.plan();
    log::info!(
        "Starting scraper: pages {} to {}, details {}, auto-detect {}",
        plan.start_page,
        plan.max_pages.map_or_else(
            || "UNLIMITED".to_string(),
            |n| plan.start_page.saturating_add(n).saturating_sub(1).to_string(),
        ),
        plan.collect_details,
        plan.auto_detect_end
    );

    let orchestrator = Orchestrator::current_exe(Some(cli.config.as_path()))?;
    let report = orchestrator
        .run(&input_script(&plan), |line| println!("{line}"))
        .await?;

    if report.interrupted {
        log::warn!("Scraping stopped");
        return Ok(());
    }
    if !report.success() {
        return Err(AppError::process(format!(
            "scraper exited with {}",
            report.status
        )));
    }

    log::info!("Scraping completed successfully!");
    let latest = storage::discover(&config.report.output_dir, &config.report.file_prefix)?;
    if let Some(file) = latest.first() {
        log::info!("Latest report: {}", file.path.display());
    }
    Ok(())
}

fn run_files(config: &Config, action: &FilesCommand) -> Result<()> {
    let dir = &config.report.output_dir;
    let prefix = &config.report.file_prefix;

    match action {
        FilesCommand::List => {
            let files = storage::discover(dir, prefix)?;
            if files.is_empty() {
                log::info!("No reports found in {}", dir.display());
                return Ok(());
            }
            for file in &files {
                println!(
                    "{}  {}  {:.1} KB",
                    file.modified.format("%Y-%m-%d %H:%M:%S"),
                    file.name(),
                    file.size_bytes as f64 / 1024.0
                );
            }
            log::info!("{} reports", files.len());
        }

        FilesCommand::Show {
            file,
            locations,
            property_types,
            rows,
        } => {
            let path = report_path(config, file);
            let filter = ReportFilter {
                locations: locations.clone(),
                property_types: property_types.clone(),
            };
            let overview = storage::inspect(&path, &filter)?;

            println!("Report: {}", path.display());
            println!("Total properties: {}", overview.row_count());
            if overview.row_count() != overview.total_rows {
                println!("  (filtered from {})", overview.total_rows);
            }
            println!("Pages scraped: {}", overview.pages);
            println!("With details: {}", overview.with_details);
            println!("Average per page: {:.1}", overview.average_per_page());

            println!("\nProperty types:");
            for (value, count) in overview.property_types.iter().take(10) {
                println!("  {count:>5}  {value}");
            }
            println!("\nTop locations:");
            for (value, count) in overview.locations.iter().take(10) {
                println!("  {count:>5}  {value}");
            }

            println!();
            for row in overview.rows.iter().take(*rows) {
                let cell = |name| overview.cell(row, name).unwrap_or("");
                println!(
                    "  #{} {} | {} | {} | {}",
                    cell("global_property_index"),
                    cell("title"),
                    cell("price"),
                    cell("location"),
                    cell("property_type")
                );
            }
        }

        FilesCommand::Delete { files, all } => {
            let paths: Vec<PathBuf> = if *all {
                storage::discover(dir, prefix)?
                    .into_iter()
                    .map(|f| f.path)
                    .collect()
            } else {
                files.iter().map(|f| report_path(config, f)).collect()
            };
            if paths.is_empty() {
                log::info!("Nothing to delete");
                return Ok(());
            }

            let result = storage::delete(&paths);
            for path in &result.deleted {
                log::info!("Deleted {}", path.display());
            }
            if !result.failed.is_empty() {
                return Err(AppError::process(format!(
                    "{} of {} files could not be deleted",
                    result.failed.len(),
                    paths.len()
                )));
            }
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, action: &ConfigCommand) -> Result<()> {
    match action {
        ConfigCommand::Init { force } => {
            if cli.config.exists() && !force {
                log::warn!(
                    "Config already exists at {}. Use --force to overwrite.",
                    cli.config.display()
                );
                return Ok(());
            }
            Config::default().save(&cli.config)?;
            log::info!("Default config written to {}", cli.config.display());
        }

        ConfigCommand::Validate => {
            log::info!("Validating configuration...");
            let config = Config::load(&cli.config)?;
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({})", cli.config.display());
        }
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = if cli.config.exists() {
        Config::load_or_default(&cli.config)
    } else {
        log::debug!("No config at {}, using defaults", cli.config.display());
        Config::default()
    };

    match &cli.command {
        Command::Crawl(args) => {
            let crawl = &mut config.crawl;
            if let Some(portal) = args.portal {
                crawl.portal = portal;
            }
            if let Some(url) = &args.base_url {
                crawl.base_url = Some(url.clone());
            }
            if let Some(start) = args.start_page {
                crawl.start_page = start;
            }
            if args.max_pages.is_some() {
                crawl.max_pages = args.max_pages;
            }
            crawl.collect_details |= args.details;
            if args.no_auto_detect {
                crawl.auto_detect_end = false;
            }
            scrape(&config, args.output.as_deref()).await?;
        }

        Command::Interactive { output } => {
            let outcome = read_plan(io::stdin().lock(), io::stdout())?;
            let PlanOutcome::Run(plan) = outcome else {
                return Ok(());
            };
            plan.apply(&mut config.crawl);
            scrape(&config, output.as_deref()).await?;
        }

        Command::Dashboard(args) => run_dashboard(&cli, &config, args).await?,

        Command::Files { action } => run_files(&config, action)?,

        Command::Config { action } => run_config(&cli, action)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("listing-scraper").chain(args.iter().copied()))
    }

    #[test]
    fn test_zero_pages_rejected() {
        let cases: [&[&str]; 4] = [
            &["dashboard", "--max-pages", "0"],
            &["dashboard", "--start-page", "0"],
            &["crawl", "--max-pages", "0"],
            &["crawl", "--start-page", "0"],
        ];
        for args in cases {
            assert!(parse(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn test_dashboard_custom_plan() {
        let cli = parse(&["dashboard", "--start-page", "4", "--max-pages", "1", "--details"]);
        let cli = cli.unwrap();
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        let plan = args.plan();
        assert_eq!(plan.start_page, 4);
        assert_eq!(plan.max_pages, Some(1));
        assert!(plan.collect_details);
        assert!(plan.auto_detect_end);
    }

    #[test]
    fn test_dashboard_preset() {
        let cli = parse(&["dashboard", "--mode", "2"]).unwrap();
        let Command::Dashboard(args) = cli.command else {
            panic!("expected dashboard");
        };
        assert_eq!(args.plan().max_pages, Some(5));
        assert!(parse(&["dashboard", "--mode", "6"]).is_err());
    }
}
