use anyhow::Result;
use clap::{Parser, Subcommand};
use hulud_scan::{
    cache::IocCache,
    config::Config,
    engine::{discover_projects, Engine, ScanOptions},
    ioc::{remote, IocDatabase},
    model::ScanResult,
    output::{format_result_to_string, print_result, OutputFormat},
    signatures::Signatures,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const CRITICAL_FINDINGS: u8 = 1;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "hulud-scan")]
#[command(
    author,
    version,
    about = "Scan JavaScript projects for Shai-Hulud 2.0 indicators of compromise"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a project directory (or a file inside it)
    Scan {
        /// Project directory or file to scan
        path: PathBuf,

        /// Scan every project with a package.json under PATH
        #[arg(short, long)]
        recursive: bool,

        /// Only check dependencies, skip source and workflow scanning
        #[arg(short, long)]
        quick: bool,

        /// Download the latest IOC list before scanning
        #[arg(long)]
        update_iocs: bool,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Also write a JSON report to this file
        #[arg(long, value_name = "FILE")]
        json_report: Option<PathBuf>,
    },

    /// Download the latest IOC list into the cache
    UpdateIocs,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Remove the cached IOC list
    ClearCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });

    match cli.command {
        Commands::Scan {
            path,
            recursive,
            quick,
            update_iocs,
            format,
            json_report,
        } => {
            let format_str = format.unwrap_or(config.default_format.clone());
            let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;

            let db = load_iocs(&config, update_iocs, format == OutputFormat::Table).await;
            let options = ScanOptions {
                deep_scan: config.deep_scan && !quick,
                ignore: config.ignore.clone(),
            };
            let engine = Engine::new(db, Signatures::default(), options)?;

            run_scan(&engine, &path, recursive, format, json_report)
        }
        Commands::UpdateIocs => {
            let cache = IocCache::with_ttl_hours(config.cache_ttl_hours);
            let path = download_with_spinner(&config.ioc_url, &cache, true).await?;
            println!("IOC list saved to: {}", path.display());
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            let cache = IocCache::new();
            cache.clear()?;
            println!("Cache cleared.");
            Ok(exit_codes::SUCCESS)
        }
    }
}

/// Resolves the IOC database, refreshing the cache first when asked to.
///
/// A failed download only warns; the previous cache or the built-in list is
/// used instead.
async fn load_iocs(config: &Config, update: bool, interactive: bool) -> IocDatabase {
    if let Some(path) = &config.ioc_file {
        return IocDatabase::load_or_fallback(Some(path.as_path()));
    }

    let cache = IocCache::with_ttl_hours(config.cache_ttl_hours);
    if update || (config.auto_update && cache.is_stale()) {
        if let Err(e) = download_with_spinner(&config.ioc_url, &cache, interactive).await {
            warn!("IOC update failed: {:#}", e);
            eprintln!("Warning: IOC update failed, using cached or built-in list");
        }
    }

    let cache_path = cache.path();
    IocDatabase::load_or_fallback(Some(cache_path.as_path()))
}

async fn download_with_spinner(url: &str, cache: &IocCache, interactive: bool) -> Result<PathBuf> {
    let progress = if interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Downloading IOC list...");
        Some(pb)
    } else {
        None
    };

    let result = remote::refresh(url, cache).await;

    if let Some(pb) = progress {
        match &result {
            Ok(_) => pb.finish_with_message("IOC list updated"),
            Err(_) => pb.finish_and_clear(),
        }
    }
    result
}

fn run_scan(
    engine: &Engine,
    path: &Path,
    recursive: bool,
    format: OutputFormat,
    json_report: Option<PathBuf>,
) -> Result<u8> {
    let is_interactive = format == OutputFormat::Table;

    let results = if recursive {
        let projects = discover_projects(path)?;
        if projects.is_empty() {
            eprintln!("No projects with package.json found in {}", path.display());
            return Ok(exit_codes::SUCCESS);
        }
        scan_projects(engine, &projects, is_interactive)?
    } else {
        vec![engine.scan_project(path)?]
    };

    print_result(&results, format)?;

    if let Some(report_path) = json_report {
        let json = format_result_to_string(&results, OutputFormat::Json)?;
        std::fs::write(&report_path, json)?;
        if is_interactive {
            println!();
            println!("JSON report written to: {}", report_path.display());
        }
    }

    Ok(determine_exit_code(&results))
}

fn scan_projects(engine: &Engine, projects: &[PathBuf], is_interactive: bool) -> Result<Vec<ScanResult>> {
    let progress = if is_interactive {
        let pb = ProgressBar::new(projects.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let mut results = Vec::with_capacity(projects.len());
    for project in projects {
        if let Some(ref pb) = progress {
            pb.set_message(format!("Scanning {}...", project.display()));
        }

        results.push(engine.scan_project(project)?);

        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Scanned {} projects", results.len()));
    }

    Ok(results)
}

/// Non-zero if any project has a CRITICAL finding.
fn determine_exit_code(results: &[ScanResult]) -> u8 {
    if results.iter().all(ScanResult::verdict) {
        exit_codes::SUCCESS
    } else {
        exit_codes::CRITICAL_FINDINGS
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'hulud-scan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
