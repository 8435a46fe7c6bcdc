use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use invscan::{
    config::Config,
    error::ScanError,
    extractor::{ExtractorConfig, ExtractorRegistry},
    model::ScanResult,
    output::{format_result_to_string, print_result, OutputFormat},
    scanner::Scanner,
    stats::{LoggingCollector, NoopCollector, StatsCollector},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    /// 128 + SIGINT
    pub const INTERRUPTED: u8 = 130;
}

#[derive(Parser)]
#[command(name = "invscan")]
#[command(
    author,
    version,
    about = "Extract software inventory from directory trees and live OS state"
)]
struct Cli {
    /// Log debug output and per-file extraction events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory tree for package manifests
    Scan {
        /// Root directory to scan
        root: PathBuf,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Only run this extractor (repeatable)
        #[arg(short = 'e', long = "extractor")]
        extractors: Vec<String>,

        /// Skip files larger than this many bytes (0 = unlimited)
        #[arg(long)]
        max_file_size: Option<u64>,
    },

    /// List available extractors
    ListExtractors,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "invscan=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    match cli.command {
        Commands::Scan {
            root,
            format,
            output,
            extractors,
            max_file_size,
        } => {
            let mut config = Config::load_from(&config_path)
                .with_context(|| format!("loading {}", config_path.display()))?;
            if !extractors.is_empty() {
                config.extractors = extractors;
            }
            if let Some(max) = max_file_size {
                config.max_file_size_bytes = max;
            }
            let format = format.unwrap_or_else(|| config.default_format.clone());

            run_scan(&root, &config, &format, output, cli.verbose).await
        }
        Commands::ListExtractors => {
            list_extractors();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(&config_path, init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(
    root: &Path,
    config: &Config,
    format: &str,
    output_file: Option<String>,
    verbose: bool,
) -> Result<u8> {
    let format = OutputFormat::from_str(format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table;

    let stats: Arc<dyn StatsCollector> = if verbose {
        Arc::new(LoggingCollector)
    } else {
        Arc::new(NoopCollector)
    };
    let registry = ExtractorRegistry::builtin(&config.extractor_config(Arc::clone(&stats)))
        .filtered(&config.extractors)?;
    let registry = Arc::new(registry);
    let scanner = Scanner::new(Arc::clone(&registry), config.scan_config(stats));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, cancelling scan");
                cancel.cancel();
            }
        });
    }

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Scanning {}...", root.display()));
        Some(pb)
    } else {
        None
    };

    let outcome = scanner.scan(root, &cancel).await;

    let (result, code) = match outcome {
        Ok(result) => (result, exit_codes::SUCCESS),
        Err(ScanError::Cancelled { partial }) => {
            warn!("scan interrupted, reporting partial results");
            (*partial, exit_codes::INTERRUPTED)
        }
        Err(e) => {
            if let Some(pb) = progress {
                pb.finish_and_clear();
            }
            return Err(e.into());
        }
    };

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Found {} packages", result.inventories.len()));
    }

    write_output(&result, &registry, format, output_file, is_interactive)?;
    Ok(code)
}

fn write_output(
    result: &ScanResult,
    registry: &ExtractorRegistry,
    format: OutputFormat,
    output_file: Option<String>,
    is_interactive: bool,
) -> Result<()> {
    match output_file {
        Some(path) => {
            let content = format_result_to_string(result, registry, format)?;
            std::fs::write(&path, content).with_context(|| format!("writing {}", path))?;
            if is_interactive {
                println!("Results written to: {}", path);
            }
            Ok(())
        }
        None => print_result(result, registry, format),
    }
}

fn list_extractors() {
    let registry = ExtractorRegistry::builtin(&ExtractorConfig::default());

    println!("Available extractors:");
    println!();

    for extractor in registry.file_extractors() {
        println!(
            "  {:<28} v{:<3} {:<11} [supported: yes]",
            extractor.name(),
            extractor.version(),
            "file"
        );
    }

    for extractor in registry.standalone_extractors() {
        let supported = if extractor.is_supported() { "yes" } else { "no" };
        let platforms: Vec<&str> = extractor
            .supported_platforms()
            .iter()
            .map(|p| p.as_str())
            .collect();
        println!(
            "  {:<28} v{:<3} {:<11} [supported: {}]",
            extractor.name(),
            extractor.version(),
            "standalone",
            supported
        );
        println!("  {:<28} Platforms: {}", "", platforms.join(", "));
    }
}

fn handle_config(config_path: &Path, init: bool, show_path: bool) -> Result<()> {
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        Config::default().save_to(config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'invscan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
