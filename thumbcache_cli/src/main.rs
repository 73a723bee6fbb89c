use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thumbcache_cli::config::{AppConfig, ConfigManager};
use thumbcache_cli::file_discovery::FileDiscoveryOptions;
use thumbcache_cli::orchestrators::cache_orchestrator::CacheOrchestrator;
use thumbcache_cli::orchestrators::generate_orchestrator::{GenerateOptions, GenerateOrchestrator};
use thumbcache_cli::orchestrators::{OutputFormat, build_service};
use thumbcache_cli::terminal;

#[derive(Parser)]
#[command(name = "thumbcache")]
#[command(author, version, about = "Thumbnail cache - bounded thumbnail generation and disk cache eviction", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate thumbnails for files and directories
    Generate {
        /// Files or directories to generate thumbnails for
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Include patterns (glob patterns, can be specified multiple times)
        #[arg(short = 'i', long = "include", value_name = "PATTERN")]
        include_patterns: Vec<String>,

        /// Exclude patterns (glob patterns, can be specified multiple times, overrides includes)
        #[arg(short = 'e', long = "exclude", value_name = "PATTERN")]
        exclude_patterns: Vec<String>,

        /// Don't use default media extensions when no include patterns are specified
        #[arg(long)]
        no_defaults: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Disable progress bar display
        #[arg(long)]
        no_progress: bool,

        /// Print the final run counters as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enforce the cache policy now
    Prune {
        /// Run even if the cache was pruned recently
        #[arg(short, long)]
        force: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show cache usage and policy
    Info {
        /// Print the full file listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every cached thumbnail
    Clear,

    /// Show or change the eviction policy
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Show or change generation concurrency
    Concurrency {
        #[command(subcommand)]
        command: ConcurrencyCommand,
    },

    /// Prune periodically until interrupted
    Watch {
        /// Seconds between prunes (defaults to prune.interval_seconds)
        #[arg(long, value_name = "SECONDS")]
        interval: Option<u64>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum PolicyCommand {
    /// Print the current policy
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Change the policy; 0 disables a limit
    Set {
        /// Maximum cache size in megabytes
        #[arg(long, value_name = "MB")]
        max_size_mb: Option<u64>,

        /// Maximum thumbnail age in days
        #[arg(long, value_name = "DAYS")]
        ttl_days: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConcurrencyCommand {
    /// Print the configured concurrency
    Show {
        #[arg(long)]
        json: bool,
    },

    /// Set how many thumbnails are generated at once
    Set {
        /// Number of parallel generations (at least 1)
        value: usize,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., prune.interval_seconds)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., prune.interval_seconds)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

fn output_format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("thumbcache_core", log::LevelFilter::Debug)
            .filter_module("thumbcache_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        command => {
            let config = ConfigManager::new()
                .load()
                .context("Failed to load configuration")?;
            terminal::apply_color_preference(config.output.color_enabled);
            run_command(command, config).await
        }
    }
}

async fn run_command(command: Commands, config: AppConfig) -> Result<()> {
    let service = build_service(&config)?;
    let show_progress = |no_progress: bool| {
        !no_progress && config.output.progress_enabled && terminal::should_show_progress_by_default()
    };

    match command {
        Commands::Generate {
            paths,
            include_patterns,
            exclude_patterns,
            no_defaults,
            recursive,
            no_progress,
            json,
        } => {
            log::debug!("Include patterns: {include_patterns:?}");
            log::debug!("Exclude patterns: {exclude_patterns:?}");

            let options = GenerateOptions {
                inputs: paths,
                discovery: FileDiscoveryOptions::new()
                    .with_include_patterns(include_patterns)
                    .with_exclude_patterns(exclude_patterns)
                    .with_use_defaults(!no_defaults)
                    .with_recursive(recursive),
                show_progress: show_progress(no_progress),
                format: output_format(json),
            };
            GenerateOrchestrator::new(service).run(options).await?;
        }
        Commands::Prune { force, json } => {
            // JSON output stays clean of progress lines
            let no_progress = json;
            CacheOrchestrator::new(service, output_format(json), show_progress(no_progress))
                .prune(force)
                .await?;
        }
        Commands::Info { json } => {
            CacheOrchestrator::new(service, output_format(json), false)
                .info()
                .await?;
        }
        Commands::Clear => {
            CacheOrchestrator::new(service, OutputFormat::Human, false)
                .clear()
                .await?;
        }
        Commands::Policy { command } => match command {
            PolicyCommand::Show { json } => {
                CacheOrchestrator::new(service, output_format(json), false).show_policy()?;
            }
            PolicyCommand::Set {
                max_size_mb,
                ttl_days,
            } => {
                CacheOrchestrator::new(service, OutputFormat::Human, false)
                    .set_policy(max_size_mb, ttl_days)?;
            }
        },
        Commands::Concurrency { command } => match command {
            ConcurrencyCommand::Show { json } => {
                CacheOrchestrator::new(service, output_format(json), false).show_concurrency()?;
            }
            ConcurrencyCommand::Set { value } => {
                CacheOrchestrator::new(service, OutputFormat::Human, false)
                    .set_concurrency(value)?;
            }
        },
        Commands::Watch { interval } => {
            let interval = interval
                .map(|secs| std::time::Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.prune_interval());
            CacheOrchestrator::new(service, OutputFormat::Human, show_progress(false))
                .watch(interval)
                .await?;
        }
        Commands::Config { command } => config_command(command)?,
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            println!("{}", manager.get(&key)?);
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("Config file: {}", manager.get_config_path().display());

            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let (section, name) = key.split_once('.').unwrap_or(("general", key.as_str()));
                sections
                    .entry(section.to_string())
                    .or_default()
                    .push((name.to_string(), value));
            }

            for (section, items) in sections {
                println!("[{}]", section.yellow());
                for (name, value) in items {
                    println!("  {} = {value}", name.cyan());
                }
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
