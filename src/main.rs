use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use narrascope::NarraError;
use narrascope::cli::OutputFormat;
use narrascope::cli::commands::analyze::AnalyzeOptions;
use narrascope::config::PipelineShape;

#[derive(Parser)]
#[command(name = "narrascope")]
#[command(
    version,
    about = "Multi-agent narrative analysis of a CSV dataset with hosted LLMs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load configuration from this file instead of the global/project layers
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the dataset for a question
    Analyze {
        #[arg(help = "Free-text question about the dataset")]
        query: String,
        #[arg(long, conflicts_with = "guest", help = "Run as this user id")]
        user: Option<String>,
        #[arg(long, help = "Run as this guest id (default: local)")]
        guest: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: OutputFormat,
        #[arg(long, help = "Pipeline shape: two-phase, single-phase")]
        shape: Option<PipelineShape>,
        #[arg(long, help = "LLM provider (gemini, openai)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
    },

    /// Manage local accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// List a user's saved analyses
    History {
        user_id: String,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a free account
    Create {
        email: String,
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show account and usage
    Show {
        user_id: String,
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },
    /// Grant unlimited queries and email delivery
    Upgrade { user_id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Edit configuration file with $EDITOR
    Edit {
        #[arg(long, short, help = "Edit global config")]
        global: bool,
    },
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mnarrascope encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = match e.downcast_ref::<NarraError>() {
                Some(err) => err.user_message(),
                None => e.to_string(),
            };
            eprintln!("\x1b[31mError:\x1b[0m {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Analyze {
            query,
            user,
            guest,
            format,
            shape,
            provider,
            model,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(narrascope::cli::commands::analyze::run(AnalyzeOptions {
                query,
                user,
                guest,
                format,
                shape,
                provider,
                model,
                config_path: cli.config.clone(),
            }))?;
        }
        Commands::User { action } => match action {
            UserAction::Create { email, format } => {
                narrascope::cli::commands::user::create(config_path, &email, format)?;
            }
            UserAction::Show { user_id, format } => {
                narrascope::cli::commands::user::show(config_path, &user_id, format)?;
            }
            UserAction::Upgrade { user_id } => {
                narrascope::cli::commands::user::upgrade(config_path, &user_id)?;
            }
        },
        Commands::History { user_id, format } => {
            narrascope::cli::commands::history::run(config_path, &user_id, format)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                narrascope::cli::commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                narrascope::cli::commands::config::path()?;
            }
            ConfigAction::Edit { global } => {
                narrascope::cli::commands::config::edit(global)?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    narrascope::cli::commands::config::init_global(force)?;
                } else {
                    narrascope::cli::commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
