//! clawbridge CLI entry point

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use clawbridge::tools::{SessionMode, ToolRunner, ERROR_PREFIX};
use clawbridge::ui;

#[derive(Parser)]
#[command(name = "clawbridge")]
#[command(about = "🦀 clawbridge - external-action tools for agents")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.clawbridge/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the workspace
    Init,

    /// Print the tool catalog as JSON
    Tools,

    /// Call one tool and print its result
    Call {
        /// Tool name
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Show configuration and tool availability
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let path = cli.config.unwrap_or_else(clawbridge::config::config_path);
            let config = clawbridge::config::init_at(&path)?;
            ui::print_success(&format!("Config at {}", path.display()));
            ui::print_step(&format!("Workspace: {}", config.workspace.display()));
            ui::print_step(&format!(
                "n8n credentials go in {}",
                config.n8n.config_path.display()
            ));
        }

        Commands::Tools => {
            let runner = build_runner(cli.config.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&runner.definitions())?);
        }

        Commands::Call { name, args } => {
            let runner = build_runner(cli.config.as_ref())?;
            let params: serde_json::Value = serde_json::from_str(&args)
                .context("--args must be a JSON object")?;

            // Ctrl+C aborts the running action instead of the process.
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    trigger.cancel();
                }
            });

            let output = runner.execute_with_cancel(&name, params, &cancel).await?;
            println!("{}", output);
            if output.starts_with(ERROR_PREFIX) {
                std::process::exit(1);
            }
        }

        Commands::Status => {
            let config = load_config(cli.config.as_ref())?;
            let runner = ToolRunner::from_config(&config, SessionMode::default());

            ui::print_header("Status");
            ui::print_step(&format!("Workspace: {}", config.workspace.display()));
            ui::print_step(&format!(
                "Kill grace: {:?}",
                Duration::from_millis(config.kill_grace_ms)
            ));
            for name in runner.tool_names() {
                ui::print_success(name);
            }
            for (name, reason) in runner.unavailable() {
                ui::print_error(&format!("{}: {}", name, reason));
            }
            if runner.unavailable().is_empty() {
                ui::print_success("All tools available");
            } else {
                ui::print_warning("Some tools are unavailable");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<clawbridge::config::Config> {
    let config = match path {
        Some(path) => clawbridge::config::load_from(path)?,
        None => clawbridge::config::load()?,
    };
    Ok(config)
}

fn build_runner(path: Option<&PathBuf>) -> Result<ToolRunner> {
    let config = load_config(path)?;
    Ok(ToolRunner::from_config(&config, SessionMode::default()))
}
