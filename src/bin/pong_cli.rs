// src/bin/pong_cli.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ping_pong::{
    config,
    controller::{default_server_binary, Controller, InstanceReply, ProcessLauncher},
    logging,
};
use std::path::PathBuf;

/// Pong game controller
#[derive(Parser, Debug)]
#[command(name = "pong-cli", version, about)]
struct Cli {
    /// YAML or JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the running session is remembered (overrides controller.state_file)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch the servers and start the exchange
    Start {
        /// Pong interval in milliseconds
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,

        /// Number of instances in the ring
        #[arg(long, value_parser = clap::value_parser!(u64).range(2..))]
        instances: Option<u64>,
    },
    /// Pause every instance
    Pause,
    /// Resume every instance
    Resume,
    /// Stop the game on every instance
    Stop {
        /// Also shut the server processes down
        #[arg(long)]
        terminate: bool,
    },
    /// Show the state of every instance
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = logging::init_tracing(&["ping_pong=info", "pong_cli=info"]) {
        eprintln!("{:#}", e);
    }

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = config::load_settings(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?
        .controller;
    if let Some(state_file) = cli.state_file {
        settings.state_file = state_file;
    }

    let binary = match settings.server_binary.clone() {
        Some(binary) => binary,
        None => default_server_binary().context("Failed to locate pong-server")?,
    };
    let launcher = ProcessLauncher::new(binary, settings.log_dir.clone());
    let default_interval = settings.interval_ms;
    let default_instances = settings.instances;
    let controller = Controller::new(settings, launcher)?;

    match cli.command {
        Command::Start {
            interval_ms,
            instances,
        } => {
            let interval_ms = interval_ms.unwrap_or(default_interval);
            let instances = instances.map_or(default_instances, |n| n as usize);
            println!("Initializing the Pong game...");

            let session = controller.start(interval_ms, instances).await?;
            for instance in &session.instances {
                match &instance.log_file {
                    Some(log) => println!("  {} (log: {})", instance.url, log.display()),
                    None => println!("  {}", instance.url),
                }
            }
            println!(
                "Game started! Pings will be exchanged every {} ms between {} instances.",
                interval_ms,
                session.instances.len()
            );
        }
        Command::Pause => {
            print_replies(&controller.pause().await?);
            println!("Game paused.");
        }
        Command::Resume => {
            print_replies(&controller.resume().await?);
            println!("Game resumed.");
        }
        Command::Stop { terminate } => {
            print_replies(&controller.stop(terminate).await?);
            if terminate {
                println!("Game stopped and servers shut down.");
            } else {
                println!("Game stopped.");
            }
        }
        Command::Status => {
            for InstanceReply { url, reply } in controller.status().await? {
                println!("{}", url);
                println!("{}", serde_json::to_string_pretty(&reply)?);
            }
        }
    }

    Ok(())
}

fn print_replies(replies: &[InstanceReply<String>]) {
    for InstanceReply { url, reply } in replies {
        println!("  {}: {}", url, reply);
    }
}
