//! Binary entrypoint for the Wireboard CLI.
//!
//! Commands:
//! - `start [--port <n>]` - run the whiteboard server
//! - `init` - create a starter `config.toml`
//!
//! See the library crate docs for module-level details: `wireboard::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use wireboard::board::WhiteboardServer;
use wireboard::config::Config;

#[derive(Parser)]
#[command(name = "wireboard")]
#[command(about = "A multi-client collaborative whiteboard server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the whiteboard server
    Start {
        /// Listen port (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize a new configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { port } => {
            let mut config = Config::load(&cli.config).await?;
            init_logging(&config, cli.verbose);
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting Wireboard v{}", env!("CARGO_PKG_VERSION"));
            let server = WhiteboardServer::bind(&config).await?;
            server.run().await
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);
            println!("Edit it, then run: wireboard start");
            Ok(())
        }
    }
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let level = match verbosity {
        0 => config
            .logging
            .level
            .parse()
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    builder.init();
}
