use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reachprobe::config::ReachConfig;
use reachprobe::probes::ProbeMethod;
use reachprobe::report::render_event;

#[derive(Parser)]
#[command(
    name = "reachprobe",
    about = "Bounded, cancellable host reachability probing with live progress",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (overrides REACHPROBE_CONFIG and the system location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a host a fixed number of times (Ctrl-C stops early)
    Run {
        /// Host name or IP address
        #[arg(long)]
        host: String,

        /// Number of attempts, 1 to 20
        #[arg(long, default_value = "4")]
        attempts: String,

        /// Probe method
        #[arg(long, value_enum)]
        method: Option<ProbeMethod>,

        /// Target port for the tcp method
        #[arg(long)]
        port: Option<u16>,

        /// Per-probe deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Pause between attempts in milliseconds
        #[arg(long)]
        pause_ms: Option<u64>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(config: &ReachConfig, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json || config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReachConfig::load(path)?,
        None => ReachConfig::load_or_default(),
    };
    init_tracing(&config, cli.log_json);

    match cli.command {
        Commands::Run {
            host,
            attempts,
            method,
            port,
            timeout_ms,
            pause_ms,
            json,
        } => {
            if let Some(method) = method {
                config.probe.method = method;
            }
            if let Some(port) = port {
                config.probe.port = port;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.probe.timeout_ms = timeout_ms;
            }
            if let Some(pause_ms) = pause_ms {
                config.schedule.pause_ms = pause_ms;
            }

            let stop = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    // No signal handler available; never stop early.
                    std::future::pending::<()>().await;
                }
            };

            let display_host = host.trim().to_string();
            let report = reachprobe::run_to_completion(&config, &host, &attempts, stop, |event| {
                if json {
                    println!("{}", serde_json::to_string(event)?);
                } else if let Some(line) = render_event(&display_host, event) {
                    println!("{}", line);
                }
                Ok(())
            })
            .await?;

            if report.is_none() {
                std::process::exit(2);
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
