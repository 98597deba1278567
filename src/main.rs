use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quotagate::config::QuotaGateConfig;
use quotagate::ratelimit::{now_millis, AdmissionGate};

/// Fixed-window admission control for request-shaping proxies.
#[derive(Debug, Parser)]
#[command(name = "quotagate", version, about)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a configuration file and print the effective policy
    Validate {
        /// Path to the YAML configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Replay requests against an in-memory gate and print each verdict
    Simulate {
        /// Path to the YAML configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Client identifier; repeat for several clients
        #[arg(long = "client", required = true)]
        clients: Vec<String>,

        /// Requests sent by each client
        #[arg(short = 'n', long, default_value_t = 1)]
        requests: u64,

        /// Request time in milliseconds since the epoch (defaults to now)
        #[arg(long)]
        at: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Validate { config } => {
            let config = QuotaGateConfig::from_file(&config)?;
            let policy = config.policy()?;
            info!("Configuration is valid");
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        Command::Simulate {
            config,
            clients,
            requests,
            at,
        } => {
            let config = match config {
                Some(path) => QuotaGateConfig::from_file(&path)?,
                None => QuotaGateConfig::default(),
            };
            let policy = config.policy()?;
            let gate = AdmissionGate::in_memory(policy);
            let now_ms = at.unwrap_or_else(now_millis);

            info!(
                clients = clients.len(),
                requests,
                now_ms,
                "Simulating requests"
            );

            for client in &clients {
                for request in 1..=requests {
                    let verdict = gate.check(client, &policy, now_ms).await;
                    if verdict.is_fail_open() {
                        warn!(client = %client, "Request admitted without quota accounting");
                    }
                    let line = json!({
                        "client": client,
                        "request": request,
                        "verdict": verdict,
                        "reset_at": format_millis(verdict.reset_time()),
                        "retry_after_ms": verdict.retry_after_ms(now_ms),
                    });
                    println!("{}", line);
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Render epoch milliseconds as RFC 3339.
fn format_millis(ms: u64) -> Option<String> {
    let ms = i64::try_from(ms).ok()?;
    DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.to_rfc3339())
}
