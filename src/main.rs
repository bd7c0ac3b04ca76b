use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use bbd_analytics::api::{analyze_payload_from_json, run_http_server};

#[derive(Parser, Debug)]
#[command(
    name = "bbd-analytics",
    about = "Derived analytics for Buy-Borrow-Die Monte Carlo runs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the analytics HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value = "info", help = "Log level when RUST_LOG is unset")]
        log_level: String,
    },
    /// Analyze one run and print the derived metrics as JSON
    Analyze {
        #[arg(long, help = "Payload file, or - for stdin")]
        input: PathBuf,
        #[arg(long, help = "Histogram bin count, overrides binCount in the payload")]
        bins: Option<usize>,
        #[arg(long)]
        pretty: bool,
        #[arg(long, default_value = "warn", help = "Log level when RUST_LOG is unset")]
        log_level: String,
    },
}

/// Logs go to stderr so `analyze` output stays clean JSON.
fn init_logging(level: &str) {
    let default_filter = format!("bbd_analytics={level}");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

fn read_input(input: &Path) -> std::io::Result<String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
    }
}

fn run_analyze(input: &Path, bins: Option<usize>, pretty: bool) -> Result<String, String> {
    let raw = read_input(input).map_err(|e| format!("Failed to read {}: {e}", input.display()))?;
    let raw = match bins {
        Some(bins) => with_bin_count(&raw, bins)?,
        None => raw,
    };
    let metrics = analyze_payload_from_json(&raw).map_err(|e| e.to_string())?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&metrics)
    } else {
        serde_json::to_string(&metrics)
    };
    rendered.map_err(|e| format!("Failed to serialize metrics: {e}"))
}

fn with_bin_count(raw: &str, bins: usize) -> Result<String, String> {
    let mut payload: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("Invalid JSON payload: {e}"))?;
    match payload.as_object_mut() {
        Some(object) => {
            object.insert("binCount".to_string(), serde_json::Value::from(bins));
            Ok(payload.to_string())
        }
        None => Err("Invalid JSON payload: expected an object".to_string()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, log_level } => {
            init_logging(&log_level);
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Analyze {
            input,
            bins,
            pretty,
            log_level,
        } => {
            init_logging(&log_level);
            match run_analyze(&input, bins, pretty) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Analyze error: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
