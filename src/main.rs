use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use querychart::{apply_transformations, load_query_result, ChartConfig, InputFormat};

#[derive(Parser, Debug)]
#[command(name = "querychart")]
#[command(about = "Turn a query result into chart-ready data for a dashboard widget", long_about = None)]
struct Args {
    /// Chart configuration JSON file (e.g. '{"type": "line", "yColumns": ["sales"]}')
    #[arg(short, long)]
    config: PathBuf,

    /// Query result file; read from stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Query result encoding; inferred from the input extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Log pipeline stages to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "querychart=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config_text = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read chart config {}", args.config.display()))?;
    let config = ChartConfig::from_json_str(&config_text)?;

    // Read the query result from a file or stdin
    let (bytes, format) = match &args.input {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read query result {}", path.display()))?;
            (bytes, args.format.unwrap_or_else(|| InputFormat::from_path(path)))
        }
        None => {
            let mut bytes = Vec::new();
            io::stdin()
                .read_to_end(&mut bytes)
                .context("Failed to read query result from stdin")?;
            (bytes, args.format.unwrap_or_default())
        }
    };
    let result = load_query_result(&bytes, format)?;

    let chart = apply_transformations(&result, &config).context("Failed to transform query result")?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&chart)?
    } else {
        serde_json::to_string(&chart)?
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write chart data to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
