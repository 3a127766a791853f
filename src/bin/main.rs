use tickload::*;

use clap::Parser;
use model::OutputFormat;
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of workers, each with its own connection
    #[arg(short, long, default_value_t = model::DEFAULT_WORKERS)]
    workers: usize,

    /// Fixed period between ticks of each worker, in milliseconds
    #[arg(short, long, default_value_t = model::DEFAULT_PERIOD_MS)]
    period_ms: u64,

    /// Output record format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Tsv)]
    format: OutputFormat,

    /// Show a spinner with running counts on stderr
    #[arg(long)]
    progress: bool,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    telemetry::init();

    let config = Config {
        workers: args.workers,
        period_ms: args.period_ms,
        format: args.format,
        progress: args.progress,
    };

    let progress = if config.progress {
        Some(output::progress_bar()?)
    } else {
        None
    };

    let (tx, rx) = output::channel();
    let dispatcher = match Dispatcher::start(&config, RequestTemplate::default(), tx) {
        Ok(d) => d,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    // runs until the process is killed or stdout goes away
    let printer = output::print_records(rx, config.format, std::io::stdout(), progress);
    if let Err(e) = dispatcher.run_with_printer(printer).await {
        error!("output failed: {}", e);
        return Err(e.into());
    }
    Ok(())
}
