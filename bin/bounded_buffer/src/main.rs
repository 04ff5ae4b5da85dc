use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use foundation_buffers::{BufferConfig, Mode, Strategy, Workload, WorkloadReport};

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Parser, Debug)]
#[command(version, about, long_about=None)]
struct Args {
    /// Path of the TOML workload file
    config: PathBuf,

    /// Buffer strategy, overrides the file: monitor, condition or semaphore
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Operation mode, overrides the file: blocking, nonblocking or timed
    #[arg(short, long)]
    mode: Option<Mode>,

    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

fn main() -> std::result::Result<(), BoxedError> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = BufferConfig::load(&args.config)?;
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    config.validate()?;

    let workload = Arc::new(Workload::new(config));
    {
        let workload = Arc::clone(&workload);
        ctrlc::set_handler(move || workload.cancel())?;
    }

    let report = workload.run()?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &WorkloadReport) {
    println!("strategy:      {}", report.strategy);
    println!("mode:          {}", report.mode);
    println!("produced:      {}", report.produced);
    println!("consumed:      {}", report.consumed);
    println!("full retries:  {}", report.full_retries);
    println!("empty retries: {}", report.empty_retries);
    if report.was_interrupted() {
        println!("interrupted:   {} workers", report.interrupted_workers);
    }
    println!("elapsed:       {:?}", report.elapsed);
}
