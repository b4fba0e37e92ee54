use clap::Parser;
use log::{error, info};

use variant_merge::cli::Args;
use variant_merge::pipeline;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let start = std::time::Instant::now();

    let args = Args::parse();

    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    if let Err(e) = pipeline::run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Elapsed time: {:.3?}", start.elapsed());
}
