use clap::Parser;
use tokio::runtime::Runtime;

use swing_scout::{Cli, run_analysis};

fn main() -> anyhow::Result<()> {
    // A. Init Logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // B. Parse Args
    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    // C. Run The Pipeline (Blocking)
    let rt = Runtime::new()?;
    let report = rt.block_on(run_analysis(&args))?;

    // D. Emit The Report
    let json = report.to_json()?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)?;
            log::info!("Report written to {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
