// src/main.rs

use runguard::{ExecutorError, cli, logging, run};

/// Conventional exit status for a run ended by SIGINT/SIGTERM.
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        if let Some(ExecutorError::Canceled) = err.downcast_ref::<ExecutorError>() {
            eprintln!("runguard: interrupted");
            std::process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("runguard error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
