// src/main.rs

use dumprun::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(status) if status.is_success() => {}
        Ok(status) => {
            eprintln!("dumprun: {status}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("dumprun error: {err:?}");
            std::process::exit(2);
        }
    }
}

async fn run_main() -> anyhow::Result<dumprun::engine::RunStatus> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    Ok(run(args).await?)
}
