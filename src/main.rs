use std::process;

use clap::Parser;
use repo_cv::{Cli, ConfigError};

#[tokio::main]
async fn main() {
    // RUST_LOG controls verbosity, "warn" by default. Logs go to stderr so
    // they never interleave with progress output on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {err}");
            source = err.source();
        }

        let code = if e.downcast_ref::<ConfigError>().is_some() {
            2
        } else {
            1
        };
        process::exit(code);
    }
}
