use clap::Parser;
use soa::api::{Cli, Command};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("soa={},info", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let outcome = match cli.command {
        Command::Serve(args) => soa::api::run_http_server(args).await,
        Command::Compute(args) => soa::api::run_compute(&args).map(|text| println!("{text}")),
        Command::Report(args) => soa::api::run_report(&args),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
