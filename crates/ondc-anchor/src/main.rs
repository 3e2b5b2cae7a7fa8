use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ondc_anchor::{Args, WorkflowError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ondc_anchor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    info!(
        endpoint = %config.endpoint,
        products = config.product_count,
        orders = config.order_count,
        ratings = config.rating_count,
        seed = ?config.rng_seed,
        "Starting run"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    match ondc_anchor::run(config, shutdown_rx).await {
        Ok(report) => {
            for line in report.summary_lines() {
                info!("{}", line);
            }
            info!("Bye!");
            Ok(())
        }
        Err(e @ WorkflowError::Interrupted { .. }) => {
            info!("{}", e);
            std::process::exit(e.exit_code());
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}
