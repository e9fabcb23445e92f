use clap::{Parser, Subcommand};
use matchbook::order::book::ladder::Ladder;
use matchbook::{api, config, engine};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "matchbook", about = "Matchbook Limit Order Book")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve,
}

fn init_logging(cfg: &config::AppConfig) {
    match cfg.logger.format {
        config::LogFormat::JSON => {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(cfg.logger.level)
                .with_current_span(true)
                .init();
        }
        config::LogFormat::COMPACT => {
            tracing_subscriber::fmt()
                .compact()
                .with_max_level(cfg.logger.level)
                .init();
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = config::AppConfig::load(cli.config_path.as_ref()).expect("could not load config");

    init_logging(&config);

    match cli.command {
        Commands::Serve => {
            let engine = Arc::new(engine::Engine::new(Ladder::new(), config.expiry));

            let cancellation_token = CancellationToken::new();
            tokio::spawn({
                let cancellation_token = cancellation_token.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancellation_token.cancel();
                    }
                }
            });

            api::start(&config.api, engine, cancellation_token)
                .await
                .expect("could not start API server");
        }
    }
}
