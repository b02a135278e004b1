mod cli;
mod runtime;

use clap::Parser;
use cli::{Cli, Commands};
use fitslake::config::{Config, LogFormat, TelemetryConfig};
use fitslake::observability::init_tracing;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            let config = Config::load_with(cli.config)?;
            init_tracing(&config.telemetry);
            runtime::serve(config).await?
        }
        Commands::Extract(args) => {
            init_tracing(&TelemetryConfig {
                log_format: LogFormat::Pretty,
                log_filter: "warn".to_string(),
            });
            runtime::extract_local(args)?
        }
        Commands::Replay(args) => {
            let config = Config::load_with(cli.config)?;
            init_tracing(&config.telemetry);
            runtime::replay(config, args).await?
        }
        Commands::Config => {
            let config = Config::load_with(cli.config)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
