use clap::Parser;
use poly_edge::cli::{print_report, print_status, Cli, Commands};
use poly_edge::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    poly_edge::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting scan and resolve loops");
            args.execute(&config).await?;
        }
        Commands::Evaluate(args) => {
            args.execute(&config).await?;
        }
        Commands::Status => print_status(&config)?,
        Commands::Report => print_report(&config)?,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
