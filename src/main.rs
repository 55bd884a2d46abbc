use clap::Parser;
use testability_patterns::{AppConfig, CliArgs, LoggingConfig, init_logging, run};

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let command = cli.command.clone();
    let config = AppConfig::from_args(cli)?;

    // fail fast before any demo touches the filesystem
    config.validate()?;
    config.ensure_workspace_root()?;

    let output = run(&config, &command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
