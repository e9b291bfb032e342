use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tempfile::TempDir;

use clipshare::{
    cli::{Cli, CliHandler, Commands, ConfigAction},
    config::Config,
    service::ServiceError,
};

fn write_config(temp_dir: &TempDir) -> Result<PathBuf> {
    let config_path = temp_dir.path().join("config.toml");
    let database = temp_dir.path().join("clipboards.db");
    std::fs::write(
        &config_path,
        format!(
            r#"
listen_addr = "127.0.0.1:0"

[storage]
backend = "sqlite"
database = "{}"

[security]
argon2_memory_kib = 8
argon2_iterations = 1
argon2_parallelism = 1
"#,
            database.display()
        ),
    )?;
    Ok(config_path)
}

#[tokio::test]
async fn test_cli_parsing() -> Result<()> {
    let cli = Cli::try_parse_from(["clipshare", "serve"])?;
    assert!(matches!(cli.command, Commands::Serve { listen: None }));

    let cli = Cli::try_parse_from(["clipshare", "info", "demo"])?;
    assert!(matches!(cli.command, Commands::Info { ref code } if code == "demo"));

    let cli = Cli::try_parse_from(["clipshare", "config", "init", "--force"])?;
    assert!(matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init { force: true }
        }
    ));

    assert!(Cli::try_parse_from(["clipshare", "list"]).is_err());

    Ok(())
}

#[tokio::test]
async fn test_cli_handler_loads_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = write_config(&temp_dir)?;

    let handler = CliHandler::new(Some(config_path))?;
    assert_eq!(handler.config().security.argon2_memory_kib, 8);
    assert_eq!(
        handler.config().storage.database,
        temp_dir.path().join("clipboards.db")
    );

    Ok(())
}

#[tokio::test]
async fn test_cli_handler_rejects_invalid_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "listen_addr = \"not an address\"\n")?;

    assert!(matches!(
        CliHandler::new(Some(config_path)),
        Err(clipshare::Error::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_config_commands() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = write_config(&temp_dir)?;
    let mut handler = CliHandler::new(Some(config_path.clone()))?;

    handler
        .handle_command(Commands::Config {
            action: ConfigAction::Show,
        })
        .await?;
    handler
        .handle_command(Commands::Config {
            action: ConfigAction::Validate,
        })
        .await?;

    assert!(Config::validate(&config_path).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_inspection_commands() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = write_config(&temp_dir)?;
    let mut handler = CliHandler::new(Some(config_path))?;

    let err = handler
        .handle_command(Commands::Info {
            code: "missing".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<clipshare::Error>(),
        Some(clipshare::Error::Service(ServiceError::NotFound(_)))
    ));

    let result = handler
        .handle_command(Commands::List {
            code: "missing".to_string(),
            passcode: None,
        })
        .await;
    assert!(result.is_err());

    // The database file is created on first use
    assert!(temp_dir.path().join("clipboards.db").exists());

    Ok(())
}
