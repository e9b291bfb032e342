use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;
use crate::passcode::PasscodeHasher;
use crate::server::{self, AppState};
use crate::service::ClipboardService;
use crate::store;

#[derive(Parser)]
#[command(name = "clipshare")]
#[command(about = "Shared clipboard server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the HTTP server")]
    Serve {
        /// Override the configured listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    #[command(about = "Print the items of a clipboard")]
    List {
        code: String,

        #[arg(short, long)]
        passcode: Option<String>,
    },

    #[command(about = "Show whether a clipboard exists and how large it is")]
    Info { code: String },

    #[command(about = "Configuration management")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Generate example configuration")]
    Init {
        #[arg(long)]
        force: bool,
    },

    #[command(about = "Validate configuration")]
    Validate,
}

pub struct CliHandler {
    config: Config,
    config_path: Option<PathBuf>,
    service: Option<ClipboardService>,
}

impl CliHandler {
    pub fn new(config_path: Option<PathBuf>) -> crate::Result<Self> {
        let config = Config::load_config(config_path.clone())?;

        Ok(Self {
            config,
            config_path,
            service: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lazily open the store and build the service when needed
    async fn ensure_service(&mut self) -> crate::Result<ClipboardService> {
        if let Some(service) = &self.service {
            return Ok(service.clone());
        }

        info!("Opening {:?} clipboard store", self.config.storage.backend);
        let store = store::open(&self.config.storage).await?;
        let hasher = PasscodeHasher::from_config(&self.config.security)?;
        let service = ClipboardService::new(store, hasher);
        self.service = Some(service.clone());
        Ok(service)
    }

    pub async fn handle_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Serve { listen } => self.serve(listen).await?,
            Commands::List { code, passcode } => self.list(&code, passcode.as_deref()).await?,
            Commands::Info { code } => self.info(&code).await?,
            Commands::Config { action } => self.handle_config_action(action)?,
        }
        Ok(())
    }

    async fn serve(&mut self, listen: Option<String>) -> crate::Result<()> {
        if let Some(listen) = listen {
            self.config.listen_addr = listen;
        }
        let addr = self.config.socket_addr()?;

        let service = self.ensure_service().await?;
        server::run(addr, AppState { service }, &self.config.server).await
    }

    async fn list(&mut self, code: &str, passcode: Option<&str>) -> crate::Result<()> {
        let service = self.ensure_service().await?;
        let items = service.list_items(code, passcode).await?;

        if items.is_empty() {
            println!("Clipboard '{}' is empty", code);
            return Ok(());
        }

        println!("Clipboard '{}' ({} items):", code, items.len());
        for (i, item) in items.iter().enumerate() {
            println!("{}. {} [{}]", i, item.title, item.id);
            println!("   {}", preview(&item.text, 60));
        }

        Ok(())
    }

    async fn info(&mut self, code: &str) -> crate::Result<()> {
        let service = self.ensure_service().await?;
        let summary = service.summary(code).await?;

        println!("Clipboard '{}':", summary.code);
        println!(
            "  Visibility: {}",
            if summary.is_private { "private" } else { "public" }
        );
        println!("  Items: {}", summary.item_count);
        println!(
            "  Created: {}",
            summary.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        Ok(())
    }

    fn handle_config_action(&self, action: ConfigAction) -> crate::Result<()> {
        match action {
            ConfigAction::Show => {
                println!("Current Configuration:");
                println!("{}", self.config.to_toml()?);
            }
            ConfigAction::Init { force } => {
                let path = Config::generate_example_config(force)?;
                println!("Example configuration written to {}", path.display());
            }
            ConfigAction::Validate => {
                // Loading in CliHandler::new() already validated it
                match &self.config_path {
                    Some(path) => println!("Configuration {} is valid", path.display()),
                    None => println!("Configuration is valid"),
                }
            }
        }
        Ok(())
    }
}

/// First line of `text`, cut to `max` characters
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let cut: String = line.chars().take(max).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

/// Resolve the default log directive for the binary
pub fn log_directive(verbose: bool, configured: Option<&str>) -> Result<String> {
    let level = if verbose {
        "debug"
    } else {
        configured.unwrap_or("info")
    };

    match level {
        "trace" | "debug" | "info" | "warn" | "error" => {
            Ok(format!("clipshare={level},tower_http={level}"))
        }
        other => Err(anyhow!("Unknown log level '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("first\nsecond", 10), "first");
        assert_eq!(preview("ééééé", 3), "ééé...");
        assert_eq!(preview("", 3), "");
    }

    #[test]
    fn test_log_directive() {
        assert_eq!(
            log_directive(false, None).unwrap(),
            "clipshare=info,tower_http=info"
        );
        assert_eq!(
            log_directive(true, Some("warn")).unwrap(),
            "clipshare=debug,tower_http=debug"
        );
        assert_eq!(
            log_directive(false, Some("warn")).unwrap(),
            "clipshare=warn,tower_http=warn"
        );
        assert!(log_directive(false, Some("loud")).is_err());
    }

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from(["clipshare", "serve", "--listen", "127.0.0.1:8080"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve { listen: Some(ref addr) } if addr == "127.0.0.1:8080"
        ));
    }

    #[test]
    fn test_cli_parses_list_with_passcode() {
        let cli = Cli::try_parse_from(["clipshare", "-v", "list", "secret", "-p", "xyz"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::List { ref code, passcode: Some(ref p) } if code == "secret" && p == "xyz"
        ));
    }
}
