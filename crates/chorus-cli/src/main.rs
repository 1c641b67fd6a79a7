use anyhow::{Context, Result};
use chorus_core::{GenerationRequest, Hub, ProviderRegistry, ProviderResult};
use chorus_gateway::GatewayServer;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{ChorusConfig, DEFAULT_CONFIG};

#[derive(Parser)]
#[command(name = "chorus")]
#[command(version)]
#[command(about = "Ask many LLM providers at once")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway until Ctrl+C
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one prompt to several providers and print every answer
    Ask {
        /// The prompt to send
        prompt: String,

        /// Provider ids, comma separated (duplicates allowed)
        #[arg(short, long, value_delimiter = ',', required = true)]
        models: Vec<String>,

        /// System prompt passed to every provider
        #[arg(short, long)]
        system: Option<String>,

        #[arg(short, long, default_value_t = chorus_core::types::DEFAULT_TEMPERATURE)]
        temperature: f32,

        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Initialize config directory and default config
    Init,

    /// Show current configuration (secrets masked)
    Config,

    /// List registered providers and their models
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("Failed to load .env"),
    }

    match cli.command {
        Commands::Init => cmd_init(&cli.config).await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Providers => cmd_providers(&cli.config).await,
        Commands::Serve { port } => cmd_serve(&cli.config, port).await,
        Commands::Ask {
            prompt,
            models,
            system,
            temperature,
            max_tokens,
        } => {
            let mut request = GenerationRequest::new(prompt, models).with_temperature(temperature);
            if let Some(system) = system {
                request = request.with_system_prompt(system);
            }
            if let Some(max_tokens) = max_tokens {
                request = request.with_max_tokens(max_tokens);
            }
            cmd_ask(&cli.config, &request).await
        }
    }
}

fn build_registry(cfg: &ChorusConfig) -> ProviderRegistry {
    ProviderRegistry::from_settings(&cfg.providers)
}

async fn cmd_init(config_path: &Option<PathBuf>) -> Result<()> {
    let path = config_path
        .clone()
        .unwrap_or_else(config::default_config_path);
    config::write_default(&path, DEFAULT_CONFIG)?;
    info!("Created default config at {}", path.display());

    println!("chorus initialized at {}", path.display());
    println!("Set your provider API keys in the environment or in a .env file.");
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ChorusConfig::load(config_path)?;
    println!("{:#?}", cfg);
    Ok(())
}

async fn cmd_providers(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = ChorusConfig::load_or_default(config_path)?;
    let registry = build_registry(&cfg);
    for info in registry.describe() {
        println!("{:<12} {}", info.id, info.model);
    }
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut cfg = ChorusConfig::load_or_default(config_path)?;
    if let Some(port) = port {
        cfg.gateway.port = port;
    }
    let bind = cfg.gateway.socket_addr()?;

    let hub = Arc::new(Hub::new(build_registry(&cfg)));
    let server = GatewayServer::new(bind, hub, cfg.gateway.api_key.clone());

    let cancel = CancellationToken::new();
    let handle = server.spawn(cancel.clone());

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    cancel.cancel();

    handle.await.context("Gateway task panicked")??;
    println!("chorus stopped.");
    Ok(())
}

async fn cmd_ask(config_path: &Option<PathBuf>, request: &GenerationRequest) -> Result<()> {
    let cfg = ChorusConfig::load_or_default(config_path)?;
    let hub = Hub::new(build_registry(&cfg));

    let response = hub.generate(request).await?;
    for result in &response.results {
        print_result(result);
    }
    info!(
        "{}/{} providers answered",
        response.succeeded(),
        response.results.len()
    );
    Ok(())
}

fn print_result(result: &ProviderResult) {
    println!("── {} ({}ms) ──", result.provider_id, result.latency_ms);
    match &result.error {
        Some(error) => println!("error: {}", error),
        None => println!("{}", result.output),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let cfg = ChorusConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(cfg.gateway.port, 8000);
        assert_eq!(build_registry(&cfg).len(), 5);
    }

    #[test]
    fn test_ask_args() {
        let cli = Cli::try_parse_from([
            "chorus",
            "ask",
            "2+2?",
            "--models",
            "openai,anthropic,openai",
            "--max-tokens",
            "64",
        ])
        .unwrap();
        match cli.command {
            Commands::Ask {
                models,
                temperature,
                max_tokens,
                ..
            } => {
                assert_eq!(models, vec!["openai", "anthropic", "openai"]);
                assert_eq!(temperature, 0.7);
                assert_eq!(max_tokens, Some(64));
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_ask_requires_models() {
        assert!(Cli::try_parse_from(["chorus", "ask", "hi"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["chorus", "serve", "--debug", "--config", "/tmp/c.toml"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
