mod gateway;

use clap::{Parser, Subcommand};
use std::sync::Arc;
use zapbot_catalog::Catalog;
use zapbot_channels::WhatsAppChannel;
use zapbot_context::ConversationStore;
use zapbot_core::{config, context::Context, traits::Provider};
use zapbot_providers::OpenRouterProvider;

#[derive(Parser)]
#[command(name = "zapbot", version, about = "WhatsApp customer-contact bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Check configuration and provider availability.
    Status,
    /// Send a one-shot message to the reply provider.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Start => {
            let cfg = config::load(&cli.config)?;
            config::install_bundled_prompts(&cfg.bot.data_dir);
            let prompts = config::Prompts::load(&cfg.bot.data_dir);

            let provider = build_provider(&cfg)?;
            if !provider.is_available().await {
                anyhow::bail!(
                    "provider '{}' is not available. Is the API key set?",
                    provider.name()
                );
            }

            let wa_cfg = cfg
                .channel
                .whatsapp
                .as_ref()
                .filter(|wa| wa.enabled)
                .cloned()
                .ok_or_else(|| {
                    anyhow::anyhow!("WhatsApp is not enabled. Set [channel.whatsapp] enabled = true.")
                })?;
            let channel = Arc::new(WhatsAppChannel::new(wa_cfg, &cfg.bot.data_dir));

            let store = Arc::new(ConversationStore::new(&cfg.context));
            let catalog = Catalog::new(&cfg.catalog).await?;

            println!("⚡ zapbot — starting...");
            let gw = gateway::Gateway::new(provider, channel, store, catalog, prompts, cfg);
            Arc::new(gw).run().await?;
        }
        Commands::Status => {
            let cfg = config::load(&cli.config)?;
            println!("⚡ zapbot — status\n");
            println!("Config: {}", cli.config);
            println!("Default provider: {}", cfg.provider.default);
            println!();

            let provider = build_provider(&cfg)?;
            println!(
                "  {}: {}",
                provider.name(),
                if provider.is_available().await {
                    "available"
                } else {
                    "not available"
                }
            );

            match cfg.channel.whatsapp {
                Some(ref wa) if wa.enabled => println!("  whatsapp: enabled"),
                Some(_) => println!("  whatsapp: disabled"),
                None => println!("  whatsapp: not configured"),
            }
            println!("  scheduled messages: {}", cfg.schedule.len());
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: zapbot ask <message>");
            }

            let cfg = config::load(&cli.config)?;
            let prompts = config::Prompts::load(&cfg.bot.data_dir);
            let provider = build_provider(&cfg)?;
            if !provider.is_available().await {
                anyhow::bail!("provider '{}' is not available", provider.name());
            }

            let mut ctx = Context::new(&message.join(" "));
            ctx.system_prompt = prompts.system;
            let response = provider.complete(&ctx).await?;
            println!("{}", response.text);
        }
    }

    Ok(())
}

/// Build the configured provider.
fn build_provider(cfg: &config::Config) -> anyhow::Result<Arc<dyn Provider>> {
    match cfg.provider.default.as_str() {
        "openrouter" => {
            let or = cfg.provider.openrouter.clone().unwrap_or_default();
            Ok(Arc::new(OpenRouterProvider::from_config(&or)))
        }
        other => anyhow::bail!("unsupported provider: {other}"),
    }
}
