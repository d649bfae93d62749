use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::error::ZapError;

/// Top-level zapbot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Fixed daily outbound messages.
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Pause before each reply is sent, in milliseconds. Makes the bot feel
    /// less mechanical in chat.
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            reply_delay_ms: default_reply_delay_ms(),
        }
    }
}

/// Provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider")]
    pub default: String,
    pub openrouter: Option<OpenRouterConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            openrouter: Some(OpenRouterConfig::default()),
        }
    }
}

/// OpenRouter proxy config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// API key. Empty falls back to the `OPENROUTER_API_KEY` env var.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openrouter_model")]
    pub model: String,
    /// Sent as `HTTP-Referer` — OpenRouter uses it for app attribution.
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Sent as `X-Title`.
    #[serde(default = "default_name")]
    pub app_title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            model: default_openrouter_model(),
            referer: default_referer(),
            app_title: default_name(),
        }
    }
}

impl OpenRouterConfig {
    /// Resolve the API key: config value first, `OPENROUTER_API_KEY` env
    /// var as fallback.
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("OPENROUTER_API_KEY").unwrap_or_default()
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub whatsapp: Option<WhatsAppConfig>,
}

/// WhatsApp channel config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Allowed phone numbers (e.g. `["5547999887766"]`). Empty = allow all,
    /// which is the normal setting for a customer-facing bot.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

/// Conversation-context tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Minutes after a conversation's creation before it expires.
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,
    /// Maximum messages kept per conversation (FIFO eviction).
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// How many recent messages are sent to the provider as history.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Interval for the background expiry sweep, in seconds. 0 disables
    /// the sweeper; expired conversations are then only replaced on access.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            max_messages: default_max_messages(),
            history_window: default_history_window(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Catalog config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub db_path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: default_catalog_path(),
        }
    }
}

/// Scheduler configuration — fixed daily outbound messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// One fixed daily outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Local time of day, "HH:MM".
    pub time: String,
    /// Delivery target (e.g. a WhatsApp JID like `5547999887766@s.whatsapp.net`).
    pub target: String,
    pub text: String,
}

// --- Default value functions ---

fn default_name() -> String {
    "zapbot".to_string()
}
fn default_data_dir() -> String {
    "~/.zapbot".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_reply_delay_ms() -> u64 {
    1500
}
fn default_provider() -> String {
    "openrouter".to_string()
}
fn default_true() -> bool {
    true
}
fn default_openrouter_model() -> String {
    "deepseek/deepseek-chat-v3-0324:free".to_string()
}
fn default_referer() -> String {
    "http://localhost".to_string()
}
fn default_ttl_minutes() -> i64 {
    15
}
fn default_max_messages() -> usize {
    10
}
fn default_history_window() -> usize {
    5
}
fn default_sweep_interval() -> u64 {
    300
}
fn default_catalog_path() -> String {
    "~/.zapbot/catalog.db".to_string()
}
fn default_poll_interval() -> u64 {
    60
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, ZapError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config {
            bot: BotConfig::default(),
            provider: ProviderConfig::default(),
            channel: ChannelConfig::default(),
            context: ContextConfig::default(),
            catalog: CatalogConfig::default(),
            scheduler: SchedulerConfig::default(),
            schedule: Vec::new(),
        });
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ZapError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| ZapError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}

/// Externalized prompts, loaded from `{data_dir}` at startup.
///
/// If files are missing, bundled defaults are used.
#[derive(Debug, Clone)]
pub struct Prompts {
    /// Persona system prompt sent with every provider request.
    pub system: String,
    /// Reply sent when the provider fails or returns nothing usable.
    pub fallback: String,
}

impl Default for Prompts {
    fn default() -> Self {
        let sections = parse_markdown_sections(BUNDLED_SYSTEM_PROMPT);
        Self {
            system: sections.get("System").cloned().unwrap_or_default(),
            fallback: sections
                .get("Fallback")
                .cloned()
                .unwrap_or_else(|| "⚠️ Desculpe, não consegui entender. Pode repetir?".into()),
        }
    }
}

/// Bundled system prompt, embedded at compile time.
const BUNDLED_SYSTEM_PROMPT: &str = include_str!("../../../prompts/SYSTEM_PROMPT.md");

/// Deploy the bundled prompt file to `data_dir`, creating the directory if
/// needed. Never overwrites an existing file so operator edits are preserved.
pub fn install_bundled_prompts(data_dir: &str) {
    let expanded = shellexpand(data_dir);
    let dir = Path::new(&expanded);
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("prompts: failed to create {}: {e}", dir.display());
        return;
    }

    let dest = dir.join("SYSTEM_PROMPT.md");
    if !dest.exists() {
        if let Err(e) = std::fs::write(&dest, BUNDLED_SYSTEM_PROMPT) {
            warn!("prompts: failed to write {}: {e}", dest.display());
        } else {
            info!("prompts: deployed bundled SYSTEM_PROMPT.md");
        }
    }
}

impl Prompts {
    /// Load prompts from `SYSTEM_PROMPT.md` in `data_dir`.
    ///
    /// Missing file or sections fall back to the bundled defaults.
    pub fn load(data_dir: &str) -> Self {
        let mut prompts = Self::default();
        let dir = shellexpand(data_dir);

        let prompt_path = format!("{dir}/SYSTEM_PROMPT.md");
        if let Ok(content) = std::fs::read_to_string(&prompt_path) {
            let sections = parse_markdown_sections(&content);
            if let Some(v) = sections.get("System") {
                prompts.system = v.clone();
            }
            if let Some(v) = sections.get("Fallback") {
                prompts.fallback = v.clone();
            }
            info!("loaded prompts from {prompt_path}");
        }

        prompts
    }
}

/// Parse a markdown file with `## Section` headers into a map of section name → body.
fn parse_markdown_sections(content: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current_key: Option<String> = None;
    let mut current_body = String::new();

    for line in content.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(key) = current_key.take() {
                let trimmed = current_body.trim().to_string();
                if !trimmed.is_empty() {
                    sections.insert(key, trimmed);
                }
            }
            current_key = Some(header.trim().to_string());
            current_body.clear();
        } else if current_key.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }

    if let Some(key) = current_key {
        let trimmed = current_body.trim().to_string();
        if !trimmed.is_empty() {
            sections.insert(key, trimmed);
        }
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_config_defaults() {
        let cc = ContextConfig::default();
        assert_eq!(cc.ttl_minutes, 15);
        assert_eq!(cc.max_messages, 10);
        assert_eq!(cc.history_window, 5);
    }

    #[test]
    fn test_context_config_from_toml() {
        let toml_str = r#"
            ttl_minutes = 1
            max_messages = 4
        "#;
        let cc: ContextConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cc.ttl_minutes, 1);
        assert_eq!(cc.max_messages, 4);
        assert_eq!(cc.history_window, 5, "missing field should default");
    }

    #[test]
    fn test_schedule_entries_from_toml() {
        let toml_str = r#"
            [[schedule]]
            time = "08:00"
            target = "5547999887766@s.whatsapp.net"
            text = "Bom dia!"

            [[schedule]]
            time = "18:30"
            target = "5547988776655@s.whatsapp.net"
            text = "Boa noite!"
        "#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.schedule.len(), 2);
        assert_eq!(cfg.schedule[0].time, "08:00");
        assert_eq!(cfg.schedule[1].text, "Boa noite!");
    }

    #[test]
    fn test_reply_delay_default_when_missing() {
        let toml_str = r#"name = "brunno""#;
        let bot: BotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(bot.reply_delay_ms, 1500);
        assert_eq!(bot.name, "brunno");
    }

    #[test]
    fn test_openrouter_explicit_key_wins() {
        let cfg = OpenRouterConfig {
            api_key: "sk-or-explicit".into(),
            ..Default::default()
        };
        assert_eq!(cfg.resolved_api_key(), "sk-or-explicit");
    }

    #[test]
    fn test_parse_markdown_sections() {
        let md = "# Title\n\n## System\nYou are a bot.\n\n## Fallback\nSorry.\n";
        let sections = parse_markdown_sections(md);
        assert_eq!(sections.get("System").unwrap(), "You are a bot.");
        assert_eq!(sections.get("Fallback").unwrap(), "Sorry.");
    }

    #[test]
    fn test_bundled_prompts_have_required_sections() {
        let prompts = Prompts::default();
        assert!(!prompts.system.is_empty(), "bundled System section missing");
        assert!(
            !prompts.fallback.is_empty(),
            "bundled Fallback section missing"
        );
    }

    #[test]
    fn test_install_bundled_prompts_preserves_edits() {
        let tmp = std::env::temp_dir().join("__zapbot_test_bundled_prompts__");
        let _ = std::fs::remove_dir_all(&tmp);

        install_bundled_prompts(tmp.to_str().unwrap());
        let prompt_path = tmp.join("SYSTEM_PROMPT.md");
        assert!(prompt_path.exists(), "SYSTEM_PROMPT.md should be deployed");

        std::fs::write(&prompt_path, "## System\ncustom persona").unwrap();
        install_bundled_prompts(tmp.to_str().unwrap());
        assert_eq!(
            std::fs::read_to_string(&prompt_path).unwrap(),
            "## System\ncustom persona",
            "should not overwrite operator edits"
        );

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
