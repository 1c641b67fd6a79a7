use anyhow::{Context, Result};
use chorus_core::providers::{ProviderSettings, ProvidersSettings, mask_secret};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Template written by `chorus init`, also used when no config file exists
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChorusConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub providers: ProvidersSettings,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Empty disables auth
    #[serde(default)]
    pub api_key: String,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("api_key", &mask_secret(&self.api_key))
            .finish()
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            api_key: String::new(),
        }
    }
}

impl GatewayConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .with_context(|| format!("Invalid gateway address {}:{}", self.bind, self.port))
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chorus")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl ChorusConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path.clone().unwrap_or_else(default_config_path);

        // Config may hold API keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `chorus init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Load from `custom_path` if given or if the default file exists,
    /// otherwise use the built-in template expanded from the environment
    pub fn load_or_default(custom_path: &Option<PathBuf>) -> Result<Self> {
        if custom_path.is_none() && !default_config_path().exists() {
            debug!("No config file found, using built-in defaults with environment keys");
            return Self::parse(DEFAULT_CONFIG).context("Failed to parse built-in config");
        }
        Self::load(custom_path)
    }

    /// Expand allowlisted `${VAR}` references, then parse
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Self = toml::from_str(&expanded)?;
        config.warn_hardcoded_secrets(content);
        Ok(config)
    }

    fn warn_hardcoded_secrets(&self, raw: &str) {
        let providers: [(&str, &ProviderSettings); 5] = [
            ("openai", &self.providers.openai),
            ("anthropic", &self.providers.anthropic),
            ("google", &self.providers.google),
            ("mistral", &self.providers.mistral),
            ("perplexity", &self.providers.perplexity),
        ];
        for (name, settings) in providers {
            if !settings.api_key.is_empty() && raw.contains(settings.api_key.as_str()) {
                warn!(
                    "{} API key is hardcoded in config file. For security, use environment variables: api_key = \"${{{}_API_KEY}}\"",
                    name,
                    name.to_uppercase()
                );
            }
        }
        if !self.gateway.api_key.is_empty() && raw.contains(self.gateway.api_key.as_str()) {
            warn!(
                "Gateway API key is hardcoded in config file. For security, use environment variables: api_key = \"${{CHORUS_API_KEY}}\""
            );
        }
    }
}

/// Write the default config to `path`, refusing to overwrite
pub fn write_default(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config already exists at {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Environment variables that may be expanded in config files
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "OPENAI_MODEL",
    "ANTHROPIC_API_KEY",
    "ANTHROPIC_BASE_URL",
    "ANTHROPIC_MODEL",
    "GOOGLE_API_KEY",
    "GOOGLE_BASE_URL",
    "GOOGLE_MODEL",
    "MISTRAL_API_KEY",
    "MISTRAL_BASE_URL",
    "MISTRAL_MODEL",
    "PERPLEXITY_API_KEY",
    "PERPLEXITY_BASE_URL",
    "PERPLEXITY_MODEL",
    "CHORUS_API_KEY",
    "API_KEY",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            pos = abs_start + end + 1;
            continue;
        }

        let value = escape_toml_string(&std::env::var(&var_name).unwrap_or_default());
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}

/// Escape a value for splicing into a TOML basic (double-quoted) string
fn escape_toml_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}
