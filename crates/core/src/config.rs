use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub crm: CrmConfig,
    pub sis: SisConfig,
    pub llm: LlmConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            crm: CrmConfig::from_env(),
            sis: SisConfig::from_env(),
            llm: LlmConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:  {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  crm:     base={}, configured={}",
            self.crm.api_base,
            self.crm.is_configured()
        );
        tracing::info!(
            "  sis:     base={}, configured={}",
            self.sis.api_base,
            self.sis.is_configured()
        );
        tracing::info!(
            "  llm:     provider={}, configured={}",
            self.llm.provider,
            self.llm.is_configured()
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 10000),
        }
    }
}

// ── CRM (LeadSquared) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    pub api_base: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl CrmConfig {
    fn from_env() -> Self {
        Self {
            api_base: env_or("LSQ_API_BASE", "https://api-in21.leadsquared.com/v2"),
            access_key: env_opt("LSQ_ACCESS_KEY"),
            secret_key: env_opt("LSQ_SECRET_KEY"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key.is_some() && self.secret_key.is_some()
    }
}

// ── SIS (Mavis) ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SisConfig {
    pub api_base: String,
    pub api_key: Option<String>,
}

impl SisConfig {
    fn from_env() -> Self {
        Self {
            api_base: env_or("MAVIS_API_BASE", "https://mavis.example.edu/api/v1"),
            api_key: env_opt("MAVIS_API_KEY"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── LLM (OpenAI / Anthropic) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" or "anthropic"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env() -> Self {
        Self {
            provider: env_or("LLM_PROVIDER", "openai"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_model: env_or("ANTHROPIC_MODEL", "claude-sonnet-4-5-20250929"),
            temperature: env_or("LLM_TEMPERATURE", "0.2").parse().unwrap_or(0.2),
            max_tokens: env_u32("LLM_MAX_TOKENS", 2048),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "anthropic" => self.anthropic_api_key.is_some(),
            _ => false,
        }
    }
}
