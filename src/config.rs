use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::llm::client::OPENAI_API_BASE;
use crate::spreadsheet::ColumnScheme;
use crate::types::IntegrationStyle;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub upload: UploadConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
}

#[derive(Clone)]
pub struct LLMConfig {
    pub api_key: String,
    pub base_url: String,
    pub integration: IntegrationStyle,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: u64,
    pub downloads_dir: PathBuf,
    pub persist_results: bool,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub sheet_name: String,
    pub columns: ColumnScheme,
}

impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("integration", &self.integration)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("poll_interval", &self.poll_interval)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            static_dir: PathBuf::from("static"),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: OPENAI_API_BASE.to_string(),
            integration: IntegrationStyle::Chat,
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            temperature: 0.0,
            poll_interval: Duration::from_secs(1),
            poll_max_attempts: 300,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            downloads_dir: PathBuf::from("public/downloads"),
            persist_results: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Contract Analysis".to_string(),
            columns: ColumnScheme::FieldValue,
        }
    }
}

/// Read `key`, falling back to `default` when unset; a set but malformed value is an error.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

/// Reject worksheet names the xlsx writer would refuse at request time
fn validate_sheet_name(name: String) -> Result<String> {
    rust_xlsxwriter::Worksheet::new()
        .set_name(&name)
        .with_context(|| format!("SHEET_NAME {:?} is not a valid worksheet name", name))?;
    Ok(name)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let api_key = env::var("OPENAI_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .unwrap_or_default();
        if api_key.trim().is_empty() {
            bail!("OPENAI_KEY (or OPENAI_API_KEY) must be set");
        }

        let columns = match env::var("SHEET_COLUMNS") {
            Ok(id) => ColumnScheme::from_id(&id)
                .with_context(|| format!("SHEET_COLUMNS must be 'field' or 'category', got {:?}", id))?,
            Err(_) => defaults.output.columns,
        };

        Ok(Self {
            server: ServerConfig {
                port: parse_env("PORT", defaults.server.port)?,
                host: env::var("HOST").unwrap_or(defaults.server.host),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.server.cors_allowed_origins),
                static_dir: env::var("STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.server.static_dir),
            },
            llm: LLMConfig {
                api_key: api_key.trim().to_string(),
                base_url: env::var("OPENAI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or(defaults.llm.base_url),
                integration: parse_env("LLM_INTEGRATION", defaults.llm.integration)?,
                model: env::var("LLM_MODEL").unwrap_or(defaults.llm.model),
                max_tokens: parse_env("LLM_MAX_TOKENS", defaults.llm.max_tokens)?,
                temperature: parse_env("LLM_TEMPERATURE", defaults.llm.temperature)?,
                poll_interval: Duration::from_millis(parse_env("POLL_INTERVAL_MS", 1000u64)?),
                poll_max_attempts: parse_env("POLL_MAX_ATTEMPTS", defaults.llm.poll_max_attempts)?,
            },
            upload: UploadConfig {
                max_file_size: parse_env("MAX_UPLOAD_BYTES", defaults.upload.max_file_size)?,
                downloads_dir: env::var("DOWNLOADS_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.upload.downloads_dir),
                persist_results: parse_env("PERSIST_RESULTS", defaults.upload.persist_results)?,
            },
            output: OutputConfig {
                sheet_name: match env::var("SHEET_NAME") {
                    Ok(name) => validate_sheet_name(name)?,
                    Err(_) => defaults.output.sheet_name,
                },
                columns,
            },
        })
    }
}
