use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::ollama::OllamaClient;
use crate::util::build_http_client_from_env;

pub const DEFAULT_MODEL: &str = "qwen3-coder:480b-cloud";

/// Which upload variant this deployment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Docx,
    Md,
}

impl UploadFormat {
    pub fn extension(self) -> &'static str {
        match self {
            UploadFormat::Docx => ".docx",
            UploadFormat::Md => ".md",
        }
    }
}

/// Process configuration, read from the environment once at startup and
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the model service (`OLLAMA_HOST`).
    pub ollama_host: String,
    /// Optional bearer credential for the model service (`OLLAMA_API_KEY`).
    pub ollama_api_key: Option<String>,
    /// Listen address (`BIND_ADDR`, or `PORT` on 0.0.0.0).
    pub bind_addr: String,
    /// Model used when the request does not name one (`DEFAULT_MODEL`).
    pub default_model: String,
    /// Path of the system instruction file (`PROMPT_PATH`).
    pub prompt_path: PathBuf,
    /// Upload variant for `/api/upload` (`UPLOAD_FORMAT`: docx | md).
    pub upload_format: UploadFormat,
    /// When set, serve static assets and the SPA fallback from this directory
    /// (`STATIC_DIR`).
    pub static_dir: Option<PathBuf>,
    /// Scheme+host of the Google Docs export service. Overridable for tests.
    pub google_export_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_host: "https://ollama.com".to_string(),
            ollama_api_key: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            prompt_path: PathBuf::from("prompt.txt"),
            upload_format: UploadFormat::Docx,
            static_dir: None,
            google_export_base: "https://docs.google.com".to_string(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();

        if let Some(host) = non_empty("OLLAMA_HOST") {
            config.ollama_host = host.trim_end_matches('/').to_string();
        }
        config.ollama_api_key = non_empty("OLLAMA_API_KEY");

        if let Some(addr) = non_empty("BIND_ADDR") {
            config.bind_addr = addr;
        } else if let Some(port) = non_empty("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("invalid PORT value: {port}"))?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(model) = non_empty("DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Some(path) = non_empty("PROMPT_PATH") {
            config.prompt_path = PathBuf::from(path);
        }
        if let Some(fmt) = non_empty("UPLOAD_FORMAT") {
            config.upload_format = match fmt.to_ascii_lowercase().as_str() {
                "docx" => UploadFormat::Docx,
                "md" | "markdown" => UploadFormat::Md,
                other => anyhow::bail!("invalid UPLOAD_FORMAT: {other} (expected docx or md)"),
            };
        }
        config.static_dir = non_empty("STATIC_DIR").map(PathBuf::from);
        if let Some(base) = non_empty("GOOGLE_EXPORT_BASE") {
            config.google_export_base = base.trim_end_matches('/').to_string();
        }

        Ok(config)
    }
}

/// Shared application state: read-only after startup, `Arc`-cloned into
/// request handlers. Nothing here is mutated across requests.
pub struct AppState {
    pub http: reqwest::Client,
    pub ollama: OllamaClient,
    pub config: AppConfig,
    pub system_prompt: String,
}

impl AppState {
    pub fn new(config: AppConfig, system_prompt: String) -> Arc<Self> {
        Self::with_client(build_http_client_from_env(), config, system_prompt)
    }

    /// Build state around an explicit HTTP client (tests use short timeouts).
    pub fn with_client(
        http: reqwest::Client,
        config: AppConfig,
        system_prompt: String,
    ) -> Arc<Self> {
        let ollama = OllamaClient::new(http.clone(), &config);
        Arc::new(Self {
            http,
            ollama,
            config,
            system_prompt,
        })
    }
}
