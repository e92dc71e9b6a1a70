use anyhow::{Context, Result};
use extract::{GenerationConfig, RetryConfig};
use index::{GraphConfig, LoaderConfig};
use prep::PrepConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Everything the binaries need, resolved once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub log_json: bool,
    pub generation: GenerationConfig,
    pub glossary_enabled: bool,
    pub prep: PrepConfig,
    /// `term<TAB>label` file for the gazetteer policy; the run's own glossary otherwise.
    pub gazetteer_terms: Option<PathBuf>,
    pub retry: RetryConfig,
    pub loader: LoaderConfig,
    pub neo4j: Neo4jSettings,
}

/// Connection settings for the graph store. The password has no default:
/// without it the load stage refuses to run, the rest of the pipeline does not care.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/output"),
            bind_addr: "0.0.0.0:3000".to_string(),
            max_upload_bytes: 50 * 1024 * 1024,
            log_json: false,
            generation: GenerationConfig::default(),
            glossary_enabled: true,
            prep: PrepConfig::default(),
            gazetteer_terms: None,
            retry: RetryConfig::default(),
            loader: LoaderConfig::default(),
            neo4j: Neo4jSettings {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: None,
                timeout_secs: 30,
            },
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(mb) = get("MAX_UPLOAD_MB") {
            config.max_upload_bytes = parse::<usize>("MAX_UPLOAD_MB", &mb)?
                .checked_mul(1024 * 1024)
                .context(format!("MAX_UPLOAD_MB is too large: {}", mb))?;
        }
        if let Some(format) = get("LOG_FORMAT") {
            config.log_json = format.eq_ignore_ascii_case("json");
        }

        if let Some(url) = get("OLLAMA_URL") {
            config.generation.base_url = url;
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            config.generation.model = model;
        }
        if let Some(secs) = get("GENERATION_TIMEOUT_SECS") {
            config.generation.timeout_secs = parse("GENERATION_TIMEOUT_SECS", &secs)?;
        }
        if let Some(enabled) = get("GLOSSARY_ENABLED") {
            config.glossary_enabled = parse("GLOSSARY_ENABLED", &enabled)?;
        }
        if let Some(top_k) = get("GLOSSARY_TOP_K") {
            config.prep.glossary_top_k = parse("GLOSSARY_TOP_K", &top_k)?;
        }
        if let Some(title) = get("DOCUMENT_TITLE") {
            config.prep.title = title;
        }
        config.gazetteer_terms = get("GAZETTEER_TERMS").map(PathBuf::from);

        if let Some(n) = get("RETRY_MAX") {
            config.retry.max_retries = parse("RETRY_MAX", &n)?;
        }
        if let Some(ms) = get("RETRY_INITIAL_MS") {
            config.retry.initial_backoff_ms = parse("RETRY_INITIAL_MS", &ms)?;
        }
        if let Some(ms) = get("RETRY_MAX_MS") {
            config.retry.max_backoff_ms = parse("RETRY_MAX_MS", &ms)?;
        }

        if let Some(size) = get("LOAD_BATCH_SIZE") {
            config.loader.batch_size = parse("LOAD_BATCH_SIZE", &size)?;
        }
        if let Some(strict) = get("LOAD_FAIL_ON_MISSING") {
            config.loader.fail_on_missing_endpoints = parse("LOAD_FAIL_ON_MISSING", &strict)?;
        }

        if let Some(uri) = get("NEO4J_URI") {
            config.neo4j.uri = uri;
        }
        if let Some(user) = get("NEO4J_USER") {
            config.neo4j.user = user;
        }
        config.neo4j.password = get("NEO4J_PASSWORD");
        if let Some(secs) = get("NEO4J_TIMEOUT_SECS") {
            config.neo4j.timeout_secs = parse("NEO4J_TIMEOUT_SECS", &secs)?;
        }

        Ok(config)
    }

    pub fn graph_configured(&self) -> bool {
        self.neo4j.password.is_some()
    }

    /// Connection parameters for the load stage; fails when credentials
    /// were never supplied.
    pub fn graph_config(&self) -> Result<GraphConfig> {
        let password = self
            .neo4j
            .password
            .clone()
            .context("NEO4J_PASSWORD is not set; graph loading is unavailable")?;

        Ok(GraphConfig {
            uri: self.neo4j.uri.clone(),
            user: self.neo4j.user.clone(),
            password,
            timeout_secs: self.neo4j.timeout_secs,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .context(format!("Invalid value for {}: {:?}", key, value))
}
