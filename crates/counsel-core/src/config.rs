use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Result};

/// Service configuration.
/// Read from the process environment first, then from `.env` in the working directory.
#[derive(Clone)]
pub struct Config {
    // HTTP listener
    pub web_bind: String,
    pub web_port: u16,
    pub cors_permissive: bool,

    // Upstream prediction service. Empty URL = fallback only.
    pub prediction_service_url: String,
    pub prediction_service_token: String,

    // Language model provider
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,

    /// Outbound request timeout in seconds. 0 = no client-side timeout.
    pub http_timeout_s: u64,
    /// Contract text beyond this many characters is cut before prompting.
    pub max_contract_chars: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("web_bind", &self.web_bind)
            .field("web_port", &self.web_port)
            .field("cors_permissive", &self.cors_permissive)
            .field("prediction_service_url", &self.prediction_service_url)
            .field("prediction_service_token", &redact(&self.prediction_service_token))
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("http_timeout_s", &self.http_timeout_s)
            .field("max_contract_chars", &self.max_contract_chars)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_bind: "0.0.0.0".into(),
            web_port: 3001,
            cors_permissive: true,
            prediction_service_url: String::new(),
            prediction_service_token: String::new(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com".into(),
            http_timeout_s: 0,
            max_contract_chars: 100_000,
        }
    }
}

pub fn parse_dotenv(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(v);
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn read_dotenv(path: &Path) -> HashMap<String, String> {
    std::fs::read_to_string(path)
        .map(|c| parse_dotenv(&c))
        .unwrap_or_default()
}

/// Key lookup over the environment, then the dotenv map.
struct Source<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
    dotenv: HashMap<String, String>,
}

impl Source<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.env)(key)
            .or_else(|| self.dotenv.get(key).cloned())
            .filter(|v| !v.is_empty())
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key).as_deref() {
            Some("true") | Some("1") => true,
            Some("false") | Some("0") => false,
            Some(_) => default,
            None => default,
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => match v.parse() {
                Ok(parsed) => Ok(parsed),
                Err(_) => bail!("invalid value for {key}: {v:?}"),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dotenv = read_dotenv(Path::new(".env"));
        Self::from_lookup(&|k| std::env::var(k).ok(), dotenv)
    }

    /// Build from an arbitrary key lookup plus a parsed `.env` map.
    pub fn from_lookup(
        env: &dyn Fn(&str) -> Option<String>,
        dotenv: HashMap<String, String>,
    ) -> Result<Self> {
        let src = Source { env, dotenv };
        let d = Self::default();

        let gemini_api_key = src
            .get("GEMINI_API_KEY")
            .or_else(|| src.get("GOOGLE_API_KEY"))
            .unwrap_or_default();

        let prediction_service_url = src.get_str("PREDICTION_SERVICE_URL", "");
        if !prediction_service_url.is_empty() {
            if let Err(e) = url::Url::parse(&prediction_service_url) {
                bail!("invalid PREDICTION_SERVICE_URL {prediction_service_url:?}: {e}");
            }
        }

        Ok(Self {
            web_bind: src.get_str("WEB_BIND", &d.web_bind),
            web_port: src.get_parsed("WEB_PORT", d.web_port)?,
            cors_permissive: src.get_bool("CORS_PERMISSIVE", d.cors_permissive),
            prediction_service_url,
            prediction_service_token: src.get_str("PREDICTION_SERVICE_TOKEN", ""),
            gemini_api_key,
            gemini_model: src.get_str("GEMINI_MODEL", &d.gemini_model),
            gemini_base_url: src
                .get_str("GEMINI_BASE_URL", &d.gemini_base_url)
                .trim_end_matches('/')
                .to_string(),
            http_timeout_s: src.get_parsed("HTTP_TIMEOUT_S", d.http_timeout_s)?,
            max_contract_chars: src.get_parsed("MAX_CONTRACT_CHARS", d.max_contract_chars)?,
        })
    }

    pub fn has_prediction_service(&self) -> bool {
        !self.prediction_service_url.is_empty()
    }

    pub fn has_model_credentials(&self) -> bool {
        !self.gemini_api_key.is_empty()
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.web_bind, self.web_port)
    }
}
