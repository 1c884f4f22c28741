use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::{env, time::Duration};

pub const MAX_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Tried in order, cheapest first
    pub models: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            api_key: String::new(),
            models: vec![
                "gemini-2.0-flash-lite".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-flash".to_string(),
                "gemini-pro".to_string(),
            ],
            timeout_secs: 30,
        }
    }
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailConfig {
    #[serde(default = "default_gmail_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Address replies are sent from
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_unread_query")]
    pub unread_query: String,
    #[serde(default = "default_body_max_chars")]
    pub body_max_chars: usize,
}

fn default_gmail_endpoint() -> String {
    "https://gmail.googleapis.com/gmail/v1/users/me".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_unread_query() -> String {
    "is:unread".to_string()
}

fn default_body_max_chars() -> usize {
    2000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_emails: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_emails: MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Firebase project whose ID tokens are accepted
    pub project_id: Option<String>,
    pub jwks_url: String,
    /// Hex encoded HS256 secret, used instead of Firebase keys when set
    pub jwt_secret: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            jwks_url:
                "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com"
                    .to_string(),
            jwt_secret: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub gemini: GeminiConfig,
    pub gmail: Option<GmailConfig>,
    pub batch: BatchConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Reads `$APP_DIR/config.toml` (optional), `MAILMIND__*` variables and
    /// the well-known provider variables, then validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let root = env::var("APP_DIR").unwrap_or_else(|_| "config".to_string());
        let path = format!("{root}/config");

        let sources = Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("MAILMIND")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_sources(sources, |key| {
            env::var(key).ok().filter(|v| !v.trim().is_empty())
        })
    }

    fn from_sources(
        sources: Config,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut cfg: ServerConfig = sources.try_deserialize()?;
        cfg.apply_env_overrides(var);
        cfg.validate()?;

        Ok(cfg)
    }

    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(models) = var("GEMINI_MODELS") {
            self.gemini.models = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
        }
        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(project_id) = var("FIREBASE_PROJECT_ID") {
            self.auth.project_id = Some(project_id);
        }
        if let Some(secret) = var("JWT_SECRET") {
            self.auth.jwt_secret = Some(secret);
        }

        let gmail_env = (
            var("GMAIL_CLIENT_ID"),
            var("GMAIL_CLIENT_SECRET"),
            var("GMAIL_REFRESH_TOKEN"),
            var("GMAIL_ADDRESS"),
        );
        match self.gmail.as_mut() {
            Some(gmail) => {
                let (client_id, client_secret, refresh_token, address) = gmail_env;
                if let Some(v) = client_id {
                    gmail.client_id = v;
                }
                if let Some(v) = client_secret {
                    gmail.client_secret = v;
                }
                if let Some(v) = refresh_token {
                    gmail.refresh_token = v;
                }
                if let Some(v) = address {
                    gmail.address = v;
                }
            }
            None => {
                if let (Some(client_id), Some(client_secret), Some(refresh_token), Some(address)) =
                    gmail_env
                {
                    self.gmail = Some(GmailConfig {
                        endpoint: default_gmail_endpoint(),
                        token_uri: default_token_uri(),
                        client_id,
                        client_secret,
                        refresh_token,
                        address,
                        unread_query: default_unread_query(),
                        body_max_chars: default_body_max_chars(),
                    });
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "GOOGLE_API_KEY not found in environment variables".to_string(),
            ));
        }
        if self.gemini.models.is_empty() {
            return Err(ConfigError::Message(
                "gemini.models must name at least one model".to_string(),
            ));
        }
        if self.gemini.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "gemini.timeout_secs must be positive".to_string(),
            ));
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch.max_emails) {
            return Err(ConfigError::Message(format!(
                "batch.max_emails must be between 1 and {MAX_BATCH_SIZE}"
            )));
        }
        if self.auth.project_id.is_none() && self.auth.jwt_secret.is_none() {
            return Err(ConfigError::Message(
                "Either FIREBASE_PROJECT_ID or JWT_SECRET is required".to_string(),
            ));
        }
        if let Some(gmail) = &self.gmail {
            let credentials = [
                ("GMAIL_CLIENT_ID", &gmail.client_id),
                ("GMAIL_CLIENT_SECRET", &gmail.client_secret),
                ("GMAIL_REFRESH_TOKEN", &gmail.refresh_token),
                ("GMAIL_ADDRESS", &gmail.address),
            ];
            for (name, value) in credentials {
                if value.trim().is_empty() {
                    return Err(ConfigError::Message(format!(
                        "{name} is required when a gmail section is configured"
                    )));
                }
            }
            if gmail.body_max_chars == 0 {
                return Err(ConfigError::Message(
                    "gmail.body_max_chars must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth_mode = match (&self.auth.project_id, &self.auth.jwt_secret) {
            (Some(project), _) => format!("firebase ({project})"),
            (None, Some(_)) => "shared secret".to_string(),
            (None, None) => "none".to_string(),
        };
        write!(
            f,
            "Server Config:\nport: {}\ncors: {}\n\nGemini: {} (timeout {}s)\nmodels: {}\n\nGmail: {}\nbatch limit: {}\nauth: {}",
            self.server.port,
            self.server.cors_origins.join(", "),
            self.gemini.endpoint,
            self.gemini.timeout_secs,
            self.gemini.models.join(" -> "),
            self.gmail
                .as_ref()
                .map_or("not configured".to_string(), |g| g.address.clone()),
            self.batch.max_emails,
            auth_mode,
        )
    }
}
