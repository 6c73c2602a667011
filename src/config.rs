use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub twilio: TwilioConfig,
    pub together: TogetherConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub external_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TogetherConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
}

fn default_model() -> String {
    "meta-llama/Llama-3-70b-chat-hf".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.7
}

fn default_top_k() -> u32 {
    50
}

fn default_repetition_penalty() -> f32 {
    1.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Path to the system prompt file, read once at startup.
    #[serde(default = "default_prompt_file")]
    pub prompt_file: String,
    /// Fixed greeting spoken on the first turn. Empty selects from the
    /// time-aware greeting pool instead.
    #[serde(default)]
    pub greeting: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Idle conversations older than this are dropped.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prompt_file: default_prompt_file(),
            greeting: String::new(),
            name: default_name(),
            session_timeout_secs: default_session_timeout(),
        }
    }
}

fn default_prompt_file() -> String {
    config_dir().join("system_prompt.txt").display().to_string()
}

fn default_name() -> String {
    "Joanna".to_string()
}

fn default_session_timeout() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ApiConfig {
    /// Bearer token required for /make-call. If empty, all requests are rejected.
    #[serde(default)]
    pub token: String,
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file from same directory as config.toml
        let env_path = config_dir().join(".env");
        match dotenvy::from_path(&env_path) {
            Ok(()) => tracing::info!("Loaded .env from {}", env_path.display()),
            Err(dotenvy::Error::Io(_)) => {
                tracing::debug!(
                    "No .env file at {}, using environment only",
                    env_path.display()
                );
            }
            Err(e) => tracing::warn!("Failed to parse .env: {e}"),
        }

        let path = config_path();
        tracing::info!("Loading config from {}", path.display());

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            format!(
                "Failed to read config at {}: {}. Run voice-relay --setup or copy config.example.toml to {}",
                path.display(),
                e,
                path.display()
            )
        })?;

        let mut config: Config = toml::from_str(&contents)?;

        // Allow env var overrides for secrets
        if let Ok(v) = std::env::var("TWILIO_ACCOUNT_SID") {
            config.twilio.account_sid = v;
        }
        if let Ok(v) = std::env::var("TWILIO_AUTH_TOKEN") {
            config.twilio.auth_token = v;
        }
        if let Ok(v) = std::env::var("TOGETHER_API_KEY") {
            config.together.api_key = v;
        }
        if let Ok(v) = std::env::var("RELAY_API_TOKEN") {
            config.api.token = v;
        }
        if let Ok(v) = std::env::var("SERVER_EXTERNAL_URL") {
            config.server.external_url = v;
        }

        Ok(config)
    }

    /// Read the system prompt file named in `agent.prompt_file`.
    pub fn load_system_prompt(&self) -> Result<String, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(&self.agent.prompt_file).map_err(|e| {
            format!(
                "Failed to read system prompt at {}: {}. Run voice-relay --setup or create the file",
                self.agent.prompt_file, e
            )
        })?;
        Ok(contents.trim().to_string())
    }
}

pub fn config_dir() -> PathBuf {
    if let Ok(p) = std::env::var("VOICE_RELAY_CONFIG") {
        // If pointing to a file, use its parent directory
        let path = PathBuf::from(p);
        return path.parent().map(|p| p.to_path_buf()).unwrap_or(path);
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".voice-relay")
}

fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("VOICE_RELAY_CONFIG") {
        return PathBuf::from(p);
    }

    config_dir().join("config.toml")
}
