//! Configuration types and loading
//!
//! The config file path is `--config`, else `CONFIG_PATH`, else
//! `genai-dispatch.toml`. A missing file means all defaults; no env var
//! overrides individual settings.
//! API keys are never stored in the TOML. They are collected from the
//! environment (a comma-separated list plus indexed `_1`, `_2`, ... keys)
//! and from an optional keys file, then handed to the credential pool as
//! raw strings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use genai_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use key_pool::RetryPolicy;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub credentials: CredentialsSection,
}

/// Generative-AI API settings shared by every client handle
#[derive(Debug, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Round budget and backoff schedule
#[derive(Debug, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_global_rounds")]
    pub max_global_rounds: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    /// Longest server retry hint honoured between rounds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Where API keys come from
#[derive(Debug, Deserialize)]
pub struct CredentialsSection {
    /// Env var holding a comma-separated key list. With the trailing `S`
    /// removed it is also the prefix for indexed keys (`GEMINI_API_KEY_1`).
    #[serde(default = "default_env_var")]
    pub env_var: String,
    /// File with keys separated by commas or newlines
    #[serde(default)]
    pub keys_file: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_global_rounds() -> u32 {
    key_pool::policy::MAX_GLOBAL_ROUNDS
}

fn default_base_delay_ms() -> u64 {
    key_pool::policy::BASE_DELAY.as_millis() as u64
}

fn default_max_jitter_ms() -> u64 {
    key_pool::policy::MAX_JITTER.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    key_pool::policy::MAX_HINT_DELAY.as_millis() as u64
}

fn default_env_var() -> String {
    "GEMINI_API_KEYS".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_global_rounds: default_max_global_rounds(),
            base_delay_ms: default_base_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            keys_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    fn validate(&self) -> common::Result<()> {
        if !self.client.base_url.starts_with("http://")
            && !self.client.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.client.base_url
            )));
        }

        if self.client.model.trim().is_empty() {
            return Err(common::Error::Config("model must not be empty".into()));
        }

        if self.client.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.credentials.env_var.trim().is_empty() {
            return Err(common::Error::Config("env_var must not be empty".into()));
        }

        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.client.base_url.clone(),
            model: self.client.model.clone(),
            timeout: Duration::from_secs(self.client.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_global_rounds: self.retry.max_global_rounds,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_jitter: Duration::from_millis(self.retry.max_jitter_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Raw credential strings from the process environment and keys file.
    pub fn raw_credentials(&self) -> common::Result<Vec<Secret<String>>> {
        self.collect_credentials(|name| std::env::var(name).ok())
    }

    /// Collect raw credential strings in order: list var, indexed vars
    /// (stopping at the first gap), keys file lines.
    fn collect_credentials<F>(&self, lookup: F) -> common::Result<Vec<Secret<String>>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let list_var = self.credentials.env_var.as_str();
        let mut raw = Vec::new();

        if let Some(value) = lookup(list_var) {
            raw.push(Secret::new(value));
        }

        let prefix = list_var.strip_suffix('S').unwrap_or(list_var);
        for index in 1.. {
            match lookup(&format!("{prefix}_{index}")) {
                Some(value) => raw.push(Secret::new(value)),
                None => break,
            }
        }

        if let Some(ref keys_file) = self.credentials.keys_file {
            let contents = std::fs::read_to_string(keys_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read keys_file {}: {e}",
                    keys_file.display()
                ))
            })?;
            raw.extend(contents.lines().map(|line| Secret::new(line.to_string())));
        }

        Ok(raw)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("genai-dispatch.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn exposed(raw: &[Secret<String>]) -> Vec<&str> {
        raw.iter().map(|s| s.expose().as_str()).collect()
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[client]
base_url = "http://127.0.0.1:9000"
model = "gemini-1.5-flash"
timeout_secs = 15

[retry]
max_global_rounds = 4
base_delay_ms = 500
max_jitter_ms = 0
max_delay_ms = 20000

[credentials]
env_var = "VOCAB_AI_KEYS"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.client.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.client.model, "gemini-1.5-flash");
        assert_eq!(config.credentials.env_var, "VOCAB_AI_KEYS");

        let policy = config.retry_policy();
        assert_eq!(policy.max_global_rounds, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_jitter, Duration::ZERO);
        assert_eq!(policy.max_delay, Duration::from_secs(20));

        let client = config.client_config();
        assert_eq!(client.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.model, DEFAULT_MODEL);
        assert_eq!(config.client.timeout_secs, 60);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.retry_policy().max_delay, Duration::from_secs(60));
        assert_eq!(config.credentials.env_var, "GEMINI_API_KEYS");
        assert!(config.credentials.keys_file.is_none());
    }

    #[test]
    fn test_missing_file_with_load_or_default() {
        let config = Config::load_or_default(Path::new("/nonexistent/genai.toml")).unwrap();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{{{ toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\nbase_url = \"ftp://example.com\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[client]\ntimeout_secs = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "got: {err}");
    }

    #[test]
    fn test_credentials_from_list_and_indexed_vars() {
        let config = Config::default();
        let raw = config
            .collect_credentials(env(&[
                ("GEMINI_API_KEYS", "k1, k2"),
                ("GEMINI_API_KEY_1", "k3"),
                ("GEMINI_API_KEY_2", "k4"),
                ("GEMINI_API_KEY_4", "unreachable"),
            ]))
            .unwrap();
        assert_eq!(exposed(&raw), vec!["k1, k2", "k3", "k4"]);
    }

    #[test]
    fn test_credentials_empty_environment() {
        let config = Config::default();
        let raw = config.collect_credentials(env(&[])).unwrap();
        assert!(raw.is_empty());
    }

    #[test]
    fn test_credentials_custom_env_var_without_trailing_s() {
        let mut config = Config::default();
        config.credentials.env_var = "AI_KEY".into();
        let raw = config
            .collect_credentials(env(&[("AI_KEY", "a"), ("AI_KEY_1", "b")]))
            .unwrap();
        assert_eq!(exposed(&raw), vec!["a", "b"]);
    }

    #[test]
    fn test_credentials_from_keys_file() {
        let dir = tempfile::tempdir().unwrap();
        let keys_path = dir.path().join("keys.txt");
        std::fs::write(&keys_path, "f1,f2\n\nf3\n").unwrap();

        let mut config = Config::default();
        config.credentials.keys_file = Some(keys_path);
        let raw = config
            .collect_credentials(env(&[("GEMINI_API_KEYS", "e1")]))
            .unwrap();
        assert_eq!(exposed(&raw), vec!["e1", "f1,f2", "", "f3"]);

        let parsed = key_pool::parse_credentials(raw.iter().map(|s| s.expose().as_str()));
        assert_eq!(exposed(&parsed), vec!["e1", "f1", "f2", "f3"]);
    }

    #[test]
    fn test_credentials_missing_keys_file_is_config_error() {
        let mut config = Config::default();
        config.credentials.keys_file = Some(PathBuf::from("/nonexistent/keys.txt"));
        let err = config.collect_credentials(env(&[])).unwrap_err();
        assert!(err.to_string().contains("keys_file"), "got: {err}");
    }

    #[test]
    fn test_raw_credentials_reads_process_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let mut config = Config::default();
        config.credentials.env_var = "GENAI_DISPATCH_TEST_KEYS".into();

        unsafe { set_env("GENAI_DISPATCH_TEST_KEYS", "p1,p2") };
        let raw = config.raw_credentials().unwrap();
        unsafe { remove_env("GENAI_DISPATCH_TEST_KEYS") };

        assert_eq!(exposed(&raw), vec!["p1,p2"]);
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("genai-dispatch.toml"));
    }
}
