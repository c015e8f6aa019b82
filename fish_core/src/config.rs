use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Overrides the location of the TOML config file.
pub const CONFIG_PATH_VAR: &str = "FISH_PRICE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "inference.toml";
const ENV_PREFIX: &str = "FISH_PRICE";
/// Smaller budgets would time out nearly every prediction.
pub const MIN_REQUEST_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Intra-op threads for the ONNX session.
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: i16,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model/fish_price.json")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    1000
}

fn default_onnx_threads() -> i16 {
    1
}

impl ServerConfig {
    /// File named by `FISH_PRICE_CONFIG` (or `inference.toml`), then `FISH_PRICE_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Same layering as [`ServerConfig::from_env`] over an explicit variable set.
    pub fn from_vars(vars: Map<String, String>) -> Result<Self, ConfigError> {
        let path = vars
            .get(CONFIG_PATH_VAR)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        Self::build(&path, Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    /// The file is optional; missing keys fall back to defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::build(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn build(path: &str, env: Environment) -> Result<Self, ConfigError> {
        let cfg: Self = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;

        if cfg.request_timeout_ms < MIN_REQUEST_TIMEOUT_MS {
            return Err(ConfigError::Message(format!(
                "request_timeout_ms must be at least {}, got {}",
                MIN_REQUEST_TIMEOUT_MS, cfg.request_timeout_ms
            )));
        }

        Ok(cfg)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let cfg = ServerConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("model/fish_price.json"));
        assert_eq!(cfg.request_timeout(), Duration::from_millis(1000));
    }

    #[test]
    fn reads_values_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "model_path = \"artifacts/forest.json\"").unwrap();
        writeln!(file, "host = \"127.0.0.1\"").unwrap();
        writeln!(file, "port = 8081").unwrap();
        writeln!(file, "request_timeout_ms = 250").unwrap();

        let cfg = ServerConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("artifacts/forest.json"));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8081");
        assert_eq!(cfg.request_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.onnx_threads, 1);
    }

    #[test]
    fn environment_overrides_the_selected_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "model_path = \"model/linear.json\"").unwrap();
        writeln!(file, "port = 8081").unwrap();
        writeln!(file, "request_timeout_ms = 250").unwrap();

        let vars: Map<String, String> = [
            (CONFIG_PATH_VAR, path.to_str().unwrap()),
            ("FISH_PRICE_PORT", "8089"),
            ("FISH_PRICE_MODEL_PATH", "x/forest.json"),
            ("FISH_PRICE_HOST", "127.0.0.1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = ServerConfig::from_vars(vars).unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("x/forest.json"));
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8089");
        // Only set in the file, so the file named by FISH_PRICE_CONFIG was read.
        assert_eq!(cfg.request_timeout_ms, 250);
    }

    #[test]
    fn rejects_request_timeout_below_floor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inference.toml");
        std::fs::write(&path, "request_timeout_ms = 0\n").unwrap();

        let err = ServerConfig::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("request_timeout_ms"));

        std::fs::write(&path, format!("request_timeout_ms = {}\n", MIN_REQUEST_TIMEOUT_MS)).unwrap();
        let cfg = ServerConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.request_timeout_ms, MIN_REQUEST_TIMEOUT_MS);
    }
}
