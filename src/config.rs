//! Configuração do streamforge carregada a partir de `streamforge.toml`.
//!
//! Chaves ausentes usam os defaults. A variável de ambiente
//! `STREAMFORGE_FLOWS_DIR` tem precedência sobre o arquivo para o diretório de flows.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{DEFAULT_QUERY_FILE, DEFAULT_SCHEMA_FILE, DEFAULT_STAGE_TIMEOUT};
use crate::error::StreamforgeError;

pub const CONFIG_FILE: &str = "streamforge.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct StreamforgeConfig {
    /// Segundos que cada estágio do build do engine pode rodar antes de ser abandonado.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Diretório com um subdiretório por flow em execução.
    #[serde(default = "default_flows_dir")]
    pub flows_dir: PathBuf,

    #[serde(default = "default_schema")]
    pub default_schema: String,

    #[serde(default = "default_query")]
    pub default_query: String,
}

fn default_stage_timeout_secs() -> u64 {
    DEFAULT_STAGE_TIMEOUT.as_secs()
}

fn default_flows_dir() -> PathBuf {
    PathBuf::from("flows")
}

fn default_schema() -> String {
    DEFAULT_SCHEMA_FILE.to_string()
}

fn default_query() -> String {
    DEFAULT_QUERY_FILE.to_string()
}

impl Default for StreamforgeConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: default_stage_timeout_secs(),
            flows_dir: default_flows_dir(),
            default_schema: default_schema(),
            default_query: default_query(),
        }
    }
}

impl StreamforgeConfig {
    /// Carrega `streamforge.toml` do diretório atual.
    pub fn load() -> Result<Self, StreamforgeError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Carrega de `path`, usando os defaults se o arquivo não existir.
    pub fn load_from(path: &Path) -> Result<Self, StreamforgeError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<StreamforgeConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(dir) = std::env::var("STREAMFORGE_FLOWS_DIR")
            && !dir.is_empty()
        {
            config.flows_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StreamforgeError> {
        if self.stage_timeout_secs == 0 {
            return Err(StreamforgeError::Config(
                "stage_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = StreamforgeConfig::default();
        assert_eq!(config.stage_timeout_secs, 20);
        assert_eq!(config.stage_timeout(), Duration::from_secs(20));
        assert_eq!(config.default_schema, "packet_schema.txt");
        assert_eq!(config.default_query, "query.gsql");
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            stage_timeout_secs = 45
            default_query = "top_talkers.gsql"
        "#;
        let config: StreamforgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.stage_timeout_secs, 45);
        assert_eq!(config.default_query, "top_talkers.gsql");
        assert_eq!(config.default_schema, "packet_schema.txt");
        assert_eq!(config.flows_dir, PathBuf::from("flows"));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = StreamforgeConfig::load_from(&tmp.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.stage_timeout_secs, 20);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, "stage_timeout_secs = 0\n").unwrap();
        let err = StreamforgeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, StreamforgeError::Config(_)));
    }

    #[test]
    fn malformed_file_is_toml_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        std::fs::write(&path, "stage_timeout_secs = \"soon\"\n").unwrap();
        let err = StreamforgeConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, StreamforgeError::Toml(_)));
    }
}
