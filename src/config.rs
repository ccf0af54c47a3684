// src/config.rs

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::Credential;

/// Префикс переменных окружения: MFA_DEFAULT_CREDENTIAL__CLIENT_SECRET и т.п.
pub const ENV_PREFIX: &str = "MFA_DEFAULT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("No usable credential configured: {0}")]
    MissingCredential(String),
    #[error("Failed to read key file {path}: {source}")]
    KeyReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write configuration: {0}")]
    Write(String),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub credential: CredentialConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DirectoryConfig {
    pub tenant_id: String,
    /// Базовый адрес API каталога, например https://directory.example.com/v1.0
    pub api_base_url: String,
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    /// Если не задан — `<схема>://<хост api_base_url>/.default`
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl DirectoryConfig {
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    pub fn resolved_scope(&self) -> Result<String, ConfigError> {
        if let Some(scope) = &self.scope {
            return Ok(scope.clone());
        }

        let url = reqwest::Url::parse(&self.api_base_url).map_err(|e| {
            ConfigError::Invalid(format!("api_base_url '{}': {}", self.api_base_url, e))
        })?;
        let host = url.host_str().unwrap_or_default();
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        Ok(format!("{}/.default", origin))
    }
}

/// Учётные данные сервисного аккаунта. Секреты никогда не пишутся на диск.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CredentialConfig {
    pub client_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub client_secret: Option<SecretString>,
    pub certificate_path: Option<String>,
    pub private_key_path: Option<String>,
    #[serde(default, skip_serializing)]
    pub access_token: Option<SecretString>,
}

impl CredentialConfig {
    /// Выбрать учётные данные: токен → сертификат → секрет
    pub fn into_credential(self) -> Result<Credential, ConfigError> {
        if let Some(token) = self.access_token {
            return Ok(Credential::AccessToken(token));
        }

        let client_id = self.client_id.ok_or_else(|| {
            ConfigError::MissingCredential("credential.client_id is not set".to_string())
        })?;

        match (self.certificate_path, self.private_key_path) {
            (Some(cert_path), Some(key_path)) => Ok(Credential::Certificate {
                client_id,
                certificate_pem: read_key_file(&cert_path)?,
                private_key_pem: read_key_file(&key_path)?,
            }),
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::MissingCredential(
                "certificate_path and private_key_path must be set together".to_string(),
            )),
            (None, None) => match self.client_secret {
                Some(client_secret) => Ok(Credential::ClientSecret {
                    client_id,
                    client_secret,
                }),
                None => Err(ConfigError::MissingCredential(
                    "set client_secret, certificate_path/private_key_path or access_token"
                        .to_string(),
                )),
            },
        }
    }
}

fn read_key_file(path: &str) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|source| ConfigError::KeyReadFailed {
        path: path.to_string(),
        source,
    })
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub enable_json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            enable_json_output: false,
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

/// Путь по умолчанию: ~/.config/mfa-default/config.yaml
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mfa-default").join("config.yaml"))
}

impl AppConfig {
    /// Загрузить конфигурацию: .env → YAML-файл → переменные окружения
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();

        // Явно указанный файл обязателен, файл по умолчанию — нет
        let explicit = path.is_some();
        if let Some(file) = path.map(Path::to_path_buf).or_else(default_config_path) {
            builder = builder.add_source(config::File::from(file).required(explicit));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Шаблон конфигурации для `init-config`
    pub fn template() -> Self {
        Self {
            directory: DirectoryConfig {
                tenant_id: "00000000-0000-0000-0000-000000000000".to_string(),
                api_base_url: "https://directory.example.com/v1.0".to_string(),
                authority_url: default_authority_url(),
                scope: None,
                timeout_secs: default_timeout_secs(),
            },
            credential: CredentialConfig {
                client_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
                ..CredentialConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        fs::write(path, content).map_err(|e| ConfigError::Write(e.to_string()))?;
        Ok(())
    }
}
