// src/directory_service.rs

use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::auth::{AuthError, Credential, DirectorySession, read_error_body};
use crate::config::DirectoryConfig;
use crate::models::{MfaMethod, UpdateUserRequest, UserRecord};

/// Ошибки каталога
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Directory API error ({status}): {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Клиент каталога: чтение и запись пользователя
#[allow(async_fn_in_trait)]
pub trait DirectoryClient {
    /// Получить пользователя вместе с методами MFA
    async fn get_user(&self, principal_name: &str) -> Result<UserRecord, DirectoryError>;

    /// Заменить список методов MFA пользователя целиком
    async fn update_user(
        &self,
        principal_name: &str,
        methods: &[MfaMethod],
    ) -> Result<(), DirectoryError>;
}

// === Ошибка в стиле OData ===

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// HTTP-клиент каталога поверх аутентифицированной сессии
#[derive(Debug)]
pub struct HttpDirectoryClient {
    http: reqwest::Client,
    session: DirectorySession,
    base_url: Url,
}

impl HttpDirectoryClient {
    /// Подключиться к каталогу с указанными учётными данными
    pub async fn connect(
        config: &DirectoryConfig,
        credential: Credential,
    ) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DirectoryError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            DirectoryError::Config(format!("Invalid api_base_url '{}': {}", config.api_base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::Config(format!(
                "api_base_url '{}' cannot be used as a base URL",
                config.api_base_url
            )));
        }

        let session = DirectorySession::connect(http.clone(), config, credential).await?;

        Ok(Self::with_session(http, session, base_url))
    }

    /// Использовать уже установленную сессию
    pub fn with_session(http: reqwest::Client, session: DirectorySession, base_url: Url) -> Self {
        Self {
            http,
            session,
            base_url,
        }
    }

    /// `{base}/users/{upn}`; UPN кодируется как один сегмент пути
    pub fn user_url(&self, principal_name: &str) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::Config("api_base_url cannot be a base".to_string()))?
            .pop_if_empty()
            .push("users")
            .push(principal_name);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        principal_name: &str,
        body: Option<&UpdateUserRequest<'_>>,
    ) -> Result<reqwest::Response, DirectoryError> {
        let url = self.user_url(principal_name)?;
        let token = self.session.access_token().await?;
        let request_id = uuid::Uuid::new_v4();

        debug!(%request_id, %method, %url, "Directory request");

        let mut request = self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header("client-request-id", request_id.to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = read_error_body(response).await;
        debug!(%request_id, %status, "Directory request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => DirectoryError::Auth(AuthError::TokenRejected),
            StatusCode::FORBIDDEN => DirectoryError::PermissionDenied(error_message(&text)),
            StatusCode::NOT_FOUND => DirectoryError::UserNotFound(principal_name.to_string()),
            _ => match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(err) => DirectoryError::Api {
                    status: status.as_u16(),
                    code: err.error.code,
                    message: err.error.message,
                },
                Err(_) => DirectoryError::Api {
                    status: status.as_u16(),
                    code: status.to_string(),
                    message: text,
                },
            },
        })
    }
}

fn error_message(text: &str) -> String {
    serde_json::from_str::<ErrorResponse>(text)
        .map(|err| err.error.message)
        .unwrap_or_else(|_| text.to_string())
}

impl DirectoryClient for HttpDirectoryClient {
    #[instrument(skip(self))]
    async fn get_user(&self, principal_name: &str) -> Result<UserRecord, DirectoryError> {
        let response = self.send(Method::GET, principal_name, None).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[instrument(skip(self, methods), fields(count = methods.len()))]
    async fn update_user(
        &self,
        principal_name: &str,
        methods: &[MfaMethod],
    ) -> Result<(), DirectoryError> {
        let body = UpdateUserRequest {
            strong_authentication_methods: methods,
        };
        self.send(Method::PATCH, principal_name, Some(&body)).await?;
        Ok(())
    }
}
