// src/auth.rs

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Cursor;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::config::DirectoryConfig;

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    TokenRequest(String),
    #[error("Credentials rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),
    #[error("Access token was rejected by the directory")]
    TokenRejected,
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidKeyFormat(e.to_string())
    }
}

/// Учётные данные для подключения к каталогу
pub enum Credential {
    ClientSecret {
        client_id: String,
        client_secret: SecretString,
    },
    /// Сертификат и приватный ключ в PEM
    Certificate {
        client_id: String,
        certificate_pem: Vec<u8>,
        private_key_pem: Vec<u8>,
    },
    /// Уже выданный токен (готовая сессия), не обновляется
    AccessToken(SecretString),
}

// Секреты и ключ в отладочный вывод не попадают
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "[REDACTED]";
        match self {
            Credential::ClientSecret { client_id, .. } => f
                .debug_struct("ClientSecret")
                .field("client_id", client_id)
                .field("client_secret", &REDACTED)
                .finish(),
            Credential::Certificate {
                client_id,
                certificate_pem,
                ..
            } => f
                .debug_struct("Certificate")
                .field("client_id", client_id)
                .field("certificate_pem", &format_args!("<{} bytes>", certificate_pem.len()))
                .field("private_key_pem", &REDACTED)
                .finish(),
            Credential::AccessToken(_) => f.debug_tuple("AccessToken").field(&REDACTED).finish(),
        }
    }
}

/// Тело ответа с ошибкой; если его не удалось прочитать, пишем в debug и отдаём пустую строку
pub(crate) async fn read_error_body(response: reqwest::Response) -> String {
    match response.text().await {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to read error response body: {}", e);
            String::new()
        }
    }
}

// === Ответ сервера токенов ===

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[allow(dead_code)]
    token_type: String,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    /// None — срок неизвестен (токен передан снаружи)
    expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + grace_period >= expires_at,
            None => false,
        }
    }
}

// === Claims для client assertion ===

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub nbf: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Отпечаток сертификата для заголовка `x5t#S256`
pub fn certificate_thumbprint(certificate_pem: &[u8]) -> Result<String, AuthError> {
    let certs = rustls_pemfile::certs(&mut Cursor::new(certificate_pem))
        .map_err(|_| AuthError::InvalidKeyFormat("Failed to parse certificate PEM".into()))?;

    let der = certs
        .into_iter()
        .next()
        .ok_or_else(|| AuthError::InvalidKeyFormat("No certificate found in PEM".into()))?;

    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(&der)))
}

/// Подписать JWT client assertion (RS256) для сервера токенов
pub fn build_client_assertion(
    client_id: &str,
    token_url: &str,
    certificate_pem: &[u8],
    private_key_pem: &[u8],
) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)?;

    let header = Header {
        alg: Algorithm::RS256,
        x5t_s256: Some(certificate_thumbprint(certificate_pem)?),
        ..Header::default()
    };

    let now = Utc::now().timestamp();
    let claims = AssertionClaims {
        aud: token_url.to_owned(),
        iss: client_id.to_owned(),
        sub: client_id.to_owned(),
        jti: uuid::Uuid::new_v4().to_string(),
        nbf: now,
        iat: now,
        exp: now + 10 * 60,
    };

    encode(&header, &claims, &encoding_key).map_err(Into::into)
}

/// Аутентифицированная сессия каталога: учётные данные + кэш токена
#[derive(Debug)]
pub struct DirectorySession {
    http: reqwest::Client,
    token_url: String,
    scope: String,
    credential: Credential,
    cached: RwLock<Option<CachedToken>>,
    grace_period: Duration,
}

impl DirectorySession {
    /// Подключиться: сразу получаем токен, чтобы ошибка аутентификации
    /// всплыла до первого запроса к каталогу
    #[instrument(skip_all, fields(tenant_id = %config.tenant_id))]
    pub async fn connect(
        http: reqwest::Client,
        config: &DirectoryConfig,
        credential: Credential,
    ) -> Result<Self, AuthError> {
        let scope = config
            .resolved_scope()
            .map_err(|e| AuthError::Config(e.to_string()))?;

        let session = Self {
            http,
            token_url: config.token_url(),
            scope,
            credential,
            cached: RwLock::new(None),
            grace_period: Duration::minutes(5),
        };

        let token = session.acquire_token().await?;
        *session.cached.write().await = Some(token);

        Ok(session)
    }

    /// Действующий токен; просроченный получаем заново
    pub async fn access_token(&self) -> Result<String, AuthError> {
        {
            let cache = self.cached.read().await;
            if let Some(token) = cache.as_ref() {
                if !token.is_expired(self.grace_period) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!("Refreshing access token");
        let token = self.acquire_token().await?;
        let access_token = token.access_token.clone();
        *self.cached.write().await = Some(token);

        Ok(access_token)
    }

    #[instrument(skip(self))]
    async fn acquire_token(&self) -> Result<CachedToken, AuthError> {
        let (client_id, secret_field) = match &self.credential {
            Credential::AccessToken(token) => {
                return Ok(CachedToken {
                    access_token: token.expose_secret().clone(),
                    expires_at: None,
                });
            }
            Credential::ClientSecret {
                client_id,
                client_secret,
            } => (
                client_id,
                vec![("client_secret", client_secret.expose_secret().clone())],
            ),
            Credential::Certificate {
                client_id,
                certificate_pem,
                private_key_pem,
            } => {
                let assertion = build_client_assertion(
                    client_id,
                    &self.token_url,
                    certificate_pem,
                    private_key_pem,
                )?;
                (
                    client_id,
                    vec![
                        ("client_assertion_type", CLIENT_ASSERTION_TYPE.to_string()),
                        ("client_assertion", assertion),
                    ],
                )
            }
        };

        let mut params = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", client_id.clone()),
            ("scope", self.scope.clone()),
        ];
        params.extend(secret_field);

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::TokenRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenRequest(format!("Failed to parse token response: {}", e)))?;

        // expires_in приходит от сервера: значение вне диапазона — ошибка, а не паника
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::TokenRequest(format!("invalid expires_in: {}", token.expires_in))
            })?;
        debug!("Acquired token, expires at {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Some(expires_at),
        })
    }
}
