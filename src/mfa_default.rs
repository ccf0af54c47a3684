// src/mfa_default.rs

use tracing::{info, instrument, warn};

use crate::auth::Credential;
use crate::config::DirectoryConfig;
use crate::directory_service::{DirectoryClient, DirectoryError, HttpDirectoryClient};
use crate::models::{MfaMethod, MfaMethodType, apply_default};

/// Результат смены метода по умолчанию
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDefaultOutcome {
    /// Список методов записан в каталог
    Updated { methods: Vec<MfaMethod> },
    /// У пользователя нет метода такого типа, в каталог ничего не писали
    NotConfigured {
        principal_name: String,
        method_type: MfaMethodType,
    },
}

impl SetDefaultOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, SetDefaultOutcome::Updated { .. })
    }
}

/// Меняет метод MFA по умолчанию у учётных записей каталога
pub struct MfaDefaultSetter<C> {
    client: C,
}

impl<C: DirectoryClient> MfaDefaultSetter<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Сделать `target` методом по умолчанию: одно чтение, не больше одной записи
    #[instrument(skip(self), fields(method = %target))]
    pub async fn set_default_method(
        &self,
        principal_name: &str,
        target: &MfaMethodType,
    ) -> Result<SetDefaultOutcome, DirectoryError> {
        let principal_name = validate_principal_name(principal_name)?;

        let user = self.client.get_user(principal_name).await?;

        let Some(methods) = apply_default(&user.strong_authentication_methods, target) else {
            warn!(
                user = principal_name,
                "MFA method {} is not configured, nothing changed", target
            );
            return Ok(SetDefaultOutcome::NotConfigured {
                principal_name: principal_name.to_string(),
                method_type: target.clone(),
            });
        };

        self.client.update_user(principal_name, &methods).await?;
        info!(user = principal_name, "Default MFA method set to {}", target);

        Ok(SetDefaultOutcome::Updated { methods })
    }

    /// Текущие методы MFA пользователя
    pub async fn methods(&self, principal_name: &str) -> Result<Vec<MfaMethod>, DirectoryError> {
        let principal_name = validate_principal_name(principal_name)?;
        let user = self.client.get_user(principal_name).await?;
        Ok(user.strong_authentication_methods)
    }
}

fn validate_principal_name(principal_name: &str) -> Result<&str, DirectoryError> {
    let trimmed = principal_name.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::InvalidInput(
            "principal name must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Подключиться с учётными данными и сменить метод по умолчанию у одного пользователя
pub async fn set_default_method(
    config: &DirectoryConfig,
    credential: Credential,
    principal_name: &str,
    target: &MfaMethodType,
) -> Result<SetDefaultOutcome, DirectoryError> {
    validate_principal_name(principal_name)?;

    let client = HttpDirectoryClient::connect(config, credential).await?;
    MfaDefaultSetter::new(client)
        .set_default_method(principal_name, target)
        .await
}
