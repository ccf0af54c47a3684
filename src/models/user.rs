// src/models/user.rs

use serde::{Deserialize, Serialize};
use crate::models::mfa::{self, MfaMethod};

/// Учётная запись в каталоге (только поля, которые нам нужны)
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_principal_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Нет поля в ответе = методы не настроены
    #[serde(default)]
    pub strong_authentication_methods: Vec<MfaMethod>,
}

impl UserRecord {
    /// Текущий метод по умолчанию
    pub fn default_method(&self) -> Option<&MfaMethod> {
        mfa::default_method(&self.strong_authentication_methods)
    }
}

/// Тело PATCH-запроса: список методов целиком
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest<'a> {
    pub strong_authentication_methods: &'a [MfaMethod],
}
