// src/models/mfa.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Тип метода MFA, как его называет каталог
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MfaMethodType {
    PhoneAppNotification,
    OneWaySms,
    TwoWayVoiceMobile,
    PhoneAppOtp,
    /// Значение, которое мы не знаем, но обязаны вернуть каталогу как есть
    Other(String),
}

impl MfaMethodType {
    /// Имя в каталоге (регистр важен)
    pub fn as_str(&self) -> &str {
        match self {
            MfaMethodType::PhoneAppNotification => "PhoneAppNotification",
            MfaMethodType::OneWaySms => "OneWaySMS",
            MfaMethodType::TwoWayVoiceMobile => "TwoWayVoiceMobile",
            MfaMethodType::PhoneAppOtp => "PhoneAppOTP",
            MfaMethodType::Other(name) => name,
        }
    }
}

impl fmt::Display for MfaMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MfaMethodType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PhoneAppNotification" => MfaMethodType::PhoneAppNotification,
            "OneWaySMS" => MfaMethodType::OneWaySms,
            "TwoWayVoiceMobile" => MfaMethodType::TwoWayVoiceMobile,
            "PhoneAppOTP" => MfaMethodType::PhoneAppOtp,
            _ => MfaMethodType::Other(s),
        }
    }
}

impl From<MfaMethodType> for String {
    fn from(t: MfaMethodType) -> Self {
        match t {
            MfaMethodType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown MFA method type '{0}' (expected one of PhoneAppNotification, OneWaySMS, TwoWayVoiceMobile, PhoneAppOTP)")]
pub struct UnknownMethodType(pub String);

/// Разбор целевого типа: только четыре известных значения, с учётом регистра
impl FromStr for MfaMethodType {
    type Err = UnknownMethodType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match MfaMethodType::from(s.to_string()) {
            MfaMethodType::Other(name) => Err(UnknownMethodType(name)),
            known => Ok(known),
        }
    }
}

/// Метод MFA пользователя
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaMethod {
    pub method_type: MfaMethodType,
    #[serde(default)]
    pub is_default: bool,
}

impl MfaMethod {
    pub fn new(method_type: MfaMethodType, is_default: bool) -> Self {
        Self { method_type, is_default }
    }
}

/// Построить новый список методов, где `target` стоит по умолчанию.
///
/// Первый метод нужного типа получает `is_default = true`, все остальные
/// (включая повторы того же типа) — `false`. Порядок сохраняется.
/// `None`, если метод такого типа у пользователя не настроен.
pub fn apply_default(methods: &[MfaMethod], target: &MfaMethodType) -> Option<Vec<MfaMethod>> {
    let index = methods.iter().position(|m| &m.method_type == target)?;

    Some(
        methods
            .iter()
            .enumerate()
            .map(|(i, m)| MfaMethod::new(m.method_type.clone(), i == index))
            .collect(),
    )
}

/// Текущий метод по умолчанию (первый, если их несколько)
pub fn default_method(methods: &[MfaMethod]) -> Option<&MfaMethod> {
    methods.iter().find(|m| m.is_default)
}
