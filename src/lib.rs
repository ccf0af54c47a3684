// src/lib.rs

pub mod auth;
pub mod cli;
pub mod config;
pub mod directory_service;
pub mod logging;
pub mod mfa_default;
pub mod models;

// Re-exports

pub use auth::{AuthError, Credential, DirectorySession};
pub use config::{AppConfig, ConfigError, DirectoryConfig};
pub use directory_service::{DirectoryClient, DirectoryError, HttpDirectoryClient};
pub use mfa_default::{MfaDefaultSetter, SetDefaultOutcome, set_default_method};
pub use models::{MfaMethod, MfaMethodType, UserRecord};
