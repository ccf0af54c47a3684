// src/models/mod.rs

pub mod mfa;
pub mod user;

// Re-exports

pub use mfa::{MfaMethod, MfaMethodType, UnknownMethodType, apply_default};
pub use user::{UpdateUserRequest, UserRecord};
