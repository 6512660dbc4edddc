//! Authentication service models

pub mod role;
pub mod user;

// Re-export for convenience
pub use role::Role;
pub use user::{LoginCredentials, PasswordChange, User};
