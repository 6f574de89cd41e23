//! Shared Kernel - vocabulary every Animeka crate agrees on
//!
//! - [`error::app_error::AppError`] and the [`error::kind::ErrorKind`] taxonomy
//! - Typed identifiers ([`id::UserId`])
//!
//! Anything placed here is expected to change rarely; domain crates
//! (`media`, `catalog`) convert their own errors into [`error::app_error::AppError`].

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
