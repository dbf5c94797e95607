//! Errors raised while updating the profile
//!
//! Rate-limit rejections are not errors; they travel as
//! [`pfp_governor::Admission`] values. A missing banner is not an error
//! either; the asset layer reports it as `None`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    /// Handle or app password is not configured
    #[error("Server configuration error - missing credentials")]
    Configuration,

    /// Anything that went wrong talking to Bluesky or reading the avatar
    #[error("{0}")]
    Upstream(String),
}

impl UpdateError {
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        UpdateError::Upstream(format!("{context}: {err}"))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, UpdateError::Configuration)
    }
}
