//! Clients for the external Yandex services the bot talks to.

pub mod disk;
pub mod gpt;
pub mod iam;

use thiserror::Error;

/// Failure of one of the upstream calls behind an answer.
///
/// The pipeline converts these into short fixed user-facing strings; the
/// detail carried here only goes to the operational log.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("IAM token exchange failed: {0}")]
    Auth(#[source] reqwest::Error),
    #[error("completion request failed: {0}")]
    Completion(#[source] reqwest::Error),
}
