//! Minimal client for the Yandex Disk REST API.
//!
//! Only the calls the exporter needs: token check, directory creation and
//! file upload.

use reqwest::{header, StatusCode};
use serde::Deserialize;
use thiserror::Error;

const API_URL: &str = "https://cloud-api.yandex.net/v1/disk";

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

pub struct Disk {
    http: reqwest::Client,
    token: String,
}

impl Disk {
    pub fn new(http: reqwest::Client, token: impl Into<String>) -> Self {
        Self { http, token: token.into() }
    }

    fn auth(&self) -> String {
        format!("OAuth {}", self.token)
    }

    /// Check that the configured token is accepted by the API.
    pub async fn check_token(&self) -> Result<(), DiskError> {
        let response = self
            .http
            .get(API_URL)
            .header(header::AUTHORIZATION, self.auth())
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Create `path` and any missing parents.  Directories that already
    /// exist are left alone.
    pub async fn ensure_dir(&self, path: &str) -> Result<(), DiskError> {
        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            let response = self
                .http
                .put(format!("{API_URL}/resources"))
                .header(header::AUTHORIZATION, self.auth())
                .query(&[("path", current.as_str())])
                .send()
                .await?;
            if response.status() == StatusCode::CONFLICT {
                continue;
            }
            expect_success(response).await?;
        }
        Ok(())
    }

    /// Upload `bytes` to `remote`, overwriting any previous version.  The
    /// API hands out a one-off upload URL first; the content goes there.
    pub async fn upload(
        &self,
        remote: &str,
        bytes: Vec<u8>,
    ) -> Result<(), DiskError> {
        #[derive(Deserialize)]
        struct UploadTarget {
            href: String,
        }

        let response = self
            .http
            .get(format!("{API_URL}/resources/upload"))
            .header(header::AUTHORIZATION, self.auth())
            .query(&[("path", remote), ("overwrite", "true")])
            .send()
            .await?;
        let target =
            expect_success(response).await?.json::<UploadTarget>().await?;

        let response = self.http.put(target.href).body(bytes).send().await?;
        expect_success(response).await?;
        Ok(())
    }
}

async fn expect_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, DiskError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(DiskError::Status { status, body })
    }
}
