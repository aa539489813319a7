//! Exchange of the long-lived OAuth credential for a short-lived IAM token.

use serde::{Deserialize, Serialize};

use super::UpstreamError;

const TOKEN_URL: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    yandex_passport_oauth_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    iam_token: String,
}

/// Issue a fresh IAM token.  Tokens are not cached or reused: every
/// completion request performs its own exchange.
pub async fn issue_token(
    http: &reqwest::Client,
    oauth_token: &str,
) -> Result<String, UpstreamError> {
    let response = http
        .post(TOKEN_URL)
        .json(&TokenRequest { yandex_passport_oauth_token: oauth_token })
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(UpstreamError::Auth)?
        .json::<TokenResponse>()
        .await
        .map_err(UpstreamError::Auth)?;
    Ok(response.iam_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_request_wire_format() {
        assert_eq!(
            serde_json::to_value(TokenRequest {
                yandex_passport_oauth_token: "y0_secret"
            })
            .unwrap(),
            serde_json::json!({"yandexPassportOauthToken": "y0_secret"})
        );
    }

    #[test]
    fn token_is_read_from_the_iam_token_field() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "iamToken": "t1.short-lived",
            "expiresAt": "2026-08-07T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(response.iam_token, "t1.short-lived");
    }
}
